pub mod device_finder;
pub mod display_env;
pub mod permissions;
pub mod shutdown;
pub mod tool;

pub use device_finder::DeviceFinder;
pub use display_env::DisplayEnv;
pub use shutdown::{ExitSignals, Shutdown, ShutdownListener};
pub use tool::run_tool;

// Макросы условного логирования
#[macro_export]
macro_rules! debug_if_enabled {
    ($($arg:tt)*) => {
        if tracing::enabled!(tracing::Level::DEBUG) {
            tracing::debug!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! trace_if_enabled {
    ($($arg:tt)*) => {
        if tracing::enabled!(tracing::Level::TRACE) {
            tracing::trace!($($arg)*);
        }
    };
}
