pub mod controller;
pub mod process;
pub mod program;
pub mod watchdogs;
pub mod window_policy;
pub mod window_tool;

pub use controller::ForegroundController;
pub use process::create_launcher;
pub use watchdogs::create_watchdogs;
pub use window_policy::WindowPolicy;
pub use window_tool::{create_window_tool, detect_screen_resolution, DryRunDesktop};
