pub mod input;
pub mod window;

pub use input::{ActivityFilter, ActivityKind};
pub use window::{ScreenGeometry, WindowGeometry, WindowHandle, WindowInfo};
