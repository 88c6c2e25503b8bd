//! WindowTool: responsibility and boundaries
//!
//! This module and its submodules are responsible ONLY for talking to the external
//! window-manager tools (wmctrl, xdotool) and the resolution probes. Every call is
//! treated as unreliable: failures are returned as errors or "not found" and never
//! retried here. Decisions about WHEN to activate or fullscreen a window belong to
//! WindowPolicy and the ForegroundController.

mod dry_run;
mod screen;
mod system;
mod wmctrl;
mod xdotool;
mod r#trait;

pub use self::dry_run::DryRunDesktop;
pub use self::r#trait::{create_window_tool, WindowTool};
pub use self::screen::detect_screen_resolution;
