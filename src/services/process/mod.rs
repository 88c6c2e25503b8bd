//! Process handles: start, liveness, graceful-then-forced stop.
//!
//! Programs are launched in their own process group so the supervisor can signal
//! the whole tree without touching itself.

mod child_process;
mod dry_run;
mod reaper;
mod r#trait;

pub use self::r#trait::{create_launcher, Launcher, ManagedProcess};
pub(crate) use self::child_process::ChildProcess;
#[cfg(test)]
pub(crate) use self::child_process::send_signal;
