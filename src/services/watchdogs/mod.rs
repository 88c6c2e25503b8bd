//! Watchdogs: responsibility and boundaries
//!
//! Each watchdog is an independent polling loop that observes one condition
//! (input activity, the signal file, inactivity, Primary health) and reacts only
//! through the ForegroundSwitch surface. Watchdogs never touch process handles or
//! windows directly and never share mutable state with each other. Every loop
//! exits when the shared shutdown flag is raised.

mod dry_run;
mod health;
mod helper_script;
mod idle;
mod input;
mod signal_file;
mod r#trait;

pub use self::r#trait::create_watchdogs;
