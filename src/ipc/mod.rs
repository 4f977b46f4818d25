//! Command input for front-ends and scripts.
//!
//! The tray front-end (or any script) writes newline-delimited JSON
//! commands to the daemon's stdin.  When that stream closes, sources that
//! block elsewhere are told to stop through a [`quit::QuitSignal`].

pub mod listener;
pub mod quit;
