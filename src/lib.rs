//! **vdindicator**: the state tracker behind a virtual desktop indicator.
//!
//! The tracker knows which Windows virtual desktop is active, how many exist
//! and what each one is called.  It polls that state, tells subscribers when
//! the active desktop or the desktop count changes, and asks Windows to switch
//! desktops on request.
//!
//! # Architecture
//!
//! The crate is organised around a handful of seams:
//!
//! * [`traits::StateSource`]: one consistent read of the desktop state.
//!   The registry-backed implementation lives in [`state`] and sits on top
//!   of [`traits::DesktopRegistry`].
//! * [`traits::SwitchStrategy`]: one way of switching desktops.  Strategies
//!   are tried in order by a [`strategy::StrategyChain`].
//! * [`traits::CommandSource`]: the transport that delivers user intent
//!   (stdin, a global hotkey).
//!
//! [`tracker::DesktopStateTracker`] ties them together.  Concrete Windows
//! backends live in `win32`, which only exists on Windows.

pub mod command;
pub mod config;
pub mod ipc;
pub mod names;
pub mod snapshot;
pub mod state;
pub mod strategy;
pub mod tracker;
pub mod traits;
#[cfg(windows)]
pub mod win32;

#[cfg(test)]
mod testing;
