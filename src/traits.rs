//! Core traits that decouple the tracker from the operating system and from
//! the transports that deliver commands.
//!
//! Every concrete backend (the Windows registry, `SendInput`, the shell's
//! virtual desktop automation, stdin, a global hotkey, a test harness, …)
//! implements one of these traits.  The
//! [`DesktopStateTracker`](crate::tracker::DesktopStateTracker) only depends
//! on these abstractions.

use crate::command::{Command, SwitchRequest};
use crate::snapshot::{DesktopId, DesktopSnapshot};
use crate::strategy::{KeyAction, VirtualKey};
use serde::Serialize;
use std::sync::mpsc;

//  State

/// Raw access to the OS-maintained virtual desktop records.
///
/// The layout behind this trait is undocumented and version-dependent; the
/// [`state`](crate::state) and [`names`](crate::names) modules interpret
/// what it returns.  `Ok(None)` means "the record does not exist", which is
/// distinct from a failed read.
pub trait DesktopRegistry {
    /// The error type produced by this registry.
    type Error: std::error::Error + Send + 'static;

    /// The ordered list of desktop ids, concatenated.
    fn desktop_ids(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    /// The id of the active desktop.
    fn current_desktop_id(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    /// The user-assigned name of the desktop `id`, if any.
    fn desktop_name(&self, id: &DesktopId) -> Result<Option<String>, Self::Error>;
}

/// Something that can produce a complete [`DesktopSnapshot`].
///
/// # Contract
///
/// * [`read_snapshot`](StateSource::read_snapshot) never fails: any problem
///   reading the OS state degrades to a valid snapshot (ultimately
///   [`DesktopSnapshot::single`]).
/// * Each call reads fresh state; nothing is cached between calls.
pub trait StateSource: Send + Sync {
    fn read_snapshot(&self) -> DesktopSnapshot;
}

//  Switching

/// Result of one switch attempt.
///
/// None of the mechanisms gets a reliable answer from the OS, so `Success`
/// only means the strategy believes the switch was issued (see each
/// strategy's docs for how strong that belief is).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchOutcome {
    Success,
    /// The strategy tried and failed, or rejected the request.
    Failure,
    /// The strategy does not handle this kind of request at all.
    Unsupported,
}

/// One mechanism for moving the active desktop.
///
/// Strategies are tried in order by a
/// [`StrategyChain`](crate::strategy::StrategyChain) until one reports
/// [`SwitchOutcome::Success`].  Implementations must not panic and must not
/// propagate errors; they report them as `Failure`.
pub trait SwitchStrategy: Send + Sync {
    /// Short name used in log output.
    fn name(&self) -> &'static str;

    fn switch(&self, request: SwitchRequest) -> SwitchOutcome;
}

/// Low-level keyboard injection.
pub trait KeySink: Send + Sync {
    /// The error type produced by this sink.
    type Error: std::error::Error + Send + 'static;

    /// Inject a single key transition.
    fn send_key(&self, key: VirtualKey, action: KeyAction) -> Result<(), Self::Error>;
}

/// The shell's own virtual desktop automation surface.
pub trait DesktopAutomation: Send + Sync {
    /// The error type produced by this automation surface.
    type Error: std::error::Error + Send + 'static;

    /// Ask the shell to activate the desktop at `index` (0-based).
    fn switch_to(&self, index: u32) -> Result<(), Self::Error>;

    /// The 0-based index of the active desktop, as the shell reports it.
    fn current_index(&self) -> Result<u32, Self::Error>;
}

//  Events

/// Change notifications sent from the
/// [`DesktopStateTracker`](crate::tracker::DesktopStateTracker) to
/// subscribers over an [`mpsc`](std::sync::mpsc) channel.
///
/// Any number of listeners (a tray icon, a JSON printer) can subscribe
/// independently.  When both fields of a snapshot change in one
/// refresh, `DesktopChanged` is sent before `DesktopCountChanged`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TrackerEvent {
    /// The active desktop changed.
    DesktopChanged {
        /// New 1-based index.
        index: u32,
        /// Resolved name of the new desktop.
        name: String,
    },

    /// The number of desktops changed.
    DesktopCountChanged { count: u32 },
}

//  Command Source

/// A source of [`Command`]s.
///
/// Implementations listen on some transport (stdin, a global hotkey) and
/// forward parsed commands into the provided [`mpsc::Sender`].
///
/// # Contract
///
/// * [`run`](CommandSource::run) **blocks** until the source is exhausted or
///   an unrecoverable error occurs.
/// * Each received command must be sent through `sink` exactly once.
/// * Implementations must be [`Send`] so they can run on a dedicated thread.
pub trait CommandSource: Send {
    /// The error type produced by this source.
    type Error: std::error::Error + Send + 'static;

    /// Start listening and forward every incoming [`Command`] into `sink`.
    ///
    /// This method blocks the calling thread.  To run multiple sources
    /// concurrently, spawn each one on its own thread.
    fn run(&mut self, sink: mpsc::Sender<Command>) -> Result<(), Self::Error>;
}
