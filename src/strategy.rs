//! Switch strategies and the chain that tries them in order.
//!
//! Windows offers no switch call that both works everywhere and confirms
//! the result, so the tracker cascades through mechanisms:
//!
//! 1. [`ShellAutomationStrategy`] asks the shell's virtual desktop
//!    automation interface to activate a desktop by index.
//! 2. [`HotkeyStrategy`] synthesizes the system's own Win+Ctrl shortcut.
//!
//! The first one to report [`SwitchOutcome::Success`] wins.

use crate::command::{Direction, SwitchRequest};
use crate::traits::{DesktopAutomation, KeySink, SwitchOutcome, SwitchStrategy};
use log::{debug, info, warn};
use std::thread;
use std::time::Duration;

//  Keys

/// A Windows virtual-key code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VirtualKey(pub u16);

impl VirtualKey {
    pub const CONTROL: Self = Self(0x11);
    pub const LEFT: Self = Self(0x25);
    pub const RIGHT: Self = Self(0x27);
    pub const LWIN: Self = Self(0x5B);

    /// The top-row digit key `0`–`9`.
    pub fn digit(d: u8) -> Option<Self> {
        (d <= 9).then(|| Self(0x30 + u16::from(d)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Down,
    Up,
}

/// Highest desktop reachable through the digit shortcuts (slot 10 is `0`).
pub const MAX_HOTKEY_DESKTOP: i64 = 10;

/// A modifier chord plus one key, e.g. Win+Ctrl+Right.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyChord {
    pub modifiers: Vec<VirtualKey>,
    pub key: VirtualKey,
}

impl KeyChord {
    /// The system's "switch desktop" chord for `request`, or `None` if the
    /// request cannot be expressed as a shortcut (index outside `1..=10`).
    pub fn for_request(request: SwitchRequest) -> Option<Self> {
        let key = match request {
            SwitchRequest::Step(Direction::Next) => VirtualKey::RIGHT,
            SwitchRequest::Step(Direction::Previous) => VirtualKey::LEFT,
            SwitchRequest::Index(i) if (1..=9).contains(&i) => VirtualKey::digit(i as u8)?,
            SwitchRequest::Index(MAX_HOTKEY_DESKTOP) => VirtualKey::digit(0)?,
            SwitchRequest::Index(_) => return None,
        };
        Some(Self {
            modifiers: vec![VirtualKey::LWIN, VirtualKey::CONTROL],
            key,
        })
    }

    /// Key transitions grouped into phases: modifiers down, key down, key
    /// up, modifiers up in reverse.  Phases are sent with a pause between
    /// them.
    pub fn phases(&self) -> Vec<Vec<(VirtualKey, KeyAction)>> {
        vec![
            self.modifiers.iter().map(|m| (*m, KeyAction::Down)).collect(),
            vec![(self.key, KeyAction::Down)],
            vec![(self.key, KeyAction::Up)],
            self.modifiers.iter().rev().map(|m| (*m, KeyAction::Up)).collect(),
        ]
    }
}

//  Hotkey strategy

/// Pauses around synthetic key transitions.
///
/// Windows drops or misreads a chord whose transitions arrive in the same
/// instant, so each phase is separated by `pause`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyTiming {
    /// Wait before the first key goes down.
    pub lead_in: Duration,
    /// Wait between the modifier, key-down, key-up and release phases.
    pub pause: Duration,
}

impl Default for KeyTiming {
    fn default() -> Self {
        Self {
            lead_in: Duration::from_millis(50),
            pause: Duration::from_millis(20),
        }
    }
}

/// Switches by injecting the Win+Ctrl shortcut through a [`KeySink`].
///
/// Handles both directional requests (Win+Ctrl+Left/Right) and direct
/// indices 1–10 (Win+Ctrl+1…9, 0).  Reports `Success` once every key event
/// was accepted by the sink; whether the shell acted on it is only visible
/// on the next state read.
pub struct HotkeyStrategy<K> {
    sink: K,
    timing: KeyTiming,
}

impl<K: KeySink> HotkeyStrategy<K> {
    pub fn new(sink: K, timing: KeyTiming) -> Self {
        Self { sink, timing }
    }

    fn send_chord(&self, chord: &KeyChord) -> Result<(), K::Error> {
        pause(self.timing.lead_in);
        let mut held: Vec<VirtualKey> = Vec::new();
        let result = self.send_phases(chord, &mut held);
        if result.is_err() {
            // Never leave Win or Ctrl stuck down.
            for key in held.iter().rev() {
                let _ = self.sink.send_key(*key, KeyAction::Up);
            }
        }
        result
    }

    fn send_phases(&self, chord: &KeyChord, held: &mut Vec<VirtualKey>) -> Result<(), K::Error> {
        for (i, phase) in chord.phases().into_iter().enumerate() {
            if i > 0 {
                pause(self.timing.pause);
            }
            for (key, action) in phase {
                self.sink.send_key(key, action)?;
                match action {
                    KeyAction::Down => held.push(key),
                    KeyAction::Up => {
                        if let Some(pos) = held.iter().rposition(|k| *k == key) {
                            held.remove(pos);
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

impl<K: KeySink> SwitchStrategy for HotkeyStrategy<K> {
    fn name(&self) -> &'static str {
        "hotkey"
    }

    fn switch(&self, request: SwitchRequest) -> SwitchOutcome {
        let Some(chord) = KeyChord::for_request(request) else {
            return SwitchOutcome::Failure;
        };
        match self.send_chord(&chord) {
            Ok(()) => SwitchOutcome::Success,
            Err(e) => {
                warn!("failed to send hotkey for {}: {}", request, e);
                SwitchOutcome::Failure
            }
        }
    }
}

fn pause(d: Duration) {
    if !d.is_zero() {
        thread::sleep(d);
    }
}

//  Shell automation strategy

/// How a [`ShellAutomationStrategy`] confirms its switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verification {
    /// How many times to re-read the active desktop.
    pub attempts: u32,
    /// Wait between re-reads.
    pub interval: Duration,
}

impl Default for Verification {
    fn default() -> Self {
        Self {
            attempts: 12,
            interval: Duration::from_millis(15),
        }
    }
}

/// Switches through the shell's [`DesktopAutomation`] surface.
///
/// Only direct index requests are handled; directional requests are
/// `Unsupported` so the chain passes them on.
///
/// With a [`Verification`], `Success` means the shell reported the target
/// desktop as active afterwards.  Without one, `Success` only means the call
/// returned without error; the shell may still have ignored it.
pub struct ShellAutomationStrategy<A> {
    automation: A,
    verify: Option<Verification>,
}

impl<A: DesktopAutomation> ShellAutomationStrategy<A> {
    pub fn new(automation: A, verify: Option<Verification>) -> Self {
        Self { automation, verify }
    }

    fn confirm(&self, target: u32, verify: Verification) -> bool {
        for attempt in 0..verify.attempts {
            match self.automation.current_index() {
                Ok(current) if current == target => return true,
                Ok(_) => {}
                Err(e) => {
                    debug!("shell verification read failed: {}", e);
                    return false;
                }
            }
            if attempt + 1 < verify.attempts {
                pause(verify.interval);
            }
        }
        false
    }
}

impl<A: DesktopAutomation> SwitchStrategy for ShellAutomationStrategy<A> {
    fn name(&self) -> &'static str {
        "shell"
    }

    fn switch(&self, request: SwitchRequest) -> SwitchOutcome {
        let SwitchRequest::Index(index) = request else {
            return SwitchOutcome::Unsupported;
        };
        let Some(target) = index.checked_sub(1).and_then(|i| u32::try_from(i).ok()) else {
            return SwitchOutcome::Failure;
        };
        if let Err(e) = self.automation.switch_to(target) {
            debug!("shell switch to {} failed: {}", request, e);
            return SwitchOutcome::Failure;
        }
        match self.verify {
            None => SwitchOutcome::Success,
            Some(v) if self.confirm(target, v) => SwitchOutcome::Success,
            Some(_) => {
                debug!("shell switch to {} not confirmed", request);
                SwitchOutcome::Failure
            }
        }
    }
}

//  Chain

/// Ordered list of strategies; first success wins.
#[derive(Default)]
pub struct StrategyChain {
    strategies: Vec<Box<dyn SwitchStrategy + Send + Sync>>,
}

impl StrategyChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a strategy; it is tried after every strategy already added.
    pub fn with(mut self, strategy: impl SwitchStrategy + 'static) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    /// Try each strategy in order until one succeeds.
    ///
    /// Returns `Success` from the winning strategy, `Unsupported` if no
    /// strategy handles this kind of request, and `Failure` otherwise.
    pub fn dispatch(&self, request: SwitchRequest) -> SwitchOutcome {
        let mut outcome = SwitchOutcome::Unsupported;
        for strategy in &self.strategies {
            match strategy.switch(request) {
                SwitchOutcome::Success => {
                    info!("switched to {} via {}", request, strategy.name());
                    return SwitchOutcome::Success;
                }
                SwitchOutcome::Failure => {
                    debug!("{} strategy failed for {}", strategy.name(), request);
                    outcome = SwitchOutcome::Failure;
                }
                SwitchOutcome::Unsupported => {
                    debug!("{} strategy does not handle {}", strategy.name(), request);
                }
            }
        }
        debug!("no strategy switched to {}", request);
        outcome
    }
}
