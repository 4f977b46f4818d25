//! Windows-specific implementations.
//!
//! This module provides the concrete backends for the
//! [`DesktopRegistry`](crate::traits::DesktopRegistry),
//! [`KeySink`](crate::traits::KeySink),
//! [`DesktopAutomation`](crate::traits::DesktopAutomation) and
//! [`CommandSource`](crate::traits::CommandSource) traits.
//!
//! Nothing outside this module should reference Win32 directly.

pub mod hotkey;
pub mod input;
pub mod registry;
pub mod shell;

use crate::config::Config;
use crate::state::RegistryStateSource;
use crate::strategy::{HotkeyStrategy, ShellAutomationStrategy, StrategyChain};
use crate::tracker::DesktopStateTracker;
use input::SendInputSink;
use registry::HkcuRegistry;
use shell::WinvdAutomation;

/// The tracker wired to the real registry and switch mechanisms.
pub type WindowsTracker = DesktopStateTracker<RegistryStateSource<HkcuRegistry>>;

/// Build a tracker reading `HKCU` and switching via shell automation first,
/// synthetic Win+Ctrl hotkeys second.
pub fn build_tracker(config: &Config) -> WindowsTracker {
    let chain = StrategyChain::new()
        .with(ShellAutomationStrategy::new(
            WinvdAutomation,
            config.tracker.verification(),
        ))
        .with(HotkeyStrategy::new(
            SendInputSink,
            config.hotkeys.key_timing(),
        ));
    DesktopStateTracker::new(
        RegistryStateSource::new(HkcuRegistry::new()),
        chain,
        config.tracker.clone(),
    )
}
