//! [`DesktopAutomation`] through the shell's virtual desktop COM interfaces.
//!
//! The `winvd` crate wraps Explorer's `IVirtualDesktopManagerInternal` for
//! the running Windows build.  Those interfaces change between builds; on an
//! unknown build every call fails and the hotkey strategy takes over.

use crate::traits::DesktopAutomation;

#[derive(Debug, Default, Clone, Copy)]
pub struct WinvdAutomation;

#[derive(Debug, thiserror::Error)]
#[error("virtual desktop automation error: {0}")]
pub struct AutomationError(String);

impl From<winvd::Error> for AutomationError {
    fn from(e: winvd::Error) -> Self {
        Self(format!("{:?}", e))
    }
}

impl DesktopAutomation for WinvdAutomation {
    type Error = AutomationError;

    fn switch_to(&self, index: u32) -> Result<(), AutomationError> {
        winvd::switch_desktop(index)?;
        Ok(())
    }

    fn current_index(&self) -> Result<u32, AutomationError> {
        Ok(winvd::get_current_desktop().and_then(|d| d.get_index())?)
    }
}
