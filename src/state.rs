//! Desktop state reader.
//!
//! Interprets the raw records exposed by a [`DesktopRegistry`]: the ordered
//! id list gives the desktop count, and the position of the active id in
//! that list gives the current index.  Every failure degrades to the
//! "single default desktop" state instead of propagating.
//!
//! [`RegistryStateSource`] combines this reader with the
//! [name resolver](crate::names) into a [`StateSource`].

use crate::names::resolve_names;
use crate::snapshot::{DesktopId, DesktopSnapshot};
use crate::traits::{DesktopRegistry, StateSource};
use log::{debug, warn};

/// Result of one read of the desktop records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesktopState {
    /// 1-based index of the active desktop.
    pub current: u32,
    /// Number of desktops, at least 1.
    pub count: u32,
    /// Ids in desktop order.  Empty when the list could not be read.
    pub ids: Vec<DesktopId>,
}

impl DesktopState {
    /// The degraded `(1, 1)` state.
    pub fn fallback() -> Self {
        Self {
            current: 1,
            count: 1,
            ids: Vec::new(),
        }
    }
}

/// Read `(current, count)` and the id list from `registry`.
pub fn read_state<R: DesktopRegistry>(registry: &R) -> DesktopState {
    let ids = match registry.desktop_ids() {
        Ok(Some(blob)) => DesktopId::split_list(&blob),
        Ok(None) => {
            debug!("desktop id list not found");
            return DesktopState::fallback();
        }
        Err(e) => {
            warn!("failed to read desktop id list: {}", e);
            return DesktopState::fallback();
        }
    };
    if ids.is_empty() {
        debug!("desktop id list is empty or malformed");
        return DesktopState::fallback();
    }
    let count = u32::try_from(ids.len()).unwrap_or(u32::MAX);

    let current = match registry.current_desktop_id() {
        Ok(Some(raw)) => match DesktopId::from_slice(&raw) {
            Some(active) => position_of(&ids, &active).unwrap_or_else(|| {
                debug!("active desktop id {} not in list, assuming 1", active);
                1
            }),
            None => {
                debug!("active desktop id has {} bytes, assuming 1", raw.len());
                1
            }
        },
        Ok(None) => {
            debug!("active desktop id not found, assuming 1");
            1
        }
        Err(e) => {
            warn!("failed to read active desktop id: {}", e);
            return DesktopState::fallback();
        }
    };

    debug!("desktop {} of {}", current, count);
    DesktopState { current, count, ids }
}

/// 1-based position of `id` in `ids`.
fn position_of(ids: &[DesktopId], id: &DesktopId) -> Option<u32> {
    ids.iter()
        .position(|candidate| candidate == id)
        .and_then(|i| u32::try_from(i + 1).ok())
}

/// [`StateSource`] backed by a [`DesktopRegistry`].
pub struct RegistryStateSource<R> {
    registry: R,
}

impl<R> RegistryStateSource<R> {
    pub fn new(registry: R) -> Self {
        Self { registry }
    }
}

impl<R: DesktopRegistry + Send + Sync> StateSource for RegistryStateSource<R> {
    fn read_snapshot(&self) -> DesktopSnapshot {
        let state = read_state(&self.registry);
        let names = resolve_names(&self.registry, &state.ids, state.count);
        DesktopSnapshot::new(state.current, state.count, names)
    }
}
