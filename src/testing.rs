//! Test doubles shared by the unit tests.

use crate::snapshot::DesktopId;
use crate::traits::DesktopRegistry;
use std::collections::{HashMap, HashSet};

#[derive(Debug, thiserror::Error)]
#[error("registry unavailable")]
pub struct MemoryRegistryError;

/// Deterministic id for desktop `n`.
pub fn id(n: u8) -> DesktopId {
    let mut bytes = [0u8; 16];
    bytes[0] = n;
    bytes[15] = 0xA5;
    DesktopId::new(bytes)
}

/// In-memory [`DesktopRegistry`].
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    pub ids: Option<Vec<u8>>,
    pub current: Option<Vec<u8>>,
    pub names: HashMap<DesktopId, String>,
    pub failing_names: HashSet<DesktopId>,
    pub fail_ids: bool,
    pub fail_current: bool,
}

impl MemoryRegistry {
    /// `n` desktops with ids `id(1)..=id(n)`; desktop 1 active.
    pub fn with_desktops(n: u8) -> Self {
        let blob = (1..=n).flat_map(|i| id(i).as_bytes().to_vec()).collect();
        Self {
            ids: Some(blob),
            current: Some(id(1).as_bytes().to_vec()),
            ..Self::default()
        }
    }

    /// Every read fails.
    pub fn unreadable() -> Self {
        Self {
            fail_ids: true,
            fail_current: true,
            ..Self::default()
        }
    }

    pub fn active(mut self, n: u8) -> Self {
        self.current = Some(id(n).as_bytes().to_vec());
        self
    }

    pub fn named(mut self, n: u8, name: &str) -> Self {
        self.names.insert(id(n), name.to_string());
        self
    }
}

impl DesktopRegistry for MemoryRegistry {
    type Error = MemoryRegistryError;

    fn desktop_ids(&self) -> Result<Option<Vec<u8>>, MemoryRegistryError> {
        if self.fail_ids {
            return Err(MemoryRegistryError);
        }
        Ok(self.ids.clone())
    }

    fn current_desktop_id(&self) -> Result<Option<Vec<u8>>, MemoryRegistryError> {
        if self.fail_current {
            return Err(MemoryRegistryError);
        }
        Ok(self.current.clone())
    }

    fn desktop_name(&self, id: &DesktopId) -> Result<Option<String>, MemoryRegistryError> {
        if self.failing_names.contains(id) {
            return Err(MemoryRegistryError);
        }
        Ok(self.names.get(id).cloned())
    }
}
