//! Point-in-time view of the virtual desktop layout.
//!
//! A [`DesktopSnapshot`] is always produced whole by the
//! [`StateSource`](crate::traits::StateSource) and replaced whole by the
//! tracker.  [`SnapshotChange`] describes what differs between two of them.

use std::fmt;

/// Width in bytes of one desktop identifier in the registry blobs.
pub const DESKTOP_ID_LEN: usize = 16;

/// Opaque per-desktop identifier (a GUID in its binary registry layout).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DesktopId([u8; DESKTOP_ID_LEN]);

impl DesktopId {
    pub fn new(bytes: [u8; DESKTOP_ID_LEN]) -> Self {
        Self(bytes)
    }

    /// Build an id from a slice, or `None` if it is not exactly 16 bytes.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let arr: [u8; DESKTOP_ID_LEN] = bytes.try_into().ok()?;
        Some(Self(arr))
    }

    /// Split a concatenated id list into ids.  A trailing partial id is
    /// ignored.
    pub fn split_list(blob: &[u8]) -> Vec<Self> {
        blob.chunks_exact(DESKTOP_ID_LEN)
            .filter_map(Self::from_slice)
            .collect()
    }

    pub fn as_bytes(&self) -> &[u8; DESKTOP_ID_LEN] {
        &self.0
    }

    /// Name of the per-desktop registry sub-key, e.g.
    /// `{0A1B2C3D-4E5F-6071-8293-A4B5C6D7E8F9}`.
    pub fn registry_key_name(&self) -> String {
        format!("{{{}}}", self)
    }
}

/// Canonical GUID text.  The first three groups are stored little-endian.
impl fmt::Display for DesktopId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        let d1 = u32::from_le_bytes([b[0], b[1], b[2], b[3]]);
        let d2 = u16::from_le_bytes([b[4], b[5]]);
        let d3 = u16::from_le_bytes([b[6], b[7]]);
        write!(f, "{:08X}-{:04X}-{:04X}-{:02X}{:02X}-", d1, d2, d3, b[8], b[9])?;
        for byte in &b[10..] {
            write!(f, "{:02X}", byte)?;
        }
        Ok(())
    }
}

/// Synthesized name for a desktop without a custom name.
pub fn default_desktop_name(index: i64) -> String {
    format!("Desktop {}", index)
}

/// The tracker's belief about the desktop layout at one instant.
///
/// Invariant: `1 <= current <= count` and `names.len() == count`.
/// Constructed via [`DesktopSnapshot::new`], which enforces it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesktopSnapshot {
    current: u32,
    count: u32,
    names: Vec<String>,
}

impl DesktopSnapshot {
    /// Build a snapshot, clamping inputs into the invariant.
    ///
    /// A zero count becomes one, an out-of-range `current` becomes `1`, and
    /// `names` is padded with default names or truncated to `count`.
    pub fn new(current: u32, count: u32, mut names: Vec<String>) -> Self {
        let count = count.max(1);
        let current = if (1..=count).contains(&current) {
            current
        } else {
            1
        };
        names.truncate(count as usize);
        while names.len() < count as usize {
            names.push(default_desktop_name(names.len() as i64 + 1));
        }
        Self {
            current,
            count,
            names,
        }
    }

    /// The degraded "single default desktop" snapshot.
    pub fn single() -> Self {
        Self::new(1, 1, Vec::new())
    }

    pub fn current(&self) -> u32 {
        self.current
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Name of desktop `index` (1-based).  Unknown indices, including
    /// zero and negatives, get the synthesized default.
    pub fn name(&self, index: i64) -> String {
        usize::try_from(index)
            .ok()
            .and_then(|i| i.checked_sub(1))
            .and_then(|i| self.names.get(i))
            .cloned()
            .unwrap_or_else(|| default_desktop_name(index))
    }

    /// Name of the active desktop.
    pub fn current_name(&self) -> String {
        self.name(i64::from(self.current))
    }
}

impl Default for DesktopSnapshot {
    fn default() -> Self {
        Self::single()
    }
}

/// Which observable fields differ between two snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SnapshotChange {
    pub desktop: Option<u32>,
    pub count: Option<u32>,
}

impl SnapshotChange {
    /// Compare `previous` against `next`.  Names are deliberately not part
    /// of the diff: a rename alone raises no event.
    pub fn between(previous: &DesktopSnapshot, next: &DesktopSnapshot) -> Self {
        Self {
            desktop: (previous.current != next.current).then_some(next.current),
            count: (previous.count != next.count).then_some(next.count),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.desktop.is_none() && self.count.is_none()
    }
}
