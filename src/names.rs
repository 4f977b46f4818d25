//! Desktop name resolver.
//!
//! Users can rename desktops; Windows keeps each custom name under the
//! desktop's own registry sub-key.  Desktops without one get the
//! synthesized `"Desktop {index}"`.

use crate::snapshot::{default_desktop_name, DesktopId};
use crate::traits::DesktopRegistry;
use log::debug;

/// Resolve one name per desktop, in index order.
///
/// `ids` is the list read by the [state reader](crate::state).  If it does
/// not cover all `count` desktops (typically because it could not be read
/// at all) every slot gets its default name.  A failed lookup only affects
/// its own slot.
pub fn resolve_names<R: DesktopRegistry>(
    registry: &R,
    ids: &[DesktopId],
    count: u32,
) -> Vec<String> {
    let count = count as usize;
    if ids.len() < count {
        debug!("no desktop ids available, using default names");
        return (1..=count as i64).map(default_desktop_name).collect();
    }

    ids.iter()
        .take(count)
        .enumerate()
        .map(|(i, id)| {
            let index = i as i64 + 1;
            match registry.desktop_name(id) {
                Ok(Some(name)) if !name.trim().is_empty() => name.trim().to_string(),
                Ok(_) => default_desktop_name(index),
                Err(e) => {
                    debug!("name lookup for desktop {} failed: {}", index, e);
                    default_desktop_name(index)
                }
            }
        })
        .collect()
}
