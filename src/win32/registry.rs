//! [`DesktopRegistry`] backed by the current user's registry hive.
//!
//! Explorer keeps its virtual desktop bookkeeping under
//! `HKCU\SOFTWARE\Microsoft\Windows\CurrentVersion\Explorer\VirtualDesktops`:
//!
//! * `VirtualDesktopIDs` (REG_BINARY): every desktop's GUID, concatenated in
//!   desktop order;
//! * `CurrentVirtualDesktop` (REG_BINARY): the active desktop's GUID;
//! * `Desktops\{GUID}\Name` (REG_SZ): the user-assigned name, if any.
//!
//! None of this is documented, and Explorer only writes it lazily, so every
//! value may be missing.  This adapter only reads.

use crate::snapshot::DesktopId;
use crate::traits::DesktopRegistry;
use windows::core::PCWSTR;
use windows::Win32::Foundation::{ERROR_FILE_NOT_FOUND, ERROR_MORE_DATA, ERROR_SUCCESS, WIN32_ERROR};
use windows::Win32::System::Registry::{
    RegGetValueW, HKEY_CURRENT_USER, REG_ROUTINE_FLAGS, RRF_RT_REG_BINARY, RRF_RT_REG_SZ,
};

const VIRTUAL_DESKTOPS_KEY: &str =
    r"SOFTWARE\Microsoft\Windows\CurrentVersion\Explorer\VirtualDesktops";

/// Attempts when the value grows between the size query and the read.
const READ_ATTEMPTS: usize = 3;

/// Read-only view of Explorer's virtual desktop records in `HKCU`.
#[derive(Debug, Default, Clone, Copy)]
pub struct HkcuRegistry;

/// A registry read failed with a Win32 error code.
#[derive(Debug, thiserror::Error)]
#[error("failed to read HKCU\\{key}\\{value}: win32 error {code}")]
pub struct RegistryError {
    key: String,
    value: String,
    code: u32,
}

impl HkcuRegistry {
    pub fn new() -> Self {
        Self
    }
}

fn wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

/// Read one value as raw bytes.  A missing key or value is `Ok(None)`.
fn read_value(
    key: &str,
    value: &str,
    flags: REG_ROUTINE_FLAGS,
) -> Result<Option<Vec<u8>>, RegistryError> {
    let key_w = wide(key);
    let value_w = wide(value);
    let fail = |res: WIN32_ERROR| RegistryError {
        key: key.to_string(),
        value: value.to_string(),
        code: res.0,
    };

    let mut res = ERROR_MORE_DATA;
    for _ in 0..READ_ATTEMPTS {
        let mut size: u32 = 0;
        res = unsafe {
            RegGetValueW(
                HKEY_CURRENT_USER,
                PCWSTR(key_w.as_ptr()),
                PCWSTR(value_w.as_ptr()),
                flags,
                None,
                None,
                Some(&mut size as *mut u32),
            )
        };
        if res == ERROR_FILE_NOT_FOUND {
            return Ok(None);
        }
        if res != ERROR_SUCCESS {
            return Err(fail(res));
        }

        let mut buf = vec![0u8; size as usize];
        res = unsafe {
            RegGetValueW(
                HKEY_CURRENT_USER,
                PCWSTR(key_w.as_ptr()),
                PCWSTR(value_w.as_ptr()),
                flags,
                None,
                Some(buf.as_mut_ptr() as *mut core::ffi::c_void),
                Some(&mut size as *mut u32),
            )
        };
        match res {
            ERROR_SUCCESS => {
                buf.truncate(size as usize);
                return Ok(Some(buf));
            }
            ERROR_FILE_NOT_FOUND => return Ok(None),
            ERROR_MORE_DATA => continue,
            _ => return Err(fail(res)),
        }
    }
    Err(fail(res))
}

/// Decode REG_SZ bytes (UTF-16LE, usually NUL-terminated).
fn decode_reg_sz(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .take_while(|unit| *unit != 0)
        .collect();
    String::from_utf16_lossy(&units)
}

impl DesktopRegistry for HkcuRegistry {
    type Error = RegistryError;

    fn desktop_ids(&self) -> Result<Option<Vec<u8>>, RegistryError> {
        read_value(VIRTUAL_DESKTOPS_KEY, "VirtualDesktopIDs", RRF_RT_REG_BINARY)
    }

    fn current_desktop_id(&self) -> Result<Option<Vec<u8>>, RegistryError> {
        read_value(VIRTUAL_DESKTOPS_KEY, "CurrentVirtualDesktop", RRF_RT_REG_BINARY)
    }

    fn desktop_name(&self, id: &DesktopId) -> Result<Option<String>, RegistryError> {
        let key = format!(r"{}\Desktops\{}", VIRTUAL_DESKTOPS_KEY, id.registry_key_name());
        Ok(read_value(&key, "Name", RRF_RT_REG_SZ)?.map(|bytes| decode_reg_sz(&bytes)))
    }
}
