//! [`KeySink`] that injects key transitions with `SendInput`.

use crate::strategy::{KeyAction, VirtualKey};
use crate::traits::KeySink;
use windows::Win32::UI::Input::KeyboardAndMouse::{
    SendInput, INPUT, INPUT_0, INPUT_KEYBOARD, KEYBDINPUT, KEYBD_EVENT_FLAGS,
    KEYEVENTF_EXTENDEDKEY, KEYEVENTF_KEYUP, VIRTUAL_KEY,
};

/// Sends each key transition as one keyboard `INPUT`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SendInputSink;

/// `SendInput` did not accept the event (blocked by UIPI or another
/// desktop being active).
#[derive(Debug, thiserror::Error)]
#[error("SendInput rejected key {key:#04x}: {source}")]
pub struct InputError {
    key: u16,
    source: windows::core::Error,
}

/// Keys that live on the extended part of the keyboard.
fn is_extended(key: VirtualKey) -> bool {
    matches!(key, VirtualKey::LEFT | VirtualKey::RIGHT | VirtualKey::LWIN)
}

impl KeySink for SendInputSink {
    type Error = InputError;

    fn send_key(&self, key: VirtualKey, action: KeyAction) -> Result<(), InputError> {
        let mut flags = match action {
            KeyAction::Down => KEYBD_EVENT_FLAGS(0),
            KeyAction::Up => KEYEVENTF_KEYUP,
        };
        if is_extended(key) {
            flags |= KEYEVENTF_EXTENDEDKEY;
        }
        let input = INPUT {
            r#type: INPUT_KEYBOARD,
            Anonymous: INPUT_0 {
                ki: KEYBDINPUT {
                    wVk: VIRTUAL_KEY(key.0),
                    wScan: 0,
                    dwFlags: flags,
                    time: 0,
                    dwExtraInfo: 0,
                },
            },
        };
        let sent = unsafe { SendInput(&[input], std::mem::size_of::<INPUT>() as i32) };
        if sent == 1 {
            Ok(())
        } else {
            Err(InputError {
                key: key.0,
                source: windows::core::Error::from_win32(),
            })
        }
    }
}
