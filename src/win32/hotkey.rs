//! Global hotkey [`CommandSource`].
//!
//! Registers Alt+` system-wide and turns each press into
//! [`Command::Next`].  The hotkey is bound to the calling thread's message
//! queue, so [`run`](CommandSource::run) must stay on the thread that
//! registered it; it pumps that queue until `WM_QUIT`, which
//! [`HotkeyStopper::stop`] posts from any other thread.

use crate::command::Command;
use crate::ipc::quit::QuitSignal;
use crate::traits::CommandSource;
use log::{debug, info, warn};
use std::sync::{mpsc, Arc};
use windows::Win32::Foundation::{HWND, LPARAM, WPARAM};
use windows::Win32::System::Threading::GetCurrentThreadId;
use windows::Win32::UI::Input::KeyboardAndMouse::{
    RegisterHotKey, UnregisterHotKey, MOD_ALT, MOD_NOREPEAT, VK_OEM_3,
};
use windows::Win32::UI::WindowsAndMessaging::{
    GetMessageW, PostThreadMessageW, MSG, WM_HOTKEY, WM_QUIT,
};

const HOTKEY_NEXT_DESKTOP: i32 = 1;

#[derive(Debug, Default)]
pub struct GlobalHotkeySource {
    quit: Arc<QuitSignal>,
}

/// Ends a running (or not yet started) [`GlobalHotkeySource`].
#[derive(Debug, Clone)]
pub struct HotkeyStopper {
    quit: Arc<QuitSignal>,
}

impl HotkeyStopper {
    pub fn stop(&self) {
        let Some(thread_id) = self.quit.request() else {
            return;
        };
        if let Err(e) = unsafe { PostThreadMessageW(thread_id, WM_QUIT, WPARAM(0), LPARAM(0)) } {
            warn!("failed to stop hotkey loop: {}", e);
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HotkeyError {
    /// Usually means another application already owns the chord.
    #[error("failed to register Alt+`: {0}")]
    Register(windows::core::Error),
    #[error("message loop failed: {0}")]
    MessageLoop(windows::core::Error),
}

impl GlobalHotkeySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stopper(&self) -> HotkeyStopper {
        HotkeyStopper {
            quit: Arc::clone(&self.quit),
        }
    }
}

fn thread_queue() -> HWND {
    HWND(std::ptr::null_mut())
}

impl CommandSource for GlobalHotkeySource {
    type Error = HotkeyError;

    fn run(&mut self, sink: mpsc::Sender<Command>) -> Result<(), HotkeyError> {
        unsafe {
            RegisterHotKey(
                thread_queue(),
                HOTKEY_NEXT_DESKTOP,
                MOD_ALT | MOD_NOREPEAT,
                u32::from(VK_OEM_3.0),
            )
        }
        .map_err(HotkeyError::Register)?;
        info!("registered Alt+` for next desktop");

        // Registration created this thread's queue, so a stop posted from
        // here on reaches it.
        let attached = self.quit.attach(unsafe { GetCurrentThreadId() });

        let result = if attached {
            pump(&sink)
        } else {
            info!("stop requested before the hotkey loop started");
            Ok(())
        };

        unsafe {
            let _ = UnregisterHotKey(thread_queue(), HOTKEY_NEXT_DESKTOP);
        }
        result
    }
}

/// Pump this thread's queue until `WM_QUIT` or until `sink` closes.
fn pump(sink: &mpsc::Sender<Command>) -> Result<(), HotkeyError> {
    let mut msg = MSG::default();
    loop {
        let got = unsafe { GetMessageW(&mut msg, thread_queue(), 0, 0) };
        match got.0 {
            -1 => return Err(HotkeyError::MessageLoop(windows::core::Error::from_win32())),
            0 => return Ok(()),
            _ => {}
        }
        if msg.message == WM_HOTKEY && msg.wParam.0 == HOTKEY_NEXT_DESKTOP as usize {
            debug!("next desktop hotkey pressed");
            if sink.send(Command::Next).is_err() {
                info!("sink closed, shutting down");
                return Ok(());
            }
        }
    }
}
