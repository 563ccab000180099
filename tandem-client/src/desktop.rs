//! Desktop backends for the action executor.
//!
//! - [`SystemDesktop`]: Win32 `SetCursorPos` + `SendInput`. Windows-only;
//!   on other platforms every call returns [`ActionError::Unsupported`].
//! - [`DryRunDesktop`]: logs what would be clicked and pressed.

use tandem_core::{ActionError, Key, KeyInput, Target, WindowFocus};
use tracing::info;

/// Windows virtual-key code for `key`, if it has one.
pub fn virtual_key(key: Key) -> Option<u16> {
    match key {
        Key::Space => Some(0x20),
        Key::Enter => Some(0x0D),
        Key::Tab => Some(0x09),
        Key::Escape => Some(0x1B),
        // VK_F1 = 0x70 .. VK_F12 = 0x7B
        Key::Function(n @ 1..=12) => Some(0x70 + u16::from(n) - 1),
        Key::Function(_) => None,
        // letters and digits share their upper-case ASCII code
        Key::Char(c) if c.is_ascii_alphanumeric() => Some(c.to_ascii_uppercase() as u16),
        Key::Char(_) => None,
    }
}

fn unmapped(key: Key) -> ActionError {
    ActionError::UnknownKey(key.to_string())
}

// ── SystemDesktop ────────────────────────────────────────────────

/// Clicks and keystrokes through the OS input stream.
///
/// `SendInput` requires the process to run in the same desktop session
/// as the target windows.
#[derive(Debug, Default)]
pub struct SystemDesktop;

impl SystemDesktop {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(target_os = "windows")]
mod platform {
    use super::*;
    use windows::Win32::UI::Input::KeyboardAndMouse::*;
    use windows::Win32::UI::WindowsAndMessaging::SetCursorPos;

    fn send(input: INPUT, what: &str) -> Result<(), ActionError> {
        let sent = unsafe { SendInput(&[input], std::mem::size_of::<INPUT>() as i32) };
        if sent == 0 {
            return Err(ActionError::Input(format!("SendInput ({what}) returned 0")));
        }
        Ok(())
    }

    fn mouse(flags: MOUSE_EVENT_FLAGS) -> INPUT {
        INPUT {
            r#type: INPUT_MOUSE,
            Anonymous: INPUT_0 {
                mi: MOUSEINPUT {
                    dx: 0,
                    dy: 0,
                    mouseData: 0,
                    dwFlags: flags,
                    time: 0,
                    dwExtraInfo: 0,
                },
            },
        }
    }

    fn keyboard(vk: u16, flags: KEYBD_EVENT_FLAGS) -> INPUT {
        INPUT {
            r#type: INPUT_KEYBOARD,
            Anonymous: INPUT_0 {
                ki: KEYBDINPUT {
                    wVk: VIRTUAL_KEY(vk),
                    wScan: 0,
                    dwFlags: flags,
                    time: 0,
                    dwExtraInfo: 0,
                },
            },
        }
    }

    impl WindowFocus for SystemDesktop {
        fn focus(&self, target: &Target, x: i32, y: i32) -> Result<(), ActionError> {
            unsafe { SetCursorPos(x, y) }.map_err(|e| ActionError::Focus {
                target: target.id.clone(),
                reason: e.to_string(),
            })?;
            send(mouse(MOUSEEVENTF_LEFTDOWN), "mouse")?;
            send(mouse(MOUSEEVENTF_LEFTUP), "mouse")
        }
    }

    impl KeyInput for SystemDesktop {
        fn key_down(&self, key: Key) -> Result<(), ActionError> {
            let vk = virtual_key(key).ok_or_else(|| unmapped(key))?;
            send(keyboard(vk, KEYBD_EVENT_FLAGS(0)), "keyboard")
        }

        fn key_up(&self, key: Key) -> Result<(), ActionError> {
            let vk = virtual_key(key).ok_or_else(|| unmapped(key))?;
            send(keyboard(vk, KEYEVENTF_KEYUP), "keyboard")
        }
    }
}

#[cfg(not(target_os = "windows"))]
mod platform {
    use super::*;

    impl WindowFocus for SystemDesktop {
        fn focus(&self, _target: &Target, _x: i32, _y: i32) -> Result<(), ActionError> {
            Err(ActionError::Unsupported)
        }
    }

    impl KeyInput for SystemDesktop {
        fn key_down(&self, _key: Key) -> Result<(), ActionError> {
            Err(ActionError::Unsupported)
        }

        fn key_up(&self, _key: Key) -> Result<(), ActionError> {
            Err(ActionError::Unsupported)
        }
    }
}

// ── DryRunDesktop ────────────────────────────────────────────────

/// Logs every click and key transition instead of performing it.
#[derive(Debug, Default)]
pub struct DryRunDesktop;

impl WindowFocus for DryRunDesktop {
    fn focus(&self, target: &Target, x: i32, y: i32) -> Result<(), ActionError> {
        info!(target = %target.id, title = %target.title, x, y, "[dry-run] click");
        Ok(())
    }
}

impl KeyInput for DryRunDesktop {
    fn key_down(&self, key: Key) -> Result<(), ActionError> {
        virtual_key(key).ok_or_else(|| unmapped(key))?;
        info!(%key, "[dry-run] key down");
        Ok(())
    }

    fn key_up(&self, key: Key) -> Result<(), ActionError> {
        info!(%key, "[dry-run] key up");
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────
