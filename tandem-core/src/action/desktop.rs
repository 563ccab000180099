//! Seams to the desktop: focusing a window and pressing keys.
//!
//! The core never touches the OS directly. Clients plug in a concrete
//! implementation (Win32 `SendInput`, a dry-run logger, a test recorder).

use super::key::Key;
use super::profile::Target;
use crate::error::ActionError;

/// Brings a target window to the foreground.
pub trait WindowFocus: Send + Sync {
    /// Click at `(x, y)` to focus `target`. The coordinates already carry jitter.
    fn focus(&self, target: &Target, x: i32, y: i32) -> Result<(), ActionError>;
}

/// Injects key transitions into the focused window.
pub trait KeyInput: Send + Sync {
    fn key_down(&self, key: Key) -> Result<(), ActionError>;
    fn key_up(&self, key: Key) -> Result<(), ActionError>;
}

/// A key that has gone down and must come back up.
///
/// Dropping a `HeldKey` without calling [`release`](Self::release)
/// still issues the key-up, so a dropped future never leaves a key stuck.
pub(crate) struct HeldKey<'a> {
    input: &'a dyn KeyInput,
    key: Key,
    released: bool,
}

impl<'a> HeldKey<'a> {
    pub(crate) fn press(input: &'a dyn KeyInput, key: Key) -> Result<Self, ActionError> {
        input.key_down(key)?;
        Ok(Self {
            input,
            key,
            released: false,
        })
    }

    pub(crate) fn release(mut self) -> Result<(), ActionError> {
        self.released = true;
        self.input.key_up(self.key)
    }
}

impl Drop for HeldKey<'_> {
    fn drop(&mut self) {
        if !self.released {
            if let Err(e) = self.input.key_up(self.key) {
                tracing::warn!(key = %self.key, "key-up on drop failed: {e}");
            }
        }
    }
}
