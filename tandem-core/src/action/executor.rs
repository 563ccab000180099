//! Runs action profiles against the desktop collaborators.
//!
//! The executor owns the input device: every key sequence, commanded or
//! idle, runs while holding [`ActionExecutor::lock_input`], so two
//! sequences never interleave keystrokes on the shared keyboard.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

use super::desktop::{HeldKey, KeyInput, WindowFocus};
use super::key::Key;
use super::profile::{ActionProfile, ActionProfiles, Target};
use crate::error::ActionError;

/// Pixel jitter applied to focus clicks, each axis.
const FOCUS_JITTER_PX: f64 = 1.0;

/// Exclusive access to the input device.
pub type InputGuard<'a> = MutexGuard<'a, ()>;

pub struct ActionExecutor {
    targets: Vec<Target>,
    profiles: ActionProfiles,
    focus: Arc<dyn WindowFocus>,
    input: Arc<dyn KeyInput>,
    device: Mutex<()>,
}

impl ActionExecutor {
    pub fn new(
        targets: Vec<Target>,
        profiles: ActionProfiles,
        focus: Arc<dyn WindowFocus>,
        input: Arc<dyn KeyInput>,
    ) -> Self {
        Self {
            targets,
            profiles,
            focus,
            input,
            device: Mutex::new(()),
        }
    }

    /// Targets in cycle order.
    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    pub fn target(&self, id: &str) -> Option<&Target> {
        self.targets.iter().find(|t| t.id == id)
    }

    pub fn profile(&self, action: &str) -> Option<&ActionProfile> {
        self.profiles.get(action)
    }

    /// Wait for exclusive use of the keyboard.
    pub async fn lock_input(&self) -> InputGuard<'_> {
        self.device.lock().await
    }

    /// Click a target's position, offset by up to one pixel.
    pub fn focus(&self, target_id: &str) -> Result<(), ActionError> {
        let target = self
            .target(target_id)
            .ok_or_else(|| ActionError::UnknownTarget(target_id.to_string()))?;

        let (dx, dy) = {
            let mut rng = rand::rng();
            (
                rng.random_range(-FOCUS_JITTER_PX..=FOCUS_JITTER_PX),
                rng.random_range(-FOCUS_JITTER_PX..=FOCUS_JITTER_PX),
            )
        };
        let x = target.x + dx.round() as i32;
        let y = target.y + dy.round() as i32;

        self.focus.focus(target, x, y)?;
        info!(target = target_id, x, y, "focused");
        Ok(())
    }

    /// Key-down, hold, key-up. The key-up is issued even if this future
    /// is dropped mid-hold.
    pub async fn press(&self, key: Key, hold: Duration) -> Result<(), ActionError> {
        let held = HeldKey::press(self.input.as_ref(), key)?;
        tokio::time::sleep(hold).await;
        held.release()?;
        debug!(%key, hold_ms = hold.as_millis() as u64, "pressed");
        Ok(())
    }

    /// Run `action` on `target_id`: focus, settle, then each key in turn.
    ///
    /// The target is focused before the action is looked up, so an
    /// unknown action still leaves its window in front.
    pub async fn execute(&self, target_id: &str, action: &str) -> Result<(), ActionError> {
        let _device = self.lock_input().await;
        self.focus(target_id)?;

        let profile = self
            .profile(action)
            .ok_or_else(|| ActionError::UnknownAction(action.to_string()))?
            .clone();

        let settle = profile.delay_after_focus.sample();
        tokio::time::sleep(settle).await;
        debug!(target = target_id, settle_ms = settle.as_millis() as u64, "settled after focus");

        for (i, key) in profile.keys.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(profile.delay_between_keys.sample()).await;
            }
            let hold = profile.key_hold_time.sample();
            self.press(*key, hold).await?;
            info!(target = target_id, %key, hold_ms = hold.as_millis() as u64, "key pressed");
        }

        info!(target = target_id, action, "action executed");
        Ok(())
    }
}

impl std::fmt::Debug for ActionExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionExecutor")
            .field("targets", &self.targets)
            .field("profiles", &self.profiles.keys())
            .finish()
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::profile::{default_profiles, default_targets};
    use crate::action::test_support::{Event, Recorder};

    fn executor(recorder: &Arc<Recorder>) -> ActionExecutor {
        ActionExecutor::new(
            default_targets(),
            default_profiles(),
            recorder.clone(),
            recorder.clone(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn execute_focuses_then_presses() {
        let recorder = Arc::new(Recorder::default());
        let exec = executor(&recorder);

        exec.execute("window2", "f2_action").await.unwrap();

        assert_eq!(
            recorder.events(),
            vec![
                Event::Focus("window2".into()),
                Event::Down(Key::Function(2)),
                Event::Up(Key::Function(2)),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn focus_click_is_jittered_by_at_most_one_pixel() {
        let recorder = Arc::new(Recorder::default());
        let exec = executor(&recorder);
        for _ in 0..50 {
            exec.focus("window1").unwrap();
        }
        for (x, y) in recorder.clicks() {
            assert!((99..=101).contains(&x));
            assert!((99..=101).contains(&y));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn hold_time_is_within_profile_range() {
        let recorder = Arc::new(Recorder::default());
        let exec = executor(&recorder);
        exec.execute("window1", "f1_action").await.unwrap();

        let holds = recorder.hold_times();
        assert_eq!(holds.len(), 1);
        let ms = holds[0].as_millis();
        assert!((90..=150).contains(&ms), "hold {ms}ms");
    }

    #[tokio::test]
    async fn unknown_action_and_target_are_errors() {
        let recorder = Arc::new(Recorder::default());
        let exec = executor(&recorder);

        assert!(matches!(
            exec.execute("window9", "f1_action").await,
            Err(ActionError::UnknownTarget(_))
        ));
        assert!(recorder.events().is_empty());

        // focus happens first; the unknown action only stops the keys
        assert!(matches!(
            exec.execute("window1", "f9_action").await,
            Err(ActionError::UnknownAction(_))
        ));
        assert_eq!(recorder.events(), vec![Event::Focus("window1".into())]);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_key_down_leaves_nothing_held() {
        let recorder = Arc::new(Recorder::default());
        recorder.fail_keys();
        let exec = executor(&recorder);

        let err = exec.execute("window1", "f1_action").await.unwrap_err();
        assert!(matches!(err, ActionError::Input(_)));
        assert_eq!(recorder.events(), vec![Event::Focus("window1".into())]);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_press_still_releases() {
        let recorder = Arc::new(Recorder::default());
        let exec = executor(&recorder);

        let press = exec.press(Key::Space, Duration::from_secs(1));
        let _ = tokio::time::timeout(Duration::from_millis(10), press).await;

        assert_eq!(
            recorder.events(),
            vec![Event::Down(Key::Space), Event::Up(Key::Space)]
        );
    }
}
