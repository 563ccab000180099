//! Client-side action state machine.
//!
//! One instance per client process, shared between the idle scheduler
//! and the command router through [`SharedState`]. Every operation
//! takes the same lock, so no task ever observes a half-applied
//! transition.
//!
//! ```text
//!            transition_active(t)            (cooldown elapsed)
//!   Idle ───────────────────────────► Active(t)
//!    ▲                                    │
//!    └──── transition_idle() ◄────────────┘  (idle timeout elapsed)
//! ```

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;
use tracing::info;

/// Minimum time between two commanded activations.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(2);

/// Time after which an active state falls back to idle.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(10);

// ── Mode ─────────────────────────────────────────────────────────

/// Whether the client is cycling on its own or serving a command.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Idle,
    /// Serving a command for the given target id.
    Active(String),
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Active(target) => write!(f, "active_{target}"),
        }
    }
}

// ── ActionState ──────────────────────────────────────────────────

/// The bare state machine. Not synchronised; see [`SharedState`].
#[derive(Debug, Clone)]
pub struct ActionState {
    mode: Mode,
    last_action: Option<Instant>,
    cooldown: Duration,
    idle_timeout: Duration,
}

impl ActionState {
    pub fn new(cooldown: Duration, idle_timeout: Duration) -> Self {
        Self {
            mode: Mode::Idle,
            last_action: None,
            cooldown,
            idle_timeout,
        }
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn is_idle(&self) -> bool {
        self.mode == Mode::Idle
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    fn elapsed_at(&self, now: Instant) -> Option<Duration> {
        self.last_action
            .map(|last| now.saturating_duration_since(last))
    }

    /// `true` once `cooldown` has passed since the last activation.
    /// Always `true` before the first activation.
    pub fn can_execute_at(&self, now: Instant) -> bool {
        self.elapsed_at(now)
            .is_none_or(|elapsed| elapsed >= self.cooldown)
    }

    pub fn transition_active_at(&mut self, target: &str, now: Instant) {
        self.mode = Mode::Active(target.to_string());
        self.last_action = Some(now);
        info!(state = %self.mode, "state changed");
    }

    pub fn transition_idle(&mut self) {
        self.mode = Mode::Idle;
        info!(state = %self.mode, "state changed");
    }

    /// `true` iff active and `idle_timeout` has passed since activation.
    pub fn should_return_idle_at(&self, now: Instant) -> bool {
        match self.mode {
            Mode::Idle => false,
            Mode::Active(_) => self
                .elapsed_at(now)
                .is_some_and(|elapsed| elapsed >= self.idle_timeout),
        }
    }

    /// Cooldown check and activation as one step.
    ///
    /// Returns `false` (and leaves the state untouched) while cooling down.
    pub fn try_activate_at(&mut self, target: &str, now: Instant) -> bool {
        if !self.can_execute_at(now) {
            return false;
        }
        self.transition_active_at(target, now);
        true
    }

    /// Idle-return check and transition as one step.
    pub fn return_idle_if_due_at(&mut self, now: Instant) -> bool {
        if !self.should_return_idle_at(now) {
            return false;
        }
        self.transition_idle();
        true
    }
}

impl Default for ActionState {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN, DEFAULT_IDLE_TIMEOUT)
    }
}

// ── SharedState ──────────────────────────────────────────────────

/// Cloneable, lock-guarded handle to the process-wide [`ActionState`].
///
/// The lock is a plain `std::sync::Mutex`: no critical section awaits.
#[derive(Debug, Clone, Default)]
pub struct SharedState {
    inner: Arc<Mutex<ActionState>>,
}

impl SharedState {
    pub fn new(state: ActionState) -> Self {
        Self {
            inner: Arc::new(Mutex::new(state)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ActionState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn can_execute(&self) -> bool {
        self.lock().can_execute_at(Instant::now())
    }

    pub fn transition_active(&self, target: &str) {
        self.lock().transition_active_at(target, Instant::now());
    }

    pub fn transition_idle(&self) {
        self.lock().transition_idle();
    }

    pub fn should_return_idle(&self) -> bool {
        self.lock().should_return_idle_at(Instant::now())
    }

    pub fn try_activate(&self, target: &str) -> bool {
        self.lock().try_activate_at(target, Instant::now())
    }

    pub fn return_idle_if_due(&self) -> bool {
        self.lock().return_idle_if_due_at(Instant::now())
    }

    pub fn is_idle(&self) -> bool {
        self.lock().is_idle()
    }

    pub fn mode(&self) -> Mode {
        self.lock().mode().clone()
    }

    /// Wire label: `"idle"` or `"active_<target>"`.
    pub fn label(&self) -> String {
        self.lock().mode().to_string()
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    #[test]
    fn fresh_state_is_idle_and_ready() {
        let state = ActionState::default();
        let now = Instant::now();
        assert!(state.is_idle());
        assert!(state.can_execute_at(now));
        assert!(!state.should_return_idle_at(now));
    }

    #[test]
    fn cooldown_blocks_within_window() {
        let mut state = ActionState::default();
        let t0 = Instant::now();
        state.transition_active_at("window1", t0);

        assert!(!state.can_execute_at(t0));
        assert!(!state.can_execute_at(t0 + secs(0.5)));
        assert!(!state.can_execute_at(t0 + secs(1.999)));
        assert!(state.can_execute_at(t0 + secs(2.0)));
        assert!(state.can_execute_at(t0 + secs(30.0)));
    }

    #[test]
    fn idle_transition_does_not_reset_cooldown() {
        let mut state = ActionState::default();
        let t0 = Instant::now();
        state.transition_active_at("window1", t0);
        state.transition_idle();
        assert!(!state.can_execute_at(t0 + secs(1.0)));
        assert!(state.can_execute_at(t0 + secs(2.0)));
    }

    #[test]
    fn cooldown_measured_from_latest_activation() {
        let mut state = ActionState::default();
        let t0 = Instant::now();
        state.transition_active_at("window1", t0);
        state.transition_active_at("window2", t0 + secs(3.0));
        assert!(!state.can_execute_at(t0 + secs(4.0)));
        assert!(state.can_execute_at(t0 + secs(5.0)));
    }

    #[test]
    fn idle_return_after_timeout() {
        let mut state = ActionState::default();
        let t0 = Instant::now();
        state.transition_active_at("window2", t0);
        assert_eq!(state.mode(), &Mode::Active("window2".into()));

        assert!(!state.should_return_idle_at(t0 + secs(9.9)));
        assert!(state.should_return_idle_at(t0 + secs(10.0)));

        state.transition_idle();
        assert!(!state.should_return_idle_at(t0 + secs(60.0)));
    }

    #[test]
    fn try_activate_respects_cooldown() {
        let mut state = ActionState::default();
        let t0 = Instant::now();
        assert!(state.try_activate_at("window1", t0));
        assert!(!state.try_activate_at("window2", t0 + secs(0.5)));
        assert_eq!(state.mode(), &Mode::Active("window1".into()));
        assert!(state.try_activate_at("window2", t0 + secs(2.5)));
        assert_eq!(state.mode(), &Mode::Active("window2".into()));
    }

    #[test]
    fn return_idle_if_due_is_one_shot() {
        let mut state = ActionState::default();
        let t0 = Instant::now();
        state.transition_active_at("window1", t0);
        assert!(!state.return_idle_if_due_at(t0 + secs(5.0)));
        assert!(state.return_idle_if_due_at(t0 + secs(10.0)));
        assert!(state.is_idle());
        assert!(!state.return_idle_if_due_at(t0 + secs(11.0)));
    }

    #[test]
    fn labels() {
        assert_eq!(Mode::Idle.to_string(), "idle");
        assert_eq!(Mode::Active("window2".into()).to_string(), "active_window2");
    }

    #[tokio::test(start_paused = true)]
    async fn shared_state_follows_the_clock() {
        let state = SharedState::default();
        state.transition_active("window1");
        assert_eq!(state.label(), "active_window1");
        assert!(!state.can_execute());

        tokio::time::advance(secs(2.0)).await;
        assert!(state.can_execute());
        assert!(!state.should_return_idle());

        tokio::time::advance(secs(8.0)).await;
        assert!(state.should_return_idle());
        assert!(state.return_idle_if_due());
        assert!(state.is_idle());
    }

    #[test]
    fn clones_share_one_state() {
        let a = SharedState::default();
        let b = a.clone();
        a.transition_active("window4");
        assert_eq!(b.mode(), Mode::Active("window4".into()));
        b.transition_idle();
        assert!(a.is_idle());
    }
}
