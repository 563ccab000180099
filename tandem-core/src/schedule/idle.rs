//! The idle scheduler.
//!
//! While no command is being served, the scheduler walks the targets
//! round-robin and runs the idle profile on each one:
//!
//! ```text
//! loop:
//!   active and timed out?  ─► transition_idle
//!   idle?                  ─► focus target[cursor], settle 1–2s,
//!                             still idle? ─► key, gap 1–2s, key
//!                             cursor += 1
//!   sleep 8s ± 10%
//! ```
//!
//! Shutdown is observed only while sleeping. A key that went down is
//! always released before the loop exits.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::cursor::ScheduleCursor;
use crate::action::{ActionProfile, IDLE_ACTION, Timing};
use crate::context::ClientContext;

#[derive(Debug, Clone, PartialEq)]
pub struct IdleConfig {
    /// Nominal pause between ticks.
    pub cycle: Duration,
    /// Relative jitter applied to `cycle` (0.1 = ±10%).
    pub variation: f64,
    /// Action profile run on each target.
    pub profile: String,
}

impl Default for IdleConfig {
    fn default() -> Self {
        Self {
            cycle: Duration::from_secs(8),
            variation: 0.1,
            profile: IDLE_ACTION.to_string(),
        }
    }
}

/// What a single tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdleOutcome {
    /// Idle keys were sent to this target.
    Performed(String),
    /// A command is being served; nothing to do.
    Busy,
    /// No targets configured.
    NoTargets,
    /// A command arrived between focusing and pressing.
    Preempted(String),
    FocusFailed(String),
    /// Key injection failed.
    Failed(String),
    /// Shutdown was requested mid-tick.
    Stopped,
}

pub struct IdleScheduler {
    ctx: Arc<ClientContext>,
    config: IdleConfig,
    cursor: ScheduleCursor,
}

impl IdleScheduler {
    pub fn new(ctx: Arc<ClientContext>, config: IdleConfig) -> Self {
        let cursor = ScheduleCursor::new(ctx.executor.targets().len());
        Self {
            ctx,
            config,
            cursor,
        }
    }

    pub fn cursor(&self) -> ScheduleCursor {
        self.cursor
    }

    /// Tick until `shutdown` fires.
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!(targets = self.cursor.len(), "starting idle mode");
        let pause = Timing::around(self.config.cycle, self.config.variation);

        while !shutdown.is_cancelled() {
            let outcome = self.tick(&shutdown).await;
            debug!(?outcome, "idle tick");
            if outcome == IdleOutcome::Stopped {
                break;
            }
            if !pause_or_stop(pause.sample(), &shutdown).await {
                break;
            }
        }

        info!("stopping idle mode");
    }

    /// One pass: idle-return check, then at most one target.
    pub async fn tick(&mut self, shutdown: &CancellationToken) -> IdleOutcome {
        let state = &self.ctx.state;
        if state.return_idle_if_due() {
            info!("returned to idle after timeout");
        }
        if !state.is_idle() {
            return IdleOutcome::Busy;
        }

        let Some(target) = self
            .cursor
            .current()
            .and_then(|i| self.ctx.executor.targets().get(i))
            .map(|t| t.id.clone())
        else {
            return IdleOutcome::NoTargets;
        };

        let outcome = self.perform(&target, shutdown).await;
        self.cursor.advance();
        outcome
    }

    async fn perform(&self, target: &str, shutdown: &CancellationToken) -> IdleOutcome {
        let executor = &self.ctx.executor;
        let state = &self.ctx.state;
        let profile = executor
            .profile(&self.config.profile)
            .cloned()
            .unwrap_or_else(ActionProfile::idle);

        {
            let _device = executor.lock_input().await;
            if !state.is_idle() {
                return IdleOutcome::Preempted(target.to_string());
            }
            if let Err(e) = executor.focus(target) {
                warn!(target, "idle focus failed: {e}");
                return IdleOutcome::FocusFailed(target.to_string());
            }
        }

        let settle = profile.delay_after_focus.sample();
        if !pause_or_stop(settle, shutdown).await {
            return IdleOutcome::Stopped;
        }

        let _device = executor.lock_input().await;
        if !state.is_idle() {
            debug!(target, "command arrived while settling; skipping idle keys");
            return IdleOutcome::Preempted(target.to_string());
        }

        let mut holds = Vec::with_capacity(profile.keys.len());
        let mut gaps = Vec::new();
        for (i, key) in profile.keys.iter().enumerate() {
            if i > 0 {
                let gap = profile.delay_between_keys.sample();
                if !pause_or_stop(gap, shutdown).await {
                    return IdleOutcome::Stopped;
                }
                gaps.push(gap);
            }
            let hold = profile.key_hold_time.sample();
            if let Err(e) = executor.press(*key, hold).await {
                warn!(target, %key, "error performing idle action: {e}");
                return IdleOutcome::Failed(target.to_string());
            }
            holds.push(hold);
        }

        info!(target, ?settle, ?holds, ?gaps, "performed idle action");
        IdleOutcome::Performed(target.to_string())
    }
}

/// Sleep for `duration`; `false` if shutdown fired first.
async fn pause_or_stop(duration: Duration, shutdown: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        _ = shutdown.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}

// ── Tests ────────────────────────────────────────────────────────
