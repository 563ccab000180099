//! Action profiles, targets and jittered timings.
//!
//! Profiles and targets are plain data loaded from the client's
//! configuration file. Timings accept either a fixed number of seconds
//! or a `[min, max]` pair:
//!
//! ```toml
//! [actions.f1_action]
//! keys = ["f1"]
//! delay_between_keys = 0.1
//! key_hold_time = [0.09, 0.15]
//! delay_after_focus = [1.0, 1.5]
//! ```

use std::collections::BTreeMap;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::key::Key;

/// Profile the idle scheduler runs on each target.
pub const IDLE_ACTION: &str = "idle_action";

// ── Timing ───────────────────────────────────────────────────────

/// A delay in seconds, either fixed or drawn uniformly from a range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Timing {
    Fixed(f64),
    Range([f64; 2]),
}

impl Timing {
    pub const fn range(min: f64, max: f64) -> Self {
        Self::Range([min, max])
    }

    /// `base` scaled by a uniform factor in `1 ± variation`.
    pub fn around(base: Duration, variation: f64) -> Self {
        let base = base.as_secs_f64();
        Self::Range([base * (1.0 - variation), base * (1.0 + variation)])
    }

    /// Lower and upper bound in seconds, sanitised (finite, non-negative, ordered).
    pub fn bounds(&self) -> (f64, f64) {
        let clean = |v: f64| if v.is_finite() { v.max(0.0) } else { 0.0 };
        match *self {
            Self::Fixed(v) => (clean(v), clean(v)),
            Self::Range([a, b]) => {
                let (a, b) = (clean(a), clean(b));
                if a <= b { (a, b) } else { (b, a) }
            }
        }
    }

    /// Draw one jittered duration.
    pub fn sample(&self) -> Duration {
        let (min, max) = self.bounds();
        let secs = if min == max {
            min
        } else {
            rand::rng().random_range(min..=max)
        };
        Duration::from_secs_f64(secs)
    }
}

// ── ActionProfile ────────────────────────────────────────────────

/// A named key sequence with jittered timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionProfile {
    /// Keys pressed in order.
    pub keys: Vec<Key>,
    /// Pause between consecutive keys.
    #[serde(default = "ActionProfile::default_between")]
    pub delay_between_keys: Timing,
    /// How long each key is held down.
    #[serde(default = "ActionProfile::default_hold")]
    pub key_hold_time: Timing,
    /// Pause after focusing the target, before the first key.
    #[serde(default = "ActionProfile::default_after_focus")]
    pub delay_after_focus: Timing,
}

impl ActionProfile {
    fn default_between() -> Timing {
        Timing::Fixed(0.1)
    }

    fn default_hold() -> Timing {
        Timing::range(0.09, 0.15)
    }

    fn default_after_focus() -> Timing {
        Timing::range(1.0, 1.5)
    }

    /// A single-key profile with the stock timings.
    pub fn single(key: Key) -> Self {
        Self {
            keys: vec![key],
            delay_between_keys: Self::default_between(),
            key_hold_time: Self::default_hold(),
            delay_after_focus: Self::default_after_focus(),
        }
    }

    /// The stock idle profile: space, then q, 1–2s apart.
    pub fn idle() -> Self {
        Self {
            keys: vec![Key::Space, Key::Char('q')],
            delay_between_keys: Timing::range(1.0, 2.0),
            key_hold_time: Timing::range(0.09, 0.15),
            delay_after_focus: Timing::range(1.0, 2.0),
        }
    }
}

/// Action profiles keyed by action id.
pub type ActionProfiles = BTreeMap<String, ActionProfile>;

/// `idle_action` plus `f1_action`..`f5_action`.
pub fn default_profiles() -> ActionProfiles {
    let mut profiles = ActionProfiles::new();
    profiles.insert(IDLE_ACTION.to_string(), ActionProfile::idle());
    for n in 1..=5u8 {
        profiles.insert(format!("f{n}_action"), ActionProfile::single(Key::Function(n)));
    }
    profiles
}

// ── Target ───────────────────────────────────────────────────────

/// A managed window: where to click to focus it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub x: i32,
    pub y: i32,
}

impl Target {
    pub fn new(id: impl Into<String>, title: impl Into<String>, x: i32, y: i32) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            x,
            y,
        }
    }
}

/// `window1`..`window5`, staggered across the screen.
pub fn default_targets() -> Vec<Target> {
    (1..=5)
        .map(|n| Target::new(format!("window{n}"), "Game", 100 * n, 50 + 50 * n))
        .collect()
}

// ── Tests ────────────────────────────────────────────────────────
