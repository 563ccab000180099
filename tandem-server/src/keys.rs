//! Key sources and keybind translation.
//!
//! Key presses reach the server as plain key names on an mpsc channel.
//! Any producer may send on it; the built-in one is [`KeyScript`], a
//! repeating schedule of presses. [`Keybinds`] turns a key name into the
//! `execute` command that gets broadcast.

use std::collections::BTreeMap;

use tandem_core::Command;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ScriptStep;

// ── Keybinds ─────────────────────────────────────────────────────

/// Case-insensitive key → target table.
#[derive(Debug, Clone, Default)]
pub struct Keybinds {
    table: BTreeMap<String, String>,
}

impl Keybinds {
    pub fn new(table: &BTreeMap<String, String>) -> Self {
        let table = table
            .iter()
            .map(|(key, target)| (key.trim().to_lowercase(), target.clone()))
            .collect();
        Self { table }
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// The command for `key`: its bound target and `<key>_action`.
    pub fn command_for(&self, key: &str) -> Option<Command> {
        let key = key.trim().to_lowercase();
        let target = self.table.get(&key)?;
        Some(Command::execute(target.clone(), format!("{key}_action")))
    }
}

// ── KeyScript ────────────────────────────────────────────────────

/// Presses keys on a fixed schedule, forever.
#[derive(Debug, Clone)]
pub struct KeyScript {
    steps: Vec<ScriptStep>,
}

impl KeyScript {
    pub fn new(steps: Vec<ScriptStep>) -> Self {
        Self { steps }
    }

    /// Feed `keys` until shutdown or until the receiver goes away.
    pub async fn run(self, keys: mpsc::Sender<String>, shutdown: CancellationToken) {
        if self.steps.is_empty() {
            warn!("key script has no steps");
            return;
        }
        info!(steps = self.steps.len(), "key script started");

        'outer: loop {
            for step in &self.steps {
                tokio::select! {
                    _ = shutdown.cancelled() => break 'outer,
                    _ = tokio::time::sleep(step.delay()) => {}
                }
                debug!(key = %step.key, "scripted key press");
                if keys.send(step.key.clone()).await.is_err() {
                    debug!("key receiver dropped");
                    break 'outer;
                }
            }
        }

        info!("key script stopped");
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tandem_core::DEFAULT_ACTION;
    use tokio::time::Instant;

    use super::*;
    use crate::config::ServerConfig;

    #[test]
    fn keybind_translation_is_case_insensitive() {
        let binds = Keybinds::new(&ServerConfig::default().keybinds);
        assert_eq!(binds.len(), 5);

        assert_eq!(
            binds.command_for("F2"),
            Some(Command::execute("window2", "f2_action"))
        );
        assert_eq!(
            binds.command_for("f1"),
            Some(Command::execute("window1", DEFAULT_ACTION))
        );
        assert_eq!(binds.command_for("F9"), None);
    }

    #[test]
    fn custom_key_names() {
        let mut table = BTreeMap::new();
        table.insert("Space".to_string(), "left".to_string());
        let binds = Keybinds::new(&table);
        assert_eq!(
            binds.command_for("SPACE"),
            Some(Command::execute("left", "space_action"))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn script_follows_schedule_and_repeats() {
        let (tx, mut rx) = mpsc::channel(8);
        let shutdown = CancellationToken::new();
        let script = KeyScript::new(ServerConfig::default().script.steps);
        let start = Instant::now();
        let handle = tokio::spawn(script.run(tx, shutdown.clone()));

        let mut seen = Vec::new();
        for _ in 0..4 {
            let key = rx.recv().await.unwrap();
            seen.push((key, start.elapsed().as_secs()));
        }
        assert_eq!(
            seen,
            vec![
                ("F1".to_string(), 10),
                ("F2".to_string(), 25),
                ("F3".to_string(), 40),
                ("F1".to_string(), 50),
            ]
        );

        shutdown.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn script_stops_when_receiver_dropped() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let script = KeyScript::new(vec![ScriptStep {
            key: "F1".into(),
            after_secs: 1.0,
        }]);
        tokio::time::timeout(
            Duration::from_secs(60),
            script.run(tx, CancellationToken::new()),
        )
        .await
        .expect("script kept running");
    }

    #[tokio::test]
    async fn empty_script_returns() {
        let (tx, _rx) = mpsc::channel(1);
        KeyScript::new(Vec::new())
            .run(tx, CancellationToken::new())
            .await;
    }
}
