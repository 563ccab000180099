//! Configuration for the tandem client.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tandem_core::{
    ActionProfiles, ActionState, ConnectionInfo, IDLE_ACTION, IdleConfig, TandemError, Target,
    default_profiles, default_targets,
};

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Server address and reconnect policy.
    pub network: NetworkConfig,
    /// Cooldown and idle-return timings.
    pub state: StateConfig,
    /// Idle cycling.
    pub idle: IdleSection,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Managed windows, in idle-cycle order.
    pub targets: Vec<Target>,
    /// Action profiles by id.
    pub actions: ActionProfiles,
}

/// Network configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Server host name or address.
    pub host: String,
    /// Server TCP port.
    pub port: u16,
    /// Fixed pause between connection attempts, in seconds.
    pub reconnect_delay_secs: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    /// Minimum time between accepted commands, in seconds.
    pub cooldown_secs: f64,
    /// Time after the last command before idling resumes, in seconds.
    pub idle_timeout_secs: f64,
}

/// Idle cycling configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdleSection {
    pub enabled: bool,
    /// Nominal pause between idle ticks, in seconds.
    pub cycle_secs: f64,
    /// Relative jitter on `cycle_secs` (0.1 = ±10%).
    pub variation: f64,
    /// Profile run on each target.
    pub profile: String,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
    /// Optional log file path. If empty, logs to stderr.
    pub file: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            state: StateConfig::default(),
            idle: IdleSection::default(),
            logging: LoggingConfig::default(),
            targets: default_targets(),
            actions: default_profiles(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 8765,
            reconnect_delay_secs: 5.0,
        }
    }
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: 2.0,
            idle_timeout_secs: 10.0,
        }
    }
}

impl Default for IdleSection {
    fn default() -> Self {
        Self {
            enabled: true,
            cycle_secs: 8.0,
            variation: 0.1,
            profile: IDLE_ACTION.into(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            file: String::new(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl ClientConfig {
    /// Load configuration from a TOML file, falling back to defaults.
    ///
    /// A missing or unparseable file yields the defaults plus the error,
    /// for the caller to log once logging is up.
    pub fn load(path: &Path) -> (Self, Option<TandemError>) {
        let loaded = std::fs::read_to_string(path)
            .map_err(|e| TandemError::Config(format!("cannot read {}: {e}", path.display())))
            .and_then(|contents| Self::parse(&contents));
        match loaded {
            Ok(config) => (config, None),
            Err(e) => (Self::default(), Some(e)),
        }
    }

    pub fn parse(text: &str) -> Result<Self, TandemError> {
        toml::from_str(text).map_err(|e| TandemError::Config(e.to_string()))
    }

    /// The default configuration as pretty TOML.
    pub fn default_toml() -> Result<String, TandemError> {
        toml::to_string_pretty(&Self::default()).map_err(|e| TandemError::Config(e.to_string()))
    }

    /// Override the server address with `host:port`.
    pub fn set_server(&mut self, addr: &str) -> Result<(), TandemError> {
        let (host, port) = addr
            .rsplit_once(':')
            .ok_or_else(|| TandemError::Config(format!("expected host:port, got {addr:?}")))?;
        let port = port
            .parse()
            .map_err(|_| TandemError::Config(format!("invalid port in {addr:?}")))?;
        if host.is_empty() {
            return Err(TandemError::Config(format!("missing host in {addr:?}")));
        }
        self.network.host = host.to_string();
        self.network.port = port;
        Ok(())
    }

    pub fn server(&self) -> ConnectionInfo {
        ConnectionInfo::new(self.network.host.clone(), self.network.port)
    }

    pub fn reconnect_delay(&self) -> Duration {
        secs(self.network.reconnect_delay_secs)
    }

    pub fn action_state(&self) -> ActionState {
        ActionState::new(
            secs(self.state.cooldown_secs),
            secs(self.state.idle_timeout_secs),
        )
    }

    pub fn idle_config(&self) -> IdleConfig {
        IdleConfig {
            cycle: secs(self.idle.cycle_secs),
            variation: self.idle.variation.clamp(0.0, 1.0),
            profile: self.idle.profile.clone(),
        }
    }
}

/// Seconds to a `Duration`; negative or non-finite values become zero.
fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use tandem_core::{Key, Timing};

    use super::*;

    #[test]
    fn default_config_serializes() {
        let text = ClientConfig::default_toml().unwrap();
        assert!(text.contains("reconnect_delay_secs"));
        assert!(text.contains("[[targets]]"));
        assert!(text.contains("f5_action"));
    }

    #[test]
    fn default_config_reparses() {
        let text = ClientConfig::default_toml().unwrap();
        let parsed = ClientConfig::parse(&text).unwrap();
        assert_eq!(parsed.network.port, 8765);
        assert_eq!(parsed.targets, default_targets());
        assert_eq!(parsed.actions, default_profiles());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let cfg = ClientConfig::parse(
            r#"
            [network]
            host = "10.0.0.5"

            [state]
            cooldown_secs = 3.5
            "#,
        )
        .unwrap();
        assert_eq!(cfg.network.host, "10.0.0.5");
        assert_eq!(cfg.network.port, 8765);
        assert_eq!(cfg.action_state().cooldown(), Duration::from_millis(3500));
        assert_eq!(cfg.action_state().idle_timeout(), Duration::from_secs(10));
        assert_eq!(cfg.targets.len(), 5);
    }

    #[test]
    fn custom_targets_and_actions() {
        let cfg = ClientConfig::parse(
            r#"
            [[targets]]
            id = "left"
            x = 10
            y = 20

            [[targets]]
            id = "right"
            title = "Game"
            x = 900
            y = 20

            [actions.loot]
            keys = ["E", "space"]
            delay_between_keys = [0.2, 0.3]
            key_hold_time = 0.1
            "#,
        )
        .unwrap();

        let ids: Vec<_> = cfg.targets.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["left", "right"]);
        let loot = &cfg.actions["loot"];
        assert_eq!(loot.keys, vec![Key::Char('e'), Key::Space]);
        assert_eq!(loot.delay_between_keys, Timing::Range([0.2, 0.3]));
        assert_eq!(loot.key_hold_time, Timing::Fixed(0.1));
        assert_eq!(loot.delay_after_focus, Timing::Range([1.0, 1.5]));
    }

    #[test]
    fn unknown_key_is_a_config_error() {
        let err = ClientConfig::parse(
            r#"
            [actions.bad]
            keys = ["hyper"]
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, TandemError::Config(_)));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let (cfg, problem) = ClientConfig::load(Path::new("/definitely/not/here.toml"));
        assert_eq!(cfg.network.reconnect_delay_secs, 5.0);
        assert!(cfg.idle.enabled);
        assert!(matches!(problem, Some(TandemError::Config(_))));
    }

    #[test]
    fn unparseable_file_reports_error_and_falls_back() {
        let path = std::env::temp_dir().join(format!("tandem-client-{}.toml", std::process::id()));
        std::fs::write(&path, "network = 5").unwrap();
        let (cfg, problem) = ClientConfig::load(&path);
        std::fs::remove_file(&path).unwrap();

        assert_eq!(cfg.network.port, 8765);
        assert!(matches!(problem, Some(TandemError::Config(_))));
    }

    #[test]
    fn valid_file_loads_cleanly() {
        let path =
            std::env::temp_dir().join(format!("tandem-client-ok-{}.toml", std::process::id()));
        std::fs::write(&path, "[network]\nport = 9100\n").unwrap();
        let (cfg, problem) = ClientConfig::load(&path);
        std::fs::remove_file(&path).unwrap();

        assert_eq!(cfg.network.port, 9100);
        assert!(problem.is_none());
    }

    #[test]
    fn server_override() {
        let mut cfg = ClientConfig::default();
        cfg.set_server("192.168.1.20:9000").unwrap();
        assert_eq!(cfg.server().to_string(), "192.168.1.20:9000");

        assert!(cfg.set_server("no-port").is_err());
        assert!(cfg.set_server("host:99999").is_err());
        assert!(cfg.set_server(":80").is_err());
    }

    #[test]
    fn nonsense_durations_become_zero() {
        let mut cfg = ClientConfig::default();
        cfg.network.reconnect_delay_secs = -1.0;
        cfg.idle.cycle_secs = f64::NAN;
        assert_eq!(cfg.reconnect_delay(), Duration::ZERO);
        assert_eq!(cfg.idle_config().cycle, Duration::ZERO);
    }
}
