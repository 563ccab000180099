//! Configuration for the tandem server.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tandem_core::{ConnectionInfo, TandemError};

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address.
    pub network: NetworkConfig,
    /// Scripted key presses.
    pub script: ScriptConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Key name → target id.
    pub keybinds: BTreeMap<String, String>,
}

/// Network configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Interface to bind.
    pub host: String,
    /// TCP port to listen on.
    pub port: u16,
}

/// A repeating schedule of key presses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptConfig {
    pub enabled: bool,
    /// Steps, run in order and repeated forever.
    pub steps: Vec<ScriptStep>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptStep {
    /// Key name, looked up in `keybinds`.
    pub key: String,
    /// Wait before pressing, in seconds.
    pub after_secs: f64,
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

impl Default for ServerConfig {
    fn default() -> Self {
        let keybinds = (1..=5)
            .map(|n| (format!("F{n}"), format!("window{n}")))
            .collect();
        Self {
            network: NetworkConfig::default(),
            script: ScriptConfig::default(),
            logging: LoggingConfig::default(),
            keybinds,
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8765,
        }
    }
}

impl Default for ScriptConfig {
    fn default() -> Self {
        let step = |key: &str, after_secs| ScriptStep {
            key: key.into(),
            after_secs,
        };
        Self {
            enabled: true,
            steps: vec![step("F1", 10.0), step("F2", 15.0), step("F3", 15.0)],
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

impl ServerConfig {
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

    /// Override the listen address with `host:port`.
    pub fn set_bind(&mut self, addr: &str) -> Result<(), TandemError> {
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

    pub fn bind_addr(&self) -> ConnectionInfo {
        ConnectionInfo::new(self.network.host.clone(), self.network.port)
    }
}

impl ScriptStep {
    /// `after_secs` as a `Duration`; negative or non-finite values become zero.
    pub fn delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.after_secs).unwrap_or(Duration::ZERO)
    }
}

// ── Tests ────────────────────────────────────────────────────────
