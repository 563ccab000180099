//! Protocol message types.
//!
//! Every frame carries one JSON object. The server sends commands, the
//! client answers each `execute` with a response:
//!
//! ```text
//! Server ──{"command":"execute","window":"window2","action":"f2_action"}──► Client
//! Client ──{"status":"success","window":"window2","action":"f2_action",
//!           "state":"active_window2"}─────────────────────────────────────► Server
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TandemError;

/// Action id used when a command omits `action`.
pub const DEFAULT_ACTION: &str = "f1_action";

fn default_action() -> String {
    DEFAULT_ACTION.to_string()
}

// ── CommandKind ──────────────────────────────────────────────────

/// The verb of a server → client message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandKind {
    /// Run an action profile on a target.
    Execute,
    /// Any verb this client does not understand.
    #[serde(other)]
    Unknown,
}

// ── Command ──────────────────────────────────────────────────────

/// A server → client command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub command: CommandKind,
    /// Target id. Commands without one are ignored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window: Option<String>,
    #[serde(default = "default_action")]
    pub action: String,
}

impl Command {
    /// Build an `execute` command.
    pub fn execute(window: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            command: CommandKind::Execute,
            window: Some(window.into()),
            action: action.into(),
        }
    }

    /// Returns the target id when this is a well-formed `execute`.
    pub fn execute_target(&self) -> Option<&str> {
        match self.command {
            CommandKind::Execute => self.window.as_deref().filter(|w| !w.is_empty()),
            CommandKind::Unknown => None,
        }
    }

    pub fn to_json(&self) -> Result<String, TandemError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self, TandemError> {
        Ok(serde_json::from_str(text)?)
    }
}

// ── Status ───────────────────────────────────────────────────────

/// Outcome reported back to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
    Cooldown,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Error => write!(f, "error"),
            Self::Cooldown => write!(f, "cooldown"),
        }
    }
}

// ── Response ─────────────────────────────────────────────────────

/// A client → server response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub status: Status,
    pub window: String,
    pub action: String,
    /// State label after execution; absent on cooldown.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

impl Response {
    pub fn cooldown(window: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            status: Status::Cooldown,
            window: window.into(),
            action: action.into(),
            state: None,
        }
    }

    pub fn completed(
        ok: bool,
        window: impl Into<String>,
        action: impl Into<String>,
        state: impl Into<String>,
    ) -> Self {
        Self {
            status: if ok { Status::Success } else { Status::Error },
            window: window.into(),
            action: action.into(),
            state: Some(state.into()),
        }
    }

    pub fn to_json(&self) -> Result<String, TandemError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self, TandemError> {
        Ok(serde_json::from_str(text)?)
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execute_wire_shape() {
        let json = Command::execute("window1", "f1_action").to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"command": "execute", "window": "window1", "action": "f1_action"})
        );
    }

    #[test]
    fn missing_action_defaults() {
        let cmd = Command::from_json(r#"{"command":"execute","window":"window3"}"#).unwrap();
        assert_eq!(cmd.action, DEFAULT_ACTION);
        assert_eq!(cmd.execute_target(), Some("window3"));
    }

    #[test]
    fn unknown_verb_has_no_target() {
        let cmd = Command::from_json(r#"{"command":"dance","window":"window3"}"#).unwrap();
        assert_eq!(cmd.command, CommandKind::Unknown);
        assert_eq!(cmd.execute_target(), None);
    }

    #[test]
    fn execute_without_window_has_no_target() {
        let cmd = Command::from_json(r#"{"command":"execute"}"#).unwrap();
        assert_eq!(cmd.execute_target(), None);
        let cmd = Command::from_json(r#"{"command":"execute","window":""}"#).unwrap();
        assert_eq!(cmd.execute_target(), None);
    }

    #[test]
    fn garbage_is_a_protocol_error() {
        assert!(matches!(
            Command::from_json("not json"),
            Err(TandemError::Protocol(_))
        ));
    }

    #[test]
    fn cooldown_response_omits_state() {
        let json = Response::cooldown("window1", "f1_action").to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"status": "cooldown", "window": "window1", "action": "f1_action"})
        );
    }

    #[test]
    fn completed_response_carries_state() {
        let resp = Response::completed(false, "window2", "f2_action", "active_window2");
        let parsed = Response::from_json(&resp.to_json().unwrap()).unwrap();
        assert_eq!(parsed.status, Status::Error);
        assert_eq!(parsed.state.as_deref(), Some("active_window2"));
    }
}
