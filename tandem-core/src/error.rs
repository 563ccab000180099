//! Domain-specific error types for the Tandem protocol.
//!
//! Errors fall into four classes (see [`ErrorClass`]):
//! framing, connectivity, configuration and action execution.
//! Framing and connectivity errors never leave the connection layer;
//! action errors travel exactly one hop, into a response message.

use thiserror::Error;

/// The canonical error type for Tandem.
#[derive(Debug, Error)]
pub enum TandemError {
    // ── Framing ──────────────────────────────────────────────────
    /// A frame could not be read from or written to the byte stream.
    #[error("framing error: {0}")]
    Framing(#[from] FramingError),

    // ── Connectivity ─────────────────────────────────────────────
    /// The TCP/IO layer reported an error (connect refused, reset, ...).
    #[error("connection error: {0}")]
    Connectivity(#[from] std::io::Error),

    /// `send` was called while no connection is established.
    #[error("not connected")]
    NotConnected,

    /// The connection was marked dead and will not accept writes.
    #[error("connection closed")]
    ConnectionClosed,

    /// A peer did not take a frame within the write deadline.
    #[error("write timed out after {0:?}")]
    WriteTimeout(std::time::Duration),

    /// An mpsc/oneshot channel was closed unexpectedly.
    #[error("channel closed")]
    ChannelClosed,

    /// A connection phase transition was requested from the wrong phase.
    #[error("invalid phase transition: {0}")]
    InvalidTransition(&'static str),

    // ── Configuration ────────────────────────────────────────────
    /// Configuration was missing or could not be parsed.
    #[error("configuration error: {0}")]
    Config(String),

    // ── Protocol ─────────────────────────────────────────────────
    /// A payload was not a valid protocol message.
    #[error("protocol error: {0}")]
    Protocol(#[from] serde_json::Error),

    // ── Action ───────────────────────────────────────────────────
    /// Focusing a target or injecting input failed.
    #[error("action error: {0}")]
    Action(#[from] ActionError),
}

/// Broad error classes, used to decide where an error stops propagating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Short or invalid read. Connection-fatal.
    Framing,
    /// Connect refused, reset, write to a dead link. Retried or removed.
    Connectivity,
    /// Missing or unparseable configuration. Defaults apply.
    Config,
    /// Input injection failure. Reported to the peer as `status: error`.
    Action,
}

impl TandemError {
    /// Classify this error.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Framing(_) | Self::Protocol(_) => ErrorClass::Framing,
            Self::Connectivity(_)
            | Self::NotConnected
            | Self::ConnectionClosed
            | Self::WriteTimeout(_)
            | Self::ChannelClosed
            | Self::InvalidTransition(_) => ErrorClass::Connectivity,
            Self::Config(_) => ErrorClass::Config,
            Self::Action(_) => ErrorClass::Action,
        }
    }
}

// ── FramingError ─────────────────────────────────────────────────

/// Errors raised by [`FrameCodec`](crate::codec::FrameCodec).
#[derive(Debug, Error)]
pub enum FramingError {
    /// The stream closed before the declared frame length was satisfied.
    #[error("stream closed mid-frame: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    /// The length prefix declares a frame larger than the codec accepts.
    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// The payload is not valid UTF-8 text.
    #[error("invalid utf-8 payload: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// The underlying stream failed.
    #[error("stream error: {0}")]
    Io(#[from] std::io::Error),
}

// ── ActionError ──────────────────────────────────────────────────

/// Failures while focusing a target or injecting keystrokes.
#[derive(Debug, Error)]
pub enum ActionError {
    /// The target id is not configured on this client.
    #[error("unknown target: {0}")]
    UnknownTarget(String),

    /// The action id has no profile on this client.
    #[error("unknown action: {0}")]
    UnknownAction(String),

    /// The key name could not be mapped to a key.
    #[error("unknown key: {0}")]
    UnknownKey(String),

    /// The window-focus collaborator failed.
    #[error("focus failed on {target}: {reason}")]
    Focus { target: String, reason: String },

    /// The input collaborator failed.
    #[error("input injection failed: {0}")]
    Input(String),

    /// Input injection is not available on this platform.
    #[error("input injection is not supported on this platform")]
    Unsupported,
}
