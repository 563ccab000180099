//! # tandem-core
//!
//! Shared library for the tandem keystroke coordinator.
//!
//! This crate contains:
//! - **Codec**: `FrameCodec`, 4-byte big-endian length-prefixed UTF-8 frames
//! - **Messages**: `Command` / `Response` JSON wire types
//! - **Network**: `Connection` (single-writer handle), `Registry` (server
//!   fan-out) and `Supervisor` (client reconnect loop)
//! - **State**: the Idle/Active `ActionState` machine and `ConnectionPhase`
//! - **Action**: keys, profiles, targets, desktop seams and `ActionExecutor`
//! - **Router**: `CommandRouter`, execute commands to actions and replies
//! - **Schedule**: the round-robin `IdleScheduler`
//! - **Error**: `TandemError`, typed, `thiserror`-based error hierarchy

pub mod action;
pub mod codec;
pub mod context;
pub mod error;
pub mod message;
pub mod network;
pub mod router;
pub mod schedule;
pub mod state;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use action::{
    ActionExecutor, ActionProfile, ActionProfiles, IDLE_ACTION, Key, KeyInput, Target, Timing,
    WindowFocus, default_profiles, default_targets,
};
pub use codec::{FrameCodec, LENGTH_PREFIX, MAX_FRAME_LEN, encode_frame};
pub use context::ClientContext;
pub use error::{ActionError, ErrorClass, FramingError, TandemError};
pub use message::{Command, CommandKind, DEFAULT_ACTION, Response, Status};
pub use network::{
    Connection, ConnectionId, ConnectionInfo, DEFAULT_RECONNECT_DELAY, Dispatch, Inbound,
    Registry, Supervisor, WRITE_TIMEOUT,
};
pub use router::CommandRouter;
pub use schedule::{IdleConfig, IdleOutcome, IdleScheduler, ScheduleCursor};
pub use state::{
    ActionState, ConnectionPhase, DEFAULT_COOLDOWN, DEFAULT_IDLE_TIMEOUT, Mode, SharedState,
};
