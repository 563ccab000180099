pub mod action;
pub mod connection;

pub use action::{ActionState, DEFAULT_COOLDOWN, DEFAULT_IDLE_TIMEOUT, Mode, SharedState};
pub use connection::ConnectionPhase;
