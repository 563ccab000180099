//! Autonomous idle cycling across targets.

pub mod cursor;
pub mod idle;

pub use cursor::ScheduleCursor;
pub use idle::{IdleConfig, IdleOutcome, IdleScheduler};
