//! Process-wide client context.
//!
//! Built once at startup and handed to every task by `Arc`: the idle
//! scheduler and the command router both reach the state machine and
//! the executor through it.

use crate::action::ActionExecutor;
use crate::state::SharedState;

#[derive(Debug)]
pub struct ClientContext {
    pub state: SharedState,
    pub executor: ActionExecutor,
}

impl ClientContext {
    pub fn new(state: SharedState, executor: ActionExecutor) -> Self {
        Self { state, executor }
    }
}
