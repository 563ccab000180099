//! Command router: turns inbound `execute` commands into actions.
//!
//! ```text
//! frame ─► Command ─► cooldown? ──yes──► {status: cooldown}
//!                        │no
//!                        ▼
//!              transition_active(target)
//!                        │
//!                        ▼
//!              executor.execute(target, action)
//!                        │
//!                        ▼
//!              {status: success|error, state}
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::context::ClientContext;
use crate::message::{Command, Response};
use crate::network::Dispatch;

#[derive(Debug, Clone)]
pub struct CommandRouter {
    ctx: Arc<ClientContext>,
}

impl CommandRouter {
    pub fn new(ctx: Arc<ClientContext>) -> Self {
        Self { ctx }
    }

    /// Handle one command. `None` means the command is not for us and
    /// gets no reply.
    pub async fn handle(&self, command: Command) -> Option<Response> {
        let Some(target) = command.execute_target() else {
            debug!(?command, "ignoring command");
            return None;
        };
        let action = command.action.as_str();
        info!(target, action, "received execute");

        if !self.ctx.state.try_activate(target) {
            warn!(target, action, "action on cooldown, ignoring command");
            return Some(Response::cooldown(target, action));
        }

        let ok = match self.ctx.executor.execute(target, action).await {
            Ok(()) => true,
            Err(e) => {
                error!(target, action, "failed to execute action: {e}");
                false
            }
        };

        info!(target, action, ok, "action completed; will return to idle after timeout");
        Some(Response::completed(ok, target, action, self.ctx.state.label()))
    }
}

#[async_trait]
impl Dispatch for CommandRouter {
    async fn dispatch(&self, payload: String) -> Option<String> {
        let command = match Command::from_json(&payload) {
            Ok(command) => command,
            Err(e) => {
                warn!("error handling server message: {e}");
                return None;
            }
        };

        let response = self.handle(command).await?;
        match response.to_json() {
            Ok(json) => Some(json),
            Err(e) => {
                error!("failed to encode response: {e}");
                None
            }
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
