//! Client service core logic.
//!
//! Wires the shared state, executor, command router and idle scheduler
//! together, then runs the connection supervisor and the scheduler side
//! by side until stopped.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use tandem_core::{
    ActionExecutor, ClientContext, CommandRouter, IdleScheduler, KeyInput, SharedState,
    Supervisor, WindowFocus,
};

use crate::config::ClientConfig;

// ── ClientService ────────────────────────────────────────────────

pub struct ClientService {
    config: ClientConfig,
    ctx: Arc<ClientContext>,
    shutdown: CancellationToken,
}

impl ClientService {
    /// Build the service over the given desktop backend.
    pub fn new<D>(config: ClientConfig, desktop: Arc<D>) -> Self
    where
        D: WindowFocus + KeyInput + 'static,
    {
        let executor = ActionExecutor::new(
            config.targets.clone(),
            config.actions.clone(),
            desktop.clone(),
            desktop,
        );
        let state = SharedState::new(config.action_state());
        Self {
            config,
            ctx: Arc::new(ClientContext::new(state, executor)),
            shutdown: CancellationToken::new(),
        }
    }

    /// Cancelling this token stops [`run`](Self::run).
    pub fn stop_handle(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn context(&self) -> &Arc<ClientContext> {
        &self.ctx
    }

    /// Run until the stop handle fires.
    ///
    /// The supervisor owns the server link; the idle scheduler (when
    /// enabled) cycles targets in a task of its own.
    pub async fn run(&self) {
        if self.config.targets.is_empty() {
            warn!("no targets configured; commands will fail and idle mode has nothing to do");
        }

        let idle = if self.config.idle.enabled {
            let scheduler = IdleScheduler::new(self.ctx.clone(), self.config.idle_config());
            Some(tokio::spawn(scheduler.run(self.shutdown.clone())))
        } else {
            info!("idle mode disabled");
            None
        };

        let supervisor =
            Supervisor::new(self.config.server()).with_reconnect_delay(self.config.reconnect_delay());
        let router = CommandRouter::new(self.ctx.clone());
        supervisor.run(&router, self.shutdown.clone()).await;

        if let Some(handle) = idle {
            if let Err(e) = handle.await {
                warn!("idle scheduler task failed: {e}");
            }
        }
        info!("client stopped");
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures::{SinkExt, StreamExt};
    use tandem_core::{Command, FrameCodec, Response, Status};
    use tokio::net::TcpListener;
    use tokio_util::codec::Framed;

    use super::*;
    use crate::desktop::DryRunDesktop;

    #[tokio::test]
    async fn serves_commands_from_configured_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let mut config = ClientConfig::default();
        config.set_server(&format!("127.0.0.1:{port}")).unwrap();
        config.idle.enabled = false;
        for profile in config.actions.values_mut() {
            profile.delay_after_focus = tandem_core::Timing::Fixed(0.0);
        }

        let service = Arc::new(ClientService::new(config, Arc::new(DryRunDesktop)));
        let stop = service.stop_handle();
        let handle = tokio::spawn({
            let service = service.clone();
            async move { service.run().await }
        });

        let (stream, _) = listener.accept().await.unwrap();
        let mut server = Framed::new(stream, FrameCodec::new());
        server
            .send(Command::execute("window4", "f4_action").to_json().unwrap())
            .await
            .unwrap();

        let reply = tokio::time::timeout(Duration::from_secs(5), server.next())
            .await
            .expect("timeout")
            .expect("stream ended")
            .unwrap();
        let reply = Response::from_json(&reply).unwrap();
        assert_eq!(reply.status, Status::Success);
        assert_eq!(reply.state.as_deref(), Some("active_window4"));
        assert!(!service.context().state.is_idle());

        stop.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("client did not stop")
            .unwrap();
    }
}
