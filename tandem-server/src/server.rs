//! Server core: accept loop, key handling and broadcast.
//!
//! ```text
//! KeyScript ─┐
//! other     ─┼─► key channel ─► Keybinds ─► Registry::broadcast ─► clients
//! producers ─┘                                       │
//!                           client replies ◄─ inbound ┘ (logged)
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use tandem_core::{Inbound, Registry, Response, Status, TandemError};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::keys::{KeyScript, Keybinds};

/// Key presses buffered ahead of the broadcaster.
const KEY_QUEUE: usize = 32;
/// Client replies buffered ahead of the logger.
const INBOUND_QUEUE: usize = 256;

// ── TandemServer ─────────────────────────────────────────────────

pub struct TandemServer {
    config: ServerConfig,
    listener: TcpListener,
    registry: Arc<Registry>,
    inbound: mpsc::Receiver<Inbound>,
    keybinds: Keybinds,
    keys_tx: mpsc::Sender<String>,
    keys_rx: mpsc::Receiver<String>,
    shutdown: CancellationToken,
}

impl TandemServer {
    /// Bind the listen socket.
    pub async fn bind(config: ServerConfig) -> Result<Self, TandemError> {
        let listener = TcpListener::bind(config.bind_addr().to_string()).await?;
        let (inbound_tx, inbound) = mpsc::channel(INBOUND_QUEUE);
        let (keys_tx, keys_rx) = mpsc::channel(KEY_QUEUE);

        Ok(Self {
            keybinds: Keybinds::new(&config.keybinds),
            config,
            listener,
            registry: Arc::new(Registry::with_inbound(inbound_tx)),
            inbound,
            keys_tx,
            keys_rx,
            shutdown: CancellationToken::new(),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, TandemError> {
        Ok(self.listener.local_addr()?)
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Channel for injecting key presses by name.
    pub fn key_sender(&self) -> mpsc::Sender<String> {
        self.keys_tx.clone()
    }

    /// Cancelling this token stops [`run`](Self::run).
    pub fn stop_handle(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Serve until the stop handle fires.
    pub async fn run(self) {
        let Self {
            config,
            listener,
            registry,
            mut inbound,
            keybinds,
            keys_tx,
            mut keys_rx,
            shutdown,
        } = self;

        match listener.local_addr() {
            Ok(addr) => info!("listening on {addr}"),
            Err(_) => info!("listening on {}", config.bind_addr()),
        }
        let accept = tokio::spawn(registry.clone().serve(listener, shutdown.clone()));

        if config.script.enabled {
            let script = KeyScript::new(config.script.steps.clone());
            tokio::spawn(script.run(keys_tx.clone(), shutdown.clone()));
        }
        drop(keys_tx);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                Some(key) = keys_rx.recv() => {
                    press(&registry, &keybinds, &key).await;
                }
                Some(reply) = inbound.recv() => log_reply(&reply),
                else => break,
            }
        }

        if let Err(e) = accept.await {
            warn!("accept task failed: {e}");
        }
        info!("server stopped");
    }
}

/// Translate `key` and broadcast the command. Returns the number of
/// clients that took it.
pub async fn press(registry: &Registry, keybinds: &Keybinds, key: &str) -> usize {
    let Some(command) = keybinds.command_for(key) else {
        warn!(key, "no keybind for key");
        return 0;
    };
    let frame = match command.to_json() {
        Ok(frame) => frame,
        Err(e) => {
            warn!(key, "failed to encode command: {e}");
            return 0;
        }
    };

    let delivered = registry.broadcast(&frame).await;
    info!(
        key,
        window = command.window.as_deref().unwrap_or_default(),
        action = %command.action,
        delivered,
        "sent command"
    );
    delivered
}

fn log_reply(reply: &Inbound) {
    match Response::from_json(&reply.payload) {
        Ok(response) => {
            let state = response.state.as_deref().unwrap_or("-");
            match response.status {
                Status::Success => info!(
                    peer = %reply.peer,
                    window = %response.window,
                    action = %response.action,
                    state,
                    "client executed action"
                ),
                Status::Cooldown => info!(
                    peer = %reply.peer,
                    window = %response.window,
                    action = %response.action,
                    "client on cooldown"
                ),
                Status::Error => warn!(
                    peer = %reply.peer,
                    window = %response.window,
                    action = %response.action,
                    state,
                    "client failed to execute action"
                ),
            }
        }
        Err(e) => warn!(peer = %reply.peer, "unreadable client reply: {e}"),
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures::StreamExt;
    use tandem_core::{Command, FrameCodec};
    use tokio::net::TcpStream;
    use tokio_util::codec::FramedRead;

    use super::*;

    fn local_config() -> ServerConfig {
        let mut config = ServerConfig::default();
        config.set_bind("127.0.0.1:0").unwrap();
        config.script.enabled = false;
        config
    }

    async fn wait_for_clients(registry: &Registry, n: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while registry.len() < n {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("clients did not register");
    }

    #[tokio::test]
    async fn key_press_is_broadcast_to_every_client() {
        let server = TandemServer::bind(local_config()).await.unwrap();
        let addr = server.local_addr().unwrap();
        let registry = server.registry().clone();
        let keys = server.key_sender();
        let stop = server.stop_handle();
        let handle = tokio::spawn(server.run());

        let mut clients = Vec::new();
        for _ in 0..2 {
            let stream = TcpStream::connect(addr).await.unwrap();
            clients.push(FramedRead::new(stream, FrameCodec::new()));
        }
        wait_for_clients(&registry, 2).await;

        keys.send("f4".into()).await.unwrap();
        for client in &mut clients {
            let frame = tokio::time::timeout(Duration::from_secs(5), client.next())
                .await
                .expect("timeout")
                .unwrap()
                .unwrap();
            assert_eq!(
                Command::from_json(&frame).unwrap(),
                Command::execute("window4", "f4_action")
            );
        }

        stop.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn unbound_key_sends_nothing() {
        let registry = Registry::new();
        let (near, _far) = tokio::io::duplex(1024);
        registry.register(tandem_core::Connection::spawn(near, "c"));
        let keybinds = Keybinds::new(&ServerConfig::default().keybinds);

        assert_eq!(press(&registry, &keybinds, "F12").await, 0);
        assert_eq!(press(&registry, &keybinds, "F1").await, 1);
    }
}
