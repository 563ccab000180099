//! Client-side connection supervisor.
//!
//! Owns the single outbound connection to the server. Connect failures
//! and dropped links are absorbed here: the supervisor waits a fixed
//! delay and tries again, forever, until shutdown.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::connection::{Connection, ConnectionInfo};
use crate::codec::FrameCodec;
use crate::error::TandemError;
use crate::state::ConnectionPhase;

/// Delay between connection attempts.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Receives each decoded frame; may return a reply frame.
#[async_trait]
pub trait Dispatch: Send + Sync {
    async fn dispatch(&self, payload: String) -> Option<String>;
}

pub struct Supervisor {
    server: ConnectionInfo,
    reconnect_delay: Duration,
    link: Mutex<Option<Connection>>,
    phase: watch::Sender<ConnectionPhase>,
    attempts: AtomicU64,
}

impl Supervisor {
    pub fn new(server: ConnectionInfo) -> Self {
        Self {
            server,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            link: Mutex::new(None),
            phase: watch::Sender::new(ConnectionPhase::Disconnected),
            attempts: AtomicU64::new(0),
        }
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn server(&self) -> &ConnectionInfo {
        &self.server
    }

    pub fn phase(&self) -> ConnectionPhase {
        self.phase.borrow().clone()
    }

    /// Watch phase changes.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionPhase> {
        self.phase.subscribe()
    }

    /// Connection attempts made so far.
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }

    fn link(&self) -> MutexGuard<'_, Option<Connection>> {
        self.link.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn transition(&self, step: impl FnOnce(&mut ConnectionPhase) -> Result<(), TandemError>) {
        self.phase.send_modify(|phase| {
            if let Err(e) = step(phase) {
                warn!("{e}; forcing Disconnected");
                phase.force_disconnect();
            }
        });
    }

    /// Send one frame to the server.
    ///
    /// Returns `false` without waiting when not connected.
    pub async fn send(&self, payload: String) -> bool {
        let conn = match self.link().as_ref() {
            Some(conn) if self.phase.borrow().is_connected() => conn.clone(),
            _ => {
                warn!("not connected to server; dropping message");
                return false;
            }
        };

        match conn.send(payload).await {
            Ok(()) => true,
            Err(e) => {
                warn!("send failed: {e}");
                false
            }
        }
    }

    /// Connect, serve, reconnect, until `shutdown` fires.
    pub async fn run<D>(&self, dispatch: &D, shutdown: CancellationToken)
    where
        D: Dispatch + ?Sized,
    {
        let addr = self.server.to_string();

        while !shutdown.is_cancelled() {
            self.transition(ConnectionPhase::begin_connect);
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
            info!(%addr, attempt, "connecting to server");

            let connected = tokio::select! {
                _ = shutdown.cancelled() => break,
                connected = TcpStream::connect(&addr) => connected,
            };

            match connected {
                Ok(stream) => {
                    self.transition(ConnectionPhase::complete_connect);
                    info!(%addr, "connected to server");
                    self.session(stream, dispatch, &shutdown).await;
                    self.teardown();
                }
                Err(e) => {
                    self.transition(ConnectionPhase::fail_connect);
                    warn!(%addr, "server connection error: {e}");
                }
            }

            if shutdown.is_cancelled() {
                break;
            }
            info!("reconnecting in {:?}", self.reconnect_delay);
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.reconnect_delay) => {}
            }
        }

        self.teardown();
        info!("supervisor stopped");
    }

    /// Read loop for one established connection.
    async fn session<D>(&self, stream: TcpStream, dispatch: &D, shutdown: &CancellationToken)
    where
        D: Dispatch + ?Sized,
    {
        if let Err(e) = stream.set_nodelay(true) {
            debug!("set_nodelay failed: {e}");
        }
        let (reader, writer) = stream.into_split();
        *self.link() = Some(Connection::spawn(writer, self.server.to_string()));

        let mut frames = FramedRead::new(reader, FrameCodec::new());
        loop {
            let next = tokio::select! {
                _ = shutdown.cancelled() => break,
                next = frames.next() => next,
            };
            match next {
                Some(Ok(payload)) => {
                    debug!("received: {payload}");
                    if let Some(reply) = dispatch.dispatch(payload).await {
                        if !self.send(reply).await {
                            break;
                        }
                    }
                }
                Some(Err(e)) => {
                    warn!("error reading from server: {e}");
                    break;
                }
                None => {
                    warn!("server disconnected");
                    break;
                }
            }
        }
    }

    /// Drop the current link (closing it once) and mark Disconnected.
    fn teardown(&self) {
        if let Some(conn) = self.link().take() {
            conn.close();
        }
        if let Some(uptime) = self.phase.borrow().connected_duration() {
            info!("session ended after {:.1}s", uptime.as_secs_f64());
        }
        self.phase.send_modify(ConnectionPhase::force_disconnect);
    }
}

impl std::fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field("server", &self.server)
            .field("reconnect_delay", &self.reconnect_delay)
            .field("phase", &*self.phase.borrow())
            .field("attempts", &self.attempts())
            .finish()
    }
}
