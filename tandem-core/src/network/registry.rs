//! Server-side registry of connected clients.
//!
//! Every accepted connection gets a slot and a dedicated reader task.
//! Outbound traffic is fan-out only: [`Registry::broadcast`] writes the
//! same frame to every live slot.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::StreamExt;
use futures::future::join_all;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::connection::Connection;
use crate::codec::FrameCodec;
use crate::error::TandemError;

/// How long a broadcast waits on one client before dropping it.
pub const WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// Pause after a failed `accept` (fd exhaustion and the like).
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

pub type ConnectionId = u64;

/// A frame received from a registered client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inbound {
    pub id: ConnectionId,
    pub peer: String,
    pub payload: String,
}

#[derive(Debug, Default)]
pub struct Registry {
    slots: Mutex<HashMap<ConnectionId, Connection>>,
    next_id: AtomicU64,
    inbound: Option<mpsc::Sender<Inbound>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry that forwards every received frame to `inbound`.
    pub fn with_inbound(inbound: mpsc::Sender<Inbound>) -> Self {
        Self {
            inbound: Some(inbound),
            ..Self::default()
        }
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<ConnectionId, Connection>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a connection and return its slot id.
    pub fn register(&self, conn: Connection) -> ConnectionId {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        info!(id, peer = conn.peer(), "client registered");
        self.slots().insert(id, conn);
        id
    }

    /// Remove and close a slot. Safe to call any number of times.
    pub fn remove(&self, id: ConnectionId) -> bool {
        let removed = self.slots().remove(&id);
        match removed {
            Some(conn) => {
                conn.close();
                info!(id, peer = conn.peer(), "client removed");
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.slots().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots().is_empty()
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.slots().contains_key(&id)
    }

    /// Register a split stream and start its reader.
    ///
    /// The reader runs until end-of-stream or a framing error, then
    /// removes the slot.
    pub fn attach<R, W>(self: &Arc<Self>, reader: R, writer: W, peer: String) -> ConnectionId
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let id = self.register(Connection::spawn(writer, peer.clone()));
        let registry = Arc::clone(self);

        tokio::spawn(async move {
            let mut frames = FramedRead::new(reader, FrameCodec::new());
            while let Some(frame) = frames.next().await {
                match frame {
                    Ok(payload) => registry.deliver(id, &peer, payload).await,
                    Err(e) => {
                        warn!(id, peer = %peer, "read failed: {e}");
                        break;
                    }
                }
            }
            debug!(id, peer = %peer, "reader finished");
            registry.remove(id);
        });

        id
    }

    async fn deliver(&self, id: ConnectionId, peer: &str, payload: String) {
        match &self.inbound {
            Some(tx) => {
                let inbound = Inbound {
                    id,
                    peer: peer.to_string(),
                    payload,
                };
                if tx.send(inbound).await.is_err() {
                    debug!(id, "inbound receiver dropped");
                }
            }
            None => info!(id, peer, "received: {payload}"),
        }
    }

    /// Accept clients until `shutdown` fires.
    pub async fn serve(self: Arc<Self>, listener: TcpListener, shutdown: CancellationToken) {
        loop {
            let accepted = tokio::select! {
                _ = shutdown.cancelled() => break,
                accepted = listener.accept() => accepted,
            };
            match accepted {
                Ok((stream, addr)) => {
                    if let Err(e) = stream.set_nodelay(true) {
                        debug!("set_nodelay failed: {e}");
                    }
                    let (reader, writer) = stream.into_split();
                    self.attach(reader, writer, addr.to_string());
                }
                Err(e) => {
                    warn!("accept error: {e}");
                    if !pause_or_stop(ACCEPT_BACKOFF, &shutdown).await {
                        break;
                    }
                }
            }
        }
        self.close_all();
    }

    /// Write `payload` to every registered connection.
    ///
    /// Each client gets [`WRITE_TIMEOUT`] to take the frame. Slots whose
    /// write fails or times out are removed after all writes have
    /// finished. Returns the number of clients that took the frame.
    pub async fn broadcast(&self, payload: &str) -> usize {
        let snapshot: Vec<(ConnectionId, Connection)> = self
            .slots()
            .iter()
            .map(|(id, conn)| (*id, conn.clone()))
            .collect();

        if snapshot.is_empty() {
            warn!("no clients connected");
            return 0;
        }

        let results = join_all(snapshot.iter().map(|(id, conn)| async move {
            let sent = tokio::time::timeout(WRITE_TIMEOUT, conn.send(payload.to_string()))
                .await
                .unwrap_or(Err(TandemError::WriteTimeout(WRITE_TIMEOUT)));
            (*id, sent)
        }))
        .await;

        let mut delivered = 0;
        let mut dead = Vec::new();
        for (id, result) in results {
            match result {
                Ok(()) => delivered += 1,
                Err(e) => {
                    warn!(id, "broadcast write failed: {e}");
                    dead.push(id);
                }
            }
        }
        for id in dead {
            self.remove(id);
        }

        debug!(delivered, "broadcast sent");
        delivered
    }

    /// Close and drop every slot.
    pub fn close_all(&self) {
        let drained: Vec<Connection> = self.slots().drain().map(|(_, c)| c).collect();
        for conn in drained {
            conn.close();
        }
    }
}

/// Sleep for `pause`; `false` if `shutdown` fired first.
async fn pause_or_stop(pause: Duration, shutdown: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        _ = shutdown.cancelled() => false,
        _ = tokio::time::sleep(pause) => true,
    }
}

// ── Tests ────────────────────────────────────────────────────────
