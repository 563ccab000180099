use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::SinkExt;
use tokio::io::AsyncWrite;
use tokio::sync::{mpsc, oneshot};
use tokio_util::codec::FramedWrite;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::codec::FrameCodec;
use crate::error::{FramingError, TandemError};

/// Frames queued ahead of the writer before `send` starts waiting.
const OUTBOUND_QUEUE: usize = 64;

type Outbound = (String, oneshot::Sender<Result<(), FramingError>>);

/// Write side of one peer connection.
///
/// A dedicated writer task owns the stream; every `send` goes through
/// its queue, so concurrent senders never interleave partial frames.
/// Cloning yields another handle to the same connection.
#[derive(Debug, Clone)]
pub struct Connection {
    peer: Arc<str>,
    tx: mpsc::Sender<Outbound>,
    alive: Arc<AtomicBool>,
    closed: Arc<AtomicBool>,
    shutdown: CancellationToken,
}

impl Connection {
    /// Spawn the writer task for `writer` and return its handle.
    pub fn spawn<W>(writer: W, peer: impl Into<String>) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let peer: Arc<str> = peer.into().into();
        let (tx, mut rx) = mpsc::channel::<Outbound>(OUTBOUND_QUEUE);
        let alive = Arc::new(AtomicBool::new(true));
        let shutdown = CancellationToken::new();

        let mut sink = FramedWrite::new(writer, FrameCodec::new());
        let task_alive = Arc::clone(&alive);
        let task_shutdown = shutdown.clone();
        let task_peer = Arc::clone(&peer);

        // Writer task: queue -> network
        tokio::spawn(async move {
            let mut stalled = false;
            loop {
                let next = tokio::select! {
                    _ = task_shutdown.cancelled() => break,
                    next = rx.recv() => next,
                };
                let Some((payload, ack)) = next else {
                    // every handle dropped
                    break;
                };

                // close() must also end a write the peer is not draining
                let result = tokio::select! {
                    _ = task_shutdown.cancelled() => {
                        stalled = true;
                        break;
                    }
                    result = sink.send(payload) => result,
                };
                let failed = result.is_err();
                if let Err(e) = &result {
                    warn!(peer = %task_peer, "write failed: {e}");
                    task_alive.store(false, Ordering::SeqCst);
                }
                let _ = ack.send(result);
                if failed {
                    break;
                }
            }

            task_alive.store(false, Ordering::SeqCst);
            if stalled {
                debug!(peer = %task_peer, "dropping stalled writer");
            } else if let Err(e) = SinkExt::<String>::close(&mut sink).await {
                debug!(peer = %task_peer, "shutdown after close: {e}");
            }
            debug!(peer = %task_peer, "writer stopped");
        });

        Self {
            peer,
            tx,
            alive,
            closed: Arc::new(AtomicBool::new(false)),
            shutdown,
        }
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// `false` once a write failed or the connection was closed.
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Write one frame and wait until it is flushed.
    ///
    /// A dead connection is never written to again.
    pub async fn send(&self, payload: String) -> Result<(), TandemError> {
        if !self.is_alive() {
            return Err(TandemError::ConnectionClosed);
        }

        let (ack_tx, ack_rx) = oneshot::channel();
        self.tx
            .send((payload, ack_tx))
            .await
            .map_err(|_| TandemError::ConnectionClosed)?;

        match ack_rx.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(TandemError::ConnectionClosed),
        }
    }

    /// Mark the connection dead and stop the writer.
    ///
    /// Returns `true` for the call that actually closed it; later calls
    /// are no-ops.
    pub fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.alive.store(false, Ordering::SeqCst);
        self.shutdown.cancel();
        info!(peer = %self.peer, "connection closed");
        true
    }
}

#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    host: String,
    port: u16,
}

impl ConnectionInfo {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl std::fmt::Display for ConnectionInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}
