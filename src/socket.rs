//! Owned WebSocket connection handle.
//!
//! DESIGN
//! ======
//! Each handle spawns one task that owns the `tokio-tungstenite` stream. The
//! task publishes its ready state through a `watch` channel so observers can
//! read it at any time without awaiting the socket. Outbound text goes through
//! an unbounded queue; inbound text is fanned out on a broadcast channel and
//! the latest message is kept for late readers.
//!
//! LIFECYCLE
//! =========
//! 1. `open` → `Connecting`
//! 2. Handshake succeeds → `Open`; fails → `Closed`
//! 3. `close` → `Closing` → `Closed`; peer close or I/O error → `Closed`
//! 4. With a reconnect policy, a dropped connection goes back to step 1 after
//!    an exponential backoff, up to `attempts` times in a row.
//!
//! Dropping the handle aborts the task.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};

const INBOUND_BROADCAST_CAPACITY: usize = 64;
const MAX_RECONNECT_BACKOFF: Duration = Duration::from_secs(10);
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

// =============================================================================
// READY STATE
// =============================================================================

/// Readiness of a socket, mirroring the browser `WebSocket.readyState` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadyState {
    #[default]
    Connecting,
    Open,
    Closing,
    Closed,
}

impl ReadyState {
    #[must_use]
    pub fn is_open(self) -> bool {
        self == Self::Open
    }
}

impl std::fmt::Display for ReadyState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closing => "closing",
            Self::Closed => "closed",
        };
        f.write_str(label)
    }
}

/// Anything whose readiness can be sampled without blocking.
pub trait ReadyProbe: Send + Sync {
    fn ready_state(&self) -> ReadyState;
}

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum SocketError {
    #[error("websocket connect to {url} failed: {source}")]
    Connect {
        url: String,
        source: Box<tokio_tungstenite::tungstenite::Error>,
    },
    #[error("socket task for {0} has stopped")]
    Stopped(String),
}

// =============================================================================
// RECONNECT POLICY
// =============================================================================

/// How the handle behaves after a connection drops or fails to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Consecutive reconnect attempts before giving up. Zero disables reconnect.
    pub attempts: u32,
    /// Delay before the first attempt; doubled after each failure.
    pub interval: Duration,
}

impl ReconnectPolicy {
    #[must_use]
    pub const fn disabled() -> Self {
        Self { attempts: 0, interval: Duration::from_secs(1) }
    }

    /// Backoff before reconnect attempt `attempt` (1-based), capped at 10s.
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.interval
            .checked_mul(factor)
            .unwrap_or(MAX_RECONNECT_BACKOFF)
            .min(MAX_RECONNECT_BACKOFF)
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::disabled()
    }
}

// =============================================================================
// MESSAGES
// =============================================================================

/// A text message received from the peer.
///
/// `seq` increases per handle so two identical payloads stay distinguishable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub seq: u64,
    pub text: String,
}

#[derive(Debug)]
enum Outbound {
    Text(String),
    Close,
}

/// Cloneable send side of a socket handle.
#[derive(Debug, Clone)]
pub struct SocketSender {
    url: Arc<str>,
    tx: mpsc::UnboundedSender<Outbound>,
}

impl SocketSender {
    /// Queue a text message. Messages queued while the socket is still
    /// connecting are flushed once it opens.
    pub fn send(&self, text: impl Into<String>) -> Result<(), SocketError> {
        self.tx
            .send(Outbound::Text(text.into()))
            .map_err(|_| SocketError::Stopped(self.url.to_string()))
    }
}

// =============================================================================
// HANDLE
// =============================================================================

/// Owned connection to one WebSocket URL.
#[derive(Debug)]
pub struct SocketHandle {
    url: Arc<str>,
    state_rx: watch::Receiver<ReadyState>,
    last_rx: watch::Receiver<Option<InboundMessage>>,
    inbound_tx: broadcast::Sender<InboundMessage>,
    sender: SocketSender,
    task: Option<JoinHandle<()>>,
}

struct SocketTask {
    url: Arc<str>,
    policy: ReconnectPolicy,
    state_tx: watch::Sender<ReadyState>,
    last_tx: watch::Sender<Option<InboundMessage>>,
    inbound_tx: broadcast::Sender<InboundMessage>,
    outbound_rx: mpsc::UnboundedReceiver<Outbound>,
    seq: u64,
}

/// How a live connection ended.
enum Ended {
    /// `close` was requested or every handle side is gone.
    ByClient,
    /// Peer closed or the transport failed.
    Dropped,
}

impl SocketHandle {
    /// Spawn the connection task and return immediately in `Connecting`.
    #[must_use]
    pub fn open(url: impl Into<String>, policy: ReconnectPolicy) -> Self {
        let url: Arc<str> = Arc::from(url.into());
        let (state_tx, state_rx) = watch::channel(ReadyState::Connecting);
        let (last_tx, last_rx) = watch::channel(None);
        let (inbound_tx, _) = broadcast::channel(INBOUND_BROADCAST_CAPACITY);
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        let task = SocketTask {
            url: Arc::clone(&url),
            policy,
            state_tx,
            last_tx,
            inbound_tx: inbound_tx.clone(),
            outbound_rx,
            seq: 0,
        };
        let task = tokio::spawn(task.run());

        Self {
            sender: SocketSender { url: Arc::clone(&url), tx: outbound_tx },
            url,
            state_rx,
            last_rx,
            inbound_tx,
            task: Some(task),
        }
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Receiver that observes every ready-state transition.
    #[must_use]
    pub fn watch_ready_state(&self) -> watch::Receiver<ReadyState> {
        self.state_rx.clone()
    }

    #[must_use]
    pub fn sender(&self) -> SocketSender {
        self.sender.clone()
    }

    /// Most recent inbound message, if any arrived yet.
    #[must_use]
    pub fn last_message(&self) -> Option<InboundMessage> {
        self.last_rx.borrow().clone()
    }

    /// Subscribe to inbound messages received from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<InboundMessage> {
        self.inbound_tx.subscribe()
    }

    /// Close the connection and wait briefly for the task to finish.
    pub async fn close(mut self) {
        let Some(mut task) = self.task.take() else {
            return;
        };
        let _ = self.sender.tx.send(Outbound::Close);
        if tokio::time::timeout(CLOSE_TIMEOUT, &mut task).await.is_err() {
            warn!(url = %self.url, "socket close timed out; aborting task");
            task.abort();
        }
    }
}

impl ReadyProbe for SocketHandle {
    fn ready_state(&self) -> ReadyState {
        *self.state_rx.borrow()
    }
}

impl Drop for SocketHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

// =============================================================================
// TASK
// =============================================================================

impl SocketTask {
    async fn run(mut self) {
        let mut attempt: u32 = 0;

        loop {
            self.state_tx.send_replace(ReadyState::Connecting);
            match connect_async(self.url.as_ref()).await {
                Ok((stream, _response)) => {
                    attempt = 0;
                    info!(url = %self.url, "socket open");
                    self.state_tx.send_replace(ReadyState::Open);
                    if let Ended::ByClient = self.drive(stream).await {
                        self.state_tx.send_replace(ReadyState::Closed);
                        info!(url = %self.url, "socket closed by client");
                        return;
                    }
                    info!(url = %self.url, "socket dropped");
                }
                Err(e) => {
                    let err = SocketError::Connect { url: self.url.to_string(), source: Box::new(e) };
                    warn!(error = %err, "socket connect failed");
                }
            }

            self.state_tx.send_replace(ReadyState::Closed);

            if attempt >= self.policy.attempts {
                debug!(url = %self.url, attempts = attempt, "reconnect budget exhausted");
                return;
            }
            attempt += 1;
            let delay = self.policy.backoff(attempt);
            debug!(url = %self.url, attempt, delay_ms = delay.as_millis(), "reconnect scheduled");
            if !self.wait_for_reconnect(delay).await {
                return;
            }
        }
    }

    /// Sleep out the backoff. Returns `false` when `close` arrived meanwhile.
    async fn wait_for_reconnect(&mut self, delay: Duration) -> bool {
        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                () = &mut sleep => return true,
                outbound = self.outbound_rx.recv() => match outbound {
                    Some(Outbound::Text(_)) => {
                        warn!(url = %self.url, "dropping message sent while reconnecting");
                    }
                    Some(Outbound::Close) | None => return false,
                },
            }
        }
    }

    async fn drive(&mut self, stream: WebSocketStream<MaybeTlsStream<TcpStream>>) -> Ended {
        let (mut write, mut read) = stream.split();

        loop {
            tokio::select! {
                outbound = self.outbound_rx.recv() => match outbound {
                    Some(Outbound::Text(text)) => {
                        if let Err(e) = write.send(Message::Text(text.into())).await {
                            warn!(url = %self.url, error = %e, "socket send failed");
                            return Ended::Dropped;
                        }
                    }
                    Some(Outbound::Close) | None => {
                        self.state_tx.send_replace(ReadyState::Closing);
                        let _ = write.send(Message::Close(None)).await;
                        let _ = write.close().await;
                        return Ended::ByClient;
                    }
                },
                inbound = read.next() => match inbound {
                    Some(Ok(Message::Text(text))) => self.publish(text.as_str().to_owned()),
                    Some(Ok(Message::Binary(bytes))) => {
                        self.publish(String::from_utf8_lossy(&bytes).into_owned());
                    }
                    Some(Ok(Message::Close(_))) => {
                        self.state_tx.send_replace(ReadyState::Closing);
                        // Flush the queued close reply to finish the handshake.
                        let _ = write.close().await;
                        return Ended::Dropped;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(url = %self.url, error = %e, "socket receive failed");
                        return Ended::Dropped;
                    }
                    None => return Ended::Dropped,
                },
            }
        }
    }

    fn publish(&mut self, text: String) {
        self.seq += 1;
        let message = InboundMessage { seq: self.seq, text };
        self.last_tx.send_replace(Some(message.clone()));
        // No subscribers is fine; the last message is still retained.
        let _ = self.inbound_tx.send(message);
    }
}

#[cfg(test)]
#[path = "socket_test.rs"]
mod tests;
