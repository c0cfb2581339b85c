//! Push-delivery transport: persistent duplex channels looked up by id.
//!
//! A [`PushChannel`] is one connected client (concretely a WebSocket held
//! by the HTTP API); the [`ChannelRegistry`] routes framed text to it.
//! Delivery failures are [`ChannelError`]s — non-fatal to the query that
//! produced the frame.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, info};

use crate::error::ChannelError;

/// Buffered frames per channel before the send timeout applies.
const CHANNEL_CAPACITY: usize = 64;

/// A delivery target for framed text.
#[async_trait]
pub trait PushChannel: Send + Sync {
    /// The channel's registry id.
    fn id(&self) -> &str;

    /// Transmits one frame.
    ///
    /// Must not block indefinitely: a full or dead peer is reported as a
    /// [`ChannelError`], and the caller decides whether to keep trying.
    async fn send(&self, payload: String) -> Result<(), ChannelError>;
}

/// Registry of connected push channels, keyed by id.
///
/// Shared via `Arc` between the API layer (which registers connections) and
/// the coordinator (which pushes frames). Queries hold no locks of their
/// own; the registry's lock is held only for the map operation itself.
#[derive(Default)]
pub struct ChannelRegistry {
    channels: RwLock<HashMap<String, Arc<dyn PushChannel>>>,
}

impl ChannelRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a channel under its id, replacing any previous one.
    pub async fn register(&self, channel: Arc<dyn PushChannel>) {
        let id = channel.id().to_string();
        info!(channel = %id, "registered push channel");
        self.channels.write().await.insert(id, channel);
    }

    /// Removes a channel by id.
    pub async fn unregister(&self, id: &str) {
        if self.channels.write().await.remove(id).is_some() {
            info!(channel = %id, "unregistered push channel");
        }
    }

    /// Looks up a channel by id.
    pub async fn lookup(&self, id: &str) -> Option<Arc<dyn PushChannel>> {
        self.channels.read().await.get(id).cloned()
    }

    /// Number of connected channels.
    pub async fn len(&self) -> usize {
        self.channels.read().await.len()
    }

    /// `true` when no channels are connected.
    pub async fn is_empty(&self) -> bool {
        self.channels.read().await.is_empty()
    }

    /// Sends one frame to the channel registered under `id`.
    ///
    /// # Errors
    ///
    /// [`ChannelError::NotFound`] when no such channel is registered;
    /// otherwise whatever the channel's own `send` reports.
    pub async fn send_to(&self, id: &str, payload: String) -> Result<(), ChannelError> {
        let channel = self.lookup(id).await.ok_or_else(|| ChannelError::NotFound {
            id: id.to_string(),
        })?;
        channel.send(payload).await
    }
}

impl std::fmt::Debug for ChannelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelRegistry").finish_non_exhaustive()
    }
}

/// A push channel backed by a bounded in-process queue.
///
/// The API layer drains the receiving half into the actual socket; `send`
/// backs off for at most `send_timeout` when the queue is full, then
/// reports the push as failed rather than stalling the producer.
pub struct QueueChannel {
    id: String,
    tx: mpsc::Sender<String>,
    send_timeout: std::time::Duration,
}

impl QueueChannel {
    /// Creates the channel and hands back the receiving half.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        send_timeout: std::time::Duration,
    ) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        (
            Self {
                id: id.into(),
                tx,
                send_timeout,
            },
            rx,
        )
    }
}

#[async_trait]
impl PushChannel for QueueChannel {
    fn id(&self) -> &str {
        &self.id
    }

    async fn send(&self, payload: String) -> Result<(), ChannelError> {
        match self.tx.send_timeout(payload, self.send_timeout).await {
            Ok(()) => Ok(()),
            Err(mpsc::error::SendTimeoutError::Timeout(_)) => {
                debug!(channel = %self.id, "push channel full past the send timeout");
                Err(ChannelError::SendTimeout {
                    id: self.id.clone(),
                })
            }
            Err(mpsc::error::SendTimeoutError::Closed(_)) => Err(ChannelError::Closed {
                id: self.id.clone(),
            }),
        }
    }
}
