//! Connection identity and handle
//!
//! A `Connection` represents one subscriber's outbound channel: an
//! unguessable id and an ordered delivery queue. The id is the sole
//! authorization for subscribe requests, so it comes from a
//! cryptographically strong random source.

use std::sync::Arc;

use serde::Serialize;

use crate::error::{Error, Result};

use super::error::RegistryError;
use super::queue::{EventQueue, PushOutcome, QueuedEvent};

/// Random bytes per id; 10 bytes encode to 20 lowercase hex characters
const ID_BYTES: usize = 10;

const HEX_CHARS: &[u8; 16] = b"0123456789abcdef";

/// Opaque connection identifier (fixed-length lowercase hex)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionId(String);

impl ConnectionId {
    /// Generate a fresh id from the OS random source
    pub fn generate() -> Self {
        use rand::RngCore;

        let mut bytes = [0u8; ID_BYTES];
        rand::rngs::OsRng.fill_bytes(&mut bytes);

        let mut s = String::with_capacity(ID_BYTES * 2);
        for b in bytes {
            s.push(HEX_CHARS[(b >> 4) as usize] as char);
            s.push(HEX_CHARS[(b & 0x0f) as usize] as char);
        }

        Self(s)
    }

    /// The id as a hex string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConnectionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Handle to one subscriber's delivery channel
///
/// Cheap to clone; all clones share the same queue. The handle stays valid
/// after removal from the registry, but its queue is closed and rejects
/// further events.
#[derive(Debug, Clone)]
pub struct Connection {
    id: ConnectionId,
    queue: Arc<EventQueue>,
}

impl Connection {
    pub(super) fn new(id: ConnectionId, queue: Arc<EventQueue>) -> Self {
        Self { id, queue }
    }

    /// The connection's id
    pub fn id(&self) -> &ConnectionId {
        &self.id
    }

    /// The connection's outbound queue
    pub fn queue(&self) -> &Arc<EventQueue> {
        &self.queue
    }

    /// Deliver an event to this connection only, regardless of its
    /// subscriptions.
    ///
    /// Used e.g. for the `connection_open` handshake event pushed before
    /// any subscription exists. Fails with
    /// [`RegistryError::InvalidConnection`] if the connection has already
    /// been torn down, or with a serialization error for an unencodable
    /// payload.
    pub async fn emit<T: Serialize + ?Sized>(&self, topic: &str, payload: &T) -> Result<()> {
        let data = serde_json::to_string(payload)?;

        tracing::debug!(connection = %self.id, topic = topic, "emit");

        match self.queue.push(QueuedEvent::new(topic, data)).await {
            PushOutcome::Closed => Err(Error::Registry(RegistryError::InvalidConnection(
                self.id.to_string(),
            ))),
            PushOutcome::DroppedOldest | PushOutcome::DroppedNewest | PushOutcome::Overflowed => {
                tracing::warn!(connection = %self.id, topic = topic, "Queue full on emit");
                Ok(())
            }
            PushOutcome::Queued => Ok(()),
        }
    }
}
