//! Connection registry implementation
//!
//! The central registry that owns all live connections and routes published
//! events to their subscribers.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::error::{Error, Result};

use super::config::RegistryConfig;
use super::connection::{Connection, ConnectionId};
use super::error::RegistryError;
use super::queue::{EventQueue, PushOutcome, QueuedEvent};

type BoxFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Catch-up callback invoked when a connection first registers for a topic.
///
/// Lets a producer prime late joiners with current state, typically by
/// emitting a snapshot event to the new subscriber.
pub type RetroEventFn = Box<dyn Fn(Connection) -> BoxFuture + Send + Sync>;

struct RegistryInner {
    /// Live connections by id
    connections: HashMap<ConnectionId, Connection>,

    /// Per-topic subscriber sets
    topics: HashMap<String, HashSet<ConnectionId>>,
}

/// Central registry for all live connections
///
/// Both maps sit under one `RwLock`: the subscriber-set read and the queue
/// appends of a broadcast happen under the same read guard, so a racing
/// `remove` (which takes the write guard) can never observe a half-removed
/// connection.
pub struct ConnectionRegistry {
    inner: RwLock<RegistryInner>,
    retro_events: RwLock<HashMap<String, RetroEventFn>>,
    config: RegistryConfig,
}

impl ConnectionRegistry {
    /// Create a registry with default configuration
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create a registry with custom configuration
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            inner: RwLock::new(RegistryInner {
                connections: HashMap::new(),
                topics: HashMap::new(),
            }),
            retro_events: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Get the registry configuration
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Allocate a fresh connection and add it to the live set.
    ///
    /// The returned handle is what the stream-opening collaborator drains;
    /// clones of it are cheap.
    pub async fn create(&self) -> Connection {
        let mut inner = self.inner.write().await;

        // Id collisions are astronomically unlikely, but the live set must
        // never hold two connections with the same id.
        let id = loop {
            let id = ConnectionId::generate();
            if !inner.connections.contains_key(&id) {
                break id;
            }
        };

        let queue = std::sync::Arc::new(EventQueue::new(
            self.config.queue_capacity,
            self.config.overflow_policy,
        ));
        let connection = Connection::new(id.clone(), queue);
        inner.connections.insert(id.clone(), connection.clone());

        tracing::info!(
            connection = %id,
            live = inner.connections.len(),
            "Connection created"
        );

        connection
    }

    /// Remove a connection from the live set and every subscriber set.
    ///
    /// Closes its queue so the drain loop terminates. Idempotent: removing
    /// an unknown or already-removed id is a no-op.
    pub async fn remove(&self, id: &ConnectionId) {
        let removed = {
            let mut inner = self.inner.write().await;

            let removed = inner.connections.remove(id);
            if removed.is_some() {
                for subscribers in inner.topics.values_mut() {
                    subscribers.remove(id);
                }
                inner.topics.retain(|_, subscribers| !subscribers.is_empty());
            }
            removed
        };

        if let Some(connection) = removed {
            connection.queue().close().await;
            tracing::info!(connection = %id, "Connection removed");
        }
    }

    /// Look up a live connection by id
    pub async fn lookup(&self, id: &str) -> Option<Connection> {
        let inner = self.inner.read().await;
        inner.connections.get(&ConnectionId::from(id)).cloned()
    }

    /// Register a connection to receive a topic.
    ///
    /// Idempotent: repeated registrations for the same topic are condensed
    /// into one. A connection no longer in the live set is skipped, so the
    /// subscriber sets never hold dangling ids.
    pub async fn register(&self, connection: &Connection, topic: &str) {
        let newly_registered = {
            let mut inner = self.inner.write().await;

            if !inner.connections.contains_key(connection.id()) {
                tracing::warn!(
                    connection = %connection.id(),
                    topic = topic,
                    "Register skipped: connection not live"
                );
                return;
            }

            inner
                .topics
                .entry(topic.to_string())
                .or_default()
                .insert(connection.id().clone())
        };

        if newly_registered {
            tracing::debug!(connection = %connection.id(), topic = topic, "Subscriber added");

            // Prime the late joiner outside the registry lock; the callback
            // is free to call back into the registry.
            let retro_events = self.retro_events.read().await;
            if let Some(retro) = retro_events.get(topic) {
                retro(connection.clone()).await;
            }
        }
    }

    /// Subscribe the connection with the given id to each named topic.
    ///
    /// Returns the resolved connection so callers can emit follow-up events
    /// to it. Fails with [`RegistryError::InvalidConnection`] if the id
    /// does not resolve to a live connection.
    pub async fn subscribe<S: AsRef<str>>(&self, id: &str, topics: &[S]) -> Result<Connection> {
        let connection = self
            .lookup(id)
            .await
            .ok_or_else(|| RegistryError::InvalidConnection(id.to_string()))?;

        for topic in topics {
            self.register(&connection, topic.as_ref()).await;
        }

        Ok(connection)
    }

    /// Install a catch-up callback for a topic.
    ///
    /// Invoked once per connection, when it first registers for the topic.
    pub async fn register_retro_event(&self, topic: impl Into<String>, retro: RetroEventFn) {
        self.retro_events.write().await.insert(topic.into(), retro);
    }

    /// Broadcast an event to every connection subscribed to `topic`.
    ///
    /// The payload is serialized once; each subscriber queue then receives
    /// a reference-counted clone, in the same producer-observed order for
    /// every subscriber. Zero subscribers is a no-op. Never blocks on a
    /// slow consumer: full queues are handled per the configured
    /// [`OverflowPolicy`](super::OverflowPolicy).
    ///
    /// Returns the number of queues the event was appended to.
    pub async fn broadcast<T: Serialize + ?Sized>(&self, topic: &str, payload: &T) -> Result<usize> {
        let data = Bytes::from(serde_json::to_string(payload).map_err(Error::Serialization)?);

        let mut delivered = 0;
        let mut to_disconnect: Vec<ConnectionId> = Vec::new();

        {
            let inner = self.inner.read().await;

            let subscribers = match inner.topics.get(topic) {
                Some(subscribers) => subscribers,
                None => return Ok(0),
            };

            for id in subscribers {
                let connection = match inner.connections.get(id) {
                    Some(connection) => connection,
                    None => continue,
                };

                let event = QueuedEvent::new(topic, data.clone());
                match connection.queue().push(event).await {
                    PushOutcome::Queued => delivered += 1,
                    PushOutcome::DroppedOldest => {
                        tracing::warn!(connection = %id, topic = topic, "Queue full, dropped oldest");
                        delivered += 1;
                    }
                    PushOutcome::DroppedNewest => {
                        tracing::warn!(connection = %id, topic = topic, "Queue full, event dropped");
                    }
                    PushOutcome::Overflowed => {
                        tracing::warn!(connection = %id, topic = topic, "Queue overflow, disconnecting");
                        to_disconnect.push(id.clone());
                    }
                    PushOutcome::Closed => {}
                }
            }
        }

        // Disconnects need the write guard, so they happen after the
        // fan-out pass.
        for id in to_disconnect {
            self.remove(&id).await;
        }

        tracing::debug!(topic = topic, delivered = delivered, "broadcast");

        Ok(delivered)
    }

    /// Deliver an event to exactly one connection.
    ///
    /// Equivalent to [`Connection::emit`]; present so producers holding only
    /// the registry can push per-connection events.
    pub async fn emit<T: Serialize + ?Sized>(
        &self,
        connection: &Connection,
        topic: &str,
        payload: &T,
    ) -> Result<()> {
        connection.emit(topic, payload).await
    }

    /// Number of live connections
    pub async fn connection_count(&self) -> usize {
        self.inner.read().await.connections.len()
    }

    /// Number of connections subscribed to a topic
    pub async fn subscriber_count(&self, topic: &str) -> usize {
        self.inner
            .read()
            .await
            .topics
            .get(topic)
            .map(|subscribers| subscribers.len())
            .unwrap_or(0)
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
