//! Connection registry for topic-based fan-out
//!
//! The registry owns the set of live connections and, per topic, the set of
//! connections currently subscribed to it. Producers broadcast to a topic;
//! the registry appends the encoded payload to every subscriber's queue.
//!
//! # Architecture
//!
//! ```text
//!                       ConnectionRegistry
//!                 ┌───────────────────────────┐
//!                 │ connections: id -> Conn   │
//!                 │ topics: name -> {ids}     │
//!                 └─────────────┬─────────────┘
//!                               │
//!          ┌────────────────────┼────────────────────┐
//!          ▼                    ▼                    ▼
//!     [Producer]          [Connection]          [Connection]
//!     broadcast()         queue.pop()           queue.pop()
//!          │                    │                    │
//!          └──► queue.push() ──► StreamWriter ──► HTTP response
//! ```
//!
//! Both maps live under one lock, so a subscriber lookup plus queue append
//! is a single atomic step: a `remove` racing with a `broadcast` can never
//! deliver to a half-removed connection or leave a dangling subscriber
//! entry.
//!
//! # Zero-Copy Design
//!
//! Serialized payloads are held as `bytes::Bytes`, so fanning one event out
//! to many subscriber queues only bumps a reference count.

pub mod catalog;
pub mod config;
pub mod connection;
pub mod error;
pub mod queue;
pub mod store;

pub use catalog::{DeclaredTopic, TopicCatalog};
pub use config::{OverflowPolicy, RegistryConfig};
pub use connection::{Connection, ConnectionId};
pub use error::RegistryError;
pub use queue::{EventQueue, PushOutcome, QueuedEvent};
pub use store::{ConnectionRegistry, RetroEventFn};
