//! # sse-rs
//!
//! Server-sent events distribution library: topic-based fan-out from
//! producers to many long-lived streaming connections, plus a resilient
//! client that reconnects automatically when the stream breaks.
//!
//! ## Server side
//!
//! Producers publish named events through a [`ConnectionRegistry`]; each
//! connection receives only the topics it subscribed to, in the order the
//! events were enqueued for it. One [`StreamWriter`] per connection drains
//! its queue into the open HTTP response. The HTTP layer itself (routes,
//! `text/event-stream` responses) is the caller's concern; see
//! `demos/relay_server.rs`.
//!
//! ```no_run
//! use std::sync::Arc;
//! use sse_rs::registry::ConnectionRegistry;
//!
//! # async fn example() -> sse_rs::error::Result<()> {
//! let registry = Arc::new(ConnectionRegistry::new());
//!
//! // Stream-opening collaborator:
//! let connection = registry.create().await;
//! connection
//!     .emit("connection_open", &serde_json::json!({"connectionId": connection.id().as_str()}))
//!     .await?;
//!
//! // Subscribe request handler:
//! registry.subscribe(connection.id().as_str(), &["zen"]).await?;
//!
//! // Any producer:
//! registry
//!     .broadcast("zen", &serde_json::json!({"index": 0, "lesson": "Beautiful is better than ugly."}))
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Client side
//!
//! ```no_run
//! use sse_rs::client::{ClientConfig, EventSource};
//!
//! # async fn example() {
//! let mut source = EventSource::new(ClientConfig::default());
//! source.add_event_listener("zen", |event| {
//!     println!("{}", event.data);
//! });
//! source
//!     .run(|| async { tokio::net::TcpStream::connect("127.0.0.1:8080").await })
//!     .await;
//! # }
//! ```

pub mod client;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod server;

pub use client::{ClientConfig, EventSource};
pub use error::{Error, Result};
pub use protocol::{Event, EventDecoder};
pub use registry::{Connection, ConnectionRegistry, RegistryConfig, TopicCatalog};
pub use server::StreamWriter;
