//! SSE client implementation
//!
//! Provides the client side of the event stream:
//! - Incremental decoding of the stream into discrete events
//! - Dispatch to per-topic listeners
//! - Automatic reconnect with a server-adjustable retry delay

pub mod config;
pub mod eventsource;

pub use config::ClientConfig;
pub use eventsource::{EventListener, EventSource};
