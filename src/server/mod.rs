//! Server-side stream delivery
//!
//! The HTTP layer that accepts subscribe requests and opens streams is a
//! collaborator, not part of this crate; it is expected to call
//! [`ConnectionRegistry::create`](crate::registry::ConnectionRegistry::create),
//! emit a `connection_open` handshake event and then hand the response body
//! to a [`StreamWriter`]. See `demos/relay_server.rs` for the wiring.

pub mod stream;

pub use stream::StreamWriter;
