//! Decoded event type
//!
//! This is what the client hands to registered listeners. The payload is
//! kept as raw text; `json()` parses it on demand.

/// Topic assigned to events that arrive without an `event:` field.
///
/// Mirrors the reserved default event type of the SSE specification; events
/// with this topic are routed to the client's default handler.
pub const DEFAULT_TOPIC: &str = "message";

/// A single decoded server-sent event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Topic (the `event:` field), or [`DEFAULT_TOPIC`] if absent
    pub topic: String,

    /// Raw payload text (the `data:` field, lines joined with `\n`)
    pub data: String,

    /// Last-seen event id, if the server sent one
    pub id: Option<String>,

    /// Server-requested reconnect delay in milliseconds, if sent
    pub retry: Option<u64>,
}

impl Event {
    /// Create an event with just a topic and payload
    pub fn new(topic: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            data: data.into(),
            id: None,
            retry: None,
        }
    }

    /// Parse the payload as JSON
    pub fn json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::from_str(&self.data)
    }

    /// Whether this event carries the reserved default topic
    pub fn is_default_topic(&self) -> bool {
        self.topic == DEFAULT_TOPIC
    }
}
