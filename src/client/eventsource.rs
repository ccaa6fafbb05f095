//! Resilient stream client
//!
//! `EventSource` opens a stream, incrementally decodes it into discrete
//! events and dispatches them to registered per-topic listeners. Any
//! transport failure (error, timeout, premature end-of-stream) is contained
//! here: the partial event left in the decode buffer is discarded, the
//! client sleeps for the current retry delay and reconnects. Listeners
//! never observe transport errors.
//!
//! State machine:
//!
//! ```text
//! Disconnected -> Connecting -> Streaming --(I/O error)--> WaitingToRetry
//!                     ^                                         |
//!                     └─────────────────────────────────────────┘
//! ```
//!
//! There is no terminal state; the client runs until the shutdown future
//! passed to [`run_until`](EventSource::run_until) completes.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::sleep;

use crate::protocol::{Event, EventDecoder};

use super::config::ClientConfig;

/// Per-topic event listener
pub type EventListener = Box<dyn FnMut(&Event) + Send>;

/// Client-side resilient SSE reader
///
/// The transport is abstracted as an async `connect` closure yielding an
/// `AsyncRead` stream; opening the HTTP request belongs to the caller.
///
/// # Example
/// ```no_run
/// use sse_rs::client::{ClientConfig, EventSource};
///
/// # async fn example() -> std::io::Result<()> {
/// let mut source = EventSource::new(ClientConfig::default());
/// source.add_event_listener("zen", |event| {
///     println!("zen: {}", event.data);
/// });
///
/// source
///     .run(|| async {
///         tokio::net::TcpStream::connect("127.0.0.1:8080").await
///     })
///     .await;
/// # Ok(())
/// # }
/// ```
pub struct EventSource {
    config: ClientConfig,
    listeners: HashMap<String, Vec<EventListener>>,
    message_listeners: Vec<EventListener>,
    retry: Duration,
    last_event_id: Option<String>,
}

impl EventSource {
    /// Create a client with the given configuration
    pub fn new(config: ClientConfig) -> Self {
        let retry = config.retry;
        Self {
            config,
            listeners: HashMap::new(),
            message_listeners: Vec::new(),
            retry,
            last_event_id: None,
        }
    }

    /// Add a listener for a topic.
    ///
    /// Multiple listeners per topic are allowed; all are invoked, in
    /// registration order, for every matching event.
    pub fn add_event_listener<F>(&mut self, topic: impl Into<String>, listener: F)
    where
        F: FnMut(&Event) + Send + 'static,
    {
        self.listeners
            .entry(topic.into())
            .or_default()
            .push(Box::new(listener));
    }

    /// Add a default listener, invoked for events with the reserved
    /// `message` topic (events sent without an `event:` field).
    pub fn on_message<F>(&mut self, listener: F)
    where
        F: FnMut(&Event) + Send + 'static,
    {
        self.message_listeners.push(Box::new(listener));
    }

    /// Current reconnect delay (initial or last server-suggested value)
    pub fn retry_delay(&self) -> Duration {
        self.retry
    }

    /// Last event id seen on the stream, if any.
    ///
    /// Tracked for observability only; the server does not replay missed
    /// events by id.
    pub fn last_event_id(&self) -> Option<&str> {
        self.last_event_id.as_deref()
    }

    /// Run forever, reconnecting on every failure.
    ///
    /// `connect` is called on each (re)connection attempt.
    pub async fn run<C, Fut, S>(&mut self, connect: C)
    where
        C: FnMut() -> Fut,
        Fut: Future<Output = std::io::Result<S>>,
        S: AsyncRead + Unpin,
    {
        self.run_until(connect, std::future::pending()).await
    }

    /// Run until the shutdown future completes.
    ///
    /// Shutdown is honored at every suspension point: while connecting,
    /// during the blocking read and during the retry sleep.
    pub async fn run_until<C, Fut, S, F>(&mut self, mut connect: C, shutdown: F)
    where
        C: FnMut() -> Fut,
        Fut: Future<Output = std::io::Result<S>>,
        S: AsyncRead + Unpin,
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            // Connecting
            let attempt = tokio::select! {
                _ = &mut shutdown => return,
                result = connect() => result,
            };

            match attempt {
                Ok(stream) => {
                    // Streaming
                    if self.stream_events(stream, &mut shutdown).await {
                        return;
                    }
                    tracing::info!(delay = ?self.retry, "Stream lost, reconnecting");
                }
                Err(e) => {
                    tracing::warn!(error = %e, delay = ?self.retry, "Connect failed");
                }
            }

            // WaitingToRetry
            tokio::select! {
                _ = &mut shutdown => return,
                _ = sleep(self.retry) => {}
            }
        }
    }

    /// Read the stream until it fails or shutdown fires.
    ///
    /// Returns `true` if shutdown was requested.
    async fn stream_events<S, F>(&mut self, mut stream: S, shutdown: &mut std::pin::Pin<&mut F>) -> bool
    where
        S: AsyncRead + Unpin,
        F: Future<Output = ()>,
    {
        let mut decoder = EventDecoder::new();
        let mut buf = vec![0u8; self.config.read_buffer_size];

        loop {
            let n = tokio::select! {
                _ = shutdown.as_mut() => return true,
                result = stream.read(&mut buf) => match result {
                    Ok(0) => break,
                    Ok(n) => n,
                    Err(e) => {
                        tracing::debug!(error = %e, "Stream read failed");
                        break;
                    }
                },
            };

            decoder.feed(&buf[..n]);
            while let Some(event) = decoder.next_event() {
                self.process_event(event);
            }
        }

        // A half-received event cannot be resumed and must not be
        // dispatched.
        decoder.discard_partial();
        false
    }

    fn process_event(&mut self, event: Event) {
        if let Some(ms) = event.retry {
            self.retry = Duration::from_millis(ms).max(self.config.min_retry);
            tracing::debug!(retry = ?self.retry, "Server-suggested retry delay");
        }

        if let Some(ref id) = event.id {
            self.last_event_id = Some(id.clone());
        }

        if event.is_default_topic() {
            for listener in &mut self.message_listeners {
                listener(&event);
            }
        } else if let Some(listeners) = self.listeners.get_mut(&event.topic) {
            for listener in listeners {
                listener(&event);
            }
        } else {
            tracing::trace!(topic = %event.topic, "No listener for topic");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use tokio::io::{AsyncWriteExt, DuplexStream};
    use tokio::sync::Notify;
    use tokio::time::timeout;

    fn fast_config() -> ClientConfig {
        ClientConfig::default()
            .retry(Duration::from_millis(5))
            .min_retry(Duration::from_millis(1))
    }

    /// Connect closure serving one scripted stream segment per attempt.
    ///
    /// Each segment is written to the stream, then the stream ends (EOF).
    /// Once the script is exhausted, connections stay open but silent.
    fn scripted_connect(
        segments: Vec<Vec<u8>>,
    ) -> impl FnMut() -> std::pin::Pin<Box<dyn Future<Output = std::io::Result<DuplexStream>> + Send>>
    {
        let segments = Arc::new(Mutex::new(VecDeque::from(segments)));

        move || {
            let segments = Arc::clone(&segments);
            Box::pin(async move {
                let (mut server, client) = tokio::io::duplex(1024);
                let segment = segments.lock().unwrap().pop_front();

                tokio::spawn(async move {
                    match segment {
                        Some(bytes) => {
                            let _ = server.write_all(&bytes).await;
                            // Dropping the server half ends the stream
                        }
                        None => {
                            // Keep the stream open but idle
                            std::future::pending::<()>().await;
                            drop(server);
                        }
                    }
                });

                Ok(client)
            })
        }
    }

    #[tokio::test]
    async fn test_dispatches_to_topic_listener() {
        let mut source = EventSource::new(fast_config());

        let seen = Arc::new(Mutex::new(Vec::new()));
        let done = Arc::new(Notify::new());

        {
            let seen = Arc::clone(&seen);
            let done = Arc::clone(&done);
            source.add_event_listener("zen", move |event| {
                seen.lock().unwrap().push(event.json().unwrap());
                done.notify_one();
            });
        }

        let connect = scripted_connect(vec![
            b"event: zen\ndata: {\"index\": 0, \"lesson\": \"Beautiful is better than ugly.\"}\n\n"
                .to_vec(),
        ]);

        let shutdown = {
            let done = Arc::clone(&done);
            async move { done.notified().await }
        };

        timeout(Duration::from_secs(5), source.run_until(connect, shutdown))
            .await
            .unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(
            seen[0],
            serde_json::json!({"index": 0, "lesson": "Beautiful is better than ugly."})
        );
    }

    #[tokio::test]
    async fn test_listeners_invoked_in_registration_order() {
        let mut source = EventSource::new(fast_config());

        let order = Arc::new(Mutex::new(Vec::new()));
        let done = Arc::new(Notify::new());

        {
            let order = Arc::clone(&order);
            source.add_event_listener("zen", move |_| order.lock().unwrap().push(1));
        }
        {
            let order = Arc::clone(&order);
            let done = Arc::clone(&done);
            source.add_event_listener("zen", move |_| {
                order.lock().unwrap().push(2);
                done.notify_one();
            });
        }

        let connect = scripted_connect(vec![b"event: zen\ndata: {}\n\n".to_vec()]);
        let shutdown = {
            let done = Arc::clone(&done);
            async move { done.notified().await }
        };

        timeout(Duration::from_secs(5), source.run_until(connect, shutdown))
            .await
            .unwrap();

        assert_eq!(*order.lock().unwrap(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_default_topic_goes_to_message_listener() {
        let mut source = EventSource::new(fast_config());

        let seen = Arc::new(Mutex::new(Vec::new()));
        let done = Arc::new(Notify::new());

        {
            let seen = Arc::clone(&seen);
            let done = Arc::clone(&done);
            source.on_message(move |event| {
                seen.lock().unwrap().push(event.data.clone());
                done.notify_one();
            });
        }

        // No event: field, so the reserved default topic applies
        let connect = scripted_connect(vec![b"data: hello\n\n".to_vec()]);
        let shutdown = {
            let done = Arc::clone(&done);
            async move { done.notified().await }
        };

        timeout(Duration::from_secs(5), source.run_until(connect, shutdown))
            .await
            .unwrap();

        assert_eq!(*seen.lock().unwrap(), vec!["hello".to_string()]);
    }

    #[tokio::test]
    async fn test_partial_event_discarded_and_delivery_resumes() {
        let mut source = EventSource::new(fast_config());

        let seen = Arc::new(Mutex::new(Vec::new()));
        let done = Arc::new(Notify::new());

        {
            let seen = Arc::clone(&seen);
            let done = Arc::clone(&done);
            source.add_event_listener("zen", move |event| {
                seen.lock().unwrap().push(event.data.clone());
                done.notify_one();
            });
        }

        // First segment ends mid-event; the fragment must never be
        // dispatched. The second connection delivers a complete event.
        let connect = scripted_connect(vec![
            b"event: zen\ndata: {\"index\"".to_vec(),
            b"event: zen\ndata: {\"index\": 2}\n\n".to_vec(),
        ]);
        let shutdown = {
            let done = Arc::clone(&done);
            async move { done.notified().await }
        };

        timeout(Duration::from_secs(5), source.run_until(connect, shutdown))
            .await
            .unwrap();

        assert_eq!(*seen.lock().unwrap(), vec!["{\"index\": 2}".to_string()]);
    }

    #[tokio::test]
    async fn test_retry_and_id_fields_update_state() {
        let mut source = EventSource::new(fast_config());

        let done = Arc::new(Notify::new());
        {
            let done = Arc::clone(&done);
            source.add_event_listener("zen", move |_| done.notify_one());
        }

        let connect = scripted_connect(vec![
            b"event: zen\nid: 42\nretry: 5000\ndata: {}\n\n".to_vec(),
        ]);
        let shutdown = {
            let done = Arc::clone(&done);
            async move { done.notified().await }
        };

        timeout(Duration::from_secs(5), source.run_until(connect, shutdown))
            .await
            .unwrap();

        assert_eq!(source.retry_delay(), Duration::from_millis(5000));
        assert_eq!(source.last_event_id(), Some("42"));
    }

    #[tokio::test]
    async fn test_retry_clamped_to_minimum() {
        let config = fast_config().min_retry(Duration::from_millis(100));
        let mut source = EventSource::new(config);

        let done = Arc::new(Notify::new());
        {
            let done = Arc::clone(&done);
            source.add_event_listener("zen", move |_| done.notify_one());
        }

        let connect = scripted_connect(vec![b"event: zen\nretry: 0\ndata: {}\n\n".to_vec()]);
        let shutdown = {
            let done = Arc::clone(&done);
            async move { done.notified().await }
        };

        timeout(Duration::from_secs(5), source.run_until(connect, shutdown))
            .await
            .unwrap();

        assert_eq!(source.retry_delay(), Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_shutdown_during_idle_stream() {
        let mut source = EventSource::new(fast_config());

        // Script exhausted immediately: connection opens and stays silent
        let connect = scripted_connect(vec![]);

        let notify = Arc::new(Notify::new());
        {
            let notify = Arc::clone(&notify);
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                notify.notify_one();
            });
        }

        let shutdown = {
            let notify = Arc::clone(&notify);
            async move { notify.notified().await }
        };

        // Returns promptly even though the stream never yields bytes
        timeout(Duration::from_secs(5), source.run_until(connect, shutdown))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_unsubscribed_topic_ignored() {
        let mut source = EventSource::new(fast_config());

        let seen = Arc::new(Mutex::new(Vec::new()));
        let done = Arc::new(Notify::new());

        {
            let seen = Arc::clone(&seen);
            let done = Arc::clone(&done);
            source.add_event_listener("zen", move |event| {
                seen.lock().unwrap().push(event.data.clone());
                done.notify_one();
            });
        }

        let connect = scripted_connect(vec![
            b"event: other\ndata: 1\n\nevent: zen\ndata: 2\n\n".to_vec(),
        ]);
        let shutdown = {
            let done = Arc::clone(&done);
            async move { done.notified().await }
        };

        timeout(Duration::from_secs(5), source.run_until(connect, shutdown))
            .await
            .unwrap();

        assert_eq!(*seen.lock().unwrap(), vec!["2".to_string()]);
    }
}
