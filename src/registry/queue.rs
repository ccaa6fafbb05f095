//! Per-connection outbound queue
//!
//! Many producer tasks may append concurrently; exactly one stream writer
//! consumes. The queue is bounded (capacity 0 opts out) and applies an
//! [`OverflowPolicy`](super::OverflowPolicy) when full, so a stalled
//! consumer cannot grow memory without limit.

use std::collections::VecDeque;

use bytes::Bytes;
use tokio::sync::{Mutex, Notify};

use super::config::OverflowPolicy;

/// One pending `(topic, encoded payload)` item
///
/// The payload is already JSON text; encoding happens once per broadcast,
/// and `Bytes` makes the per-subscriber clone a reference-count bump.
#[derive(Debug, Clone)]
pub struct QueuedEvent {
    /// Topic the event was published under
    pub topic: String,
    /// JSON-encoded payload
    pub data: Bytes,
}

impl QueuedEvent {
    /// Create a queued event from a topic and serialized payload
    pub fn new(topic: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            topic: topic.into(),
            data: data.into(),
        }
    }

    /// Payload as UTF-8 text
    pub fn data_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.data)
    }
}

/// Result of appending to a queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// Event queued normally
    Queued,
    /// Queue was full; the oldest event was dropped to make room
    DroppedOldest,
    /// Queue was full; the incoming event was dropped
    DroppedNewest,
    /// Queue was full and the policy demands disconnecting the consumer
    Overflowed,
    /// Queue already closed; event not delivered
    Closed,
}

/// Multi-producer single-consumer FIFO for one connection
#[derive(Debug)]
pub struct EventQueue {
    inner: Mutex<QueueInner>,
    notify: Notify,
    capacity: usize,
    policy: OverflowPolicy,
}

#[derive(Debug)]
struct QueueInner {
    items: VecDeque<QueuedEvent>,
    closed: bool,
}

impl EventQueue {
    /// Create a queue with the given capacity (0 = unbounded) and policy
    pub fn new(capacity: usize, policy: OverflowPolicy) -> Self {
        Self {
            inner: Mutex::new(QueueInner {
                items: VecDeque::new(),
                closed: false,
            }),
            notify: Notify::new(),
            capacity,
            policy,
        }
    }

    /// Append an event. Never blocks on the consumer.
    pub async fn push(&self, event: QueuedEvent) -> PushOutcome {
        let mut inner = self.inner.lock().await;

        if inner.closed {
            return PushOutcome::Closed;
        }

        if self.capacity > 0 && inner.items.len() >= self.capacity {
            return match self.policy {
                OverflowPolicy::DropOldest => {
                    inner.items.pop_front();
                    inner.items.push_back(event);
                    self.notify.notify_one();
                    PushOutcome::DroppedOldest
                }
                OverflowPolicy::DropNewest => PushOutcome::DroppedNewest,
                OverflowPolicy::Disconnect => PushOutcome::Overflowed,
            };
        }

        inner.items.push_back(event);
        self.notify.notify_one();
        PushOutcome::Queued
    }

    /// Wait for the next event.
    ///
    /// Returns `None` once the queue has been closed. Only the connection's
    /// stream writer may call this.
    pub async fn pop(&self) -> Option<QueuedEvent> {
        loop {
            {
                let mut inner = self.inner.lock().await;
                if let Some(event) = inner.items.pop_front() {
                    return Some(event);
                }
                if inner.closed {
                    return None;
                }
            }

            // notify_one stores a permit, so a push racing with this await
            // cannot be missed.
            self.notify.notified().await;
        }
    }

    /// Close the queue and discard anything still pending.
    ///
    /// Wakes the consumer so its drain loop can terminate.
    pub async fn close(&self) {
        let mut inner = self.inner.lock().await;
        inner.closed = true;
        inner.items.clear();
        self.notify.notify_one();
    }

    /// Number of pending events
    pub async fn len(&self) -> usize {
        self.inner.lock().await.items.len()
    }

    /// Whether the queue holds no pending events
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Whether the queue has been closed
    pub async fn is_closed(&self) -> bool {
        self.inner.lock().await.closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(n: u32) -> QueuedEvent {
        QueuedEvent::new("test", format!("{}", n))
    }

    #[tokio::test]
    async fn test_fifo_order() {
        let queue = EventQueue::new(0, OverflowPolicy::DropOldest);

        queue.push(event(1)).await;
        queue.push(event(2)).await;
        queue.push(event(3)).await;

        assert_eq!(queue.pop().await.unwrap().data_str(), "1");
        assert_eq!(queue.pop().await.unwrap().data_str(), "2");
        assert_eq!(queue.pop().await.unwrap().data_str(), "3");
    }

    #[tokio::test]
    async fn test_pop_waits_for_push() {
        let queue = std::sync::Arc::new(EventQueue::new(0, OverflowPolicy::DropOldest));

        let consumer = {
            let queue = std::sync::Arc::clone(&queue);
            tokio::spawn(async move { queue.pop().await })
        };

        tokio::task::yield_now().await;
        queue.push(event(7)).await;

        let popped = consumer.await.unwrap().unwrap();
        assert_eq!(popped.data_str(), "7");
    }

    #[tokio::test]
    async fn test_drop_oldest() {
        let queue = EventQueue::new(2, OverflowPolicy::DropOldest);

        assert_eq!(queue.push(event(1)).await, PushOutcome::Queued);
        assert_eq!(queue.push(event(2)).await, PushOutcome::Queued);
        assert_eq!(queue.push(event(3)).await, PushOutcome::DroppedOldest);

        assert_eq!(queue.pop().await.unwrap().data_str(), "2");
        assert_eq!(queue.pop().await.unwrap().data_str(), "3");
    }

    #[tokio::test]
    async fn test_drop_newest() {
        let queue = EventQueue::new(2, OverflowPolicy::DropNewest);

        queue.push(event(1)).await;
        queue.push(event(2)).await;
        assert_eq!(queue.push(event(3)).await, PushOutcome::DroppedNewest);

        assert_eq!(queue.pop().await.unwrap().data_str(), "1");
        assert_eq!(queue.pop().await.unwrap().data_str(), "2");
        assert_eq!(queue.len().await, 0);
    }

    #[tokio::test]
    async fn test_disconnect_policy_reports_overflow() {
        let queue = EventQueue::new(1, OverflowPolicy::Disconnect);

        queue.push(event(1)).await;
        assert_eq!(queue.push(event(2)).await, PushOutcome::Overflowed);

        // The overflowing event is not queued
        assert_eq!(queue.len().await, 1);
    }

    #[tokio::test]
    async fn test_close_wakes_consumer() {
        let queue = std::sync::Arc::new(EventQueue::new(0, OverflowPolicy::DropOldest));

        let consumer = {
            let queue = std::sync::Arc::clone(&queue);
            tokio::spawn(async move { queue.pop().await })
        };

        tokio::task::yield_now().await;
        queue.close().await;

        assert!(consumer.await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_push_after_close() {
        let queue = EventQueue::new(0, OverflowPolicy::DropOldest);
        queue.close().await;

        assert_eq!(queue.push(event(1)).await, PushOutcome::Closed);
        assert!(queue.pop().await.is_none());
    }

    #[tokio::test]
    async fn test_unbounded_capacity() {
        let queue = EventQueue::new(0, OverflowPolicy::DropOldest);

        for n in 0..10_000 {
            assert_eq!(queue.push(event(n)).await, PushOutcome::Queued);
        }
        assert_eq!(queue.len().await, 10_000);
    }
}
