//! Connection stream draining
//!
//! One `StreamWriter` runs per connection: it blocks on the connection's
//! queue, encodes each item to the SSE wire format and writes it to the
//! transport. It is the sole path that turns a registered connection into a
//! deregistered one: whether the queue closes or the write fails, the
//! writer calls `ConnectionRegistry::remove` before returning, so
//! subscriber sets never accumulate stale entries.

use std::sync::Arc;

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::Result;
use crate::protocol::encode_event;
use crate::registry::{Connection, ConnectionRegistry};

/// Drains one connection's queue into an `AsyncWrite` transport
pub struct StreamWriter<W> {
    registry: Arc<ConnectionRegistry>,
    connection: Connection,
    writer: W,
}

impl<W: AsyncWrite + Unpin> StreamWriter<W> {
    /// Create a writer for the given connection and transport.
    ///
    /// The transport is typically the body of an open `text/event-stream`
    /// HTTP response.
    pub fn new(registry: Arc<ConnectionRegistry>, connection: Connection, writer: W) -> Self {
        Self {
            registry,
            connection,
            writer,
        }
    }

    /// Run until the transport fails or the connection is removed.
    ///
    /// Either way the connection is deregistered before this returns.
    pub async fn run(mut self) -> Result<()> {
        let result = self.drain().await;

        self.registry.remove(self.connection.id()).await;

        if let Err(ref e) = result {
            tracing::debug!(connection = %self.connection.id(), error = %e, "Stream writer stopped");
        }

        result
    }

    /// Run until the transport fails, the connection is removed, or the
    /// shutdown future completes.
    pub async fn run_until<F>(mut self, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()>,
    {
        let result = tokio::select! {
            _ = shutdown => {
                tracing::debug!(connection = %self.connection.id(), "Stream writer shutdown");
                Ok(())
            }
            result = self.drain() => result,
        };

        self.registry.remove(self.connection.id()).await;

        result
    }

    async fn drain(&mut self) -> Result<()> {
        while let Some(event) = self.connection.queue().pop().await {
            let frame = encode_event(&event.topic, &event.data_str());
            self.writer.write_all(&frame).await?;
            self.writer.flush().await?;
        }

        // Queue closed: the connection was removed elsewhere
        Ok(())
    }
}
