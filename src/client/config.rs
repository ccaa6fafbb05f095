//! Client configuration

use std::time::Duration;

/// Client configuration options
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Initial reconnect delay, used until the server suggests one
    pub retry: Duration,

    /// Lower bound for the reconnect delay.
    ///
    /// A server-sent `retry:` value below this is clamped so a
    /// misconfigured server cannot make the client hot-loop.
    pub min_retry: Duration,

    /// Read buffer size for the stream reader
    pub read_buffer_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            retry: Duration::from_secs(3),
            min_retry: Duration::from_millis(100),
            read_buffer_size: 16 * 1024,
        }
    }
}

impl ClientConfig {
    /// Set the initial reconnect delay
    pub fn retry(mut self, retry: Duration) -> Self {
        self.retry = retry;
        self
    }

    /// Set the minimum reconnect delay
    pub fn min_retry(mut self, min_retry: Duration) -> Self {
        self.min_retry = min_retry;
        self
    }

    /// Set the read buffer size
    pub fn read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();

        assert_eq!(config.retry, Duration::from_secs(3));
        assert_eq!(config.min_retry, Duration::from_millis(100));
        assert_eq!(config.read_buffer_size, 16 * 1024);
    }

    #[test]
    fn test_builder_chaining() {
        let config = ClientConfig::default()
            .retry(Duration::from_millis(500))
            .min_retry(Duration::from_millis(50))
            .read_buffer_size(1024);

        assert_eq!(config.retry, Duration::from_millis(500));
        assert_eq!(config.min_retry, Duration::from_millis(50));
        assert_eq!(config.read_buffer_size, 1024);
    }

    #[test]
    fn test_read_buffer_never_zero() {
        let config = ClientConfig::default().read_buffer_size(0);

        assert_eq!(config.read_buffer_size, 1);
    }
}
