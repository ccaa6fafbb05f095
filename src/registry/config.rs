//! Registry configuration

/// What to do when a subscriber's queue is full
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Drop the oldest queued event to make room for the new one
    DropOldest,
    /// Drop the incoming event, keep what is queued
    DropNewest,
    /// Remove the slow connection from the registry entirely
    Disconnect,
}

/// Registry configuration options
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Maximum events queued per connection (0 = unbounded)
    ///
    /// A subscriber that stops reading but keeps its transport half-open
    /// would otherwise grow its queue without limit.
    pub queue_capacity: usize,

    /// Policy applied when a queue hits `queue_capacity`
    pub overflow_policy: OverflowPolicy,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
            overflow_policy: OverflowPolicy::DropOldest,
        }
    }
}

impl RegistryConfig {
    /// Set the per-connection queue capacity (0 = unbounded)
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Set the overflow policy
    pub fn overflow_policy(mut self, policy: OverflowPolicy) -> Self {
        self.overflow_policy = policy;
        self
    }
}
