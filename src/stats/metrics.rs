//! Delivery and dispatch counters
//!
//! Cheap relaxed atomics bumped on the hot paths; read by operators through
//! [`StatsSnapshot`]. Online connection and room counts live in the registry
//! and room manager, which own that state.

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic hub counters
#[derive(Debug, Default)]
pub struct HubStats {
    /// Publish calls that reached the fan-out path
    pub events_published: AtomicU64,
    /// Individual member deliveries that were enqueued
    pub frames_delivered: AtomicU64,
    /// Individual member deliveries dropped (full queue or closed peer)
    pub frames_dropped: AtomicU64,
    /// Commands appended to durable queues
    pub commands_issued: AtomicU64,
    /// Inbound messages decoded successfully
    pub messages_received: AtomicU64,
    /// Inbound messages rejected as malformed
    pub validation_failures: AtomicU64,
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub events_published: u64,
    pub frames_delivered: u64,
    pub frames_dropped: u64,
    pub commands_issued: u64,
    pub messages_received: u64,
    pub validation_failures: u64,
}

impl HubStats {
    /// Create zeroed counters
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_publish(&self, delivered: u64, dropped: u64) {
        self.events_published.fetch_add(1, Ordering::Relaxed);
        self.frames_delivered.fetch_add(delivered, Ordering::Relaxed);
        self.frames_dropped.fetch_add(dropped, Ordering::Relaxed);
    }

    pub fn record_command(&self) {
        self.commands_issued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_message(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_validation_failure(&self) {
        self.validation_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the current counter values
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            events_published: self.events_published.load(Ordering::Relaxed),
            frames_delivered: self.frames_delivered.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            commands_issued: self.commands_issued.load(Ordering::Relaxed),
            messages_received: self.messages_received.load(Ordering::Relaxed),
            validation_failures: self.validation_failures.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let stats = HubStats::new();
        stats.record_publish(3, 1);
        stats.record_publish(2, 0);
        stats.record_command();

        let snap = stats.snapshot();
        assert_eq!(snap.events_published, 2);
        assert_eq!(snap.frames_delivered, 5);
        assert_eq!(snap.frames_dropped, 1);
        assert_eq!(snap.commands_issued, 1);
    }
}
