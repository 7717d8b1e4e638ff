//! Gateway counters
//!
//! - Counters only, monotonic
//! - Reset only on process start
//! - Relaxed atomics; exact values are not needed across threads

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Operational counters for health checking and routing
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    probes_sent: AtomicU64,
    probe_failures: AtomicU64,
    probe_timeouts: AtomicU64,
    statements_routed: AtomicU64,
    statements_rejected: AtomicU64,
    transactions_begun: AtomicU64,
    transactions_committed: AtomicU64,
    transactions_rolled_back: AtomicU64,
}

impl MetricsRegistry {
    /// Create a new metrics registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    // Health checking

    pub fn increment_probes_sent(&self) {
        self.probes_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_probe_failures(&self) {
        self.probe_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_probe_timeouts(&self) {
        self.probe_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    // Routing

    pub fn increment_statements_routed(&self) {
        self.statements_routed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_statements_rejected(&self) {
        self.statements_rejected.fetch_add(1, Ordering::Relaxed);
    }

    // Transactions

    pub fn increment_transactions_begun(&self) {
        self.transactions_begun.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_transactions_committed(&self) {
        self.transactions_committed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_transactions_rolled_back(&self) {
        self.transactions_rolled_back.fetch_add(1, Ordering::Relaxed);
    }

    /// Get all counters as a snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            probes_sent: self.probes_sent.load(Ordering::Relaxed),
            probe_failures: self.probe_failures.load(Ordering::Relaxed),
            probe_timeouts: self.probe_timeouts.load(Ordering::Relaxed),
            statements_routed: self.statements_routed.load(Ordering::Relaxed),
            statements_rejected: self.statements_rejected.load(Ordering::Relaxed),
            transactions_begun: self.transactions_begun.load(Ordering::Relaxed),
            transactions_committed: self.transactions_committed.load(Ordering::Relaxed),
            transactions_rolled_back: self.transactions_rolled_back.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of all counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct MetricsSnapshot {
    pub probes_sent: u64,
    pub probe_failures: u64,
    pub probe_timeouts: u64,
    pub statements_routed: u64,
    pub statements_rejected: u64,
    pub transactions_begun: u64,
    pub transactions_committed: u64,
    pub transactions_rolled_back: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_registry_has_zero_values() {
        let snapshot = MetricsRegistry::new().snapshot();
        assert_eq!(snapshot.probes_sent, 0);
        assert_eq!(snapshot.statements_routed, 0);
        assert_eq!(snapshot.transactions_begun, 0);
    }

    #[test]
    fn test_increment_counters() {
        let registry = MetricsRegistry::new();
        registry.increment_probes_sent();
        registry.increment_probes_sent();
        registry.increment_probe_failures();
        registry.increment_probe_timeouts();
        registry.increment_statements_routed();
        registry.increment_statements_rejected();
        registry.increment_transactions_begun();
        registry.increment_transactions_committed();
        registry.increment_transactions_rolled_back();

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.probes_sent, 2);
        assert_eq!(snapshot.probe_failures, 1);
        assert_eq!(snapshot.probe_timeouts, 1);
        assert_eq!(snapshot.statements_routed, 1);
        assert_eq!(snapshot.statements_rejected, 1);
        assert_eq!(snapshot.transactions_begun, 1);
        assert_eq!(snapshot.transactions_committed, 1);
        assert_eq!(snapshot.transactions_rolled_back, 1);
    }

    #[test]
    fn test_snapshot_serializes_pascal_case() {
        let registry = MetricsRegistry::new();
        registry.increment_probes_sent();
        let json = serde_json::to_value(registry.snapshot()).unwrap();
        assert_eq!(json["ProbesSent"], 1);
    }

    #[test]
    fn test_thread_safety() {
        use std::sync::Arc;
        use std::thread;

        let registry = Arc::new(MetricsRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let reg = Arc::clone(&registry);
                thread::spawn(move || {
                    for _ in 0..100 {
                        reg.increment_probes_sent();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(registry.snapshot().probes_sent, 800);
    }
}
