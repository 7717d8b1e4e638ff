//! Topology reload counters
//!
//! `reload` counts processed topology changes. `watch_error` and `parsing`
//! stay at zero on a healthy gateway; any non-zero value is a defect.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

#[derive(Debug, Default)]
pub struct ReloadCounters {
    reload: AtomicU64,
    watch_error: AtomicU64,
    parsing: AtomicU64,
}

impl ReloadCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_reload(&self) {
        self.reload.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_watch_error(&self) {
        self.watch_error.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_parsing(&self) {
        self.parsing.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ReloadCountersSnapshot {
        ReloadCountersSnapshot {
            reload: self.reload.load(Ordering::Relaxed),
            watch_error: self.watch_error.load(Ordering::Relaxed),
            parsing: self.parsing.load(Ordering::Relaxed),
        }
    }
}

/// Counter values as exported under `VtgateVSchemaCounts`.
///
/// Zero-valued error counters are left out of the output entirely.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReloadCountersSnapshot {
    #[serde(skip_serializing_if = "is_zero")]
    pub reload: u64,
    #[serde(skip_serializing_if = "is_zero")]
    pub watch_error: u64,
    #[serde(skip_serializing_if = "is_zero")]
    pub parsing: u64,
}

fn is_zero(value: &u64) -> bool {
    *value == 0
}
