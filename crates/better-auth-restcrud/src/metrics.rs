// In-process adapter metrics.
//
// Counters are atomics, not bare fields; the adapter may be shared across
// tasks and threads. State is transient: it resets on process restart or an
// explicit `reset()`.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::ErrorKind;

/// Request/error tallies and a running latency sum.
#[derive(Debug, Default)]
pub struct AdapterMetrics {
    requests: AtomicU64,
    errors: AtomicU64,
    latency_total_ms: AtomicU64,
    error_kinds: [AtomicU64; 10],
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsSnapshot {
    pub requests: u64,
    pub errors: u64,
    /// Average latency of successful requests, in milliseconds.
    pub avg_latency_ms: f64,
    /// Non-zero error counts by kind.
    pub errors_by_kind: Vec<(ErrorKind, u64)>,
}

impl AdapterMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one successful request and its latency.
    pub fn record_request(&self, latency_ms: u64) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.latency_total_ms.fetch_add(latency_ms, Ordering::Relaxed);
    }

    /// Record one failed operation.
    pub fn record_error(&self, kind: ErrorKind) {
        self.errors.fetch_add(1, Ordering::Relaxed);
        self.error_kinds[kind.slot()].fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let requests = self.requests.load(Ordering::Relaxed);
        let total_ms = self.latency_total_ms.load(Ordering::Relaxed);
        let avg_latency_ms = if requests == 0 {
            0.0
        } else {
            total_ms as f64 / requests as f64
        };

        let errors_by_kind = ErrorKind::ALL
            .iter()
            .filter_map(|kind| {
                let count = self.error_kinds[kind.slot()].load(Ordering::Relaxed);
                (count > 0).then_some((*kind, count))
            })
            .collect();

        MetricsSnapshot {
            requests,
            errors: self.errors.load(Ordering::Relaxed),
            avg_latency_ms,
            errors_by_kind,
        }
    }

    /// Zero every counter.
    pub fn reset(&self) {
        self.requests.store(0, Ordering::Relaxed);
        self.errors.store(0, Ordering::Relaxed);
        self.latency_total_ms.store(0, Ordering::Relaxed);
        for slot in &self.error_kinds {
            slot.store(0, Ordering::Relaxed);
        }
    }
}
