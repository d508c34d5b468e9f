//! Counters for identification request outcomes

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics handle for recording request outcomes
#[derive(Debug, Default)]
pub struct Metrics {
    requests_submitted: AtomicU64,
    requests_succeeded: AtomicU64,
    requests_failed: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_submitted(&self) {
        self.requests_submitted.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "requests_submitted", "Metric incremented");
    }

    pub fn request_succeeded(&self) {
        self.requests_succeeded.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "requests_succeeded", "Metric incremented");
    }

    pub fn request_failed(&self) {
        self.requests_failed.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "requests_failed", "Metric incremented");
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests_submitted: self.requests_submitted.load(Ordering::Relaxed),
            requests_succeeded: self.requests_succeeded.load(Ordering::Relaxed),
            requests_failed: self.requests_failed.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub requests_submitted: u64,
    pub requests_succeeded: u64,
    pub requests_failed: u64,
}
