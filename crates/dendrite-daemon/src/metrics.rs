//! Daemon counters exposed through the `metrics` RPC method.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use serde_json::Value;
use serde_json::json;

pub struct DaemonMetrics {
    started: Instant,
    requests: AtomicU64,
    errors: AtomicU64,
    launches: AtomicU64,
    payloads_delivered: AtomicU64,
    payloads_dropped: AtomicU64,
}

impl DaemonMetrics {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            requests: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            launches: AtomicU64::new(0),
            payloads_delivered: AtomicU64::new(0),
            payloads_dropped: AtomicU64::new(0),
        }
    }

    pub fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_launch(&self) {
        self.launches.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the outcome of one publish: either it reached subscribers
    /// or it was dropped on an empty channel.
    pub fn record_publish(&self, delivered: usize) {
        if delivered == 0 {
            self.payloads_dropped.fetch_add(1, Ordering::Relaxed);
        } else {
            self.payloads_delivered
                .fetch_add(delivered as u64, Ordering::Relaxed);
        }
    }

    pub fn requests(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    pub fn uptime_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    pub fn snapshot(&self) -> Value {
        json!({
            "requests_total": self.requests.load(Ordering::Relaxed),
            "errors_total": self.errors.load(Ordering::Relaxed),
            "launches_total": self.launches.load(Ordering::Relaxed),
            "payloads_delivered_total": self.payloads_delivered.load(Ordering::Relaxed),
            "payloads_dropped_total": self.payloads_dropped.load(Ordering::Relaxed),
            "uptime_ms": self.uptime_ms(),
        })
    }
}

impl Default for DaemonMetrics {
    fn default() -> Self {
        Self::new()
    }
}
