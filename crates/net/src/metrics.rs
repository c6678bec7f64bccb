use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic counters for observability, in the style of the teacher's
/// `PerformanceMetrics` (`mesio::hls::metrics`): relaxed-ordering counters
/// cheap enough to bump on every request without contending with the
/// fetch/append hot path.
#[derive(Debug, Default)]
pub struct NetworkMetrics {
    requests_total: AtomicU64,
    requests_failed: AtomicU64,
    bytes_received: AtomicU64,
    manifest_requests: AtomicU64,
    segment_requests: AtomicU64,
    license_requests: AtomicU64,
    app_requests: AtomicU64,
}

impl NetworkMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self, request_type: crate::request::RequestType, bytes: u64, failed: bool) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        self.bytes_received.fetch_add(bytes, Ordering::Relaxed);
        if failed {
            self.requests_failed.fetch_add(1, Ordering::Relaxed);
        }
        use crate::request::RequestType::*;
        let counter = match request_type {
            Manifest => &self.manifest_requests,
            Segment => &self.segment_requests,
            License => &self.license_requests,
            App => &self.app_requests,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn requests_total(&self) -> u64 {
        self.requests_total.load(Ordering::Relaxed)
    }

    pub fn requests_failed(&self) -> u64 {
        self.requests_failed.load(Ordering::Relaxed)
    }

    pub fn bytes_received(&self) -> u64 {
        self.bytes_received.load(Ordering::Relaxed)
    }
}
