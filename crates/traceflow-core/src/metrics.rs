//! Ingest metrics for the Traceflow engine
//!
//! Counters for monitoring ingestion health. All counters are atomic so the
//! collector can be shared across the ingestion path and read concurrently.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Shared handle to the metrics collector
pub type SharedMetrics = Arc<IngestMetrics>;

/// Ingest metrics collector
#[derive(Debug)]
pub struct IngestMetrics {
    /// When the collector was started
    start_time: Instant,
    /// Messages submitted for ingestion
    pub messages_received: AtomicU64,
    /// Messages dropped because no trace id could be resolved
    pub messages_dropped: AtomicU64,
    /// Traces created
    pub traces_created: AtomicU64,
    /// Traces removed by capacity eviction
    pub traces_evicted: AtomicU64,
    /// Traces removed by age-based cleanup
    pub traces_expired: AtomicU64,
}

impl Default for IngestMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl IngestMetrics {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            messages_received: AtomicU64::new(0),
            messages_dropped: AtomicU64::new(0),
            traces_created: AtomicU64::new(0),
            traces_evicted: AtomicU64::new(0),
            traces_expired: AtomicU64::new(0),
        }
    }

    /// Get uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn record_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.messages_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_created(&self) {
        self.traces_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_evicted(&self, count: u64) {
        self.traces_evicted.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_expired(&self, count: u64) {
        self.traces_expired.fetch_add(count, Ordering::Relaxed);
    }

    /// Take a point-in-time snapshot for API rendering
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            uptime_seconds: self.uptime_seconds(),
            messages_received: self.messages_received.load(Ordering::Relaxed),
            messages_dropped: self.messages_dropped.load(Ordering::Relaxed),
            traces_created: self.traces_created.load(Ordering::Relaxed),
            traces_evicted: self.traces_evicted.load(Ordering::Relaxed),
            traces_expired: self.traces_expired.load(Ordering::Relaxed),
        }
    }

    /// Export metrics in Prometheus format
    pub fn to_prometheus(&self) -> String {
        let snap = self.snapshot();
        let mut output = String::new();

        output.push_str("# HELP traceflow_uptime_seconds Time since engine started\n");
        output.push_str("# TYPE traceflow_uptime_seconds gauge\n");
        output.push_str(&format!("traceflow_uptime_seconds {}\n\n", snap.uptime_seconds));

        output.push_str("# HELP traceflow_messages_total Messages submitted for ingestion\n");
        output.push_str("# TYPE traceflow_messages_total counter\n");
        output.push_str(&format!(
            "traceflow_messages_total{{outcome=\"received\"}} {}\n",
            snap.messages_received
        ));
        output.push_str(&format!(
            "traceflow_messages_total{{outcome=\"dropped\"}} {}\n\n",
            snap.messages_dropped
        ));

        output.push_str("# HELP traceflow_traces_total Trace lifecycle transitions\n");
        output.push_str("# TYPE traceflow_traces_total counter\n");
        output.push_str(&format!(
            "traceflow_traces_total{{event=\"created\"}} {}\n",
            snap.traces_created
        ));
        output.push_str(&format!(
            "traceflow_traces_total{{event=\"evicted\"}} {}\n",
            snap.traces_evicted
        ));
        output.push_str(&format!(
            "traceflow_traces_total{{event=\"expired\"}} {}\n",
            snap.traces_expired
        ));

        output
    }
}

/// Point-in-time metrics values
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub uptime_seconds: u64,
    pub messages_received: u64,
    pub messages_dropped: u64,
    pub traces_created: u64,
    pub traces_evicted: u64,
    pub traces_expired: u64,
}
