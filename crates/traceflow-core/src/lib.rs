//! Traceflow Core - Message types, configuration, and ingest metrics
//!
//! This crate provides the foundational types for the Traceflow engine:
//!
//! - **Message**: a keyed event consumed from a topic, plus trace-id resolution
//! - **Config**: topic-graph topology and correlation settings (TOML)
//! - **Metrics**: ingest counters for monitoring engine health
//! - **Sink**: the ingestion trait implemented by the graph builder

pub mod config;
pub mod message;
pub mod metrics;
pub mod sink;

// Re-export commonly used types
pub use config::{ConfigError, ConfigResult, GraphConfig, TopicEdge};
pub use message::{Message, TraceIdExtractor};
pub use metrics::{IngestMetrics, MetricsSnapshot, SharedMetrics};
pub use sink::MessageSink;

/// Engine version
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
