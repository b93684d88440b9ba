//! Trace correlation and topic-flow analytics
//!
//! This crate owns the bounded set of in-flight traces and every statistic
//! derived from it:
//!
//! - [`TraceStore`]: trace timelines with FIFO eviction under a grace period
//! - [`stats`]: per-topic rates, age percentiles, and slowest-trace rankings
//! - [`ComponentAnalyzer`]: disconnected-component decomposition of the
//!   topic graph with per-node/edge statistics
//! - [`GraphBuilder`]: the facade composing ingestion and all read queries
//!
//! Ingestion is single-writer; reads are concurrent and return owned copies.
//! Time-filtered views are pure projections over the store, never mutations.

pub mod builder;
pub mod components;
pub mod stats;
pub mod store;
pub mod topic_graph;

pub use builder::{
    DisconnectedGraphs, FilteredGraphData, GraphBuilder, StatisticsReport, TimeFilter,
    TopicGraphData, TraceFlowData, TraceHop, TraceSummary, TraceSummaryEntry,
};
pub use components::{Component, ComponentAnalyzer, ComponentSummary, GraphEdge, GraphNode, NodeColor};
pub use stats::{EdgeStats, SlowTrace, TopicStats};
pub use store::{AddOutcome, TraceInfo, TraceStore};
pub use topic_graph::TopicGraph;
