//! Graph builder facade
//!
//! Composes the trace store, statistics, and component analysis behind one
//! handle. Ingestion is single-writer through [`GraphBuilder::add_message`];
//! every read query takes the read lock, computes from a borrowed view of the
//! store, and returns owned data. Time filtering is a pure projection; the
//! store itself is never touched by a read.

use crate::components::{self, Component, ComponentAnalyzer, GraphEdge, GraphNode};
use crate::stats::{self, TopicStats};
use crate::store::{AddOutcome, TraceInfo, TraceStore};
use crate::topic_graph::TopicGraph;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use traceflow_core::{
    GraphConfig, IngestMetrics, Message, MessageSink, SharedMetrics, TraceIdExtractor,
};

/// Time window applied to filtered graph queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeFilter {
    All,
    LastHour,
    Last30Min,
    Last15Min,
    Last5Min,
    /// Caller-supplied window in minutes (defaults to 60 when unspecified)
    Custom,
    /// Fallback for unrecognized filter names
    Last24Hours,
}

impl TimeFilter {
    /// Parse a filter name; anything unrecognized maps to the 24-hour default
    pub fn parse(value: &str) -> Self {
        match value {
            "all" => Self::All,
            "last_hour" => Self::LastHour,
            "last_30min" => Self::Last30Min,
            "last_15min" => Self::Last15Min,
            "last_5min" => Self::Last5Min,
            "custom" => Self::Custom,
            _ => Self::Last24Hours,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::LastHour => "last_hour",
            Self::Last30Min => "last_30min",
            Self::Last15Min => "last_15min",
            Self::Last5Min => "last_5min",
            Self::Custom => "custom",
            Self::Last24Hours => "last_24h",
        }
    }

    /// Cutoff instant for this filter; `None` means no filtering
    pub fn cutoff(
        &self,
        now: DateTime<Utc>,
        custom_minutes: Option<i64>,
    ) -> Option<DateTime<Utc>> {
        match self {
            Self::All => None,
            Self::LastHour => Some(now - Duration::hours(1)),
            Self::Last30Min => Some(now - Duration::minutes(30)),
            Self::Last15Min => Some(now - Duration::minutes(15)),
            Self::Last5Min => Some(now - Duration::minutes(5)),
            Self::Custom => Some(now - Duration::minutes(custom_minutes.unwrap_or(60))),
            Self::Last24Hours => Some(now - Duration::hours(24)),
        }
    }
}

/// One trace in the summary listing
#[derive(Debug, Clone, Serialize)]
pub struct TraceSummaryEntry {
    pub trace_id: String,
    pub message_count: usize,
    pub topics: Vec<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_ms: i64,
}

/// Summary of every in-flight trace
#[derive(Debug, Clone, Serialize)]
pub struct TraceSummary {
    pub total_traces: usize,
    pub monitored_topics: Vec<String>,
    pub traces: Vec<TraceSummaryEntry>,
}

/// The full topic graph with per-node/edge statistics
#[derive(Debug, Clone, Serialize)]
pub struct TopicGraphData {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

/// One topic visited by a trace
#[derive(Debug, Clone, Serialize)]
pub struct TraceHop {
    pub topic: String,
    pub message_count: usize,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

/// The path of a single trace through the topic graph
#[derive(Debug, Clone, Serialize)]
pub struct TraceFlowData {
    pub trace_id: String,
    pub message_count: usize,
    pub topic_count: usize,
    pub duration_ms: i64,
    /// Topics in order of first arrival
    pub hops: Vec<TraceHop>,
}

/// Statistics for every monitored topic
#[derive(Debug, Clone, Serialize)]
pub struct StatisticsReport {
    pub total_traces: usize,
    pub total_messages: usize,
    pub topics: Vec<TopicStats>,
}

/// Disconnected-component view of the full graph
#[derive(Debug, Clone, Serialize)]
pub struct DisconnectedGraphs {
    pub component_count: usize,
    pub components: Vec<Component>,
}

/// Time-filtered component view
#[derive(Debug, Clone, Serialize)]
pub struct FilteredGraphData {
    pub time_filter: String,
    pub cutoff: Option<DateTime<Utc>>,
    pub trace_count: usize,
    pub total_messages: usize,
    pub components: Vec<Component>,
}

/// Facade over the trace store, statistics engine, and component analyzer
pub struct GraphBuilder {
    graph: TopicGraph,
    extractor: TraceIdExtractor,
    store: RwLock<TraceStore>,
    monitored: RwLock<BTreeSet<String>>,
    metrics: SharedMetrics,
}

impl GraphBuilder {
    /// Build from validated configuration
    pub fn new(config: &GraphConfig) -> Self {
        let graph = TopicGraph::from_config(config);

        let monitored = if config.activate_all_on_startup {
            graph.all_topics().clone()
        } else {
            let (known, unknown): (Vec<_>, Vec<_>) = config
                .default_monitored_topics
                .iter()
                .cloned()
                .partition(|t| graph.contains(t));
            if !unknown.is_empty() {
                warn!(topics = ?unknown, "ignoring default monitored topics absent from graph");
            }
            known.into_iter().collect()
        };

        info!(
            topics = graph.all_topics().len(),
            edges = graph.edges().len(),
            monitored = monitored.len(),
            "graph builder initialized"
        );

        Self {
            graph,
            extractor: TraceIdExtractor::new(&config.trace_id_field, config.segment_extraction),
            store: RwLock::new(TraceStore::new(config.max_traces)),
            monitored: RwLock::new(monitored),
            metrics: Arc::new(IngestMetrics::new()),
        }
    }

    /// The static topic graph
    pub fn topic_graph(&self) -> &TopicGraph {
        &self.graph
    }

    /// Shared ingest metrics handle
    pub fn metrics(&self) -> SharedMetrics {
        self.metrics.clone()
    }

    /// Ingest one message
    ///
    /// Resolves the canonical trace id, then appends to the store. Messages
    /// with no resolvable id are dropped and counted, never an error.
    pub async fn add_message(&self, mut message: Message) {
        self.metrics.record_received();

        match self.extractor.resolve(&message) {
            Some(trace_id) => message.trace_id = Some(trace_id),
            None => {
                self.metrics.record_dropped();
                debug!(topic = %message.topic, "no resolvable trace id; message dropped");
                return;
            }
        }

        let outcome = self.store.write().await.add_message(message);
        match outcome {
            AddOutcome::Created { evicted } => {
                self.metrics.record_created();
                if evicted > 0 {
                    self.metrics.record_evicted(evicted as u64);
                }
            }
            AddOutcome::Appended { evicted } => {
                if evicted > 0 {
                    self.metrics.record_evicted(evicted as u64);
                }
            }
            AddOutcome::Dropped => self.metrics.record_dropped(),
        }
    }

    /// Look up one trace; `None` for an unknown id
    pub async fn get_trace(&self, trace_id: &str) -> Option<TraceInfo> {
        self.store.read().await.get(trace_id).cloned()
    }

    /// All trace ids, least recently updated first
    pub async fn get_all_trace_ids(&self) -> Vec<String> {
        self.store.read().await.trace_ids()
    }

    /// Summarize every in-flight trace
    pub async fn get_trace_summary(&self) -> TraceSummary {
        let store = self.store.read().await;
        let monitored = self.monitored.read().await;

        let mut traces: Vec<TraceSummaryEntry> = store
            .traces()
            .values()
            .map(|t| TraceSummaryEntry {
                trace_id: t.trace_id.clone(),
                message_count: t.message_count(),
                topics: t.topics.iter().cloned().collect(),
                start_time: t.start_time,
                end_time: t.end_time,
                duration_ms: t.duration().num_milliseconds(),
            })
            .collect();
        traces.sort_by(|a, b| {
            a.start_time
                .cmp(&b.start_time)
                .then_with(|| a.trace_id.cmp(&b.trace_id))
        });

        TraceSummary {
            total_traces: store.len(),
            monitored_topics: monitored.iter().cloned().collect(),
            traces,
        }
    }

    /// The full topic graph with statistics on every node and edge
    pub async fn get_topic_graph_data(&self) -> TopicGraphData {
        let store = self.store.read().await;
        let traces: Vec<&TraceInfo> = store.traces().values().collect();
        let now = Utc::now();

        let nodes = self
            .graph
            .all_topics()
            .iter()
            .map(|topic| components::build_node(&traces, topic, now))
            .collect();
        let edges = self
            .graph
            .edges()
            .iter()
            .map(|(source, destination)| components::build_edge(&traces, source, destination))
            .collect();

        TopicGraphData { nodes, edges }
    }

    /// The path of one trace through the graph; `None` for an unknown id
    pub async fn get_trace_flow_data(&self, trace_id: &str) -> Option<TraceFlowData> {
        let store = self.store.read().await;
        let trace = store.get(trace_id)?;

        let mut hops: Vec<TraceHop> = Vec::new();
        for topic in &trace.topics {
            let first = trace.first_message_in(topic)?;
            let last = trace.last_message_in(topic)?;
            hops.push(TraceHop {
                topic: topic.clone(),
                message_count: trace.messages.iter().filter(|m| &m.topic == topic).count(),
                first_seen: first.timestamp,
                last_seen: last.timestamp,
            });
        }
        hops.sort_by(|a, b| a.first_seen.cmp(&b.first_seen).then_with(|| a.topic.cmp(&b.topic)));

        Some(TraceFlowData {
            trace_id: trace.trace_id.clone(),
            message_count: trace.message_count(),
            topic_count: trace.topics.len(),
            duration_ms: trace.duration().num_milliseconds(),
            hops,
        })
    }

    /// Statistics for every monitored topic
    pub async fn get_statistics(&self) -> StatisticsReport {
        let store = self.store.read().await;
        let monitored = self.monitored.read().await;
        let traces: Vec<&TraceInfo> = store.traces().values().collect();
        let now = Utc::now();

        let topics: Vec<TopicStats> = monitored
            .iter()
            .map(|topic| stats::topic_stats(&traces, topic, now))
            .collect();

        StatisticsReport {
            total_traces: store.len(),
            total_messages: traces.iter().map(|t| t.message_count()).sum(),
            topics,
        }
    }

    /// Disconnected components of the full graph over the full store
    pub async fn get_disconnected_graphs(&self) -> DisconnectedGraphs {
        let store = self.store.read().await;
        let traces: Vec<&TraceInfo> = store.traces().values().collect();
        let components =
            ComponentAnalyzer::new(&self.graph).analyze(&traces, self.graph.all_topics(), Utc::now());

        DisconnectedGraphs {
            component_count: components.len(),
            components,
        }
    }

    /// Disconnected components over a time-filtered projection of the store
    ///
    /// Filtering keeps traces whose `start_time` is at or after the cutoff;
    /// the unfiltered store is never mutated. Unfiltered queries use the full
    /// topic universe; filtered ones restrict it to the topics the surviving
    /// traces touch.
    pub async fn get_filtered_graph_data(
        &self,
        filter: TimeFilter,
        custom_minutes: Option<i64>,
    ) -> FilteredGraphData {
        let now = Utc::now();
        let cutoff = filter.cutoff(now, custom_minutes);

        let store = self.store.read().await;
        let traces: Vec<&TraceInfo> = store
            .traces()
            .values()
            .filter(|t| cutoff.map_or(true, |c| t.start_time >= c))
            .collect();

        let universe: BTreeSet<String> = match cutoff {
            None => self.graph.all_topics().clone(),
            Some(_) => traces
                .iter()
                .flat_map(|t| t.topics.iter())
                .filter(|topic| self.graph.contains(topic.as_str()))
                .cloned()
                .collect(),
        };

        let components = ComponentAnalyzer::new(&self.graph).analyze(&traces, &universe, now);

        FilteredGraphData {
            time_filter: filter.as_str().to_string(),
            cutoff,
            trace_count: traces.len(),
            total_messages: traces.iter().map(|t| t.message_count()).sum(),
            components,
        }
    }

    /// Replace the monitored-topic set
    ///
    /// Names absent from the graph are dropped and returned; the remainder is
    /// applied. Never a hard error.
    pub async fn set_monitored_topics(&self, topics: Vec<String>) -> Vec<String> {
        let (known, rejected): (Vec<_>, Vec<_>) =
            topics.into_iter().partition(|t| self.graph.contains(t));

        if !rejected.is_empty() {
            warn!(topics = ?rejected, "ignoring monitored topics absent from graph");
        }

        *self.monitored.write().await = known.into_iter().collect();
        rejected
    }

    /// The currently monitored topics, sorted
    pub async fn get_monitored_topics(&self) -> Vec<String> {
        self.monitored.read().await.iter().cloned().collect()
    }

    /// Remove traces idle for longer than `max_age_hours`; returns the count
    pub async fn cleanup_old_traces(&self, max_age_hours: i64) -> usize {
        let removed = self.store.write().await.cleanup_old_traces(max_age_hours);
        if removed > 0 {
            self.metrics.record_expired(removed as u64);
            info!(removed, max_age_hours, "cleaned up idle traces");
        }
        removed
    }
}

#[async_trait]
impl MessageSink for GraphBuilder {
    async fn submit(&self, message: Message) {
        self.add_message(message).await;
    }
}
