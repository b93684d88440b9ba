//! Disconnected-component decomposition of the topic graph
//!
//! Treats directed edges as undirected and splits the graph into maximal
//! connected sets, restricted to a topic universe (all topics, or the topics
//! touched by a time-filtered trace set). Each component carries per-node and
//! per-edge statistics plus an aggregate health summary.

use crate::stats::{self, percentile, EdgeStats, TopicStats};
use crate::store::TraceInfo;
use crate::topic_graph::TopicGraph;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

/// Age thresholds for the node color classification
const FRESH_AGE_SECONDS: f64 = 30.0;
const AGING_AGE_SECONDS: f64 = 300.0;

/// Node freshness classification by median trace age
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeColor {
    Fresh,
    Aging,
    Stale,
}

/// One topic within a component
#[derive(Debug, Clone, Serialize)]
pub struct GraphNode {
    pub topic: String,
    pub color: NodeColor,
    /// Rendering size hint scaled by message count
    pub size: f64,
    pub stats: TopicStats,
}

/// One edge within a component
#[derive(Debug, Clone, Serialize)]
pub struct GraphEdge {
    pub source: String,
    pub destination: String,
    pub flow_count: usize,
    pub message_rate: f64,
    /// Rendering width derived from flow count
    pub width: f64,
}

/// Aggregate health of a component
#[derive(Debug, Clone, Serialize)]
pub struct ComponentSummary {
    pub total_messages: usize,
    pub active_traces: usize,
    /// 0.7 * age score + 0.3 * activity score
    pub health_score: f64,
}

/// A maximal undirected-connectivity set of topics
#[derive(Debug, Clone, Serialize)]
pub struct Component {
    /// Topics in this component, sorted
    pub topics: Vec<String>,
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub summary: ComponentSummary,
}

/// Computes components over the static topic graph
pub struct ComponentAnalyzer<'a> {
    graph: &'a TopicGraph,
}

impl<'a> ComponentAnalyzer<'a> {
    pub fn new(graph: &'a TopicGraph) -> Self {
        Self { graph }
    }

    /// Decompose the graph restricted to `universe` and attach statistics
    ///
    /// Components are ordered by topic count descending; equally sized
    /// components are ordered by their smallest topic name, so output is
    /// stable across runs.
    pub fn analyze(
        &self,
        traces: &[&TraceInfo],
        universe: &BTreeSet<String>,
        now: DateTime<Utc>,
    ) -> Vec<Component> {
        let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
        for topic in universe {
            if self.graph.contains(topic) {
                adjacency.entry(topic.as_str()).or_default();
            }
        }
        for (source, destination) in self.graph.edges() {
            if !universe.contains(source) || !universe.contains(destination) {
                continue;
            }
            adjacency.entry(source.as_str()).or_default().push(destination.as_str());
            adjacency.entry(destination.as_str()).or_default().push(source.as_str());
        }

        let mut visited: BTreeSet<&str> = BTreeSet::new();
        let mut components = Vec::new();

        // Iterate the universe in sorted order so DFS starting points are
        // deterministic
        for topic in universe {
            let topic = topic.as_str();
            if !adjacency.contains_key(topic) || visited.contains(topic) {
                continue;
            }

            let mut members: Vec<String> = Vec::new();
            let mut stack = vec![topic];
            while let Some(current) = stack.pop() {
                if !visited.insert(current) {
                    continue;
                }
                members.push(current.to_string());
                if let Some(neighbors) = adjacency.get(current) {
                    for &neighbor in neighbors {
                        if !visited.contains(neighbor) {
                            stack.push(neighbor);
                        }
                    }
                }
            }

            members.sort();
            components.push(self.build_component(members, traces, now));
        }

        components.sort_by(|a, b| {
            b.topics
                .len()
                .cmp(&a.topics.len())
                .then_with(|| a.topics.first().cmp(&b.topics.first()))
        });
        components
    }

    fn build_component(
        &self,
        topics: Vec<String>,
        traces: &[&TraceInfo],
        now: DateTime<Utc>,
    ) -> Component {
        let member_set: BTreeSet<&str> = topics.iter().map(String::as_str).collect();

        let nodes: Vec<GraphNode> = topics
            .iter()
            .map(|topic| build_node(traces, topic, now))
            .collect();

        let edges: Vec<GraphEdge> = self
            .graph
            .edges()
            .iter()
            .filter(|(s, d)| member_set.contains(s.as_str()) && member_set.contains(d.as_str()))
            .map(|(source, destination)| build_edge(traces, source, destination))
            .collect();

        let summary = summarize(&topics, &nodes, traces);

        Component {
            topics,
            nodes,
            edges,
            summary,
        }
    }
}

/// Build a statistics-bearing node for one topic
pub(crate) fn build_node(traces: &[&TraceInfo], topic: &str, now: DateTime<Utc>) -> GraphNode {
    let stats = stats::topic_stats(traces, topic, now);
    GraphNode {
        topic: topic.to_string(),
        color: classify_age(stats.age_p50_ms / 1000.0),
        size: node_size(stats.message_count),
        stats,
    }
}

/// Build a statistics-bearing edge
pub(crate) fn build_edge(traces: &[&TraceInfo], source: &str, destination: &str) -> GraphEdge {
    let EdgeStats {
        source,
        destination,
        flow_count,
        message_rate,
    } = stats::edge_stats(traces, source, destination);
    GraphEdge {
        source,
        destination,
        flow_count,
        message_rate,
        width: edge_width(flow_count),
    }
}

fn classify_age(median_age_seconds: f64) -> NodeColor {
    if median_age_seconds < FRESH_AGE_SECONDS {
        NodeColor::Fresh
    } else if median_age_seconds < AGING_AGE_SECONDS {
        NodeColor::Aging
    } else {
        NodeColor::Stale
    }
}

fn node_size(message_count: usize) -> f64 {
    (20.0 + (message_count as f64).sqrt() * 4.0).min(80.0)
}

fn edge_width(flow_count: usize) -> f64 {
    (1.0 + flow_count as f64 * 0.5).min(8.0)
}

fn summarize(topics: &[String], nodes: &[GraphNode], traces: &[&TraceInfo]) -> ComponentSummary {
    let total_messages: usize = nodes.iter().map(|n| n.stats.message_count).sum();
    let active_traces = traces
        .iter()
        .filter(|t| t.topics.iter().any(|topic| topics.contains(topic)))
        .count();

    // Median age pooled across every topic in the component
    let mut ages: Vec<f64> = Vec::new();
    for trace in traces {
        for message in &trace.messages {
            if topics.contains(&message.topic) {
                ages.push((message.timestamp - trace.start_time).num_milliseconds() as f64);
            }
        }
    }
    ages.sort_by(|a, b| a.total_cmp(b));
    let median_age_seconds = percentile(&ages, 50.0) / 1000.0;

    let age_score = (100.0 - median_age_seconds / 60.0).max(0.0);
    let activity_score = (total_messages as f64 / 10.0).min(100.0);
    let health_score = 0.7 * age_score + 0.3 * activity_score;

    ComponentSummary {
        total_messages,
        active_traces,
        health_score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::TraceStore;
    use chrono::Duration;
    use traceflow_core::Message;

    fn graph() -> TopicGraph {
        TopicGraph::new(vec![
            ("a".into(), "b".into()),
            ("c".into(), "d".into()),
        ])
    }

    fn universe(graph: &TopicGraph) -> BTreeSet<String> {
        graph.all_topics().clone()
    }

    #[test]
    fn test_two_disconnected_components() {
        let g = graph();
        let analyzer = ComponentAnalyzer::new(&g);
        let components = analyzer.analyze(&[], &universe(&g), Utc::now());

        assert_eq!(components.len(), 2);
        assert_eq!(components[0].topics, vec!["a", "b"]);
        assert_eq!(components[1].topics, vec!["c", "d"]);
    }

    #[test]
    fn test_equal_size_tiebreak_is_lexicographic() {
        let g = TopicGraph::new(vec![
            ("x".into(), "y".into()),
            ("a".into(), "b".into()),
            ("m".into(), "n".into()),
        ]);
        let analyzer = ComponentAnalyzer::new(&g);
        let components = analyzer.analyze(&[], &universe(&g), Utc::now());

        let firsts: Vec<&str> = components
            .iter()
            .map(|c| c.topics.first().unwrap().as_str())
            .collect();
        assert_eq!(firsts, vec!["a", "m", "x"]);
    }

    #[test]
    fn test_largest_component_first() {
        let g = TopicGraph::new(vec![
            ("a".into(), "b".into()),
            ("b".into(), "c".into()),
            ("x".into(), "y".into()),
        ]);
        let analyzer = ComponentAnalyzer::new(&g);
        let components = analyzer.analyze(&[], &universe(&g), Utc::now());

        assert_eq!(components[0].topics, vec!["a", "b", "c"]);
        assert_eq!(components[1].topics, vec!["x", "y"]);
    }

    #[test]
    fn test_universe_restriction_splits_components() {
        // a-b-c is one chain; removing b from the universe leaves a and c
        // isolated
        let g = TopicGraph::new(vec![
            ("a".into(), "b".into()),
            ("b".into(), "c".into()),
        ]);
        let analyzer = ComponentAnalyzer::new(&g);
        let restricted: BTreeSet<String> = ["a".to_string(), "c".to_string()].into();
        let components = analyzer.analyze(&[], &restricted, Utc::now());

        assert_eq!(components.len(), 2);
        assert_eq!(components[0].topics, vec!["a"]);
        assert_eq!(components[1].topics, vec!["c"]);
        assert!(components.iter().all(|c| c.edges.is_empty()));
    }

    #[test]
    fn test_nodes_and_edges_carry_stats() {
        let now = Utc::now();
        let base = now - Duration::seconds(10);
        let mut store = TraceStore::new(100);
        store.add_message(Message::new("a", base).with_trace_id("t1"));
        store.add_message(Message::new("b", base + Duration::seconds(2)).with_trace_id("t1"));

        let g = graph();
        let analyzer = ComponentAnalyzer::new(&g);
        let traces: Vec<&TraceInfo> = store.traces().values().collect();
        let components = analyzer.analyze(&traces, &universe(&g), now);

        let ab = &components[0];
        let node_a = ab.nodes.iter().find(|n| n.topic == "a").unwrap();
        assert_eq!(node_a.stats.message_count, 1);
        assert_eq!(node_a.color, NodeColor::Fresh);
        assert!(node_a.size > 20.0);

        assert_eq!(ab.edges.len(), 1);
        assert_eq!(ab.edges[0].flow_count, 1);
        assert!(ab.edges[0].width > 1.0);

        assert_eq!(ab.summary.total_messages, 2);
        assert_eq!(ab.summary.active_traces, 1);
        assert!(ab.summary.health_score > 0.0);

        // The c-d component saw no traffic
        let cd = &components[1];
        assert_eq!(cd.summary.total_messages, 0);
        assert_eq!(cd.summary.active_traces, 0);
    }

    #[test]
    fn test_stale_classification() {
        let now = Utc::now();
        let base = now - Duration::seconds(2000);
        let mut store = TraceStore::new(100);
        store.add_message(Message::new("a", base).with_trace_id("t1"));
        store.add_message(Message::new("a", base + Duration::seconds(900)).with_trace_id("t1"));

        let g = graph();
        let analyzer = ComponentAnalyzer::new(&g);
        let traces: Vec<&TraceInfo> = store.traces().values().collect();
        let components = analyzer.analyze(&traces, &universe(&g), now);
        let node_a = components[0]
            .nodes
            .iter()
            .find(|n| n.topic == "a")
            .unwrap();

        // Median age of samples {0 ms, 900 000 ms} is 450 s -> stale
        assert_eq!(node_a.color, NodeColor::Stale);
    }
}
