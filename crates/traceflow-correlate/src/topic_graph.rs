//! Static directed topic graph
//!
//! Loaded once from configuration at startup. Answers adjacency and
//! membership queries; never mutated afterwards.

use std::collections::{BTreeSet, HashMap};
use traceflow_core::GraphConfig;

/// Directed graph of topic-to-topic edges
#[derive(Debug, Clone)]
pub struct TopicGraph {
    edges: Vec<(String, String)>,
    topics: BTreeSet<String>,
    destinations: HashMap<String, Vec<String>>,
}

impl TopicGraph {
    /// Build the graph from validated configuration
    pub fn from_config(config: &GraphConfig) -> Self {
        let edges: Vec<(String, String)> = config
            .topic_edges
            .iter()
            .map(|e| (e.source.clone(), e.destination.clone()))
            .collect();
        Self::new(edges)
    }

    pub fn new(edges: Vec<(String, String)>) -> Self {
        let mut topics = BTreeSet::new();
        let mut destinations: HashMap<String, Vec<String>> = HashMap::new();

        for (source, destination) in &edges {
            topics.insert(source.clone());
            topics.insert(destination.clone());
            let dests = destinations.entry(source.clone()).or_default();
            if !dests.contains(destination) {
                dests.push(destination.clone());
            }
        }

        Self {
            edges,
            topics,
            destinations,
        }
    }

    /// All directed edges, in configuration order
    pub fn edges(&self) -> &[(String, String)] {
        &self.edges
    }

    /// Every topic appearing in any edge
    pub fn all_topics(&self) -> &BTreeSet<String> {
        &self.topics
    }

    /// Direct destinations of a topic
    pub fn destinations(&self, topic: &str) -> &[String] {
        self.destinations.get(topic).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether the topic appears in the graph
    pub fn contains(&self, topic: &str) -> bool {
        self.topics.contains(topic)
    }
}
