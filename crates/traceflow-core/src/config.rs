//! Configuration for the Traceflow engine
//!
//! Provides:
//! - Topic-graph topology (directed topic edges)
//! - Monitored-topic startup policy
//! - Trace-id resolution settings
//! - Trace-store capacity
//!
//! Configuration is TOML parsed with serde. A malformed or missing file is
//! fatal at construction: the engine must not start in a partially-loaded
//! state.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    #[error("Config file not found: {0}")]
    NotFound(PathBuf),
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// A directed edge in the topic graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicEdge {
    /// Source topic
    pub source: String,

    /// Destination topic
    pub destination: String,
}

/// Complete engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Directed topic-to-topic edges
    pub topic_edges: Vec<TopicEdge>,

    /// Topics monitored at startup when `activate_all_on_startup` is false
    pub default_monitored_topics: Vec<String>,

    /// Monitor every topic present in the graph at startup
    pub activate_all_on_startup: bool,

    /// Field name used to resolve trace ids from headers or payload
    pub trace_id_field: String,

    /// Split raw trace ids on `-` and take the second of three or more
    /// segments (the `prefix-<id>-suffix` wire format)
    pub segment_extraction: bool,

    /// Maximum in-flight traces before eviction kicks in
    pub max_traces: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            topic_edges: Vec::new(),
            default_monitored_topics: Vec::new(),
            activate_all_on_startup: true,
            trace_id_field: "trace_id".to_string(),
            segment_extraction: true,
            max_traces: 1000,
        }
    }
}

impl GraphConfig {
    /// Load configuration from a TOML file
    ///
    /// Fatal on a missing or malformed file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        info!("Loading topic graph from: {}", path.display());
        let content = std::fs::read_to_string(path)?;
        let config: GraphConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> ConfigResult<()> {
        for edge in &self.topic_edges {
            if edge.source.is_empty() || edge.destination.is_empty() {
                return Err(ConfigError::ValidationError(
                    "topic edge with empty endpoint".to_string(),
                ));
            }
        }

        if self.max_traces == 0 {
            return Err(ConfigError::ValidationError(
                "max_traces must be greater than zero".to_string(),
            ));
        }

        if self.trace_id_field.is_empty() {
            return Err(ConfigError::ValidationError(
                "trace_id_field must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}
