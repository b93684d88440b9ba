//! Message types and trace-id resolution
//!
//! A [`Message`] is one consumed event: it belongs to a topic, carries the
//! broker coordinates (partition/offset), the decoded payload produced by the
//! upstream decoder, and optionally a trace identifier correlating it with
//! other messages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single consumed event
///
/// A message is associated with at most one trace. If `trace_id` is unset,
/// [`TraceIdExtractor::resolve`] attempts to recover one from the headers or
/// the decoded payload before ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Topic this message was consumed from
    pub topic: String,

    /// Partition within the topic
    pub partition: i32,

    /// Offset within the partition
    pub offset: i64,

    /// Message key, if any
    pub key: Option<String>,

    /// Broker timestamp
    pub timestamp: DateTime<Utc>,

    /// Message headers
    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// Decoded payload fields (flat map, produced by the external decoder)
    #[serde(default)]
    pub decoded: HashMap<String, serde_json::Value>,

    /// Correlation id, if already resolved upstream
    pub trace_id: Option<String>,
}

impl Message {
    /// Create a message with the given topic and timestamp
    pub fn new(topic: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            topic: topic.into(),
            partition: 0,
            offset: 0,
            key: None,
            timestamp,
            headers: HashMap::new(),
            decoded: HashMap::new(),
            trace_id: None,
        }
    }

    /// Set the trace id
    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }

    /// Set the message key
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Add a header
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Add a decoded payload field
    pub fn with_decoded(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.decoded.insert(key.into(), value.into());
        self
    }

    /// Set the partition and offset
    pub fn at(mut self, partition: i32, offset: i64) -> Self {
        self.partition = partition;
        self.offset = offset;
        self
    }
}

/// Resolves the canonical trace id for a message
///
/// The configured field name is looked up in the headers first, then in the
/// decoded payload. When segment extraction is enabled and the raw value
/// splits on `-` into three or more segments, the second segment is used as
/// the canonical id (the common `prefix-<id>-suffix` wire format); otherwise
/// the raw value is used verbatim.
#[derive(Debug, Clone)]
pub struct TraceIdExtractor {
    field: String,
    segment_extraction: bool,
}

impl TraceIdExtractor {
    pub fn new(field: impl Into<String>, segment_extraction: bool) -> Self {
        Self {
            field: field.into(),
            segment_extraction,
        }
    }

    /// Resolve the trace id for a message
    ///
    /// A trace id already present on the message wins as-is; canonicalization
    /// only applies to values recovered from headers or payload.
    pub fn resolve(&self, message: &Message) -> Option<String> {
        if let Some(id) = &message.trace_id {
            return Some(id.clone());
        }

        let raw = message
            .headers
            .get(&self.field)
            .cloned()
            .or_else(|| message.decoded.get(&self.field).and_then(value_to_string));

        raw.map(|r| self.canonicalize(&r))
    }

    fn canonicalize(&self, raw: &str) -> String {
        if self.segment_extraction {
            let segments: Vec<&str> = raw.split('-').collect();
            if segments.len() >= 3 {
                return segments[1].to_string();
            }
        }
        raw.to_string()
    }
}

impl Default for TraceIdExtractor {
    fn default() -> Self {
        Self::new("trace_id", true)
    }
}

/// Render a decoded payload value as a trace-id candidate
fn value_to_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg() -> Message {
        Message::new("orders", Utc::now())
    }

    #[test]
    fn test_resolve_prefers_existing_trace_id() {
        let message = msg()
            .with_trace_id("already-set")
            .with_header("trace_id", "other");
        let extractor = TraceIdExtractor::default();
        assert_eq!(extractor.resolve(&message), Some("already-set".to_string()));
    }

    #[test]
    fn test_resolve_from_headers_before_payload() {
        let message = msg()
            .with_header("trace_id", "from_header")
            .with_decoded("trace_id", "from_payload");
        let extractor = TraceIdExtractor::default();
        assert_eq!(extractor.resolve(&message), Some("from_header".to_string()));
    }

    #[test]
    fn test_resolve_from_decoded_payload() {
        let message = msg().with_decoded("trace_id", "abc123");
        let extractor = TraceIdExtractor::default();
        assert_eq!(extractor.resolve(&message), Some("abc123".to_string()));
    }

    #[test]
    fn test_resolve_numeric_payload_value() {
        let message = msg().with_decoded("trace_id", 42);
        let extractor = TraceIdExtractor::default();
        assert_eq!(extractor.resolve(&message), Some("42".to_string()));
    }

    #[test]
    fn test_segment_extraction_takes_second_segment() {
        let message = msg().with_header("trace_id", "svc-9f8e7d-prod");
        let extractor = TraceIdExtractor::default();
        assert_eq!(extractor.resolve(&message), Some("9f8e7d".to_string()));
    }

    #[test]
    fn test_segment_extraction_requires_three_segments() {
        let message = msg().with_header("trace_id", "svc-9f8e7d");
        let extractor = TraceIdExtractor::default();
        assert_eq!(extractor.resolve(&message), Some("svc-9f8e7d".to_string()));
    }

    #[test]
    fn test_segment_extraction_disabled() {
        let message = msg().with_header("trace_id", "svc-9f8e7d-prod");
        let extractor = TraceIdExtractor::new("trace_id", false);
        assert_eq!(
            extractor.resolve(&message),
            Some("svc-9f8e7d-prod".to_string())
        );
    }

    #[test]
    fn test_custom_field_name() {
        let message = msg().with_header("correlation_id", "c1");
        let extractor = TraceIdExtractor::new("correlation_id", true);
        assert_eq!(extractor.resolve(&message), Some("c1".to_string()));
    }

    #[test]
    fn test_resolve_missing_everywhere() {
        let extractor = TraceIdExtractor::default();
        assert_eq!(extractor.resolve(&msg()), None);
    }

    #[test]
    fn test_message_roundtrip_json() {
        let message = msg()
            .at(3, 1042)
            .with_key("k1")
            .with_trace_id("t1")
            .with_decoded("amount", 12);
        let json = serde_json::to_string(&message).unwrap();
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(back.topic, "orders");
        assert_eq!(back.partition, 3);
        assert_eq!(back.offset, 1042);
        assert_eq!(back.trace_id, Some("t1".to_string()));
    }
}
