//! Per-topic and per-edge statistics
//!
//! Pure functions over a slice of trace references, so the same code serves
//! both the full store and time-filtered projections. Nothing is cached:
//! every call recomputes from raw message samples, which costs O(messages)
//! per query but can never serve stale aggregates.

use crate::store::TraceInfo;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// Rolling-rate window
const ROLLING_WINDOW_SECONDS: i64 = 60;

/// How many slowest traces to report per topic
const SLOWEST_TRACE_COUNT: usize = 3;

/// A trace ranked by its time-to-topic
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlowTrace {
    /// Full, untruncated trace id
    pub trace_id: String,
    /// Elapsed time from the trace's first message to its first message in
    /// this topic
    pub time_to_topic_ms: i64,
    /// Full trace duration
    pub total_duration_ms: i64,
}

/// Statistics for one topic
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicStats {
    pub topic: String,
    /// Messages in this topic across all traces
    pub message_count: usize,
    /// Traces with at least one message in this topic
    pub trace_count: usize,
    /// Messages per minute over the full observed span
    pub rate_total: f64,
    /// Messages per minute over the last 60 seconds
    pub rate_rolling_60s: f64,
    pub age_p10_ms: f64,
    pub age_p50_ms: f64,
    pub age_p95_ms: f64,
    /// Top traces by time-to-topic, slowest first
    pub slowest_traces: Vec<SlowTrace>,
}

impl TopicStats {
    fn empty(topic: &str) -> Self {
        Self {
            topic: topic.to_string(),
            message_count: 0,
            trace_count: 0,
            rate_total: 0.0,
            rate_rolling_60s: 0.0,
            age_p10_ms: 0.0,
            age_p50_ms: 0.0,
            age_p95_ms: 0.0,
            slowest_traces: Vec::new(),
        }
    }
}

/// Statistics for one directed edge
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeStats {
    pub source: String,
    pub destination: String,
    /// Traces with at least one message in both endpoints
    pub flow_count: usize,
    /// Combined messages per minute across both endpoints
    pub message_rate: f64,
}

/// Compute statistics for a topic over the given traces
pub fn topic_stats(traces: &[&TraceInfo], topic: &str, now: DateTime<Utc>) -> TopicStats {
    let rolling_cutoff = now - Duration::seconds(ROLLING_WINDOW_SECONDS);

    let mut message_count = 0usize;
    let mut trace_count = 0usize;
    let mut rolling = 0usize;
    let mut earliest: Option<DateTime<Utc>> = None;
    let mut latest: Option<DateTime<Utc>> = None;
    let mut ages: Vec<f64> = Vec::new();
    let mut ranked: Vec<SlowTrace> = Vec::new();

    for trace in traces {
        let mut seen = false;
        for message in trace.messages.iter().filter(|m| m.topic == topic) {
            seen = true;
            message_count += 1;
            earliest = Some(earliest.map_or(message.timestamp, |e| e.min(message.timestamp)));
            latest = Some(latest.map_or(message.timestamp, |l| l.max(message.timestamp)));
            if message.timestamp >= rolling_cutoff {
                rolling += 1;
            }
            ages.push((message.timestamp - trace.start_time).num_milliseconds() as f64);
        }

        if !seen {
            continue;
        }
        trace_count += 1;

        if let Some(ttt) = time_to_topic(trace, topic) {
            ranked.push(SlowTrace {
                trace_id: trace.trace_id.clone(),
                time_to_topic_ms: ttt.num_milliseconds(),
                total_duration_ms: trace.duration().num_milliseconds(),
            });
        }
    }

    if message_count == 0 {
        return TopicStats::empty(topic);
    }

    let rate_total = match (earliest, latest) {
        (Some(e), Some(l)) => message_count as f64 / span_minutes(e, l),
        _ => 0.0,
    };

    ages.sort_by(|a, b| a.total_cmp(b));
    ranked.sort_by(|a, b| b.time_to_topic_ms.cmp(&a.time_to_topic_ms));
    ranked.truncate(SLOWEST_TRACE_COUNT);

    TopicStats {
        topic: topic.to_string(),
        message_count,
        trace_count,
        rate_total,
        rate_rolling_60s: rolling as f64,
        age_p10_ms: percentile(&ages, 10.0),
        age_p50_ms: percentile(&ages, 50.0),
        age_p95_ms: percentile(&ages, 95.0),
        slowest_traces: ranked,
    }
}

/// Compute statistics for a directed edge over the given traces
pub fn edge_stats(traces: &[&TraceInfo], source: &str, destination: &str) -> EdgeStats {
    let mut flow_count = 0usize;
    let mut combined = 0usize;
    let mut earliest: Option<DateTime<Utc>> = None;
    let mut latest: Option<DateTime<Utc>> = None;

    for trace in traces {
        if trace.topics.contains(source) && trace.topics.contains(destination) {
            flow_count += 1;
        }
        for message in trace
            .messages
            .iter()
            .filter(|m| m.topic == source || m.topic == destination)
        {
            combined += 1;
            earliest = Some(earliest.map_or(message.timestamp, |e| e.min(message.timestamp)));
            latest = Some(latest.map_or(message.timestamp, |l| l.max(message.timestamp)));
        }
    }

    let message_rate = match (earliest, latest) {
        (Some(e), Some(l)) if combined > 0 => combined as f64 / span_minutes(e, l),
        _ => 0.0,
    };

    EdgeStats {
        source: source.to_string(),
        destination: destination.to_string(),
        flow_count,
        message_rate,
    }
}

/// Time from the trace's first message to its first message in `topic`
///
/// An exactly-zero value on a multi-topic trace means this topic is the
/// trace's origin; the intra-topic processing time is reported instead. A
/// single-topic, single-message trace gets a cosmetic 1 ms floor so the
/// ranking never shows a zero-duration entry.
fn time_to_topic(trace: &TraceInfo, topic: &str) -> Option<Duration> {
    let first = trace.first_message_in(topic)?;
    let mut elapsed = first.timestamp - trace.start_time;

    if elapsed.is_zero() {
        if trace.topics.len() > 1 {
            let last = trace.last_message_in(topic)?;
            elapsed = last.timestamp - first.timestamp;
        } else if trace.message_count() == 1 {
            elapsed = Duration::milliseconds(1);
        }
    }

    Some(elapsed)
}

/// Span between two instants in minutes, floored at one
///
/// The floor keeps burst traffic inside a single minute from blowing up the
/// per-minute rate.
fn span_minutes(earliest: DateTime<Utc>, latest: DateTime<Utc>) -> f64 {
    ((latest - earliest).num_milliseconds() as f64 / 60_000.0).max(1.0)
}

/// Linear-interpolation percentile over a sorted sample set
pub fn percentile(sorted: &[f64], pct: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }

    let rank = pct / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::TraceStore;
    use traceflow_core::Message;

    fn build(messages: Vec<(&str, &str, DateTime<Utc>)>) -> TraceStore {
        let mut store = TraceStore::new(1000);
        for (topic, trace_id, ts) in messages {
            store.add_message(Message::new(topic, ts).with_trace_id(trace_id));
        }
        store
    }

    fn refs(store: &TraceStore) -> Vec<&TraceInfo> {
        store.traces().values().collect()
    }

    #[test]
    fn test_empty_topic_yields_zeroes() {
        let store = build(vec![]);
        let stats = topic_stats(&refs(&store), "orders", Utc::now());
        assert_eq!(stats.message_count, 0);
        assert_eq!(stats.rate_total, 0.0);
        assert_eq!(stats.rate_rolling_60s, 0.0);
        assert_eq!(stats.age_p50_ms, 0.0);
        assert!(stats.slowest_traces.is_empty());
    }

    #[test]
    fn test_rate_total_uses_minimum_one_minute_span() {
        let now = Utc::now();
        let base = now - Duration::seconds(300);
        // 6 messages within 10 seconds: span floors to 1 minute
        let store = build(
            (0..6)
                .map(|i| ("orders", "t1", base + Duration::seconds(i * 2)))
                .collect(),
        );
        let stats = topic_stats(&refs(&store), "orders", now);
        assert_eq!(stats.message_count, 6);
        assert!((stats.rate_total - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_rolling_rate_counts_last_minute_only() {
        let now = Utc::now();
        let store = build(vec![
            ("orders", "t1", now - Duration::seconds(300)),
            ("orders", "t1", now - Duration::seconds(30)),
            ("orders", "t1", now - Duration::seconds(5)),
        ]);
        let stats = topic_stats(&refs(&store), "orders", now);
        assert_eq!(stats.rate_rolling_60s, 2.0);
    }

    #[test]
    fn test_percentile_ordering_invariant() {
        let now = Utc::now();
        let base = now - Duration::seconds(600);
        let mut messages = Vec::new();
        for (i, offset) in [0i64, 3, 7, 11, 50, 90, 120, 500].iter().enumerate() {
            let id = format!("t{i}");
            messages.push((
                "orders".to_string(),
                id,
                base + Duration::seconds(*offset),
            ));
        }
        let mut store = TraceStore::new(1000);
        for (topic, id, ts) in &messages {
            // Give each trace an earlier origin message in another topic so
            // ages are non-zero
            store.add_message(Message::new("ingest", *ts - Duration::seconds(10)).with_trace_id(id));
            store.add_message(Message::new(topic.as_str(), *ts).with_trace_id(id));
        }
        let traces = refs(&store);
        let stats = topic_stats(&traces, "orders", now);
        assert!(stats.age_p10_ms <= stats.age_p50_ms);
        assert!(stats.age_p50_ms <= stats.age_p95_ms);
        assert!(stats.age_p10_ms > 0.0);
    }

    #[test]
    fn test_percentile_linear_interpolation() {
        let samples = [10.0, 20.0, 30.0, 40.0];
        assert_eq!(percentile(&samples, 50.0), 25.0);
        assert_eq!(percentile(&samples, 0.0), 10.0);
        assert_eq!(percentile(&samples, 100.0), 40.0);
        assert_eq!(percentile(&[], 50.0), 0.0);
        assert_eq!(percentile(&[7.0], 95.0), 7.0);
    }

    #[test]
    fn test_slowest_traces_ranked_and_capped() {
        let now = Utc::now();
        let base = now - Duration::seconds(600);
        let mut store = TraceStore::new(1000);
        // Five traces with increasing time-to-topic for "process"
        for i in 1..=5i64 {
            let id = format!("t{i}");
            store.add_message(Message::new("ingest", base).with_trace_id(&id));
            store.add_message(
                Message::new("process", base + Duration::seconds(i * 10)).with_trace_id(&id),
            );
        }
        let traces = refs(&store);
        let stats = topic_stats(&traces, "process", now);

        assert_eq!(stats.slowest_traces.len(), 3);
        assert_eq!(stats.slowest_traces[0].trace_id, "t5");
        assert_eq!(stats.slowest_traces[0].time_to_topic_ms, 50_000);
        assert_eq!(stats.slowest_traces[1].trace_id, "t4");
        assert_eq!(stats.slowest_traces[2].trace_id, "t3");
    }

    #[test]
    fn test_origin_topic_reports_intra_topic_time() {
        let now = Utc::now();
        let base = now - Duration::seconds(600);
        let store = build(vec![
            ("ingest", "t1", base),
            ("ingest", "t1", base + Duration::seconds(4)),
            ("process", "t1", base + Duration::seconds(10)),
        ]);
        let traces = refs(&store);
        // "ingest" is the origin: time_to_topic would be 0, so the
        // intra-topic span (4 s) is reported instead
        let stats = topic_stats(&traces, "ingest", now);
        assert_eq!(stats.slowest_traces[0].time_to_topic_ms, 4_000);
    }

    #[test]
    fn test_single_message_trace_gets_millisecond_floor() {
        let now = Utc::now();
        let store = build(vec![("ingest", "t1", now - Duration::seconds(300))]);
        let traces = refs(&store);
        let stats = topic_stats(&traces, "ingest", now);
        assert_eq!(stats.slowest_traces[0].time_to_topic_ms, 1);
    }

    #[test]
    fn test_edge_stats_flow_count() {
        let now = Utc::now();
        let base = now - Duration::seconds(600);
        let store = build(vec![
            ("orders", "t1", base),
            ("payments", "t1", base + Duration::seconds(5)),
            ("orders", "t2", base + Duration::seconds(10)),
            ("payments", "t3", base + Duration::seconds(20)),
        ]);
        let traces = refs(&store);
        let stats = edge_stats(&traces, "orders", "payments");

        // Only t1 touches both endpoints
        assert_eq!(stats.flow_count, 1);
        // 4 combined messages over a 20-second span, floored to 1 minute
        assert!((stats.message_rate - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_edge_stats_no_traffic() {
        let store = build(vec![]);
        let traces = refs(&store);
        let stats = edge_stats(&traces, "a", "b");
        assert_eq!(stats.flow_count, 0);
        assert_eq!(stats.message_rate, 0.0);
    }
}
