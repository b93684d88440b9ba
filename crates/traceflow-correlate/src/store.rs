//! Bounded in-memory trace store
//!
//! Owns the mapping from trace id to timeline plus the recency order used for
//! eviction. Capacity control is FIFO with a grace period: the least recently
//! updated traces go first, but a trace updated within the last 30 seconds is
//! never evicted, so sustained bursts on few trace ids can overshoot
//! `max_traces` by a bounded amount. That overshoot is intentional.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, VecDeque};
use tracing::debug;
use traceflow_core::Message;

/// Most traces evicted in a single pass
const EVICTION_BATCH: usize = 100;

/// Traces updated within this window are never evicted
const EVICTION_GRACE_SECONDS: i64 = 30;

/// One trace: the ordered messages sharing a correlation id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceInfo {
    /// Canonical trace id
    pub trace_id: String,

    /// Messages in insertion order
    pub messages: Vec<Message>,

    /// Union of all message topics; never shrinks
    pub topics: BTreeSet<String>,

    /// Earliest message timestamp
    pub start_time: DateTime<Utc>,

    /// Latest message timestamp
    pub end_time: DateTime<Utc>,
}

impl TraceInfo {
    fn new(trace_id: String, first: &Message) -> Self {
        Self {
            trace_id,
            messages: Vec::new(),
            topics: BTreeSet::new(),
            start_time: first.timestamp,
            end_time: first.timestamp,
        }
    }

    fn append(&mut self, message: Message) {
        self.topics.insert(message.topic.clone());
        if message.timestamp < self.start_time {
            self.start_time = message.timestamp;
        }
        if message.timestamp > self.end_time {
            self.end_time = message.timestamp;
        }
        self.messages.push(message);
    }

    /// Full trace duration
    pub fn duration(&self) -> Duration {
        self.end_time - self.start_time
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    /// Earliest message in the given topic, by timestamp
    pub fn first_message_in(&self, topic: &str) -> Option<&Message> {
        self.messages
            .iter()
            .filter(|m| m.topic == topic)
            .min_by_key(|m| m.timestamp)
    }

    /// Latest message in the given topic, by timestamp
    pub fn last_message_in(&self, topic: &str) -> Option<&Message> {
        self.messages
            .iter()
            .filter(|m| m.topic == topic)
            .max_by_key(|m| m.timestamp)
    }
}

/// Outcome of one ingestion call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// No trace id; message dropped
    Dropped,
    /// A new trace was created
    Created { evicted: usize },
    /// Appended to an existing trace
    Appended { evicted: usize },
}

/// Bounded store of in-flight traces
#[derive(Debug)]
pub struct TraceStore {
    traces: HashMap<String, TraceInfo>,
    /// Trace ids ordered least to most recently updated; each id appears once
    recency: VecDeque<String>,
    max_traces: usize,
    dropped: u64,
}

impl TraceStore {
    pub fn new(max_traces: usize) -> Self {
        Self {
            traces: HashMap::new(),
            recency: VecDeque::new(),
            max_traces,
            dropped: 0,
        }
    }

    /// Ingest one message
    ///
    /// A message with no trace id is dropped and counted, never an error.
    /// Eviction runs after every successful append.
    pub fn add_message(&mut self, message: Message) -> AddOutcome {
        let Some(trace_id) = message.trace_id.clone() else {
            self.dropped += 1;
            debug!(
                topic = %message.topic,
                partition = message.partition,
                offset = message.offset,
                "dropping message without trace id"
            );
            return AddOutcome::Dropped;
        };

        let created = !self.traces.contains_key(&trace_id);
        let trace = self
            .traces
            .entry(trace_id.clone())
            .or_insert_with(|| TraceInfo::new(trace_id.clone(), &message));
        trace.append(message);

        self.touch(&trace_id);
        let evicted = self.evict_over_capacity(Utc::now());

        if created {
            AddOutcome::Created { evicted }
        } else {
            AddOutcome::Appended { evicted }
        }
    }

    /// Move (or insert) a trace id to the tail of the recency order
    fn touch(&mut self, trace_id: &str) {
        if let Some(pos) = self.recency.iter().position(|id| id == trace_id) {
            self.recency.remove(pos);
        }
        self.recency.push_back(trace_id.to_string());
    }

    /// Evict oldest-first while over capacity, honoring the grace period
    ///
    /// The scan is bounded by the current recency length so a store full of
    /// fresh traces terminates with the documented overshoot.
    fn evict_over_capacity(&mut self, now: DateTime<Utc>) -> usize {
        if self.traces.len() <= self.max_traces {
            return 0;
        }

        let target = (self.traces.len() - self.max_traces).min(EVICTION_BATCH);
        let grace = Duration::seconds(EVICTION_GRACE_SECONDS);
        let mut evicted = 0;
        let mut scanned = 0;
        let scan_limit = self.recency.len();

        while evicted < target && scanned < scan_limit {
            let Some(trace_id) = self.recency.pop_front() else {
                break;
            };
            scanned += 1;

            let in_grace = self
                .traces
                .get(&trace_id)
                .map(|t| now - t.end_time < grace)
                .unwrap_or(false);

            if in_grace {
                // Active burst; re-queue and try the next-oldest candidate
                self.recency.push_back(trace_id);
                continue;
            }

            if self.traces.remove(&trace_id).is_some() {
                debug!(trace_id = %trace_id, "evicted trace over capacity");
                evicted += 1;
            }
        }

        evicted
    }

    /// Remove every trace whose latest message is older than the cutoff
    ///
    /// Ignores the eviction grace period; intended for long-idle cleanup
    /// rather than capacity control. Returns the number removed.
    pub fn cleanup_old_traces(&mut self, max_age_hours: i64) -> usize {
        let cutoff = Utc::now() - Duration::hours(max_age_hours);
        let stale: Vec<String> = self
            .traces
            .iter()
            .filter(|(_, t)| t.end_time < cutoff)
            .map(|(id, _)| id.clone())
            .collect();

        for trace_id in &stale {
            self.traces.remove(trace_id);
            if let Some(pos) = self.recency.iter().position(|id| id == trace_id) {
                self.recency.remove(pos);
            }
        }

        stale.len()
    }

    pub fn get(&self, trace_id: &str) -> Option<&TraceInfo> {
        self.traces.get(trace_id)
    }

    /// Trace ids, least recently updated first
    pub fn trace_ids(&self) -> Vec<String> {
        self.recency.iter().cloned().collect()
    }

    pub fn traces(&self) -> &HashMap<String, TraceInfo> {
        &self.traces
    }

    pub fn len(&self) -> usize {
        self.traces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.traces.is_empty()
    }

    /// Messages dropped for want of a trace id
    pub fn dropped_count(&self) -> u64 {
        self.dropped
    }
}
