//! Ingestion trait
//!
//! The transport layer (broker consumer, replay tool, test generator) hands
//! decoded messages to a sink. The call is expected to be fast and
//! non-blocking; no backpressure signal is returned.

use crate::message::Message;
use async_trait::async_trait;

/// Accepts decoded messages for correlation
#[async_trait]
pub trait MessageSink: Send + Sync {
    /// Submit one message
    ///
    /// A message with no resolvable trace id is dropped, not an error.
    async fn submit(&self, message: Message);
}
