//! Message channel adapter
//!
//! Publish/consume primitives over named durable queues. Consumed messages are
//! acknowledged as soon as they are delivered, so delivery is at-most-once: a message
//! whose processing fails is not redelivered.
//!
//! A message carrying a correlation id is also addressable on its own: a requester that
//! opened [`MessageChannel::consume_correlated`] for that id receives it, and nobody else
//! does. Plain consumers of the queue see every message.

mod memory;
mod nats;

pub use memory::MemoryChannel;
pub use nats::NatsChannel;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;
use stowage_core::AppResult;

/// Header carrying an id the lookup response echoes back to the requester
pub const CORRELATION_ID_HEADER: &str = "Correlation-Id";

pub const CONTENT_TYPE_HEADER: &str = "Content-Type";
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Per-request address of messages on `queue` that carry `correlation_id`
pub fn correlated_subject(queue: &str, correlation_id: &str) -> String {
    format!("{}.{}", queue, subject_token(correlation_id))
}

/// Replace everything but `[A-Za-z0-9_-]` so the result is one subject token and a
/// valid stream or consumer name
pub(crate) fn subject_token(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// A message taken off a queue
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub payload: Bytes,
    pub correlation_id: Option<String>,
}

impl Delivery {
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
            correlation_id: None,
        }
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }
}

/// A message to put on a queue. Payloads are JSON.
pub type OutgoingMessage = Delivery;

/// Lazy, unbounded stream of deliveries from one queue
pub type DeliveryStream = Pin<Box<dyn Stream<Item = AppResult<Delivery>> + Send>>;

/// Broker abstraction the pipeline and the command line tools talk to
#[async_trait]
pub trait MessageChannel: Send + Sync {
    /// Declare a durable queue. Declaring an existing queue is a no-op.
    async fn declare_queue(&self, queue: &str) -> AppResult<()>;

    /// Publish a message, declaring the queue first if needed
    async fn publish(&self, queue: &str, message: OutgoingMessage) -> AppResult<()>;

    /// Start consuming a queue
    async fn consume(&self, queue: &str) -> AppResult<DeliveryStream>;

    /// Consume only the messages on `queue` that carry `correlation_id`.
    ///
    /// Open it before publishing the request the reply belongs to.
    async fn consume_correlated(
        &self,
        queue: &str,
        correlation_id: &str,
    ) -> AppResult<DeliveryStream>;
}
