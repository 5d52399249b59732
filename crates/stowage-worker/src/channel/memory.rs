//! In-process channel over tokio mpsc queues, for tests and local runs

use super::{correlated_subject, Delivery, DeliveryStream, MessageChannel, OutgoingMessage};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use stowage_core::{AppError, AppResult};
use tokio::sync::mpsc;

struct QueueState {
    tx: mpsc::UnboundedSender<Delivery>,
    rx: Option<mpsc::UnboundedReceiver<Delivery>>,
}

impl QueueState {
    fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx: Some(rx) }
    }
}

fn unfold(rx: mpsc::UnboundedReceiver<Delivery>) -> DeliveryStream {
    Box::pin(futures::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|delivery| (Ok(delivery), rx))
    }))
}

/// [`MessageChannel`] backed by in-memory FIFO queues. Each queue has at most one
/// consumer.
///
/// A correlated consumer only receives messages published after it was opened; until
/// then they go to the queue itself.
#[derive(Default)]
pub struct MemoryChannel {
    queues: Mutex<HashMap<String, QueueState>>,
    correlated: Mutex<HashMap<String, mpsc::UnboundedSender<Delivery>>>,
}

impl MemoryChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of every declared queue, sorted
    pub fn declared_queues(&self) -> Vec<String> {
        let mut names: Vec<String> = self.lock().keys().cloned().collect();
        names.sort();
        names
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, QueueState>> {
        self.queues.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_correlated(
        &self,
    ) -> std::sync::MutexGuard<'_, HashMap<String, mpsc::UnboundedSender<Delivery>>> {
        self.correlated.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Hand `message` to the consumer waiting for its correlation id, if any.
    /// Returns the message back when nobody is waiting.
    fn route_correlated(&self, queue: &str, message: OutgoingMessage) -> Option<OutgoingMessage> {
        let Some(correlation_id) = message.correlation_id.as_deref() else {
            return Some(message);
        };
        let subject = correlated_subject(queue, correlation_id);

        let mut correlated = self.lock_correlated();
        let Some(tx) = correlated.get(&subject) else {
            return Some(message);
        };
        match tx.send(message) {
            Ok(()) => None,
            Err(mpsc::error::SendError(message)) => {
                correlated.remove(&subject);
                Some(message)
            }
        }
    }
}

#[async_trait]
impl MessageChannel for MemoryChannel {
    async fn declare_queue(&self, queue: &str) -> AppResult<()> {
        if queue.is_empty() {
            return Err(AppError::Channel("Queue name is empty".to_string()));
        }
        self.lock()
            .entry(queue.to_string())
            .or_insert_with(QueueState::new);
        Ok(())
    }

    async fn publish(&self, queue: &str, message: OutgoingMessage) -> AppResult<()> {
        self.declare_queue(queue).await?;
        let Some(message) = self.route_correlated(queue, message) else {
            return Ok(());
        };

        let queues = self.lock();
        let state = queues
            .get(queue)
            .ok_or_else(|| AppError::Channel(format!("Queue {} vanished", queue)))?;
        state
            .tx
            .send(message)
            .map_err(|_| AppError::Channel(format!("Consumer of {} has gone away", queue)))
    }

    async fn consume(&self, queue: &str) -> AppResult<DeliveryStream> {
        self.declare_queue(queue).await?;
        let rx = self
            .lock()
            .get_mut(queue)
            .and_then(|state| state.rx.take())
            .ok_or_else(|| {
                AppError::Channel(format!("Queue {} already has a consumer", queue))
            })?;

        Ok(unfold(rx))
    }

    async fn consume_correlated(
        &self,
        queue: &str,
        correlation_id: &str,
    ) -> AppResult<DeliveryStream> {
        self.declare_queue(queue).await?;
        let subject = correlated_subject(queue, correlation_id);

        let mut correlated = self.lock_correlated();
        if correlated.get(&subject).is_some_and(|tx| !tx.is_closed()) {
            return Err(AppError::Channel(format!(
                "Subject {} already has a consumer",
                subject
            )));
        }
        let (tx, rx) = mpsc::unbounded_channel();
        correlated.insert(subject, tx);
        Ok(unfold(rx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn delivers_in_fifo_order_with_headers() {
        let channel = MemoryChannel::new();
        channel
            .publish("q", Delivery::new(&b"one"[..]).with_correlation_id("c-1"))
            .await
            .unwrap();
        channel.publish("q", Delivery::new(&b"two"[..])).await.unwrap();

        let mut stream = channel.consume("q").await.unwrap();
        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(&first.payload[..], b"one");
        assert_eq!(first.correlation_id.as_deref(), Some("c-1"));
        let second = stream.next().await.unwrap().unwrap();
        assert_eq!(&second.payload[..], b"two");
        assert!(second.correlation_id.is_none());
    }

    #[tokio::test]
    async fn declare_is_idempotent() {
        let channel = MemoryChannel::new();
        channel.declare_queue("b").await.unwrap();
        channel.declare_queue("a").await.unwrap();
        channel.declare_queue("a").await.unwrap();
        assert_eq!(channel.declared_queues(), vec!["a", "b"]);
        assert!(channel.declare_queue("").await.is_err());
    }

    #[tokio::test]
    async fn interleaved_replies_reach_their_own_requesters() {
        let channel = MemoryChannel::new();
        let mut first = channel.consume_correlated("replies", "req-a").await.unwrap();
        let mut second = channel.consume_correlated("replies", "req-b").await.unwrap();

        channel
            .publish("replies", Delivery::new(&b"for b"[..]).with_correlation_id("req-b"))
            .await
            .unwrap();
        channel
            .publish("replies", Delivery::new(&b"for a"[..]).with_correlation_id("req-a"))
            .await
            .unwrap();

        let a = first.next().await.unwrap().unwrap();
        assert_eq!(&a.payload[..], b"for a");
        assert_eq!(a.correlation_id.as_deref(), Some("req-a"));
        let b = second.next().await.unwrap().unwrap();
        assert_eq!(&b.payload[..], b"for b");
        assert_eq!(b.correlation_id.as_deref(), Some("req-b"));
    }

    #[tokio::test]
    async fn replies_without_a_waiting_requester_stay_on_the_queue() {
        let channel = MemoryChannel::new();
        let correlated = channel.consume_correlated("replies", "gone").await.unwrap();
        drop(correlated);

        channel
            .publish("replies", Delivery::new(&b"late"[..]).with_correlation_id("gone"))
            .await
            .unwrap();
        channel
            .publish("replies", Delivery::new(&b"other"[..]).with_correlation_id("x"))
            .await
            .unwrap();

        let mut queue = channel.consume("replies").await.unwrap();
        assert_eq!(&queue.next().await.unwrap().unwrap().payload[..], b"late");
        assert_eq!(&queue.next().await.unwrap().unwrap().payload[..], b"other");
    }

    #[tokio::test]
    async fn single_correlated_consumer_per_id() {
        let channel = MemoryChannel::new();
        let _stream = channel.consume_correlated("replies", "id").await.unwrap();
        assert!(channel.consume_correlated("replies", "id").await.is_err());
        assert!(channel.consume_correlated("replies", "other").await.is_ok());
    }

    #[tokio::test]
    async fn single_consumer_per_queue() {
        let channel = MemoryChannel::new();
        let _stream = channel.consume("q").await.unwrap();
        assert!(matches!(
            channel.consume("q").await,
            Err(AppError::Channel(_))
        ));
    }
}
