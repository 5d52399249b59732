//! NATS JetStream channel
//!
//! Every queue is a JetStream stream over the queue name and its `<queue>.>` children,
//! with work-queue retention and file storage. Messages carrying a correlation id are
//! published on `<queue>.<id>`. The shared consumer of a queue is a durable pull consumer
//! with explicit ack; correlated consumers are ephemeral and filtered on their subject.

use super::{
    correlated_subject, subject_token, Delivery, DeliveryStream, MessageChannel, OutgoingMessage,
    CONTENT_TYPE_HEADER, CONTENT_TYPE_JSON, CORRELATION_ID_HEADER,
};
use async_nats::jetstream::{self, consumer::PullConsumer, stream::Stream};
use async_nats::{Client, ConnectOptions, HeaderMap};
use async_trait::async_trait;
use futures::StreamExt;
use std::time::Duration;
use stowage_core::{AppError, AppResult};

/// Default ping interval for keep-alive
const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(120);

/// Idle time after which the server removes a correlated consumer
const CORRELATED_CONSUMER_INACTIVE: Duration = Duration::from_secs(300);

/// JetStream-backed [`MessageChannel`]
#[derive(Clone)]
pub struct NatsChannel {
    client: Client,
    jetstream: jetstream::Context,
}

impl NatsChannel {
    /// Connect to the broker. Fails fast when the server is unreachable.
    pub async fn connect(
        url: &str,
        user: Option<&str>,
        password: Option<&str>,
        name: &str,
    ) -> AppResult<Self> {
        tracing::info!(url = %url, "Connecting to NATS");

        let mut options = ConnectOptions::new()
            .name(name)
            .ping_interval(DEFAULT_PING_INTERVAL)
            .connection_timeout(Duration::from_secs(5));

        if let (Some(user), Some(password)) = (user, password) {
            options = options.user_and_password(user.to_string(), password.to_string());
        }

        let client = options
            .connect(url)
            .await
            .map_err(|e| AppError::Channel(format!("Failed to connect to NATS: {}", e)))?;

        tracing::info!(url = %url, "Connected to NATS");
        Ok(Self::new(client))
    }

    pub fn new(client: Client) -> Self {
        let jetstream = jetstream::new(client.clone());
        Self { client, jetstream }
    }

    /// Get the underlying NATS client
    pub fn inner(&self) -> &Client {
        &self.client
    }

    async fn ensure_stream(&self, queue: &str) -> AppResult<Stream> {
        let name = stream_name(queue);
        let stream = self
            .jetstream
            .get_or_create_stream(jetstream::stream::Config {
                name: name.clone(),
                subjects: vec![queue.to_string(), format!("{}.>", queue)],
                retention: jetstream::stream::RetentionPolicy::WorkQueue,
                storage: jetstream::stream::StorageType::File,
                ..Default::default()
            })
            .await
            .map_err(|e| {
                AppError::Channel(format!("Failed to declare queue {}: {}", queue, e))
            })?;

        tracing::debug!(queue = %queue, stream = %name, "Queue declared");
        Ok(stream)
    }

    async fn ensure_consumer(&self, queue: &str, stream: &Stream) -> AppResult<PullConsumer> {
        let consumer_name = stream_name(&format!("{}-consumer", queue));

        let consumer = stream
            .get_or_create_consumer(
                &consumer_name,
                jetstream::consumer::pull::Config {
                    durable_name: Some(consumer_name.clone()),
                    ack_policy: jetstream::consumer::AckPolicy::Explicit,
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| {
                AppError::Channel(format!("Failed to create consumer for {}: {}", queue, e))
            })?;

        tracing::info!(queue = %queue, consumer = %consumer_name, "Using consumer");
        Ok(consumer)
    }

    async fn correlated_consumer(&self, subject: &str, stream: &Stream) -> AppResult<PullConsumer> {
        let consumer = stream
            .create_consumer(jetstream::consumer::pull::Config {
                filter_subject: subject.to_string(),
                ack_policy: jetstream::consumer::AckPolicy::Explicit,
                inactive_threshold: CORRELATED_CONSUMER_INACTIVE,
                ..Default::default()
            })
            .await
            .map_err(|e| {
                AppError::Channel(format!("Failed to create consumer for {}: {}", subject, e))
            })?;

        tracing::debug!(subject = %subject, "Using correlated consumer");
        Ok(consumer)
    }
}

/// Ack each message as it arrives and turn it into a [`Delivery`]
async fn deliveries(consumer: PullConsumer, queue: &str) -> AppResult<DeliveryStream> {
    let messages = consumer
        .messages()
        .await
        .map_err(|e| AppError::Channel(format!("Failed to consume {}: {}", queue, e)))?;

    let queue = queue.to_string();
    let deliveries = messages.then(move |result| {
        let queue = queue.clone();
        async move {
            let message = result.map_err(|e| {
                AppError::Channel(format!("Failed to receive from {}: {}", queue, e))
            })?;

            // Acked on delivery: processing failures are not redelivered
            message.ack().await.map_err(|e| {
                AppError::Channel(format!("Failed to ack message on {}: {}", queue, e))
            })?;

            let correlation_id = message
                .headers
                .as_ref()
                .and_then(|h| h.get(CORRELATION_ID_HEADER))
                .map(|v| v.as_str().to_string());

            Ok(Delivery {
                payload: message.payload.clone(),
                correlation_id,
            })
        }
    });

    Ok(Box::pin(deliveries))
}

/// Stream and consumer names may not contain `.`, `*`, `>`, whitespace or path separators
fn stream_name(queue: &str) -> String {
    subject_token(queue)
}

#[async_trait]
impl MessageChannel for NatsChannel {
    async fn declare_queue(&self, queue: &str) -> AppResult<()> {
        self.ensure_stream(queue).await.map(|_| ())
    }

    async fn publish(&self, queue: &str, message: OutgoingMessage) -> AppResult<()> {
        self.ensure_stream(queue).await?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE_HEADER, CONTENT_TYPE_JSON);
        if let Some(correlation_id) = &message.correlation_id {
            headers.insert(CORRELATION_ID_HEADER, correlation_id.as_str());
        }

        let subject = match &message.correlation_id {
            Some(correlation_id) => correlated_subject(queue, correlation_id),
            None => queue.to_string(),
        };

        let size = message.payload.len();
        self.jetstream
            .publish_with_headers(subject, headers, message.payload)
            .await
            .map_err(|e| AppError::Channel(format!("Failed to publish to {}: {}", queue, e)))?
            .await
            .map_err(|e| {
                AppError::Channel(format!("Failed to confirm publish to {}: {}", queue, e))
            })?;

        tracing::debug!(queue = %queue, size_bytes = size, "Message published");
        Ok(())
    }

    async fn consume(&self, queue: &str) -> AppResult<DeliveryStream> {
        let stream = self.ensure_stream(queue).await?;
        let consumer = self.ensure_consumer(queue, &stream).await?;
        deliveries(consumer, queue).await
    }

    async fn consume_correlated(
        &self,
        queue: &str,
        correlation_id: &str,
    ) -> AppResult<DeliveryStream> {
        let stream = self.ensure_stream(queue).await?;
        let subject = correlated_subject(queue, correlation_id);
        let consumer = self.correlated_consumer(&subject, &stream).await?;
        deliveries(consumer, &subject).await
    }
}
