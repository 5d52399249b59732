//! Consume loops for the upload and lookup queues.
//!
//! Each input queue gets its own loop. Every delivery is handled on a spawned task; a
//! semaphore bounds the tasks in flight per loop and is acquired before the next message
//! is taken, so back-pressure stays in the loop.
//!
//! Shutdown: [`ShutdownHandle::shutdown`] stops both loops from taking new messages.
//! [`Pipeline::run`] returns once in-flight tasks have finished.

use futures::StreamExt;
use std::sync::Arc;
use stowage_core::{AppError, AppResult, QueueNames};
use tokio::sync::{watch, Semaphore};

use crate::channel::{DeliveryStream, MessageChannel};
use crate::handler::MessageHandler;

#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub queues: QueueNames,
    /// Upper bound on in-flight message tasks per loop
    pub max_concurrent_messages: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queues: QueueNames::default(),
            max_concurrent_messages: 16,
        }
    }
}

/// Stops a running pipeline
#[derive(Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        let _ = self.tx.send(true);
    }
}

pub struct Pipeline {
    channel: Arc<dyn MessageChannel>,
    ingest: Arc<dyn MessageHandler>,
    lookup: Arc<dyn MessageHandler>,
    config: PipelineConfig,
    shutdown_tx: Arc<watch::Sender<bool>>,
}

impl Pipeline {
    pub fn new(
        channel: Arc<dyn MessageChannel>,
        ingest: Arc<dyn MessageHandler>,
        lookup: Arc<dyn MessageHandler>,
        config: PipelineConfig,
    ) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            channel,
            ingest,
            lookup,
            config,
            shutdown_tx: Arc::new(shutdown_tx),
        }
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: self.shutdown_tx.clone(),
        }
    }

    /// Declare the upload, lookup and response queues
    pub async fn declare_queues(&self) -> AppResult<()> {
        for queue in self.config.queues.all() {
            self.channel.declare_queue(queue).await?;
        }
        tracing::info!(queues = ?self.config.queues.all(), "Queues declared");
        Ok(())
    }

    /// Consume both input queues until shutdown or until both streams end.
    ///
    /// Fails when either queue cannot be opened. Per-message failures never stop a loop.
    pub async fn run(&self) -> AppResult<()> {
        let uploads = self.channel.consume(&self.config.queues.file_data).await?;
        let lookups = self.channel.consume(&self.config.queues.file_request).await?;

        tracing::info!(
            max_concurrent_messages = self.config.max_concurrent_messages,
            file_data_queue = %self.config.queues.file_data,
            file_request_queue = %self.config.queues.file_request,
            "Pipeline started"
        );

        let ingest_loop = tokio::spawn(consume_loop(
            self.config.queues.file_data.clone(),
            uploads,
            self.ingest.clone(),
            self.config.max_concurrent_messages,
            self.shutdown_tx.subscribe(),
        ));
        let lookup_loop = tokio::spawn(consume_loop(
            self.config.queues.file_request.clone(),
            lookups,
            self.lookup.clone(),
            self.config.max_concurrent_messages,
            self.shutdown_tx.subscribe(),
        ));

        let (ingest_result, lookup_result) = tokio::join!(ingest_loop, lookup_loop);
        ingest_result.map_err(|e| AppError::Internal(format!("Ingest loop panicked: {}", e)))?;
        lookup_result.map_err(|e| AppError::Internal(format!("Lookup loop panicked: {}", e)))?;

        tracing::info!("Pipeline stopped");
        Ok(())
    }
}

async fn consume_loop(
    queue: String,
    mut deliveries: DeliveryStream,
    handler: Arc<dyn MessageHandler>,
    max_concurrent: usize,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let max_concurrent = max_concurrent.max(1);
    let semaphore = Arc::new(Semaphore::new(max_concurrent));

    tracing::info!(queue = %queue, handler = handler.name(), "Consume loop started");

    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        let permit = tokio::select! {
            _ = shutdown_rx.changed() => break,
            permit = semaphore.clone().acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => break,
            },
        };

        let next = tokio::select! {
            _ = shutdown_rx.changed() => break,
            next = deliveries.next() => next,
        };

        match next {
            Some(Ok(delivery)) => {
                let handler = handler.clone();
                tokio::spawn(async move {
                    let _permit = permit;
                    handler.handle(delivery).await;
                });
            }
            Some(Err(e)) => {
                tracing::warn!(queue = %queue, error = %e, "Failed to receive message");
            }
            None => {
                tracing::info!(queue = %queue, "Queue stream ended");
                break;
            }
        }
    }

    // Wait for in-flight tasks by taking every permit back
    let _ = semaphore.acquire_many(max_concurrent as u32).await;
    tracing::info!(queue = %queue, handler = handler.name(), "Consume loop stopped");
}
