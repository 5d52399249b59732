//! Lookup coordinator
//!
//! Decodes a `FileRequest`, queries the catalog and publishes the matching names as a JSON
//! array on the response queue. The request's correlation id, if any, travels with the
//! response.

use async_trait::async_trait;
use std::sync::Arc;
use stowage_core::models::FileRequest;
use stowage_core::AppResult;
use stowage_db::Catalog;

use crate::channel::{Delivery, MessageChannel, OutgoingMessage};
use crate::handler::{log_dropped, MessageHandler};

pub struct LookupCoordinator {
    catalog: Arc<dyn Catalog>,
    channel: Arc<dyn MessageChannel>,
    response_queue: String,
}

impl LookupCoordinator {
    pub fn new(
        catalog: Arc<dyn Catalog>,
        channel: Arc<dyn MessageChannel>,
        response_queue: impl Into<String>,
    ) -> Self {
        Self {
            catalog,
            channel,
            response_queue: response_queue.into(),
        }
    }

    /// Answer a delivered request. Returns the names that were published.
    #[tracing::instrument(skip(self, delivery), fields(correlation_id = ?delivery.correlation_id))]
    pub async fn respond(&self, delivery: &Delivery) -> AppResult<Vec<String>> {
        let request: FileRequest = serde_json::from_slice(&delivery.payload)?;

        if request.is_unfiltered() {
            tracing::debug!("Lookup without filters matches every file");
        }

        let names = self.catalog.find_file_names(&request).await?;
        let payload = serde_json::to_vec(&names)?;

        let mut response = OutgoingMessage::new(payload);
        response.correlation_id = delivery.correlation_id.clone();
        self.channel.publish(&self.response_queue, response).await?;

        tracing::info!(
            name_filter = request.name_filter().unwrap_or(""),
            tag_filter = ?request.tag_filter(),
            matches = names.len(),
            "Lookup answered"
        );

        Ok(names)
    }
}

#[async_trait]
impl MessageHandler for LookupCoordinator {
    fn name(&self) -> &'static str {
        "lookup"
    }

    async fn handle(&self, delivery: Delivery) {
        if let Err(err) = self.respond(&delivery).await {
            log_dropped(self.name(), &err);
        }
    }
}
