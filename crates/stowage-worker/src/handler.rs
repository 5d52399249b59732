//! Message handler trait
//!
//! The coordinators implement this trait. The consume loop calls `handle` for every
//! delivery on the handler's own task; the handler owns logging of its failures.

use async_trait::async_trait;
use stowage_core::{AppError, ErrorMetadata};

use crate::channel::Delivery;

/// Processing of a single delivery
#[async_trait]
pub trait MessageHandler: Send + Sync + 'static {
    /// Short name used in log fields (e.g., "ingest")
    fn name(&self) -> &'static str;

    /// Process one delivery. Failures are logged and the message is dropped.
    async fn handle(&self, delivery: Delivery);
}

/// Log a per-message failure. Every dropped message is an error for the operator.
pub(crate) fn log_dropped(handler: &'static str, err: &AppError) {
    tracing::error!(
        handler,
        error_code = err.error_code(),
        error_type = err.error_type(),
        recoverable = err.is_recoverable(),
        error = %err.detailed_message(),
        "Message dropped"
    );
}
