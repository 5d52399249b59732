//! Stowage worker
//!
//! Consumes upload and lookup messages from the broker. The ingestion coordinator persists
//! metadata, enforces the storage quota and writes encrypted objects; the lookup
//! coordinator queries the catalog and publishes the matching file names.

pub mod channel;
pub mod handler;
pub mod ingest;
pub mod lookup;
pub mod pipeline;

pub use channel::{
    correlated_subject, Delivery, DeliveryStream, MemoryChannel, MessageChannel, NatsChannel,
    OutgoingMessage, CORRELATION_ID_HEADER,
};
pub use handler::MessageHandler;
pub use ingest::{IngestCoordinator, IngestOutcome};
pub use lookup::LookupCoordinator;
pub use pipeline::{Pipeline, PipelineConfig, ShutdownHandle};
