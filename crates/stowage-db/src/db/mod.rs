//! Catalog implementations for the data access layer
//!
//! `catalog` holds the trait the pipeline depends on, `files` the PostgreSQL repository,
//! `memory` the in-process one and `query` the lookup query builder they share semantics
//! with.

pub mod catalog;
pub mod files;
pub mod memory;
pub mod query;

pub use catalog::Catalog;
pub use files::{migrate, PgCatalog};
pub use memory::MemoryCatalog;
pub use query::{build_query, escape_like};
