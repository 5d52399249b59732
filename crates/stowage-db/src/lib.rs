//! Stowage metadata catalog
//!
//! Persists file records and their tags in PostgreSQL and answers name/tag lookups.
//! [`MemoryCatalog`] provides the same semantics in process for tests and local runs.

pub mod db;

pub use db::{build_query, escape_like, migrate, Catalog, MemoryCatalog, PgCatalog};
