//! Stowage Core Library
//!
//! This crate provides the domain models, error types, configuration and the object
//! cipher shared by every Stowage component.

pub mod config;
pub mod encryption;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use config::{Config, QueueNames};
pub use encryption::{sealed_len, ObjectCipher, ENCRYPTED_SUFFIX, NONCE_LEN};
pub use error::{AppError, AppResult, ErrorMetadata};
