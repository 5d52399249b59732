//! Stowage Storage Library
//!
//! Durable storage for file content. Objects are encrypted before they touch the disk and
//! live under a single storage root; the [`VolumeAccountant`] keeps the total size of that
//! root under a byte ceiling.
//!
//! # Object layout
//!
//! A file named `report.pdf` is stored at `{root}/report.pdf.encrypted`. The same file
//! name always maps to the same object, so a later upload overwrites an earlier one.
//! Names must not contain `..`, a path separator or a leading `/`. Path derivation is
//! centralized in the `keys` module.

pub(crate) mod keys;
pub mod local;
pub mod quota;
pub mod traits;

// Re-export commonly used types
pub use keys::{object_path, validate_file_name};
pub use local::{decrypt, encrypt_and_store, EncryptedObjectStore};
pub use quota::{QuotaCheck, QuotaGuard, VolumeAccountant};
pub use traits::{ObjectStore, StorageError, StorageResult};
