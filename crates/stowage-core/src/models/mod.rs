//! Data models for the pipeline
//!
//! Wire records exchanged over the broker (`FileData`, `FileRequest`) and the catalog
//! entities they are projected into (`FileRecord`, `Tag`).

mod file;
mod request;

pub use file::*;
pub use request::*;

use serde::{Deserialize, Deserializer};

/// Treat an explicit JSON `null` like a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Trim, drop blanks and duplicates, keep first-seen order.
pub(crate) fn normalize_tags<'a>(tags: impl IntoIterator<Item = &'a String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    out
}
