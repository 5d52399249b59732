//! Storage volume accounting
//!
//! Sums the size of every regular file under a storage root and decides whether an
//! incoming file still fits the configured ceiling. Check-then-write sequences are
//! serialised per root through [`VolumeAccountant::reserve`].

use crate::traits::{StorageError, StorageResult};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::fs;
use tokio::sync::OwnedMutexGuard;

/// Outcome of a quota check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaCheck {
    /// Bytes currently stored under the root
    pub current: u64,
    /// Declared size of the incoming file
    pub incoming: u64,
    pub limit: u64,
}

impl QuotaCheck {
    pub fn is_within_limit(&self) -> bool {
        self.current.saturating_add(self.incoming) <= self.limit
    }
}

/// Exclusive hold on a storage root, released on drop
pub struct QuotaGuard {
    root: PathBuf,
    _guard: OwnedMutexGuard<()>,
}

impl QuotaGuard {
    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Computes on-disk usage and enforces the byte ceiling
#[derive(Default)]
pub struct VolumeAccountant {
    locks: Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>,
}

impl VolumeAccountant {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the per-root lock. Hold the guard across the quota check and the object write
    /// so concurrent ingestions cannot both pass the check.
    pub async fn reserve(&self, root: &Path) -> QuotaGuard {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            locks
                .entry(root.to_path_buf())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
                .clone()
        };

        QuotaGuard {
            root: root.to_path_buf(),
            _guard: lock.lock_owned().await,
        }
    }

    /// Total size of regular files under `root`, creating the root if missing
    pub async fn current_usage(&self, root: &Path) -> StorageResult<u64> {
        fs::create_dir_all(root).await.map_err(|e| {
            StorageError::WriteFailed(format!(
                "Failed to create storage directory {}: {}",
                root.display(),
                e
            ))
        })?;

        let mut total = 0u64;
        let mut pending = vec![root.to_path_buf()];

        while let Some(dir) = pending.pop() {
            let mut entries = fs::read_dir(&dir).await.map_err(|e| {
                StorageError::ReadFailed(format!("Failed to walk {}: {}", dir.display(), e))
            })?;

            while let Some(entry) = entries.next_entry().await.map_err(|e| {
                StorageError::ReadFailed(format!("Failed to walk {}: {}", dir.display(), e))
            })? {
                let metadata = fs::symlink_metadata(entry.path()).await?;
                if metadata.is_dir() {
                    pending.push(entry.path());
                } else if metadata.is_file() {
                    total = total.saturating_add(metadata.len());
                }
            }
        }

        Ok(total)
    }

    /// Measure `root` and compare against `limit_bytes`.
    ///
    /// `incoming_bytes` is what the write will add to the volume, i.e. the sealed size.
    #[tracing::instrument(skip(self), fields(root = %root.display()))]
    pub async fn check(
        &self,
        root: &Path,
        incoming_bytes: u64,
        limit_bytes: u64,
    ) -> StorageResult<QuotaCheck> {
        let check = QuotaCheck {
            current: self.current_usage(root).await?,
            incoming: incoming_bytes,
            limit: limit_bytes,
        };

        tracing::debug!(
            current_bytes = check.current,
            incoming_bytes = check.incoming,
            limit_bytes = check.limit,
            within_limit = check.is_within_limit(),
            "Storage volume measured"
        );

        Ok(check)
    }

    /// `current + incoming <= limit` for the files under `root`. Negative sizes count as zero.
    pub async fn is_within_limit(
        &self,
        root: &Path,
        incoming_size: i64,
        limit_bytes: u64,
    ) -> StorageResult<bool> {
        Ok(self
            .check(root, incoming_size.max(0) as u64, limit_bytes)
            .await?
            .is_within_limit())
    }
}
