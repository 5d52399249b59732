use crate::keys::{object_path, with_encrypted_suffix};
use crate::traits::{ObjectStore, StorageError, StorageResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use stowage_core::ObjectCipher;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Encrypt `data` under `key` and write it to `destination` + `.encrypted`.
///
/// Parent directories are created and the file is synced before returning. Returns the
/// path written.
pub async fn encrypt_and_store(
    data: &[u8],
    destination: &Path,
    key: &[u8],
) -> StorageResult<PathBuf> {
    let cipher = ObjectCipher::from_key_bytes(key)?;
    write_sealed(&cipher, data, &with_encrypted_suffix(destination)).await
}

/// Read the object at `source` and decrypt it under `key`
pub async fn decrypt(source: &Path, key: &[u8]) -> StorageResult<Vec<u8>> {
    let cipher = ObjectCipher::from_key_bytes(key)?;
    read_sealed(&cipher, source).await
}

async fn write_sealed(cipher: &ObjectCipher, data: &[u8], path: &Path) -> StorageResult<PathBuf> {
    let start = std::time::Instant::now();
    let sealed = cipher.encrypt(data)?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await.map_err(|e| {
            StorageError::WriteFailed(format!(
                "Failed to create directory {}: {}",
                parent.display(),
                e
            ))
        })?;
    }

    let mut file = fs::File::create(path).await.map_err(|e| {
        StorageError::WriteFailed(format!("Failed to create file {}: {}", path.display(), e))
    })?;

    file.write_all(&sealed).await.map_err(|e| {
        StorageError::WriteFailed(format!("Failed to write file {}: {}", path.display(), e))
    })?;

    file.sync_all().await.map_err(|e| {
        StorageError::WriteFailed(format!("Failed to sync file {}: {}", path.display(), e))
    })?;

    tracing::info!(
        path = %path.display(),
        plaintext_bytes = data.len(),
        stored_bytes = sealed.len(),
        key_bits = cipher.key_bits(),
        duration_ms = start.elapsed().as_secs_f64() * 1000.0,
        "Encrypted object written"
    );

    Ok(path.to_path_buf())
}

async fn read_sealed(cipher: &ObjectCipher, path: &Path) -> StorageResult<Vec<u8>> {
    let start = std::time::Instant::now();

    let sealed = fs::read(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            StorageError::NotFound(path.display().to_string())
        } else {
            StorageError::ReadFailed(format!("Failed to read file {}: {}", path.display(), e))
        }
    })?;

    let plaintext = cipher.decrypt(&sealed)?;

    tracing::debug!(
        path = %path.display(),
        stored_bytes = sealed.len(),
        plaintext_bytes = plaintext.len(),
        duration_ms = start.elapsed().as_secs_f64() * 1000.0,
        "Encrypted object read"
    );

    Ok(plaintext)
}

/// Encrypted objects on the local filesystem
#[derive(Clone)]
pub struct EncryptedObjectStore {
    root: PathBuf,
    cipher: ObjectCipher,
}

impl EncryptedObjectStore {
    /// Create a store rooted at `root`, creating the directory if missing
    ///
    /// # Arguments
    /// * `root` - Directory holding every object (e.g., "./storage")
    /// * `key` - Raw key bytes, 16 (AES-128) or 32 (AES-256) long
    pub async fn new(root: impl Into<PathBuf>, key: &[u8]) -> StorageResult<Self> {
        let root = root.into();
        let cipher = ObjectCipher::from_key_bytes(key)?;

        fs::create_dir_all(&root).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                root.display(),
                e
            ))
        })?;

        Ok(Self { root, cipher })
    }
}

#[async_trait]
impl ObjectStore for EncryptedObjectStore {
    async fn put(&self, file_name: &str, data: &[u8]) -> StorageResult<PathBuf> {
        let path = object_path(&self.root, file_name)?;
        write_sealed(&self.cipher, data, &path).await
    }

    async fn get(&self, file_name: &str) -> StorageResult<Vec<u8>> {
        let path = object_path(&self.root, file_name)?;
        read_sealed(&self.cipher, &path).await
    }

    async fn exists(&self, file_name: &str) -> StorageResult<bool> {
        let path = object_path(&self.root, file_name)?;
        Ok(fs::try_exists(&path).await?)
    }

    fn root(&self) -> &Path {
        &self.root
    }
}
