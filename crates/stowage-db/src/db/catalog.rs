use stowage_core::models::{FileData, FileRecord, FileRequest};
use stowage_core::AppError;
use uuid::Uuid;

/// Trait for metadata catalog operations
/// This abstracts the database implementation (PostgreSQL or in-memory)
#[async_trait::async_trait]
pub trait Catalog: Send + Sync {
    /// Persist a file record and associate its tags. Tags are shared by name.
    async fn save_file_data(&self, data: &FileData) -> Result<FileRecord, AppError>;

    /// Names of the files matching every filter in `request`, oldest first
    async fn find_file_names(&self, request: &FileRequest) -> Result<Vec<String>, AppError>;

    /// Fetch a record with its tags
    async fn get_file(&self, id: Uuid) -> Result<Option<FileRecord>, AppError>;
}
