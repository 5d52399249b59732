use super::catalog::Catalog;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use stowage_core::models::{FileData, FileRecord, FileRequest, Tag};
use stowage_core::AppError;
use uuid::Uuid;

#[derive(Default)]
struct CatalogState {
    files: Vec<FileRecord>,
    tags: Vec<Tag>,
}

/// In-process catalog with the same matching rules as [`super::PgCatalog`]
#[derive(Default)]
pub struct MemoryCatalog {
    state: Mutex<CatalogState>,
    unavailable: AtomicBool,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every operation fail with a storage error, as a lost database connection would
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn file_count(&self) -> usize {
        self.lock().files.len()
    }

    pub fn tag_count(&self) -> usize {
        self.lock().tags.len()
    }

    /// Every stored record, oldest first
    pub fn records(&self) -> Vec<FileRecord> {
        self.lock().files.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CatalogState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_available(&self) -> Result<(), AppError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(sqlx::Error::PoolTimedOut.into());
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Catalog for MemoryCatalog {
    async fn save_file_data(&self, data: &FileData) -> Result<FileRecord, AppError> {
        self.check_available()?;
        let mut state = self.lock();

        let mut tags = Vec::new();
        for name in data.tags() {
            let tag = match state.tags.iter().find(|t| t.name == name) {
                Some(existing) => existing.clone(),
                None => {
                    let tag = Tag {
                        id: Uuid::new_v4(),
                        name,
                    };
                    state.tags.push(tag.clone());
                    tag
                }
            };
            tags.push(tag);
        }

        let now = Utc::now();
        let record = FileRecord {
            id: Uuid::new_v4(),
            file_name: data.file_name.clone(),
            file_type: data.content_type().to_string(),
            file_size: data.file_size,
            created_at: now,
            updated_at: now,
            tags,
        };
        state.files.push(record.clone());

        Ok(record)
    }

    async fn find_file_names(&self, request: &FileRequest) -> Result<Vec<String>, AppError> {
        self.check_available()?;
        let required = request.tag_filter();
        let state = self.lock();

        let mut matches: Vec<&FileRecord> = state
            .files
            .iter()
            .filter(|f| {
                request
                    .name_filter()
                    .map_or(true, |name| f.file_name.contains(name))
            })
            .filter(|f| {
                required
                    .iter()
                    .all(|tag| f.tags.iter().any(|t| &t.name == tag))
            })
            .collect();
        // Stable, so records created in the same instant keep insertion order
        matches.sort_by_key(|f| f.created_at);

        Ok(matches.into_iter().map(|f| f.file_name.clone()).collect())
    }

    async fn get_file(&self, id: Uuid) -> Result<Option<FileRecord>, AppError> {
        self.check_available()?;
        Ok(self.lock().files.iter().find(|f| f.id == id).cloned())
    }
}
