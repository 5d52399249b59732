use super::catalog::Catalog;
use super::query::build_query;
use anyhow::Context;
use sqlx::{PgPool, Postgres};
use std::path::Path;
use stowage_core::models::{FileData, FileRecord, FileRequest, Tag};
use stowage_core::AppError;
use uuid::Uuid;

/// Apply pending migrations from the workspace `migrations/` directory
pub async fn migrate(pool: &PgPool) -> anyhow::Result<()> {
    let migrations_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../migrations");
    let migrator = sqlx::migrate::Migrator::new(migrations_dir)
        .await
        .context("Failed to load migrations")?;
    migrator
        .run(pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database migrations applied");
    Ok(())
}

/// PostgreSQL catalog of file records and tags
#[derive(Clone)]
pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn tags_for(&self, file_id: Uuid) -> Result<Vec<Tag>, AppError> {
        let tags = sqlx::query_as::<Postgres, Tag>(
            r#"
            SELECT t.id, t.name
            FROM tags t
            JOIN file_tags ft ON ft.tag_id = t.id
            WHERE ft.file_id = $1
            ORDER BY t.name ASC
            "#,
        )
        .bind(file_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(tags)
    }
}

#[async_trait::async_trait]
impl Catalog for PgCatalog {
    #[tracing::instrument(skip(self, data), fields(
        db.system = "postgresql",
        db.table = "files",
        db.operation = "insert",
        file_name = %data.file_name
    ))]
    async fn save_file_data(&self, data: &FileData) -> Result<FileRecord, AppError> {
        let mut tx = self.pool.begin().await?;

        let mut record = sqlx::query_as::<Postgres, FileRecord>(
            r#"
            INSERT INTO files (id, file_name, file_type, file_size)
            VALUES ($1, $2, $3, $4)
            RETURNING id, file_name, file_type, file_size, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&data.file_name)
        .bind(data.content_type())
        .bind(data.file_size)
        .fetch_one(&mut *tx)
        .await?;

        for name in data.tags() {
            // DO UPDATE so RETURNING yields the existing row on conflict
            let tag = sqlx::query_as::<Postgres, Tag>(
                r#"
                INSERT INTO tags (id, name)
                VALUES ($1, $2)
                ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
                RETURNING id, name
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(&name)
            .fetch_one(&mut *tx)
            .await?;

            sqlx::query(
                "INSERT INTO file_tags (file_id, tag_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
            .bind(record.id)
            .bind(tag.id)
            .execute(&mut *tx)
            .await?;

            record.tags.push(tag);
        }

        tx.commit().await?;

        tracing::debug!(
            file_id = %record.id,
            tag_count = record.tags.len(),
            "File metadata saved"
        );

        Ok(record)
    }

    #[tracing::instrument(skip(self), fields(db.system = "postgresql", db.table = "files", db.operation = "select"))]
    async fn find_file_names(&self, request: &FileRequest) -> Result<Vec<String>, AppError> {
        let mut query = build_query(request);
        let names = query
            .build_query_scalar::<String>()
            .fetch_all(&self.pool)
            .await?;

        tracing::debug!(matches = names.len(), "File lookup executed");
        Ok(names)
    }

    #[tracing::instrument(skip(self), fields(db.table = "files", db.operation = "select", db.record_id = %id))]
    async fn get_file(&self, id: Uuid) -> Result<Option<FileRecord>, AppError> {
        let record = sqlx::query_as::<Postgres, FileRecord>(
            "SELECT id, file_name, file_type, file_size, created_at, updated_at FROM files WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match record {
            Some(mut record) => {
                record.tags = self.tags_for(record.id).await?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }
}
