//! Template file attachments.
//!
//! Two file areas matter to a listing: `backup` holds the course archive an
//! import unpacks (absence means the build job has not produced one yet),
//! and `background` holds the tile images shown on the entitled tier.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::postgres::PostgresPool;
use crate::template::TemplateId;

/// File-store error type
#[derive(Debug, Error)]
pub enum FileStoreError {
    #[error("Database error: {0}")]
    Postgres(#[from] sqlx::Error),
}

/// Result type for file operations
pub type FileResult<T> = Result<T, FileStoreError>;

/// A stored file attached to a template.
#[derive(Debug, Clone)]
pub struct StoredFile {
    /// File identifier
    pub id: Uuid,

    /// Original filename
    pub filename: String,

    /// Declared MIME type
    pub mimetype: String,
}

/// A background image reference ready for presentation.
#[derive(Debug, Clone, Serialize)]
pub struct ImageRef {
    /// File identifier
    pub id: Uuid,

    /// URL the image is served from
    pub url: String,
}

/// URL a background image is served from.
fn background_image_url(file_base_url: &str, template: TemplateId, filename: &str) -> String {
    format!(
        "{}/templates/{}/background/{}",
        file_base_url.trim_end_matches('/'),
        template,
        filename
    )
}

/// Read access to template file areas.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Backup archives attached to a template.
    async fn files_for(&self, template: TemplateId) -> FileResult<Vec<StoredFile>>;

    /// Background images attached to a template, as presentation refs.
    async fn background_images_for(&self, template: TemplateId) -> FileResult<Vec<ImageRef>>;
}

/// PostgreSQL file store.
///
/// Table structure:
/// - `template_files` - one row per stored file, with an `area` column
///   (`backup` or `background`) selecting the file area
pub struct PostgresFileStore {
    pool: PgPool,
    file_base_url: String,
}

impl PostgresFileStore {
    pub fn new(pool: PgPool, file_base_url: String) -> Self {
        Self {
            pool,
            file_base_url,
        }
    }
}

#[async_trait]
impl FileStore for PostgresFileStore {
    async fn files_for(&self, template: TemplateId) -> FileResult<Vec<StoredFile>> {
        let rows: Vec<(Uuid, String, String)> = sqlx::query_as(
            r#"
            SELECT id, filename, mimetype
            FROM template_files
            WHERE template_id = $1 AND area = 'backup'
            ORDER BY filename ASC
            "#,
        )
        .bind(template)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, filename, mimetype)| StoredFile {
                id,
                filename,
                mimetype,
            })
            .collect())
    }

    async fn background_images_for(&self, template: TemplateId) -> FileResult<Vec<ImageRef>> {
        let rows: Vec<(Uuid, String)> = sqlx::query_as(
            r#"
            SELECT id, filename
            FROM template_files
            WHERE template_id = $1 AND area = 'background'
            ORDER BY filename ASC
            "#,
        )
        .bind(template)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, filename)| ImageRef {
                id,
                url: background_image_url(&self.file_base_url, template, &filename),
            })
            .collect())
    }
}

/// In-memory file store for tests and single-node development.
pub struct MemoryFileStore {
    backups: DashMap<TemplateId, Vec<StoredFile>>,
    backgrounds: DashMap<TemplateId, Vec<ImageRef>>,
    file_base_url: String,
}

impl MemoryFileStore {
    pub fn new(file_base_url: String) -> Self {
        Self {
            backups: DashMap::new(),
            backgrounds: DashMap::new(),
            file_base_url,
        }
    }

    /// Attach a backup archive to a template.
    pub fn add_backup(&self, template: TemplateId, filename: &str) {
        self.backups
            .entry(template)
            .or_default()
            .push(StoredFile {
                id: Uuid::new_v4(),
                filename: filename.to_string(),
                mimetype: "application/x-course-backup".to_string(),
            });
    }

    /// Attach a background image to a template.
    pub fn add_background_image(&self, template: TemplateId, filename: &str) {
        let url = background_image_url(&self.file_base_url, template, filename);
        self.backgrounds.entry(template).or_default().push(ImageRef {
            id: Uuid::new_v4(),
            url,
        });
    }
}

#[async_trait]
impl FileStore for MemoryFileStore {
    async fn files_for(&self, template: TemplateId) -> FileResult<Vec<StoredFile>> {
        Ok(self
            .backups
            .get(&template)
            .map(|f| f.clone())
            .unwrap_or_default())
    }

    async fn background_images_for(&self, template: TemplateId) -> FileResult<Vec<ImageRef>> {
        Ok(self
            .backgrounds
            .get(&template)
            .map(|f| f.clone())
            .unwrap_or_default())
    }
}

/// Create a file store: PostgreSQL when a pool is available, otherwise the
/// in-memory store.
pub fn create_file_store(
    file_base_url: &str,
    postgres_pool: Option<Arc<PostgresPool>>,
) -> Arc<dyn FileStore> {
    match postgres_pool {
        Some(pool) => {
            tracing::info!(backend = "postgres", "Creating PostgreSQL file store");
            Arc::new(PostgresFileStore::new(
                pool.pool().clone(),
                file_base_url.to_string(),
            ))
        }
        None => {
            tracing::info!(backend = "memory", "Creating memory file store");
            Arc::new(MemoryFileStore::new(file_base_url.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_backups() {
        let store = MemoryFileStore::new("/files".to_string());
        store.add_backup(7, "course-backup.zip");

        let files = store.files_for(7).await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].filename, "course-backup.zip");

        assert!(store.files_for(8).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_memory_store_background_urls() {
        let store = MemoryFileStore::new("/files/".to_string());
        store.add_background_image(7, "one.png");
        store.add_background_image(7, "two.png");

        let images = store.background_images_for(7).await.unwrap();
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].url, "/files/templates/7/background/one.png");
    }

    #[test]
    fn test_background_image_url_trims_slash() {
        assert_eq!(
            background_image_url("/files/", 3, "a.png"),
            "/files/templates/3/background/a.png"
        );
        assert_eq!(
            background_image_url("https://cdn.example.com/files", 3, "a.png"),
            "https://cdn.example.com/files/templates/3/background/a.png"
        );
    }
}
