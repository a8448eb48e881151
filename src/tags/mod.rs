//! Template tags.
//!
//! Tags serve two purposes: the listing query matches search text against
//! tag names, and the assembler renders each template's tags as a hashtag
//! line ("#science #starter").

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use sqlx::PgPool;
use thiserror::Error;

use crate::postgres::PostgresPool;
use crate::template::TemplateId;

/// Tag-specific error type
#[derive(Debug, Error)]
pub enum TagStoreError {
    #[error("Database error: {0}")]
    Postgres(#[from] sqlx::Error),
}

/// Result type for tag operations
pub type TagResult<T> = Result<T, TagStoreError>;

/// Read access to template tags.
#[async_trait]
pub trait TagProvider: Send + Sync {
    /// Tag names for a template, in their stored display order.
    async fn tags_of(&self, template: TemplateId) -> TagResult<Vec<String>>;
}

/// PostgreSQL tag provider.
///
/// Table structure:
/// - `tags` - tag names
/// - `template_tags` - template/tag links with a `seq` display order
pub struct PostgresTagProvider {
    pool: PgPool,
}

impl PostgresTagProvider {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TagProvider for PostgresTagProvider {
    async fn tags_of(&self, template: TemplateId) -> TagResult<Vec<String>> {
        let names: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT t.name
            FROM template_tags tt
            JOIN tags t ON t.id = tt.tag_id
            WHERE tt.template_id = $1
            ORDER BY tt.seq ASC
            "#,
        )
        .bind(template)
        .fetch_all(&self.pool)
        .await?;

        Ok(names)
    }
}

/// In-memory tag provider for tests and single-node development.
#[derive(Default)]
pub struct MemoryTagProvider {
    tags: DashMap<TemplateId, Vec<String>>,
}

impl MemoryTagProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the tag list for a template.
    pub fn set_tags(&self, template: TemplateId, tags: Vec<String>) {
        self.tags.insert(template, tags);
    }
}

#[async_trait]
impl TagProvider for MemoryTagProvider {
    async fn tags_of(&self, template: TemplateId) -> TagResult<Vec<String>> {
        Ok(self
            .tags
            .get(&template)
            .map(|t| t.clone())
            .unwrap_or_default())
    }
}

/// Create a tag provider: PostgreSQL when a pool is available, otherwise
/// the in-memory provider.
pub fn create_tag_provider(postgres_pool: Option<Arc<PostgresPool>>) -> Arc<dyn TagProvider> {
    match postgres_pool {
        Some(pool) => {
            tracing::info!(backend = "postgres", "Creating PostgreSQL tag provider");
            Arc::new(PostgresTagProvider::new(pool.pool().clone()))
        }
        None => {
            tracing::info!(backend = "memory", "Creating memory tag provider");
            Arc::new(MemoryTagProvider::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_provider_preserves_order() {
        let provider = MemoryTagProvider::new();
        provider.set_tags(1, vec!["science".to_string(), "starter".to_string()]);

        let tags = provider.tags_of(1).await.unwrap();
        assert_eq!(tags, vec!["science", "starter"]);
    }

    #[tokio::test]
    async fn test_memory_provider_unknown_template_is_empty() {
        let provider = MemoryTagProvider::new();
        assert!(provider.tags_of(99).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_memory_provider_replaces_tags() {
        let provider = MemoryTagProvider::new();
        provider.set_tags(1, vec!["old".to_string()]);
        provider.set_tags(1, vec!["new".to_string()]);

        let tags = provider.tags_of(1).await.unwrap();
        assert_eq!(tags, vec!["new"]);
    }
}
