//! Course and template persistence.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use dashmap::DashMap;
use sqlx::PgPool;
use thiserror::Error;

use super::query::{ListQuery, SqlParam};
use crate::metrics::BackendMetrics;
use crate::postgres::PostgresPool;
use crate::template::{Course, CourseId, Template, TemplateId, TemplateRow, TextFormat, ViewMode};

/// Store error type
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Course not found: {0}")]
    CourseNotFound(CourseId),

    #[error("Database error: {0}")]
    Postgres(#[from] sqlx::Error),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Read access to courses and listing candidates.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Fetch the course hosting the listing.
    async fn fetch_course(&self, course: CourseId) -> StoreResult<Course>;

    /// Fetch listing candidates in final presentation order.
    async fn fetch_templates(&self, query: &ListQuery) -> StoreResult<Vec<Template>>;
}

/// PostgreSQL catalog store.
///
/// Table structure:
/// - `templates` - template rows; restriction id lists are JSON text
///   columns parsed once at the row boundary
/// - `courses` - course records with category, view mode and instructions
pub struct PostgresCatalogStore {
    pool: PgPool,
}

impl PostgresCatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogStore for PostgresCatalogStore {
    async fn fetch_course(&self, course: CourseId) -> StoreResult<Course> {
        let started = Instant::now();
        let row: Option<(i64, String, i64, i16, Option<String>, i16)> = sqlx::query_as(
            r#"
            SELECT id, fullname, category_id, templates_view, instructions, instructions_format
            FROM courses
            WHERE id = $1
            "#,
        )
        .bind(course)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            BackendMetrics::record_error("postgres", "fetch_course");
            e
        })?;
        BackendMetrics::record_latency("postgres", "fetch_course", started.elapsed().as_secs_f64());

        let (id, fullname, category_id, templates_view, instructions, instructions_format) =
            row.ok_or(StoreError::CourseNotFound(course))?;

        Ok(Course {
            id,
            fullname,
            category_id,
            templates_view: ViewMode::from_code(templates_view),
            instructions: instructions.filter(|i| !i.trim().is_empty()),
            instructions_format: TextFormat::from_code(instructions_format),
        })
    }

    async fn fetch_templates(&self, query: &ListQuery) -> StoreResult<Vec<Template>> {
        let started = Instant::now();
        let select = query.build();

        let mut fetch = sqlx::query_as::<_, TemplateRow>(&select.sql);
        for param in &select.params {
            fetch = match param {
                SqlParam::Text(text) => fetch.bind(text.clone()),
                SqlParam::Int(value) => fetch.bind(*value),
            };
        }

        let rows = fetch.fetch_all(&self.pool).await.map_err(|e| {
            BackendMetrics::record_error("postgres", "fetch_templates");
            e
        })?;
        BackendMetrics::record_latency(
            "postgres",
            "fetch_templates",
            started.elapsed().as_secs_f64(),
        );

        tracing::trace!(candidates = rows.len(), "Fetched listing candidates");

        Ok(rows.into_iter().map(Template::from).collect())
    }
}

/// In-memory catalog store for tests and single-node development.
///
/// Applies the same candidate semantics as the SQL query: hidden and
/// unpublished rows are dropped, search matches title, description or tag
/// names case-insensitively, and the ordering list both restricts and
/// sorts.
#[derive(Default)]
pub struct MemoryCatalogStore {
    courses: DashMap<CourseId, Course>,
    templates: DashMap<TemplateId, TemplateRow>,
    tag_names: DashMap<TemplateId, Vec<String>>,
}

impl MemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a course.
    pub fn insert_course(&self, course: Course) {
        self.courses.insert(course.id, course);
    }

    /// Insert or replace a template row.
    pub fn insert_template(&self, row: TemplateRow) {
        self.templates.insert(row.id, row);
    }

    /// Insert a template together with the tag names search should match.
    pub fn insert_template_with_tags(&self, row: TemplateRow, tags: Vec<String>) {
        self.tag_names.insert(row.id, tags);
        self.insert_template(row);
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalogStore {
    async fn fetch_course(&self, course: CourseId) -> StoreResult<Course> {
        self.courses
            .get(&course)
            .map(|c| c.clone())
            .ok_or(StoreError::CourseNotFound(course))
    }

    async fn fetch_templates(&self, query: &ListQuery) -> StoreResult<Vec<Template>> {
        let mut rows: Vec<TemplateRow> = self
            .templates
            .iter()
            .filter(|entry| entry.visible && entry.status)
            .map(|entry| entry.value().clone())
            .collect();

        if let Some(search) = &query.search {
            rows.retain(|row| {
                search.matches(&row.title)
                    || search.matches(&row.description)
                    || self
                        .tag_names
                        .get(&row.id)
                        .map(|tags| tags.iter().any(|tag| search.matches(tag)))
                        .unwrap_or(false)
            });
        }

        if query.ordering.is_empty() {
            rows.sort_by_key(|row| row.id);
        } else {
            let rank: HashMap<TemplateId, usize> = query
                .ordering
                .iter()
                .enumerate()
                .map(|(position, id)| (*id, position))
                .collect();
            rows.retain(|row| rank.contains_key(&row.id));
            rows.sort_by_key(|row| rank.get(&row.id).copied().unwrap_or(usize::MAX));
        }

        Ok(rows.into_iter().map(Template::from).collect())
    }
}

/// Create a catalog store: PostgreSQL when a pool is available, otherwise
/// the in-memory store.
pub fn create_catalog_store(postgres_pool: Option<Arc<PostgresPool>>) -> Arc<dyn CatalogStore> {
    match postgres_pool {
        Some(pool) => {
            tracing::info!(backend = "postgres", "Creating PostgreSQL catalog store");
            Arc::new(PostgresCatalogStore::new(pool.pool().clone()))
        }
        None => {
            tracing::info!(backend = "memory", "Creating memory catalog store");
            Arc::new(MemoryCatalogStore::new())
        }
    }
}
