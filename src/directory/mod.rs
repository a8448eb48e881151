//! User directory lookups.
//!
//! Restriction evaluation needs to know which cohorts a user belongs to
//! and which roles they hold in the course being viewed. Both are resolved
//! fresh for every listing request; nothing here is cached.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use sqlx::PgPool;
use thiserror::Error;

use crate::postgres::PostgresPool;
use crate::template::{CohortId, CourseId, RoleId, UserId};

/// Directory-specific error type
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("Database error: {0}")]
    Postgres(#[from] sqlx::Error),
}

/// Result type for directory operations
pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Read access to user membership data.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Cohorts the user belongs to.
    async fn cohorts_of(&self, user: UserId) -> DirectoryResult<HashSet<CohortId>>;

    /// Roles the user holds in the given course.
    async fn roles_of(&self, user: UserId, course: CourseId) -> DirectoryResult<HashSet<RoleId>>;
}

/// PostgreSQL directory.
///
/// Table structure:
/// - `cohort_members` - cohort/user membership links
/// - `course_role_assignments` - per-course role assignments
pub struct PostgresDirectory {
    pool: PgPool,
}

impl PostgresDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Directory for PostgresDirectory {
    async fn cohorts_of(&self, user: UserId) -> DirectoryResult<HashSet<CohortId>> {
        let ids: Vec<i64> =
            sqlx::query_scalar("SELECT cohort_id FROM cohort_members WHERE user_id = $1")
                .bind(user)
                .fetch_all(&self.pool)
                .await?;

        Ok(ids.into_iter().collect())
    }

    async fn roles_of(&self, user: UserId, course: CourseId) -> DirectoryResult<HashSet<RoleId>> {
        let ids: Vec<i64> = sqlx::query_scalar(
            "SELECT role_id FROM course_role_assignments WHERE user_id = $1 AND course_id = $2",
        )
        .bind(user)
        .bind(course)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids.into_iter().collect())
    }
}

/// In-memory directory for tests and single-node development.
#[derive(Default)]
pub struct MemoryDirectory {
    cohorts: DashMap<UserId, HashSet<CohortId>>,
    roles: DashMap<(UserId, CourseId), HashSet<RoleId>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a user to a cohort.
    pub fn add_cohort_member(&self, cohort: CohortId, user: UserId) {
        self.cohorts.entry(user).or_default().insert(cohort);
    }

    /// Assign a role to a user within a course.
    pub fn assign_role(&self, user: UserId, course: CourseId, role: RoleId) {
        self.roles.entry((user, course)).or_default().insert(role);
    }
}

#[async_trait]
impl Directory for MemoryDirectory {
    async fn cohorts_of(&self, user: UserId) -> DirectoryResult<HashSet<CohortId>> {
        Ok(self.cohorts.get(&user).map(|c| c.clone()).unwrap_or_default())
    }

    async fn roles_of(&self, user: UserId, course: CourseId) -> DirectoryResult<HashSet<RoleId>> {
        Ok(self
            .roles
            .get(&(user, course))
            .map(|r| r.clone())
            .unwrap_or_default())
    }
}

/// Create a directory: PostgreSQL when a pool is available, otherwise the
/// in-memory directory.
pub fn create_directory(postgres_pool: Option<Arc<PostgresPool>>) -> Arc<dyn Directory> {
    match postgres_pool {
        Some(pool) => {
            tracing::info!(backend = "postgres", "Creating PostgreSQL directory");
            Arc::new(PostgresDirectory::new(pool.pool().clone()))
        }
        None => {
            tracing::info!(backend = "memory", "Creating memory directory");
            Arc::new(MemoryDirectory::new())
        }
    }
}
