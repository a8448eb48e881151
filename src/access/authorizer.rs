//! Template management authorization.
//!
//! Users holding the `manage_templates` capability bypass restriction
//! checks and see management affordances in the listing page.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashSet;
use sqlx::PgPool;

use super::AccessResult;
use crate::postgres::PostgresPool;
use crate::template::{CourseId, UserId};

/// Capability name granting template management.
pub const MANAGE_TEMPLATES: &str = "manage_templates";

/// Decides whether a user may manage templates.
#[async_trait]
pub trait Authorizer: Send + Sync {
    /// Whether the user may manage templates for the given course.
    async fn can_manage_templates(&self, user: UserId, course: CourseId) -> AccessResult<bool>;
}

/// PostgreSQL authorizer backed by a capability grant table.
///
/// Table structure:
/// - `capability_grants` - user/capability pairs with an optional course
///   scope; a NULL `course_id` grant is site-wide
pub struct PostgresAuthorizer {
    pool: PgPool,
}

impl PostgresAuthorizer {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Authorizer for PostgresAuthorizer {
    async fn can_manage_templates(&self, user: UserId, course: CourseId) -> AccessResult<bool> {
        let found: Option<i32> = sqlx::query_scalar(
            r#"
            SELECT 1
            FROM capability_grants
            WHERE user_id = $1
              AND capability = $2
              AND (course_id IS NULL OR course_id = $3)
            LIMIT 1
            "#,
        )
        .bind(user)
        .bind(MANAGE_TEMPLATES)
        .bind(course)
        .fetch_optional(&self.pool)
        .await?;

        Ok(found.is_some())
    }
}

/// Static authorizer for tests and single-node development: a fixed set of
/// managing users, granted for every course.
#[derive(Default)]
pub struct StaticAuthorizer {
    managers: DashSet<UserId>,
}

impl StaticAuthorizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant template management to a user.
    pub fn grant(&self, user: UserId) {
        self.managers.insert(user);
    }
}

#[async_trait]
impl Authorizer for StaticAuthorizer {
    async fn can_manage_templates(&self, user: UserId, _course: CourseId) -> AccessResult<bool> {
        Ok(self.managers.contains(&user))
    }
}

/// Create an authorizer: PostgreSQL when a pool is available, otherwise the
/// static authorizer (which grants nothing until told to).
pub fn create_authorizer(postgres_pool: Option<Arc<PostgresPool>>) -> Arc<dyn Authorizer> {
    match postgres_pool {
        Some(pool) => {
            tracing::info!(backend = "postgres", "Creating PostgreSQL authorizer");
            Arc::new(PostgresAuthorizer::new(pool.pool().clone()))
        }
        None => {
            tracing::info!(backend = "static", "Creating static authorizer");
            Arc::new(StaticAuthorizer::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_authorizer_denies_by_default() {
        let authorizer = StaticAuthorizer::new();
        assert!(!authorizer.can_manage_templates(1, 100).await.unwrap());
    }

    #[tokio::test]
    async fn test_static_authorizer_grant_covers_all_courses() {
        let authorizer = StaticAuthorizer::new();
        authorizer.grant(1);

        assert!(authorizer.can_manage_templates(1, 100).await.unwrap());
        assert!(authorizer.can_manage_templates(1, 200).await.unwrap());
        assert!(!authorizer.can_manage_templates(2, 100).await.unwrap());
    }
}
