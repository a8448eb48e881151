//! Course category tree lookups.
//!
//! Category restrictions may cover whole subtrees, so the evaluator needs
//! existence checks and descendant expansion over the category hierarchy.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use sqlx::PgPool;

use super::AccessResult;
use crate::postgres::PostgresPool;
use crate::template::CategoryId;

/// Read access to the course category hierarchy.
#[async_trait]
pub trait CategoryTree: Send + Sync {
    /// Whether a category exists.
    async fn exists(&self, category: CategoryId) -> AccessResult<bool>;

    /// All descendants of a category (children, grandchildren, and so on),
    /// excluding the category itself.
    async fn descendants_of(&self, category: CategoryId) -> AccessResult<HashSet<CategoryId>>;
}

/// PostgreSQL category tree.
///
/// Table structure:
/// - `course_categories` - id plus `parent_id` adjacency list
pub struct PostgresCategoryTree {
    pool: PgPool,
}

impl PostgresCategoryTree {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CategoryTree for PostgresCategoryTree {
    async fn exists(&self, category: CategoryId) -> AccessResult<bool> {
        let found: Option<i64> =
            sqlx::query_scalar("SELECT id FROM course_categories WHERE id = $1")
                .bind(category)
                .fetch_optional(&self.pool)
                .await?;

        Ok(found.is_some())
    }

    async fn descendants_of(&self, category: CategoryId) -> AccessResult<HashSet<CategoryId>> {
        let ids: Vec<i64> = sqlx::query_scalar(
            r#"
            WITH RECURSIVE subtree AS (
                SELECT id FROM course_categories WHERE parent_id = $1
                UNION ALL
                SELECT c.id
                FROM course_categories c
                JOIN subtree s ON c.parent_id = s.id
            )
            SELECT id FROM subtree
            "#,
        )
        .bind(category)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids.into_iter().collect())
    }
}

/// In-memory category tree for tests and single-node development.
#[derive(Default)]
pub struct MemoryCategoryTree {
    parents: DashMap<CategoryId, Option<CategoryId>>,
}

impl MemoryCategoryTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a category under an optional parent.
    pub fn add_category(&self, id: CategoryId, parent: Option<CategoryId>) {
        self.parents.insert(id, parent);
    }
}

#[async_trait]
impl CategoryTree for MemoryCategoryTree {
    async fn exists(&self, category: CategoryId) -> AccessResult<bool> {
        Ok(self.parents.contains_key(&category))
    }

    async fn descendants_of(&self, category: CategoryId) -> AccessResult<HashSet<CategoryId>> {
        let mut result = HashSet::new();
        let mut frontier = vec![category];

        while let Some(current) = frontier.pop() {
            for entry in self.parents.iter() {
                if *entry.value() == Some(current) && result.insert(*entry.key()) {
                    frontier.push(*entry.key());
                }
            }
        }

        Ok(result)
    }
}

/// Create a category tree: PostgreSQL when a pool is available, otherwise
/// the in-memory tree.
pub fn create_category_tree(postgres_pool: Option<Arc<PostgresPool>>) -> Arc<dyn CategoryTree> {
    match postgres_pool {
        Some(pool) => {
            tracing::info!(backend = "postgres", "Creating PostgreSQL category tree");
            Arc::new(PostgresCategoryTree::new(pool.pool().clone()))
        }
        None => {
            tracing::info!(backend = "memory", "Creating memory category tree");
            Arc::new(MemoryCategoryTree::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_tree_exists() {
        let tree = MemoryCategoryTree::new();
        tree.add_category(1, None);

        assert!(tree.exists(1).await.unwrap());
        assert!(!tree.exists(2).await.unwrap());
    }

    #[tokio::test]
    async fn test_memory_tree_descendants_multi_level() {
        let tree = MemoryCategoryTree::new();
        tree.add_category(1, None);
        tree.add_category(2, Some(1));
        tree.add_category(3, Some(1));
        tree.add_category(4, Some(2));
        tree.add_category(5, None);

        let descendants = tree.descendants_of(1).await.unwrap();
        assert_eq!(descendants, [2, 3, 4].iter().copied().collect());

        assert!(tree.descendants_of(5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_memory_tree_leaf_has_no_descendants() {
        let tree = MemoryCategoryTree::new();
        tree.add_category(1, None);
        tree.add_category(2, Some(1));

        assert!(tree.descendants_of(2).await.unwrap().is_empty());
    }
}
