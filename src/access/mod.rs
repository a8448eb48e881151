//! Access control for template listings.
//!
//! A template may carry four restriction predicates (cohort, category,
//! role, user). This module resolves them into directly testable form and
//! evaluates them against a per-request [`UserContext`]:
//!
//! - resolution expands category restrictions through the category tree
//!   when `include_subcategories` is set, and discards inactive predicates;
//! - evaluation is a pure check over the resolved predicates, with a single
//!   bypass for users who can manage templates.

pub mod authorizer;
pub mod categories;

pub use authorizer::{create_authorizer, Authorizer, PostgresAuthorizer, StaticAuthorizer};
pub use categories::{create_category_tree, CategoryTree, MemoryCategoryTree, PostgresCategoryTree};

use std::collections::HashSet;

use thiserror::Error;

use crate::metrics::FilterMetrics;
use crate::template::{CategoryId, CohortId, RestrictionSet, RoleId, Template, UserId};

/// Access-control error type
#[derive(Debug, Error)]
pub enum AccessError {
    #[error("Database error: {0}")]
    Postgres(#[from] sqlx::Error),
}

/// Result type for access operations
pub type AccessResult<T> = Result<T, AccessError>;

/// Everything known about the requesting user that a restriction can test.
#[derive(Debug, Clone, Default)]
pub struct UserContext {
    /// Requesting user
    pub user_id: UserId,

    /// Cohorts the user belongs to
    pub cohort_ids: HashSet<CohortId>,

    /// Roles the user holds in the course being viewed
    pub role_ids: HashSet<RoleId>,

    /// Category of the course being viewed
    pub category_id: CategoryId,
}

/// A template's restrictions resolved into directly testable predicates.
///
/// `None` means the predicate is inactive: its flag is unset, its target
/// set is empty, or (for categories) every listed id was dangling.
#[derive(Debug, Clone, Default)]
pub struct EffectiveRestrictions {
    /// Cohorts the viewer must intersect
    pub cohorts: Option<HashSet<CohortId>>,

    /// Categories (expanded through the tree) the course must sit in
    pub categories: Option<HashSet<CategoryId>>,

    /// Roles the viewer must intersect
    pub roles: Option<HashSet<RoleId>>,

    /// Users the viewer must be among
    pub users: Option<HashSet<UserId>>,
}

impl EffectiveRestrictions {
    /// Resolve a template's stored restriction sets.
    ///
    /// Category ids that no longer exist are skipped; when
    /// `include_subcategories` is set each surviving category contributes
    /// its whole subtree.
    pub async fn resolve(template: &Template, tree: &dyn CategoryTree) -> AccessResult<Self> {
        let cohorts = active_set(&template.cohort);
        let roles = active_set(&template.role);
        let users = active_set(&template.user);

        let categories = match active_set(&template.category) {
            Some(ids) => {
                let mut expanded: HashSet<CategoryId> = HashSet::new();
                for id in ids {
                    if !tree.exists(id).await? {
                        continue;
                    }
                    expanded.insert(id);
                    if template.include_subcategories {
                        expanded.extend(tree.descendants_of(id).await?);
                    }
                }
                if expanded.is_empty() {
                    // Every listed id was dangling: nothing left to test.
                    None
                } else {
                    Some(expanded)
                }
            }
            None => None,
        };

        Ok(Self {
            cohorts,
            categories,
            roles,
            users,
        })
    }

    /// True when no predicate is active.
    pub fn is_unrestricted(&self) -> bool {
        self.cohorts.is_none()
            && self.categories.is_none()
            && self.roles.is_none()
            && self.users.is_none()
    }
}

fn active_set(set: &RestrictionSet) -> Option<HashSet<i64>> {
    if set.is_active() {
        Some(set.ids.clone())
    } else {
        None
    }
}

/// Decide whether a user may see a template.
///
/// Managers see everything. Otherwise every active predicate must pass:
/// cohort and role predicates on non-empty intersection, category when the
/// expanded set contains the course's category, user when the viewer is
/// listed.
pub fn is_eligible(
    restrictions: &EffectiveRestrictions,
    ctx: &UserContext,
    can_manage: bool,
) -> bool {
    if can_manage {
        return true;
    }

    if let Some(cohorts) = &restrictions.cohorts {
        if cohorts.is_disjoint(&ctx.cohort_ids) {
            FilterMetrics::record_cohort_filtered();
            return false;
        }
    }

    if let Some(categories) = &restrictions.categories {
        if !categories.contains(&ctx.category_id) {
            FilterMetrics::record_category_filtered();
            return false;
        }
    }

    if let Some(roles) = &restrictions.roles {
        if roles.is_disjoint(&ctx.role_ids) {
            FilterMetrics::record_role_filtered();
            return false;
        }
    }

    if let Some(users) = &restrictions.users {
        if !users.contains(&ctx.user_id) {
            FilterMetrics::record_user_filtered();
            return false;
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn unrestricted_template() -> Template {
        Template {
            id: 1,
            title: "t".to_string(),
            description: String::new(),
            description_format: crate::template::TextFormat::Plain,
            visible: true,
            status: true,
            course_format: None,
            cohort: RestrictionSet::default(),
            category: RestrictionSet::default(),
            include_subcategories: false,
            role: RestrictionSet::default(),
            user: RestrictionSet::default(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn ctx() -> UserContext {
        UserContext {
            user_id: 1,
            cohort_ids: [10].iter().copied().collect(),
            role_ids: [5].iter().copied().collect(),
            category_id: 30,
        }
    }

    #[test]
    fn test_unrestricted_passes() {
        let restrictions = EffectiveRestrictions::default();
        assert!(restrictions.is_unrestricted());
        assert!(is_eligible(&restrictions, &ctx(), false));
    }

    #[test]
    fn test_manager_bypasses_everything() {
        let restrictions = EffectiveRestrictions {
            users: Some([999].iter().copied().collect()),
            ..Default::default()
        };
        assert!(!is_eligible(&restrictions, &ctx(), false));
        assert!(is_eligible(&restrictions, &ctx(), true));
    }

    #[test]
    fn test_cohort_intersection() {
        let mut restrictions = EffectiveRestrictions {
            cohorts: Some([10, 11].iter().copied().collect()),
            ..Default::default()
        };
        assert!(is_eligible(&restrictions, &ctx(), false));

        restrictions.cohorts = Some([11, 12].iter().copied().collect());
        assert!(!is_eligible(&restrictions, &ctx(), false));
    }

    #[test]
    fn test_role_intersection() {
        let mut restrictions = EffectiveRestrictions {
            roles: Some([5].iter().copied().collect()),
            ..Default::default()
        };
        assert!(is_eligible(&restrictions, &ctx(), false));

        restrictions.roles = Some([6].iter().copied().collect());
        assert!(!is_eligible(&restrictions, &ctx(), false));
    }

    #[test]
    fn test_category_membership() {
        let mut restrictions = EffectiveRestrictions {
            categories: Some([30].iter().copied().collect()),
            ..Default::default()
        };
        assert!(is_eligible(&restrictions, &ctx(), false));

        restrictions.categories = Some([31].iter().copied().collect());
        assert!(!is_eligible(&restrictions, &ctx(), false));
    }

    #[test]
    fn test_user_membership() {
        let mut restrictions = EffectiveRestrictions {
            users: Some([1, 2].iter().copied().collect()),
            ..Default::default()
        };
        assert!(is_eligible(&restrictions, &ctx(), false));

        restrictions.users = Some([2].iter().copied().collect());
        assert!(!is_eligible(&restrictions, &ctx(), false));
    }

    #[test]
    fn test_all_active_predicates_must_pass() {
        let restrictions = EffectiveRestrictions {
            cohorts: Some([10].iter().copied().collect()),
            roles: Some([6].iter().copied().collect()),
            ..Default::default()
        };
        // Cohort passes but role fails.
        assert!(!is_eligible(&restrictions, &ctx(), false));
    }

    #[tokio::test]
    async fn test_resolve_inactive_flags_give_none() {
        let tree = MemoryCategoryTree::new();
        let template = unrestricted_template();

        let restrictions = EffectiveRestrictions::resolve(&template, &tree)
            .await
            .unwrap();
        assert!(restrictions.is_unrestricted());
    }

    #[tokio::test]
    async fn test_resolve_expands_subcategories() {
        let tree = MemoryCategoryTree::new();
        tree.add_category(30, None);
        tree.add_category(31, Some(30));
        tree.add_category(32, Some(31));

        let mut template = unrestricted_template();
        template.category = RestrictionSet::of(&[30]);
        template.include_subcategories = true;

        let restrictions = EffectiveRestrictions::resolve(&template, &tree)
            .await
            .unwrap();
        let categories = restrictions.categories.unwrap();
        assert_eq!(categories, [30, 31, 32].iter().copied().collect());
    }

    #[tokio::test]
    async fn test_resolve_without_subcategories_keeps_exact_ids() {
        let tree = MemoryCategoryTree::new();
        tree.add_category(30, None);
        tree.add_category(31, Some(30));

        let mut template = unrestricted_template();
        template.category = RestrictionSet::of(&[30]);

        let restrictions = EffectiveRestrictions::resolve(&template, &tree)
            .await
            .unwrap();
        assert_eq!(
            restrictions.categories.unwrap(),
            [30].iter().copied().collect()
        );
    }

    #[tokio::test]
    async fn test_resolve_skips_dangling_categories() {
        let tree = MemoryCategoryTree::new();
        tree.add_category(30, None);

        let mut template = unrestricted_template();
        template.category = RestrictionSet::of(&[30, 999]);
        template.include_subcategories = true;

        let restrictions = EffectiveRestrictions::resolve(&template, &tree)
            .await
            .unwrap();
        assert_eq!(
            restrictions.categories.unwrap(),
            [30].iter().copied().collect()
        );
    }

    #[tokio::test]
    async fn test_resolve_all_dangling_is_inactive() {
        let tree = MemoryCategoryTree::new();

        let mut template = unrestricted_template();
        template.category = RestrictionSet::of(&[998, 999]);

        let restrictions = EffectiveRestrictions::resolve(&template, &tree)
            .await
            .unwrap();
        assert!(restrictions.categories.is_none());
        assert!(is_eligible(&restrictions, &ctx(), false));
    }
}
