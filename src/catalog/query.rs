//! Listing query construction.
//!
//! The SELECT for one listing is built from three inputs: the tier policy,
//! an optional validated search, and the admin ordering list. Every
//! user-influenced value becomes a bound parameter; the only text spliced
//! into the SQL is placeholder numbers and literal integer ranks.

use std::collections::HashSet;

use crate::config::CatalogConfig;
use crate::template::TemplateId;

/// Per-request licensing decisions.
///
/// Computed once per listing from `catalog.pro_enabled` and consulted by
/// the query builder, the listing loop and the assembler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierPolicy {
    /// Whether the entitled (pro) tier is active
    pub entitled: bool,

    /// Cap on importable templates per listing; 0 means unlimited
    pub limit: usize,

    /// Whether restriction rules are evaluated at all
    pub restrictions_enabled: bool,

    /// Whether the admin ordering list applies
    pub ordering_enabled: bool,
}

impl TierPolicy {
    /// Entitled tier: no cap, restrictions and ordering active.
    pub fn pro() -> Self {
        Self {
            entitled: true,
            limit: 0,
            restrictions_enabled: true,
            ordering_enabled: true,
        }
    }

    /// Free tier: capped, restrictions and ordering inert.
    pub fn free(limit: usize) -> Self {
        Self {
            entitled: false,
            limit,
            restrictions_enabled: false,
            ordering_enabled: false,
        }
    }

    /// The policy for the configured tier.
    pub fn from_settings(catalog: &CatalogConfig) -> Self {
        if catalog.pro_enabled {
            Self::pro()
        } else {
            Self::free(catalog.free_tier_limit)
        }
    }

    /// Whether keeping `importable` importable templates would overrun the
    /// cap.
    pub fn exceeds_limit(&self, importable: usize) -> bool {
        self.limit > 0 && importable > self.limit
    }
}

/// A validated search term.
///
/// Built only when the request's `action` is [`SearchQuery::ACTION`]. The
/// value is trimmed; a term that is empty after trimming disables the
/// search entirely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    term: String,
}

impl SearchQuery {
    /// Action value that activates search.
    pub const ACTION: &'static str = "searchtemplate";

    /// Build from request parameters.
    pub fn from_params(action: Option<&str>, value: Option<&str>) -> Option<Self> {
        if action != Some(Self::ACTION) {
            return None;
        }

        let term = value.unwrap_or_default().trim().to_string();
        if term.is_empty() {
            None
        } else {
            Some(Self { term })
        }
    }

    /// The trimmed search term.
    pub fn term(&self) -> &str {
        &self.term
    }

    /// The bound LIKE pattern: wildcards escaped, wrapped in `%`.
    pub fn like_pattern(&self) -> String {
        format!("%{}%", escape_like(&self.term))
    }

    /// Case-insensitive substring test, for in-memory candidate matching.
    pub fn matches(&self, text: &str) -> bool {
        text.to_lowercase().contains(&self.term.to_lowercase())
    }
}

/// Escape LIKE wildcards so user text matches literally. Postgres treats
/// backslash as the default LIKE escape character.
fn escape_like(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Parse the admin ordering list, a comma-separated string of template ids.
///
/// Entries are trimmed, non-numeric entries are skipped with a warning, and
/// duplicates keep their first position.
pub fn parse_ordering(raw: &str) -> Vec<TemplateId> {
    let mut seen = HashSet::new();
    let mut ordering = Vec::new();

    for entry in raw.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        match entry.parse::<i64>() {
            Ok(id) if seen.insert(id) => ordering.push(id),
            Ok(_) => {}
            Err(_) => {
                tracing::warn!(entry = %entry, "Skipping non-numeric template ordering entry");
            }
        }
    }

    ordering
}

/// A parameter bound to the listing SELECT.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Text(String),
    Int(i64),
}

/// A ready-to-run SELECT with its bound parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlSelect {
    /// SQL text with `$n` placeholders
    pub sql: String,

    /// Parameters in placeholder order
    pub params: Vec<SqlParam>,
}

/// The template listing query for one request.
#[derive(Debug, Clone)]
pub struct ListQuery {
    /// Tier decisions for this request
    pub tier: TierPolicy,

    /// Optional validated search
    pub search: Option<SearchQuery>,

    /// Admin ordering list; always empty when the tier has ordering off
    pub ordering: Vec<TemplateId>,
}

impl ListQuery {
    pub fn new(tier: TierPolicy, search: Option<SearchQuery>, ordering: Vec<TemplateId>) -> Self {
        let ordering = if tier.ordering_enabled {
            ordering
        } else {
            Vec::new()
        };

        Self {
            tier,
            search,
            ordering,
        }
    }

    /// Build the SELECT.
    ///
    /// The base filter keeps visible, published rows. A search adds one
    /// bound pattern tested against title, description and tag names. A
    /// non-empty ordering list restricts rows to the listed ids and sorts
    /// them by list position, reusing the `IN` placeholders in the rank
    /// CASE; otherwise rows come back in id order.
    pub fn build(&self) -> SqlSelect {
        let mut sql = String::from(
            "SELECT id, title, description, description_format, visible, status, \
             course_format, restrict_cohort, cohort_ids, restrict_category, category_ids, \
             include_subcategories, restrict_role, role_ids, restrict_user, user_ids, \
             created_at, updated_at \
             FROM templates WHERE visible = TRUE AND status = TRUE",
        );
        let mut params: Vec<SqlParam> = Vec::new();

        if let Some(search) = &self.search {
            let p = params.len() + 1;
            params.push(SqlParam::Text(search.like_pattern()));
            sql.push_str(&format!(
                " AND (title ILIKE ${p} OR description ILIKE ${p} OR EXISTS (\
                 SELECT 1 FROM template_tags tt \
                 JOIN tags t ON t.id = tt.tag_id \
                 WHERE tt.template_id = templates.id AND t.name ILIKE ${p}))",
            ));
        }

        if self.ordering.is_empty() {
            sql.push_str(" ORDER BY id ASC");
        } else {
            let first = params.len() + 1;
            let placeholders: Vec<String> = (0..self.ordering.len())
                .map(|i| format!("${}", first + i))
                .collect();

            sql.push_str(&format!(" AND id IN ({})", placeholders.join(", ")));

            sql.push_str(" ORDER BY CASE");
            for (rank, placeholder) in placeholders.iter().enumerate() {
                sql.push_str(&format!(" WHEN id = {} THEN {}", placeholder, rank));
            }
            sql.push_str(" END ASC");

            for id in &self.ordering {
                params.push(SqlParam::Int(*id));
            }
        }

        SqlSelect { sql, params }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_policy_pro() {
        let tier = TierPolicy::pro();
        assert!(tier.entitled);
        assert_eq!(tier.limit, 0);
        assert!(tier.restrictions_enabled);
        assert!(tier.ordering_enabled);
        assert!(!tier.exceeds_limit(10_000));
    }

    #[test]
    fn test_tier_policy_free() {
        let tier = TierPolicy::free(4);
        assert!(!tier.entitled);
        assert!(!tier.restrictions_enabled);
        assert!(!tier.ordering_enabled);
        assert!(!tier.exceeds_limit(4));
        assert!(tier.exceeds_limit(5));
    }

    #[test]
    fn test_tier_policy_from_settings() {
        let mut catalog = CatalogConfig::default();
        assert_eq!(TierPolicy::from_settings(&catalog), TierPolicy::free(4));

        catalog.pro_enabled = true;
        assert_eq!(TierPolicy::from_settings(&catalog), TierPolicy::pro());
    }

    #[test]
    fn test_search_requires_action() {
        assert!(SearchQuery::from_params(None, Some("bio")).is_none());
        assert!(SearchQuery::from_params(Some("other"), Some("bio")).is_none());

        let search = SearchQuery::from_params(Some("searchtemplate"), Some("bio")).unwrap();
        assert_eq!(search.term(), "bio");
    }

    #[test]
    fn test_search_trims_and_rejects_empty() {
        let search = SearchQuery::from_params(Some("searchtemplate"), Some("  bio  ")).unwrap();
        assert_eq!(search.term(), "bio");

        assert!(SearchQuery::from_params(Some("searchtemplate"), Some("   ")).is_none());
        assert!(SearchQuery::from_params(Some("searchtemplate"), None).is_none());
    }

    #[test]
    fn test_search_like_pattern_escapes_wildcards() {
        let search = SearchQuery::from_params(Some("searchtemplate"), Some("100%_a\\b")).unwrap();
        assert_eq!(search.like_pattern(), "%100\\%\\_a\\\\b%");
    }

    #[test]
    fn test_search_matches_case_insensitive() {
        let search = SearchQuery::from_params(Some("searchtemplate"), Some("BIO")).unwrap();
        assert!(search.matches("Biology 101"));
        assert!(!search.matches("Chemistry"));
    }

    #[test]
    fn test_parse_ordering() {
        assert_eq!(parse_ordering("3, 1,7"), vec![3, 1, 7]);
        assert_eq!(parse_ordering(""), Vec::<i64>::new());
        assert_eq!(parse_ordering(" , ,"), Vec::<i64>::new());
    }

    #[test]
    fn test_parse_ordering_skips_bad_entries() {
        assert_eq!(parse_ordering("3, x, 7, 1x"), vec![3, 7]);
    }

    #[test]
    fn test_parse_ordering_dedupes_keeping_first() {
        assert_eq!(parse_ordering("3, 7, 3, 1, 7"), vec![3, 7, 1]);
    }

    #[test]
    fn test_build_base_query() {
        let query = ListQuery::new(TierPolicy::free(4), None, Vec::new());
        let select = query.build();

        assert!(select.sql.contains("WHERE visible = TRUE AND status = TRUE"));
        assert!(select.sql.ends_with("ORDER BY id ASC"));
        assert!(select.params.is_empty());
        assert!(!select.sql.contains("ILIKE"));
    }

    #[test]
    fn test_build_with_search_binds_single_pattern() {
        let search = SearchQuery::from_params(Some("searchtemplate"), Some("bio"));
        let query = ListQuery::new(TierPolicy::free(4), search, Vec::new());
        let select = query.build();

        assert_eq!(select.sql.matches("ILIKE $1").count(), 3);
        assert_eq!(select.params, vec![SqlParam::Text("%bio%".to_string())]);
    }

    #[test]
    fn test_build_with_ordering_filters_and_ranks() {
        let query = ListQuery::new(TierPolicy::pro(), None, vec![7, 3, 1]);
        let select = query.build();

        assert!(select.sql.contains("AND id IN ($1, $2, $3)"));
        assert!(select.sql.contains(
            "ORDER BY CASE WHEN id = $1 THEN 0 WHEN id = $2 THEN 1 WHEN id = $3 THEN 2 END ASC"
        ));
        assert_eq!(
            select.params,
            vec![SqlParam::Int(7), SqlParam::Int(3), SqlParam::Int(1)]
        );
    }

    #[test]
    fn test_build_with_search_and_ordering_numbers_placeholders() {
        let search = SearchQuery::from_params(Some("searchtemplate"), Some("bio"));
        let query = ListQuery::new(TierPolicy::pro(), search, vec![5, 2]);
        let select = query.build();

        assert!(select.sql.contains("ILIKE $1"));
        assert!(select.sql.contains("AND id IN ($2, $3)"));
        assert_eq!(
            select.params,
            vec![
                SqlParam::Text("%bio%".to_string()),
                SqlParam::Int(5),
                SqlParam::Int(2)
            ]
        );
    }

    #[test]
    fn test_new_drops_ordering_when_tier_disables_it() {
        let query = ListQuery::new(TierPolicy::free(4), None, vec![5, 2]);
        assert!(query.ordering.is_empty());
        assert!(query.build().sql.ends_with("ORDER BY id ASC"));
    }

    #[test]
    fn test_build_never_inlines_user_text() {
        let search = SearchQuery::from_params(
            Some("searchtemplate"),
            Some("'; DROP TABLE templates; --"),
        );
        let query = ListQuery::new(TierPolicy::free(4), search, Vec::new());
        let select = query.build();

        assert!(!select.sql.contains("DROP TABLE"));
        assert_eq!(select.params.len(), 1);
    }
}
