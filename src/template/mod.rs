//! Course template domain types.
//!
//! This module provides:
//! - Identifier aliases shared across the catalog
//! - `TextFormat`, the storage format code for rich-text columns
//! - `TemplateRow` (the raw store row) and `Template` (its parsed form,
//!   with restriction id-sets parsed exactly once, fail-open)
//! - `Course` and its `ViewMode`
//! - The presentation contract: `DisplayTemplate`, `TemplateListPage`,
//!   `TemplateGroup`

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::files::ImageRef;
use crate::metrics::FilterMetrics;

/// Template identifier
pub type TemplateId = i64;

/// Course identifier
pub type CourseId = i64;

/// Course category identifier
pub type CategoryId = i64;

/// Cohort identifier
pub type CohortId = i64;

/// Role identifier
pub type RoleId = i64;

/// User identifier
pub type UserId = i64;

/// Storage format code for rich-text columns.
///
/// Stored as a small integer. Unknown codes fall back to `Plain` so a bad
/// row degrades to escaped text instead of aborting the listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextFormat {
    /// Plain text, escaped and newline-broken on render
    #[default]
    Plain,

    /// Author-supplied HTML, rendered as-is
    Html,

    /// Markdown (rendered subset: paragraphs, emphasis, inline code)
    Markdown,
}

impl TextFormat {
    /// Parse a stored format code.
    pub fn from_code(code: i16) -> Self {
        match code {
            0 => Self::Plain,
            1 => Self::Html,
            2 => Self::Markdown,
            other => {
                tracing::warn!(code = other, "Unknown text format code, treating as plain");
                Self::Plain
            }
        }
    }

    /// The stored integer code for this format.
    pub fn code(&self) -> i16 {
        match self {
            Self::Plain => 0,
            Self::Html => 1,
            Self::Markdown => 2,
        }
    }
}

/// One restriction predicate as stored on a template row: an on/off flag
/// plus a JSON array of target ids.
///
/// Malformed JSON parses to an empty set with a warning, and an empty set
/// leaves the predicate inactive. A corrupt row therefore widens visibility
/// rather than hiding the template from everyone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestrictionSet {
    /// Whether this restriction is switched on for the template
    pub enabled: bool,

    /// Target ids the restriction applies to
    pub ids: HashSet<i64>,
}

impl RestrictionSet {
    /// Build a restriction from a raw flag + JSON id-list column pair.
    ///
    /// `column` names the source column in the warning log.
    pub fn parse(enabled: bool, raw: Option<&str>, column: &str) -> Self {
        let ids = match raw {
            Some(text) if !text.trim().is_empty() => match parse_id_array(text) {
                Ok(ids) => ids,
                Err(e) => {
                    FilterMetrics::record_parse_failure();
                    tracing::warn!(
                        column = %column,
                        error = %e,
                        "Malformed restriction id list, treating as unrestricted"
                    );
                    HashSet::new()
                }
            },
            _ => HashSet::new(),
        };

        Self { enabled, ids }
    }

    /// An active restriction has its flag set and at least one target id.
    pub fn is_active(&self) -> bool {
        self.enabled && !self.ids.is_empty()
    }

    #[cfg(test)]
    pub fn of(ids: &[i64]) -> Self {
        Self {
            enabled: true,
            ids: ids.iter().copied().collect(),
        }
    }
}

/// Parse a JSON array of ids. Numeric strings are accepted (older rows store
/// `["3","7"]`); other entry types are skipped.
fn parse_id_array(text: &str) -> Result<HashSet<i64>, serde_json::Error> {
    let values: Vec<serde_json::Value> = serde_json::from_str(text)?;
    Ok(values
        .iter()
        .filter_map(|v| match v {
            serde_json::Value::Number(n) => n.as_i64(),
            serde_json::Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
        .collect())
}

/// Raw template row as returned by the store.
///
/// Restriction id lists arrive as opaque JSON text; converting into
/// [`Template`] parses them exactly once.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TemplateRow {
    /// Template identifier
    pub id: i64,

    /// Title as stored
    pub title: String,

    /// Description markup as stored
    pub description: String,

    /// Format code for `description`
    pub description_format: i16,

    /// Visibility flag
    pub visible: bool,

    /// Published flag
    pub status: bool,

    /// Course format name for format-type templates, empty or NULL otherwise
    pub course_format: Option<String>,

    /// Cohort restriction flag
    pub restrict_cohort: bool,

    /// JSON array of cohort ids
    pub cohort_ids: Option<String>,

    /// Category restriction flag
    pub restrict_category: bool,

    /// JSON array of category ids
    pub category_ids: Option<String>,

    /// Whether the category restriction covers subcategories
    pub include_subcategories: bool,

    /// Role restriction flag
    pub restrict_role: bool,

    /// JSON array of role ids
    pub role_ids: Option<String>,

    /// User restriction flag
    pub restrict_user: bool,

    /// JSON array of user ids
    pub user_ids: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

/// A course template with its restriction data parsed.
#[derive(Debug, Clone)]
pub struct Template {
    /// Template identifier
    pub id: TemplateId,

    /// Title as stored (normalized for display by the assembler)
    pub title: String,

    /// Description markup as stored
    pub description: String,

    /// Format of `description`
    pub description_format: TextFormat,

    /// Hidden templates never reach a listing
    pub visible: bool,

    /// Published flag
    pub status: bool,

    /// Course format name for format-type templates (`None` for importable ones)
    pub course_format: Option<String>,

    /// Cohort restriction: viewer must belong to one of the cohorts
    pub cohort: RestrictionSet,

    /// Category restriction: course must sit in one of the categories
    pub category: RestrictionSet,

    /// Whether the category restriction also covers subcategories
    pub include_subcategories: bool,

    /// Role restriction: viewer must hold one of the roles in the course
    pub role: RestrictionSet,

    /// User restriction: viewer must be listed
    pub user: RestrictionSet,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Template {
    /// Format-type templates configure a course format instead of importing
    /// content, and never count toward the listing cap.
    pub fn is_course_format(&self) -> bool {
        self.course_format.is_some()
    }
}

impl From<TemplateRow> for Template {
    fn from(row: TemplateRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            description_format: TextFormat::from_code(row.description_format),
            visible: row.visible,
            status: row.status,
            course_format: row.course_format.filter(|f| !f.trim().is_empty()),
            cohort: RestrictionSet::parse(
                row.restrict_cohort,
                row.cohort_ids.as_deref(),
                "cohort_ids",
            ),
            category: RestrictionSet::parse(
                row.restrict_category,
                row.category_ids.as_deref(),
                "category_ids",
            ),
            include_subcategories: row.include_subcategories,
            role: RestrictionSet::parse(row.restrict_role, row.role_ids.as_deref(), "role_ids"),
            user: RestrictionSet::parse(row.restrict_user, row.user_ids.as_deref(), "user_ids"),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// How the course page presents its template list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    /// Tile grid (default)
    #[default]
    Tile,

    /// Vertical list
    List,
}

impl ViewMode {
    /// Parse a stored view-mode code. Unknown codes fall back to `Tile`.
    pub fn from_code(code: i16) -> Self {
        match code {
            1 => Self::List,
            _ => Self::Tile,
        }
    }

    /// The stored integer code for this mode.
    pub fn code(&self) -> i16 {
        match self {
            Self::Tile => 0,
            Self::List => 1,
        }
    }
}

/// The course whose page hosts the template list.
#[derive(Debug, Clone)]
pub struct Course {
    /// Course identifier
    pub id: CourseId,

    /// Full display name
    pub fullname: String,

    /// Category the course sits in, checked by category restrictions
    pub category_id: CategoryId,

    /// Template list presentation mode
    pub templates_view: ViewMode,

    /// Optional instructions shown above the list
    pub instructions: Option<String>,

    /// Format of `instructions`
    pub instructions_format: TextFormat,
}

/// A template prepared for presentation.
#[derive(Debug, Clone, Serialize)]
pub struct DisplayTemplate {
    /// Template identifier
    pub id: TemplateId,

    /// Normalized display title
    pub title: String,

    /// Rendered description HTML with asset URLs resolved
    pub description_html: String,

    /// Space-joined `#tag` list in tag-store order
    pub hashtags: String,

    /// Import endpoint carrying the template and destination course
    pub import_url: String,

    /// Format-type templates import no content
    pub is_course_format: bool,

    /// Background images (populated on the entitled tier only)
    pub background_images: Vec<ImageRef>,

    /// More than one background image attached
    pub has_multiple_images: bool,

    /// No course backup attached yet; an import would wait on the build job
    pub awaiting_backup: bool,
}

/// Upsell notice shown to site admins browsing on the free tier.
#[derive(Debug, Clone, Serialize)]
pub struct UpgradeNotice {
    /// Where the upgrade flow lives
    pub url: String,
}

/// Everything the course page needs to present the template list.
#[derive(Debug, Clone, Serialize)]
pub struct TemplateListPage {
    /// Templates that survived filtering, in presentation order
    pub templates: Vec<DisplayTemplate>,

    /// Whether the entitled tier is active
    pub has_pro: bool,

    /// True when no template survived filtering
    pub no_templates: bool,

    /// Presentation mode from the course record
    pub view_mode: ViewMode,

    /// Whether the requesting user manages templates
    pub can_manage: bool,

    /// Rendered course instructions, when the course carries any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,

    /// Upsell notice for site admins on the free tier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upgrade: Option<UpgradeNotice>,
}

/// A fixed-size chunk of display templates for grouped layouts.
#[derive(Debug, Clone, Serialize)]
pub struct TemplateGroup {
    /// Templates in this group, order preserved
    pub templates: Vec<DisplayTemplate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_row() -> TemplateRow {
        TemplateRow {
            id: 1,
            title: "Biology 101".to_string(),
            description: "A starter course".to_string(),
            description_format: 1,
            visible: true,
            status: true,
            course_format: None,
            restrict_cohort: false,
            cohort_ids: None,
            restrict_category: false,
            category_ids: None,
            include_subcategories: false,
            restrict_role: false,
            role_ids: None,
            restrict_user: false,
            user_ids: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_text_format_codes() {
        assert_eq!(TextFormat::from_code(0), TextFormat::Plain);
        assert_eq!(TextFormat::from_code(1), TextFormat::Html);
        assert_eq!(TextFormat::from_code(2), TextFormat::Markdown);
        assert_eq!(TextFormat::Markdown.code(), 2);
    }

    #[test]
    fn test_text_format_unknown_falls_back_to_plain() {
        assert_eq!(TextFormat::from_code(99), TextFormat::Plain);
        assert_eq!(TextFormat::from_code(-1), TextFormat::Plain);
    }

    #[test]
    fn test_restriction_parse_valid() {
        let set = RestrictionSet::parse(true, Some("[3, 7, 7]"), "cohort_ids");
        assert!(set.is_active());
        assert_eq!(set.ids, [3, 7].iter().copied().collect());
    }

    #[test]
    fn test_restriction_parse_numeric_strings() {
        let set = RestrictionSet::parse(true, Some(r#"["3", "7"]"#), "role_ids");
        assert!(set.is_active());
        assert!(set.ids.contains(&3));
        assert!(set.ids.contains(&7));
    }

    #[test]
    fn test_restriction_parse_malformed_is_inactive() {
        let set = RestrictionSet::parse(true, Some("not json"), "user_ids");
        assert!(!set.is_active());
        assert!(set.ids.is_empty());

        let set = RestrictionSet::parse(true, Some(r#"{"a": 1}"#), "user_ids");
        assert!(!set.is_active());
    }

    #[test]
    fn test_restriction_parse_empty_inputs() {
        assert!(!RestrictionSet::parse(true, None, "cohort_ids").is_active());
        assert!(!RestrictionSet::parse(true, Some(""), "cohort_ids").is_active());
        assert!(!RestrictionSet::parse(true, Some("  "), "cohort_ids").is_active());
        assert!(!RestrictionSet::parse(true, Some("[]"), "cohort_ids").is_active());
    }

    #[test]
    fn test_restriction_disabled_flag_wins() {
        let set = RestrictionSet::parse(false, Some("[1, 2]"), "cohort_ids");
        assert!(!set.is_active());
        assert_eq!(set.ids.len(), 2);
    }

    #[test]
    fn test_restriction_non_numeric_entries_skipped() {
        let set = RestrictionSet::parse(true, Some(r#"[1, "x", null, 2]"#), "user_ids");
        assert_eq!(set.ids, [1, 2].iter().copied().collect());
    }

    #[test]
    fn test_template_from_row() {
        let mut row = base_row();
        row.restrict_cohort = true;
        row.cohort_ids = Some("[5]".to_string());

        let template = Template::from(row);
        assert_eq!(template.id, 1);
        assert_eq!(template.description_format, TextFormat::Html);
        assert!(template.cohort.is_active());
        assert!(!template.role.is_active());
        assert!(!template.is_course_format());
    }

    #[test]
    fn test_template_empty_course_format_is_none() {
        let mut row = base_row();
        row.course_format = Some("".to_string());
        assert!(!Template::from(row).is_course_format());

        let mut row = base_row();
        row.course_format = Some("weeks".to_string());
        assert!(Template::from(row).is_course_format());
    }

    #[test]
    fn test_view_mode_codes() {
        assert_eq!(ViewMode::from_code(0), ViewMode::Tile);
        assert_eq!(ViewMode::from_code(1), ViewMode::List);
        assert_eq!(ViewMode::from_code(42), ViewMode::Tile);
        assert_eq!(ViewMode::List.code(), 1);
    }
}
