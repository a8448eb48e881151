//! The listing service.
//!
//! [`CatalogService::list`] produces the full template-list page for one
//! user viewing one course:
//! 1. Load the course and the user's manage capability
//! 2. Gather the user's cohorts and course roles
//! 3. Fetch candidates via the tier-shaped query (search, ordering)
//! 4. Scan candidates in order: restriction rules, then the free-tier cap
//! 5. Enrich survivors and assemble the page

use std::sync::Arc;
use std::time::Instant;

use super::assembler::TemplateAssembler;
use super::query::{parse_ordering, ListQuery, SearchQuery, TierPolicy};
use super::store::CatalogStore;
use super::CatalogResult;
use crate::access::{is_eligible, Authorizer, CategoryTree, EffectiveRestrictions, UserContext};
use crate::config::CatalogConfig;
use crate::directory::Directory;
use crate::metrics::{FilterMetrics, ListingMetrics};
use crate::template::{
    CourseId, DisplayTemplate, TemplateGroup, TemplateListPage, UpgradeNotice, UserId,
};

/// Raw listing parameters from the request.
#[derive(Debug, Clone, Default)]
pub struct ListParams {
    /// Request action; search activates on `searchtemplate`
    pub action: Option<String>,

    /// Value for the action (the search term)
    pub value: Option<String>,
}

/// Produces template-list pages.
pub struct CatalogService {
    settings: CatalogConfig,
    store: Arc<dyn CatalogStore>,
    directory: Arc<dyn Directory>,
    authorizer: Arc<dyn Authorizer>,
    categories: Arc<dyn CategoryTree>,
    assembler: TemplateAssembler,
}

impl CatalogService {
    pub fn new(
        settings: CatalogConfig,
        store: Arc<dyn CatalogStore>,
        directory: Arc<dyn Directory>,
        authorizer: Arc<dyn Authorizer>,
        categories: Arc<dyn CategoryTree>,
        assembler: TemplateAssembler,
    ) -> Self {
        Self {
            settings,
            store,
            directory,
            authorizer,
            categories,
            assembler,
        }
    }

    /// Build the template-list page for one user viewing one course.
    pub async fn list(
        &self,
        user: UserId,
        site_admin: bool,
        course_id: CourseId,
        params: &ListParams,
    ) -> CatalogResult<TemplateListPage> {
        let started = Instant::now();

        let course = self.store.fetch_course(course_id).await?;
        let can_manage = self.authorizer.can_manage_templates(user, course_id).await?;
        let (cohort_ids, role_ids) = futures::try_join!(
            self.directory.cohorts_of(user),
            self.directory.roles_of(user, course_id),
        )?;
        let ctx = UserContext {
            user_id: user,
            cohort_ids,
            role_ids,
            category_id: course.category_id,
        };

        let search = SearchQuery::from_params(params.action.as_deref(), params.value.as_deref());
        if search.is_some() {
            ListingMetrics::record_search();
        }

        let tier = TierPolicy::from_settings(&self.settings);
        if tier.entitled {
            ListingMetrics::record_pro_listing();
        } else {
            ListingMetrics::record_free_listing();
        }

        let ordering = match &self.settings.template_order {
            Some(raw) if tier.ordering_enabled => parse_ordering(raw),
            _ => Vec::new(),
        };

        let query = ListQuery::new(tier, search, ordering);
        let candidates = self.store.fetch_templates(&query).await?;

        if can_manage && tier.restrictions_enabled {
            FilterMetrics::record_manager_bypass();
        }

        // Keep candidates in query order; importable templates burn the cap,
        // format-type ones ride along for free.
        let mut selected = Vec::new();
        let mut importable = 0usize;
        let mut truncated = false;

        for template in &candidates {
            if tier.restrictions_enabled && !can_manage {
                let restrictions =
                    EffectiveRestrictions::resolve(template, self.categories.as_ref()).await?;
                if !is_eligible(&restrictions, &ctx, false) {
                    continue;
                }
            }

            if !template.is_course_format() {
                if tier.exceeds_limit(importable + 1) {
                    truncated = true;
                    break;
                }
                importable += 1;
            }

            selected.push(template);
        }

        if truncated {
            ListingMetrics::record_truncated();
            tracing::debug!(
                course_id = course_id,
                limit = tier.limit,
                "Free-tier cap reached, listing truncated"
            );
        }

        let mut templates = Vec::with_capacity(selected.len());
        for template in selected {
            templates.push(self.assembler.enrich(template, &course, &tier).await?);
        }

        let instructions = self.assembler.render_instructions(&course);
        let upgrade = (!tier.entitled && site_admin).then(|| UpgradeNotice {
            url: self.settings.upgrade_url.clone(),
        });
        let no_templates = templates.is_empty();

        ListingMetrics::record_returned(templates.len());
        ListingMetrics::record_latency(started.elapsed().as_secs_f64());
        tracing::debug!(
            user_id = user,
            course_id = course_id,
            returned = templates.len(),
            can_manage = can_manage,
            "Template listing assembled"
        );

        Ok(TemplateListPage {
            templates,
            has_pro: tier.entitled,
            no_templates,
            view_mode: course.templates_view,
            can_manage,
            instructions,
            upgrade,
        })
    }

    /// Templates per group for the grouped layout, clamped to at least 1.
    pub fn per_group(&self) -> usize {
        self.settings.per_group.max(1)
    }
}

/// Chunk display templates for the grouped layout. Order is preserved and
/// the final group may run short.
pub fn group_templates(templates: &[DisplayTemplate], per_group: usize) -> Vec<TemplateGroup> {
    templates
        .chunks(per_group.max(1))
        .map(|chunk| TemplateGroup {
            templates: chunk.to_vec(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::files::ImageRef;

    fn display(id: i64) -> DisplayTemplate {
        DisplayTemplate {
            id,
            title: format!("Template {}", id),
            description_html: String::new(),
            hashtags: String::new(),
            import_url: String::new(),
            is_course_format: false,
            background_images: Vec::<ImageRef>::new(),
            has_multiple_images: false,
            awaiting_backup: false,
        }
    }

    #[test]
    fn test_group_templates_chunks_in_order() {
        let templates: Vec<_> = (1..=5).map(display).collect();
        let groups = group_templates(&templates, 2);

        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].templates[0].id, 1);
        assert_eq!(groups[0].templates[1].id, 2);
        assert_eq!(groups[2].templates.len(), 1);
        assert_eq!(groups[2].templates[0].id, 5);
    }

    #[test]
    fn test_group_templates_exact_multiple() {
        let templates: Vec<_> = (1..=4).map(display).collect();
        let groups = group_templates(&templates, 2);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[1].templates.len(), 2);
    }

    #[test]
    fn test_group_templates_empty() {
        assert!(group_templates(&[], 2).is_empty());
    }

    #[test]
    fn test_group_templates_clamps_zero_size() {
        let templates: Vec<_> = (1..=3).map(display).collect();
        let groups = group_templates(&templates, 0);

        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].templates.len(), 1);
    }
}
