//! Template enrichment for presentation.
//!
//! The assembler turns one eligible [`Template`] into its
//! [`DisplayTemplate`] form: rendered description with asset URLs resolved,
//! normalized title, hashtag line, import link, and the entitled-tier image
//! and backup flags. It reads collaborators only; eligibility and capping
//! are the listing service's concern.

use std::sync::Arc;

use super::query::TierPolicy;
use super::{CatalogError, CatalogResult};
use crate::content::{ContentRenderer, FileContext};
use crate::files::FileStore;
use crate::tags::TagProvider;
use crate::template::{Course, CourseId, DisplayTemplate, Template, TemplateId};

/// Import endpoint for one template into one course.
fn import_url(template: TemplateId, course: CourseId) -> String {
    format!(
        "/api/v1/templates/{}/import?course_id={}",
        template, course
    )
}

/// Enriches eligible templates into their display form.
pub struct TemplateAssembler {
    renderer: Arc<dyn ContentRenderer>,
    tags: Arc<dyn TagProvider>,
    files: Arc<dyn FileStore>,
    file_base_url: String,
}

impl TemplateAssembler {
    pub fn new(
        renderer: Arc<dyn ContentRenderer>,
        tags: Arc<dyn TagProvider>,
        files: Arc<dyn FileStore>,
        file_base_url: String,
    ) -> Self {
        Self {
            renderer,
            tags,
            files,
            file_base_url,
        }
    }

    /// Enrich one template for the given course and tier.
    ///
    /// On the free tier the file store is never consulted: background
    /// images stay empty and `awaiting_backup` stays false.
    pub async fn enrich(
        &self,
        template: &Template,
        course: &Course,
        tier: &TierPolicy,
    ) -> CatalogResult<DisplayTemplate> {
        let file_ctx = FileContext::template_description(&self.file_base_url, template.id);
        let description_html = self.renderer.render(
            &template.description,
            template.description_format,
            Some(&file_ctx),
        );
        let title = self.renderer.render_title(&template.title);

        let (tags, backups, images) = if tier.entitled {
            futures::try_join!(
                async {
                    self.tags
                        .tags_of(template.id)
                        .await
                        .map_err(CatalogError::from)
                },
                async {
                    self.files
                        .files_for(template.id)
                        .await
                        .map_err(CatalogError::from)
                },
                async {
                    self.files
                        .background_images_for(template.id)
                        .await
                        .map_err(CatalogError::from)
                },
            )?
        } else {
            let tags = self.tags.tags_of(template.id).await?;
            (tags, Vec::new(), Vec::new())
        };

        let hashtags = tags
            .iter()
            .map(|name| format!("#{}", name))
            .collect::<Vec<_>>()
            .join(" ");

        let awaiting_backup =
            tier.entitled && backups.is_empty() && !template.is_course_format();

        Ok(DisplayTemplate {
            id: template.id,
            title,
            description_html,
            hashtags,
            import_url: import_url(template.id, course.id),
            is_course_format: template.is_course_format(),
            has_multiple_images: images.len() > 1,
            background_images: images,
            awaiting_backup,
        })
    }

    /// Render the course's instruction block, when present.
    pub fn render_instructions(&self, course: &Course) -> Option<String> {
        course.instructions.as_ref().map(|text| {
            let ctx = FileContext::course_instructions(&self.file_base_url, course.id);
            self.renderer
                .render(text, course.instructions_format, Some(&ctx))
        })
    }
}
