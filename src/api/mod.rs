//! API layer - HTTP endpoint handlers organized by domain.

mod health;
mod metrics;
mod routes;
mod templates;

// Re-export all handlers for use in server/app.rs
pub use health::health;
pub use metrics::prometheus_metrics;
pub use routes::api_routes;
pub use templates::{list_course_templates, ListTemplatesQuery, TemplateListResponse};
