//! Course template listing endpoint.

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::catalog::{group_templates, CatalogError, ListParams};
use crate::error::AppError;
use crate::server::AppState;
use crate::template::{TemplateGroup, TemplateListPage};

/// Layout value that chunks the listing into groups.
const GROUPED_LAYOUT: &str = "grouped";

#[derive(Debug, Default, Deserialize)]
pub struct ListTemplatesQuery {
    /// Request action; `searchtemplate` activates search
    pub action: Option<String>,

    /// Value for the action (the search term)
    pub value: Option<String>,

    /// `grouped` chunks the listing for carousel-style layouts
    pub layout: Option<String>,

    /// Group size override for the grouped layout
    pub pergroup: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct TemplateListResponse {
    #[serde(flatten)]
    pub page: TemplateListPage,

    /// Present only for `layout=grouped`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<TemplateGroup>>,
}

/// GET /api/v1/courses/{course_id}/templates - List templates for a course
#[tracing::instrument(name = "http.list_course_templates", skip(state, headers, query))]
pub async fn list_course_templates(
    State(state): State<AppState>,
    Path(course_id): Path<i64>,
    Query(query): Query<ListTemplatesQuery>,
    headers: HeaderMap,
) -> Result<Json<TemplateListResponse>, AppError> {
    let token = extract_token(&headers)
        .ok_or_else(|| AppError::Auth("Missing bearer token".to_string()))?;
    let (user_id, claims) = state.jwt_validator.validate_user(token)?;

    let params = ListParams {
        action: query.action,
        value: query.value,
    };

    let page = state
        .catalog
        .list(user_id, claims.is_site_admin(), course_id, &params)
        .await
        .map_err(catalog_error)?;

    let groups = (query.layout.as_deref() == Some(GROUPED_LAYOUT)).then(|| {
        let per_group = query.pergroup.unwrap_or_else(|| state.catalog.per_group());
        group_templates(&page.templates, per_group)
    });

    Ok(Json(TemplateListResponse { page, groups }))
}

/// Extract bearer token from the Authorization header
fn extract_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

fn catalog_error(err: CatalogError) -> AppError {
    if err.is_not_found() {
        AppError::NotFound(err.to_string())
    } else {
        AppError::Internal(err.to_string())
    }
}
