use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;

use crate::access::{create_authorizer, create_category_tree};
use crate::auth::JwtValidator;
use crate::catalog::{create_catalog_store, CatalogService, TemplateAssembler};
use crate::config::Settings;
use crate::content::HtmlContentRenderer;
use crate::directory::create_directory;
use crate::files::create_file_store;
use crate::postgres::PostgresPool;
use crate::tags::create_tag_provider;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub jwt_validator: Arc<JwtValidator>,
    pub catalog: Arc<CatalogService>,
    pub postgres_pool: Option<Arc<PostgresPool>>,
    pub start_time: Instant,
}

impl AppState {
    /// Wire up the full application state.
    ///
    /// With `database.url` configured every backend runs on PostgreSQL;
    /// without it the service falls back to in-memory backends, which is
    /// the development and test setup.
    pub async fn build(settings: Settings) -> Result<Self> {
        let postgres_pool = match settings.database.url {
            Some(_) => Some(Arc::new(PostgresPool::new(&settings.database).await?)),
            None => {
                tracing::warn!("No database URL configured, using in-memory backends");
                None
            }
        };

        let jwt_validator = Arc::new(JwtValidator::new(&settings.jwt));

        let store = create_catalog_store(postgres_pool.clone());
        let directory = create_directory(postgres_pool.clone());
        let authorizer = create_authorizer(postgres_pool.clone());
        let categories = create_category_tree(postgres_pool.clone());
        let tags = create_tag_provider(postgres_pool.clone());
        let files = create_file_store(&settings.catalog.file_base_url, postgres_pool.clone());

        let assembler = TemplateAssembler::new(
            Arc::new(HtmlContentRenderer::new()),
            tags,
            files,
            settings.catalog.file_base_url.clone(),
        );
        let catalog = Arc::new(CatalogService::new(
            settings.catalog.clone(),
            store,
            directory,
            authorizer,
            categories,
            assembler,
        ));

        Ok(Self {
            settings: Arc::new(settings),
            jwt_validator,
            catalog,
            postgres_pool,
            start_time: Instant::now(),
        })
    }
}
