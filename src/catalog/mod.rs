//! The template catalog.
//!
//! This module contains the listing pipeline:
//! - `query`: tier policy, search validation and SELECT construction
//! - `store`: course and template persistence behind `CatalogStore`
//! - `assembler`: enrichment of eligible templates for presentation
//! - `service`: the listing orchestration and the grouping transform

pub mod assembler;
pub mod query;
pub mod service;
pub mod store;

pub use assembler::TemplateAssembler;
pub use query::{parse_ordering, ListQuery, SearchQuery, SqlParam, SqlSelect, TierPolicy};
pub use service::{group_templates, CatalogService, ListParams};
pub use store::{
    create_catalog_store, CatalogStore, MemoryCatalogStore, PostgresCatalogStore, StoreError,
};

use thiserror::Error;

/// Catalog error type aggregating collaborator failures.
///
/// A listing aborts on the first collaborator failure; there are no
/// retries.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Store error: {0}")]
    Store(#[from] store::StoreError),

    #[error("Directory error: {0}")]
    Directory(#[from] crate::directory::DirectoryError),

    #[error("Access error: {0}")]
    Access(#[from] crate::access::AccessError),

    #[error("Tag error: {0}")]
    Tags(#[from] crate::tags::TagStoreError),

    #[error("File error: {0}")]
    Files(#[from] crate::files::FileStoreError),
}

impl CatalogError {
    /// Whether this error means the requested course does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, CatalogError::Store(StoreError::CourseNotFound(_)))
    }
}

/// Result type for catalog operations
pub type CatalogResult<T> = Result<T, CatalogError>;
