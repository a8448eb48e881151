mod settings;

pub use settings::{
    CatalogConfig, DatabaseConfig, JwtConfig, OtelConfig, ServerConfig, Settings,
};
