use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerConfig,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub otel: OtelConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: Option<String>,
    pub audience: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Connection URL; when absent the service runs on in-memory backends.
    pub url: Option<String>,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u32,
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_seconds: u32,
}

/// Listing behavior: licensing tier, caps and layout defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    /// Entitled ("pro") installation: unlimited listing, custom ordering,
    /// restriction rules.
    #[serde(default)]
    pub pro_enabled: bool,
    /// Cap on importable templates shown on the free tier.
    #[serde(default = "default_free_tier_limit")]
    pub free_tier_limit: usize,
    /// Templates per group in the grouped layout.
    #[serde(default = "default_per_group")]
    pub per_group: usize,
    /// Admin-maintained ordering list, comma-separated template ids.
    /// Only honored on the pro tier.
    pub template_order: Option<String>,
    /// Base URL under which description assets are served.
    #[serde(default = "default_file_base_url")]
    pub file_base_url: String,
    /// Where the free-tier upgrade notice points site admins.
    #[serde(default = "default_upgrade_url")]
    pub upgrade_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OtelConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_otel_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_otel_service_name")]
    pub service_name: String,
    #[serde(default = "default_otel_sampling_ratio")]
    pub sampling_ratio: f64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8082
}

fn default_pool_size() -> u32 {
    5
}

fn default_connect_timeout() -> u32 {
    5
}

fn default_idle_timeout() -> u32 {
    600
}

fn default_free_tier_limit() -> usize {
    4
}

fn default_per_group() -> usize {
    2
}

fn default_file_base_url() -> String {
    "/files".to_string()
}

fn default_upgrade_url() -> String {
    "https://ara.dev/catalog/pro".to_string()
}

fn default_otel_endpoint() -> String {
    "http://localhost:4317".to_string()
}

fn default_otel_service_name() -> String {
    "ara-template-catalog".to_string()
}

fn default_otel_sampling_ratio() -> f64 {
    1.0
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            // Start with default values
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8082)?
            .set_default("catalog.pro_enabled", false)?
            .set_default("catalog.free_tier_limit", 4)?
            .set_default("catalog.per_group", 2)?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Load from environment variables
            // SERVER__HOST, JWT__SECRET, DATABASE__URL, CATALOG__PRO_ENABLED, etc.
            .add_source(
                Environment::default()
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(","),
            );

        builder.build()?.try_deserialize()
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: vec![],
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            pool_size: default_pool_size(),
            connect_timeout_seconds: default_connect_timeout(),
            idle_timeout_seconds: default_idle_timeout(),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            pro_enabled: false,
            free_tier_limit: default_free_tier_limit(),
            per_group: default_per_group(),
            template_order: None,
            file_base_url: default_file_base_url(),
            upgrade_url: default_upgrade_url(),
        }
    }
}

impl Default for OtelConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_otel_endpoint(),
            service_name: default_otel_service_name(),
            sampling_ratio: default_otel_sampling_ratio(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let server = ServerConfig::default();
        assert_eq!(server.host, "0.0.0.0");
        assert_eq!(server.port, 8082);
    }

    #[test]
    fn test_catalog_defaults() {
        let catalog = CatalogConfig::default();
        assert!(!catalog.pro_enabled);
        assert_eq!(catalog.free_tier_limit, 4);
        assert_eq!(catalog.per_group, 2);
        assert!(catalog.template_order.is_none());
    }

    #[test]
    fn test_database_defaults() {
        let db = DatabaseConfig::default();
        assert!(db.url.is_none());
        assert_eq!(db.pool_size, 5);
    }
}
