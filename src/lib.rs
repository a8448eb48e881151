// Infrastructure layer (shared components)
pub mod infrastructure;

// Re-export infrastructure modules at the crate root
pub use infrastructure::auth;
pub use infrastructure::config;
pub use infrastructure::error;
pub use infrastructure::metrics;
pub use infrastructure::postgres;

// Domain layer (business logic)
pub mod access;
pub mod catalog;
pub mod content;
pub mod directory;
pub mod files;
pub mod tags;
pub mod template;

// Application layer
pub mod api;
pub mod server;

// Supporting modules
pub mod telemetry;
