use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Platform role granted to site administrators. Free-tier installations
/// surface the upgrade notice only to holders of this role.
pub const SITE_ADMIN_ROLE: &str = "site-admin";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id, stringified directory id)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Platform roles (distinct from course-scoped role ids, which come
    /// from the directory)
    #[serde(default)]
    pub roles: Vec<String>,
    /// Additional custom claims
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl Claims {
    /// The directory user id, when the subject is a well-formed id.
    pub fn user_id(&self) -> Option<i64> {
        self.sub.parse().ok()
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn is_site_admin(&self) -> bool {
        self.has_role(SITE_ADMIN_ROLE)
    }

    pub fn is_expired(&self) -> bool {
        let now = chrono::Utc::now().timestamp();
        self.exp < now
    }
}
