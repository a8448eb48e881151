mod claims;
mod jwt;

pub use claims::{Claims, SITE_ADMIN_ROLE};
pub use jwt::JwtValidator;
