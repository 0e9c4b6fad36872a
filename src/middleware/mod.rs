pub mod auth;
pub mod response;
pub mod validate_site;

pub use auth::{jwt_auth_middleware, require_superadmin_middleware, AuthUser};
pub use response::{ApiResponse, ApiResult};
pub use validate_site::{validate_site_middleware, ValidatedSite};
