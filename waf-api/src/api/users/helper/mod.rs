pub mod auth_token;
pub mod auth_middleware;

pub use auth_token::{AuthConfig, Claims, generate_token, validate_token, is_admin, is_staff_or_admin, can_modify_user};
pub use auth_middleware::{RoleAuth, UserSelfCheck, ClaimsFromRequest, JwtAuth};
