// Authorization for the inventory admin surface
//
// Login lives in the storefront; this service only verifies the bearer token
// it issued and decides whether the caller is an administrator.

pub mod error;
pub mod middleware;
pub mod models;
pub mod token;

pub use error::AuthError;
pub use middleware::AdminUser;
pub use models::{AuthSettings, Role};
pub use token::{Claims, TokenService};
