// Admin extractor for protected inventory routes

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::auth::{error::AuthError, models::AuthSettings, models::Role};

/// Caller proven to be an administrator.
///
/// Rejects with 401 when the bearer token is missing, malformed, expired or
/// belongs to a non-admin.
#[derive(Debug, Clone)]
pub struct AdminUser {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
}

/// Extracts the raw token from an `Authorization: Bearer <token>` header
pub fn bearer_token(parts: &Parts) -> Result<&str, AuthError> {
    let auth_header = parts
        .headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?
        .to_str()
        .map_err(|_| AuthError::InvalidToken)?;

    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::InvalidToken)
}

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    AuthSettings: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let settings = AuthSettings::from_ref(state);
        let endpoint = parts.uri.path().to_string();

        let token = bearer_token(parts).map_err(|e| {
            warn!("Rejected request to {}: {}", endpoint, e);
            e
        })?;
        let claims = settings.tokens.validate_access_token(token)?;

        if !settings.is_admin(claims.role, &claims.email) {
            return Err(AuthError::NotAdmin { email: claims.email });
        }

        debug!("Admin {} authorized for {}", claims.sub, endpoint);
        Ok(AdminUser {
            user_id: claims.sub,
            email: claims.email,
            role: claims.role,
        })
    }
}
