// Authentication and authorization error types

use axum::response::{IntoResponse, Response};
use tracing::{error, warn};

use crate::error::ApiError;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing authentication token")]
    MissingToken,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired")]
    ExpiredToken,

    /// Authenticated, but not an administrator
    #[error("Administrator access required")]
    NotAdmin { email: String },

    #[error("Token generation error: {0}")]
    TokenGenerationError(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match &self {
            AuthError::TokenGenerationError(msg) => {
                error!("Token generation error: {}", msg);
                ApiError::InternalError(msg.clone()).into_response()
            }
            AuthError::NotAdmin { email } => {
                warn!("Non-admin {} attempted an admin operation", email);
                ApiError::Unauthorized(self.to_string()).into_response()
            }
            _ => ApiError::Unauthorized(self.to_string()).into_response(),
        }
    }
}
