// Error handling module for the inventory API
// Provides centralized error types and HTTP response conversion

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};
use utoipa::ToSchema;

use crate::inventory::error::InventoryError;

/// Main error type for the API
/// All handlers return Result<T, ApiError>
///
/// Each variant maps to one HTTP status code.
#[derive(Debug)]
pub enum ApiError {
    /// Request body failed derive-based validation (400)
    ValidationError(validator::ValidationErrors),

    /// Domain-level rejection of a well-formed request (400)
    BadRequest(String),

    /// Missing, invalid or insufficient credentials (401)
    Unauthorized(String),

    NotFound { resource: String, id: String },

    Conflict { message: String },

    /// Backing store not configured or unreachable (503)
    ServiceUnavailable(String),

    /// Database operation errors (500)
    /// Sensitive details are filtered from client responses
    DatabaseError(String),

    /// Internal server errors (500)
    InternalError(String),
}

/// Consistent error response structure
///
/// `error` is the human-readable message; `error_code` is machine-readable.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,

    /// e.g. "VALIDATION_ERROR", "NOT_FOUND"
    pub error_code: String,

    /// Field-level validation errors, omitted when None
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,

    /// RFC 3339 timestamp of when the error occurred
    pub timestamp: String,
}

impl ErrorResponse {
    fn new(error_code: &str, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            error_code: error_code.to_string(),
            details: None,
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_response) = self.to_error_response();
        (status, Json(error_response)).into_response()
    }
}

impl ApiError {
    /// Convert ApiError to HTTP status code and ErrorResponse
    ///
    /// 500-level errors are logged with `error!` and replaced by a generic
    /// client message.
    fn to_error_response(&self) -> (StatusCode, ErrorResponse) {
        let status = self.status_code();
        let body = match self {
            ApiError::ValidationError(errors) => {
                debug!("Validation error: {:?}", errors);
                ErrorResponse {
                    details: Some(serde_json::to_value(errors).unwrap_or(serde_json::json!({}))),
                    ..ErrorResponse::new("VALIDATION_ERROR", "Request validation failed")
                }
            }
            ApiError::BadRequest(message) => {
                debug!("Bad request: {}", message);
                ErrorResponse::new("BAD_REQUEST", message.clone())
            }
            ApiError::Unauthorized(message) => {
                warn!("Unauthorized access attempt: {}", message);
                ErrorResponse::new("UNAUTHORIZED", message.clone())
            }
            ApiError::NotFound { resource, id } => {
                debug!("Resource not found: {} {}", resource, id);
                ErrorResponse::new("NOT_FOUND", format!("{} {} not found", resource, id))
            }
            ApiError::Conflict { message } => {
                warn!("Conflict error: {}", message);
                ErrorResponse::new("CONFLICT", message.clone())
            }
            ApiError::ServiceUnavailable(message) => {
                warn!("Service unavailable: {}", message);
                ErrorResponse::new("SERVICE_UNAVAILABLE", message.clone())
            }
            ApiError::DatabaseError(db_error) => {
                error!("Database error: {}", db_error);
                ErrorResponse::new("DATABASE_ERROR", "A database error occurred")
            }
            ApiError::InternalError(internal_msg) => {
                error!("Internal error: {}", internal_msg);
                ErrorResponse::new("INTERNAL_ERROR", "An internal server error occurred")
            }
        };
        (status, body)
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::ValidationError(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::DatabaseError(_) | ApiError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ApiError::ValidationError(errors)
    }
}

/// Malformed or mistyped JSON bodies (including unknown enum values) are 400s
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<InventoryError> for ApiError {
    fn from(err: InventoryError) -> Self {
        match err {
            InventoryError::DatabaseError(msg) => ApiError::DatabaseError(msg),
            InventoryError::StoreUnavailable => ApiError::ServiceUnavailable(err.to_string()),
            InventoryError::ItemNotFound(sku) => ApiError::NotFound {
                resource: "Inventory item".to_string(),
                id: sku,
            },
            InventoryError::AlertNotFound(id) => ApiError::NotFound {
                resource: "Alert".to_string(),
                id: id.to_string(),
            },
            InventoryError::DuplicateSku(sku) => ApiError::Conflict {
                message: format!("SKU {} already exists", sku),
            },
            InventoryError::ItemInUse { .. } => ApiError::Conflict {
                message: err.to_string(),
            },
            InventoryError::NegativeStock { .. }
            | InventoryError::InsufficientStock { .. }
            | InventoryError::QuantityOutOfRange
            | InventoryError::ValidationError(_) => ApiError::BadRequest(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_inventory_errors_map_to_statuses() {
        let cases = vec![
            (InventoryError::StoreUnavailable, StatusCode::SERVICE_UNAVAILABLE),
            (InventoryError::ItemNotFound("YW-X".into()), StatusCode::NOT_FOUND),
            (InventoryError::AlertNotFound(Uuid::new_v4()), StatusCode::NOT_FOUND),
            (InventoryError::DuplicateSku("YW-X".into()), StatusCode::CONFLICT),
            (
                InventoryError::ItemInUse { sku: "YW-X".into(), detail: "4 units reserved".into() },
                StatusCode::CONFLICT,
            ),
            (InventoryError::QuantityOutOfRange, StatusCode::BAD_REQUEST),
            (InventoryError::NegativeStock { resulting: -1 }, StatusCode::BAD_REQUEST),
            (InventoryError::ValidationError("bad".into()), StatusCode::BAD_REQUEST),
            (InventoryError::DatabaseError("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status_code(), expected);
        }
    }

    #[test]
    fn test_database_details_are_not_leaked() {
        let (_, body) = ApiError::DatabaseError("password=hunter2".into()).to_error_response();
        assert_eq!(body.error, "A database error occurred");
        assert!(!body.error.contains("hunter2"));
    }

    #[test]
    fn test_store_unavailable_message() {
        let (status, body) = ApiError::from(InventoryError::StoreUnavailable).to_error_response();
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body.error, "Database not configured");
    }
}
