use uuid::Uuid;

/// Error types for inventory operations
#[derive(Debug, thiserror::Error)]
pub enum InventoryError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Database not configured")]
    StoreUnavailable,

    #[error("Inventory item not found: {0}")]
    ItemNotFound(String),

    #[error("Alert not found: {0}")]
    AlertNotFound(Uuid),

    #[error("SKU already exists: {0}")]
    DuplicateSku(String),

    #[error("Adjustment would result in negative stock: {resulting}")]
    NegativeStock { resulting: i32 },

    #[error("Insufficient stock for {sku}: requested {requested}, available {available}")]
    InsufficientStock {
        sku: String,
        requested: i32,
        available: i32,
    },

    #[error("Quantity out of range")]
    QuantityOutOfRange,

    /// Deleting would orphan reserved stock or movement history
    #[error("Inventory item {sku} cannot be deleted: {detail}")]
    ItemInUse { sku: String, detail: String },

    #[error("{0}")]
    ValidationError(String),
}

impl From<sqlx::Error> for InventoryError {
    fn from(err: sqlx::Error) -> Self {
        InventoryError::DatabaseError(err.to_string())
    }
}

/// True when a database error is a unique constraint violation (SQLSTATE 23505)
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some("23505"),
        _ => false,
    }
}

pub type InventoryResult<T> = Result<T, InventoryError>;
