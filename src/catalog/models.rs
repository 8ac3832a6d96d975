use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Product row as far as SKU resolution is concerned
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub wood_type: Option<String>,
    pub usage_type: Option<String>,
}

/// A selectable variant (profile, color, ...) of a product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ProductVariant {
    pub id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    pub variant_type: Option<String>,
}
