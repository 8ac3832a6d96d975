use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::validation::validate_not_blank;

/// Default reorder threshold for newly created items
pub const DEFAULT_REORDER_POINT: i32 = 10;
/// Default quantity suggested when reordering
pub const DEFAULT_REORDER_QUANTITY: i32 = 50;
/// Default page size for movement history reads
pub const DEFAULT_HISTORY_LIMIT: i64 = 50;

// ============================================================================
// Enums
// ============================================================================

/// Kind of a stock movement.
///
/// `Sale` settles reserved stock and leaves `quantity_available` untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MovementKind {
    Restock,
    Adjustment,
    Reservation,
    Release,
    Sale,
}

impl MovementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementKind::Restock => "restock",
            MovementKind::Adjustment => "adjustment",
            MovementKind::Reservation => "reservation",
            MovementKind::Release => "release",
            MovementKind::Sale => "sale",
        }
    }

    /// Whether movements of this kind count toward `quantity_available`
    pub fn moves_available(&self) -> bool {
        !matches!(self, MovementKind::Sale)
    }
}

impl fmt::Display for MovementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why a manual adjustment was made.
///
/// Unknown values are rejected when the request body is deserialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AdjustmentReason {
    Damaged,
    Lost,
    Found,
    Correction,
    Theft,
    Return,
    Sample,
    Other,
}

impl AdjustmentReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdjustmentReason::Damaged => "damaged",
            AdjustmentReason::Lost => "lost",
            AdjustmentReason::Found => "found",
            AdjustmentReason::Correction => "correction",
            AdjustmentReason::Theft => "theft",
            AdjustmentReason::Return => "return",
            AdjustmentReason::Sample => "sample",
            AdjustmentReason::Other => "other",
        }
    }
}

impl fmt::Display for AdjustmentReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Alert categories raised by the alert engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    LowStock,
    OutOfStock,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::LowStock => "low_stock",
            AlertType::OutOfStock => "out_of_stock",
        }
    }
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Stock status filter for listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    #[default]
    All,
    InStock,
    LowStock,
    OutOfStock,
}

impl FromStr for StockStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" | "" => Ok(StockStatus::All),
            "in_stock" => Ok(StockStatus::InStock),
            "low_stock" => Ok(StockStatus::LowStock),
            "out_of_stock" => Ok(StockStatus::OutOfStock),
            other => Err(format!("Invalid status filter: {}", other)),
        }
    }
}

// ============================================================================
// Stored records
// ============================================================================

/// Stock record for one SKU
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct InventoryItem {
    pub id: Uuid,
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub sku: String,
    pub quantity_available: i32,
    pub quantity_reserved: i32,
    pub quantity_sold: i32,
    pub reorder_point: i32,
    pub reorder_quantity: i32,
    pub location: Option<String>,
    pub last_restocked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InventoryItem {
    /// Status bucket used by listings and stats
    pub fn status(&self) -> StockStatus {
        if self.quantity_available == 0 {
            StockStatus::OutOfStock
        } else if self.quantity_available <= self.reorder_point {
            StockStatus::LowStock
        } else {
            StockStatus::InStock
        }
    }
}

/// Append-only record of one change to an item's quantities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct StockMovement {
    pub id: Uuid,
    pub inventory_item_id: Uuid,
    pub kind: MovementKind,
    /// Signed delta applied to `quantity_available`; for sales, the units
    /// taken out of reserved stock
    pub quantity: i32,
    pub reason: String,
    pub reference_id: Option<String>,
    pub notes: Option<String>,
    pub performed_by: Option<Uuid>,
    pub performed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct InventoryAlert {
    pub id: Uuid,
    pub inventory_item_id: Uuid,
    pub alert_type: AlertType,
    pub threshold: Option<i32>,
    pub current_quantity: i32,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<Uuid>,
}

impl InventoryAlert {
    pub fn is_open(&self) -> bool {
        self.resolved_at.is_none()
    }
}

// ============================================================================
// Repository inputs
// ============================================================================

/// A single ledger write: item quantity change plus the movement describing it
#[derive(Debug, Clone)]
pub struct StockChange {
    pub kind: MovementKind,
    /// Delta applied to `quantity_available`
    pub delta: i32,
    /// Delta applied to `quantity_reserved`
    pub reserved_delta: i32,
    /// Delta applied to `quantity_sold`
    pub sold_delta: i32,
    pub reason: String,
    pub reference_id: Option<String>,
    pub notes: Option<String>,
    pub performed_by: Option<Uuid>,
    /// Replaces the stored location when present
    pub location: Option<String>,
}

impl StockChange {
    pub fn new(kind: MovementKind, delta: i32, reason: impl Into<String>) -> Self {
        Self {
            kind,
            delta,
            reserved_delta: 0,
            sold_delta: 0,
            reason: reason.into(),
            reference_id: None,
            notes: None,
            performed_by: None,
            location: None,
        }
    }

    /// Quantity written to the movement log
    pub fn movement_quantity(&self) -> i32 {
        if self.kind.moves_available() {
            self.delta
        } else {
            self.sold_delta
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewInventoryItem {
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub sku: String,
    pub quantity_available: i32,
    pub reorder_point: i32,
    pub reorder_quantity: i32,
    pub location: Option<String>,
    pub created_by: Option<Uuid>,
}

#[derive(Debug, Clone, Default)]
pub struct SettingsUpdate {
    pub reorder_point: Option<i32>,
    pub reorder_quantity: Option<i32>,
    pub location: Option<String>,
}

impl SettingsUpdate {
    pub fn is_empty(&self) -> bool {
        self.reorder_point.is_none() && self.reorder_quantity.is_none() && self.location.is_none()
    }
}

/// Validated listing filter
#[derive(Debug, Clone)]
pub struct InventoryFilter {
    pub status: StockStatus,
    pub search: Option<String>,
    pub location: Option<String>,
    pub page: u32,
    pub limit: u32,
}

impl Default for InventoryFilter {
    fn default() -> Self {
        Self {
            status: StockStatus::All,
            search: None,
            location: None,
            page: 1,
            limit: 50,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct InventoryStats {
    pub total_items: i64,
    pub in_stock: i64,
    pub low_stock: i64,
    pub out_of_stock: i64,
}

impl InventoryStats {
    /// Tallies a slice of items into status buckets
    pub fn from_items<'a>(items: impl IntoIterator<Item = &'a InventoryItem>) -> Self {
        items.into_iter().fold(Self::default(), |mut stats, item| {
            stats.total_items += 1;
            match item.status() {
                StockStatus::InStock => stats.in_stock += 1,
                StockStatus::LowStock => stats.low_stock += 1,
                StockStatus::OutOfStock => stats.out_of_stock += 1,
                StockStatus::All => {}
            }
            stats
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: i64,
    pub pages: i64,
}

impl Pagination {
    pub fn new(page: u32, limit: u32, total: i64) -> Self {
        let limit_i = i64::from(limit.max(1));
        Self {
            page,
            limit,
            total,
            pages: (total + limit_i - 1) / limit_i,
        }
    }
}

/// One page of items plus stats over the whole stock
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InventoryPage {
    pub items: Vec<InventoryItem>,
    pub pagination: Pagination,
    pub stats: InventoryStats,
}

/// Line of an order reservation
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ReservationLine {
    #[validate(custom = "validate_not_blank")]
    pub sku: String,
    #[validate(range(min = 1, message = "Quantity must be greater than zero"))]
    pub quantity: i32,
}

// ============================================================================
// Request DTOs
// ============================================================================

/// Request body for POST /api/inventory
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateInventoryItem {
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    #[validate(custom = "validate_not_blank")]
    pub sku: String,
    #[validate(range(min = 0, message = "Quantity cannot be negative"))]
    pub quantity_available: Option<i32>,
    #[validate(range(min = 0, message = "Reorder point cannot be negative"))]
    pub reorder_point: Option<i32>,
    #[validate(range(min = 0, message = "Reorder quantity cannot be negative"))]
    pub reorder_quantity: Option<i32>,
    pub location: Option<String>,
}

/// Request body for PUT /api/inventory/{sku}
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateInventorySettings {
    #[validate(range(min = 0, message = "Reorder point cannot be negative"))]
    pub reorder_point: Option<i32>,
    #[validate(range(min = 0, message = "Reorder quantity cannot be negative"))]
    pub reorder_quantity: Option<i32>,
    pub location: Option<String>,
}

impl From<UpdateInventorySettings> for SettingsUpdate {
    fn from(req: UpdateInventorySettings) -> Self {
        Self {
            reorder_point: req.reorder_point,
            reorder_quantity: req.reorder_quantity,
            location: req.location,
        }
    }
}

/// Request body for POST /api/inventory/adjust
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct AdjustmentRequest {
    #[validate(custom = "validate_not_blank")]
    pub sku: String,
    /// Signed delta; zero is rejected by the ledger
    pub quantity: i32,
    pub reason: AdjustmentReason,
    pub notes: Option<String>,
}

/// Request body for POST /api/inventory/restock
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct RestockRequest {
    #[validate(custom = "validate_not_blank")]
    pub sku: String,
    #[validate(range(min = 1, message = "Restock quantity must be greater than zero"))]
    pub quantity: i32,
    pub reason: Option<String>,
    pub location: Option<String>,
    pub notes: Option<String>,
}

/// Request body for POST /api/inventory/reservations
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ReservationRequest {
    #[validate(custom = "validate_not_blank")]
    pub order_id: String,
    #[validate(length(min = 1, message = "At least one line is required"))]
    pub items: Vec<ReservationLine>,
}

/// Request body for POST /api/inventory/alerts
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ResolveAlertRequest {
    #[serde(rename = "alertId")]
    pub alert_id: Uuid,
}

// ============================================================================
// Cart lines
// ============================================================================

/// Configurator choices attached to a cart line
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LineConfiguration {
    #[serde(alias = "usageType")]
    pub usage_type: Option<String>,
    #[serde(alias = "profileVariantId")]
    pub profile_variant_id: Option<Uuid>,
    #[serde(alias = "colorVariantId")]
    pub color_variant_id: Option<Uuid>,
    #[serde(alias = "thicknessMm")]
    pub thickness_mm: Option<f64>,
    #[serde(alias = "widthMm")]
    pub width_mm: Option<f64>,
    #[serde(alias = "lengthMm")]
    pub length_mm: Option<f64>,
}

/// One line of a shopping cart as submitted by the storefront
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CartLine {
    /// Product id
    pub id: Uuid,
    #[serde(default)]
    pub name: String,
    pub quantity: i32,
    #[serde(default, alias = "variantId")]
    pub variant_id: Option<Uuid>,
    /// Legacy free-text color
    #[serde(default)]
    pub color: Option<String>,
    /// Legacy free-text profile
    #[serde(default)]
    pub finish: Option<String>,
    #[serde(default)]
    pub configuration: Option<LineConfiguration>,
}

// ============================================================================
// Responses
// ============================================================================

/// GET /api/inventory/{sku} response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InventoryItemDetail {
    pub item: InventoryItem,
    pub movements: Vec<StockMovement>,
}

/// Shared shape of mutation responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MutationResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<InventoryItem>,
}

impl MutationResponse {
    pub fn with_item(message: impl Into<String>, item: InventoryItem) -> Self {
        Self {
            success: true,
            message: message.into(),
            item: Some(item),
        }
    }

    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            item: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AlertList {
    pub alerts: Vec<InventoryAlert>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReservationResponse {
    pub success: bool,
    pub order_id: String,
    pub items: Vec<InventoryItem>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(available: i32, reorder_point: i32) -> InventoryItem {
        let now = Utc::now();
        InventoryItem {
            id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            variant_id: None,
            sku: "YW-TER-LA-RECT-NATURAL-140X3000-T28".to_string(),
            quantity_available: available,
            quantity_reserved: 0,
            quantity_sold: 0,
            reorder_point,
            reorder_quantity: DEFAULT_REORDER_QUANTITY,
            location: None,
            last_restocked_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_status_buckets() {
        assert_eq!(item(0, 10).status(), StockStatus::OutOfStock);
        assert_eq!(item(10, 10).status(), StockStatus::LowStock);
        assert_eq!(item(1, 10).status(), StockStatus::LowStock);
        assert_eq!(item(11, 10).status(), StockStatus::InStock);
    }

    #[test]
    fn test_stats_from_items() {
        let items = vec![item(0, 10), item(5, 10), item(50, 10), item(11, 10)];
        let stats = InventoryStats::from_items(&items);
        assert_eq!(
            stats,
            InventoryStats {
                total_items: 4,
                in_stock: 2,
                low_stock: 1,
                out_of_stock: 1,
            }
        );
    }

    #[test]
    fn test_pagination_rounds_pages_up() {
        assert_eq!(Pagination::new(1, 50, 0).pages, 0);
        assert_eq!(Pagination::new(1, 50, 50).pages, 1);
        assert_eq!(Pagination::new(2, 50, 51).pages, 2);
    }

    #[test]
    fn test_adjustment_reason_rejects_unknown_values() {
        let parsed: Result<AdjustmentRequest, _> = serde_json::from_value(serde_json::json!({
            "sku": "YW-A",
            "quantity": -2,
            "reason": "vandalism"
        }));
        assert!(parsed.is_err());
    }

    #[test]
    fn test_blank_sku_fails_validation() {
        let req = AdjustmentRequest {
            sku: "   ".to_string(),
            quantity: 3,
            reason: AdjustmentReason::Correction,
            notes: None,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_restock_request_requires_positive_quantity() {
        let req = RestockRequest {
            sku: "YW-A".to_string(),
            quantity: 0,
            reason: None,
            location: None,
            notes: None,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_resolve_alert_request_uses_camel_case_id() {
        let id = Uuid::new_v4();
        let req: ResolveAlertRequest =
            serde_json::from_value(serde_json::json!({ "alertId": id })).unwrap();
        assert_eq!(req.alert_id, id);
    }
}
