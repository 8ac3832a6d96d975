// HTTP handlers for inventory administration and storefront stock checks

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::auth::AdminUser;
use crate::error::{ApiError, ErrorResponse};
use crate::inventory::availability::{CartAdjustment, CartValidation, ProductStockStatus};
use crate::inventory::models::{
    AdjustmentRequest, AlertList, CartLine, CreateInventoryItem, InventoryItem,
    InventoryItemDetail, InventoryPage, MutationResponse, ReservationRequest,
    ReservationResponse, ResolveAlertRequest, RestockRequest, StockMovement,
    UpdateInventorySettings,
};
use crate::inventory::query::ListParams;
use crate::inventory::resolver::ResolvePass;
use crate::inventory::sku::{self, SkuConfig};
use crate::AppState;

// ============================================================================
// Query and body types local to the HTTP surface
// ============================================================================

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AlertQuery {
    /// Include resolved alerts
    pub resolved: Option<bool>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HistoryQuery {
    /// Maximum number of movements, 50 by default
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StockQuery {
    pub quantity: Option<i32>,
    pub variant_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CartRequest {
    pub items: Vec<CartLine>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ResolvedSku {
    /// `null` when the product cannot be resolved
    pub sku: Option<String>,
    pub configuration: Option<SkuConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductStockResponse {
    #[serde(flatten)]
    pub status: ProductStockStatus,
    pub max_quantity: i32,
}

// ============================================================================
// Admin: items
// ============================================================================

/// Handler for GET /api/inventory
/// Lists inventory items with filters, pagination and stock stats
#[utoipa::path(
    get,
    path = "/api/inventory",
    params(ListParams),
    responses(
        (status = 200, description = "Page of inventory items", body = InventoryPage),
        (status = 400, description = "Invalid filter", body = ErrorResponse),
        (status = 401, description = "Not an administrator", body = ErrorResponse),
        (status = 503, description = "Database not configured", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "inventory"
)]
pub async fn list_inventory(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(params): Query<ListParams>,
) -> Result<Json<InventoryPage>, ApiError> {
    let filter = params.into_filter().map_err(ApiError::BadRequest)?;
    let page = state.services()?.ledger.list_items(&filter).await?;
    tracing::debug!("Listed {} of {} inventory items", page.items.len(), page.pagination.total);
    Ok(Json(page))
}

/// Handler for POST /api/inventory
#[utoipa::path(
    post,
    path = "/api/inventory",
    request_body = CreateInventoryItem,
    responses(
        (status = 201, description = "Inventory item created", body = InventoryItem),
        (status = 400, description = "Invalid input data", body = ErrorResponse),
        (status = 401, description = "Not an administrator", body = ErrorResponse),
        (status = 409, description = "SKU already exists", body = ErrorResponse),
        (status = 503, description = "Database not configured", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "inventory"
)]
pub async fn create_inventory_item(
    State(state): State<AppState>,
    admin: AdminUser,
    payload: Result<Json<CreateInventoryItem>, JsonRejection>,
) -> Result<(StatusCode, Json<InventoryItem>), ApiError> {
    let Json(payload) = payload?;
    payload.validate()?;

    let item = state
        .services()?
        .ledger
        .create_item(payload, Some(admin.user_id))
        .await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// Handler for GET /api/inventory/{sku}
/// Returns the item with its 20 most recent movements
#[utoipa::path(
    get,
    path = "/api/inventory/{sku}",
    params(("sku" = String, Path, description = "Inventory SKU")),
    responses(
        (status = 200, description = "Inventory item found", body = InventoryItemDetail),
        (status = 401, description = "Not an administrator", body = ErrorResponse),
        (status = 404, description = "Inventory item not found", body = ErrorResponse),
        (status = 503, description = "Database not configured", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "inventory"
)]
pub async fn get_inventory_item(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(sku): Path<String>,
) -> Result<Json<InventoryItemDetail>, ApiError> {
    let detail = state.services()?.ledger.get_item_detail(&sku).await?;
    Ok(Json(detail))
}

/// Handler for PUT /api/inventory/{sku}
/// Updates reorder point, reorder quantity and/or location
#[utoipa::path(
    put,
    path = "/api/inventory/{sku}",
    params(("sku" = String, Path, description = "Inventory SKU")),
    request_body = UpdateInventorySettings,
    responses(
        (status = 200, description = "Settings updated", body = MutationResponse),
        (status = 400, description = "No valid fields to update", body = ErrorResponse),
        (status = 401, description = "Not an administrator", body = ErrorResponse),
        (status = 404, description = "Inventory item not found", body = ErrorResponse),
        (status = 503, description = "Database not configured", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "inventory"
)]
pub async fn update_inventory_item(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(sku): Path<String>,
    payload: Result<Json<UpdateInventorySettings>, JsonRejection>,
) -> Result<Json<MutationResponse>, ApiError> {
    let Json(payload) = payload?;
    payload.validate()?;

    let item = state
        .services()?
        .ledger
        .update_settings(&sku, payload.into())
        .await?;
    Ok(Json(MutationResponse::with_item("Inventory settings updated", item)))
}

/// Handler for DELETE /api/inventory/{sku}
#[utoipa::path(
    delete,
    path = "/api/inventory/{sku}",
    params(("sku" = String, Path, description = "Inventory SKU")),
    responses(
        (status = 200, description = "Inventory item deleted", body = MutationResponse),
        (status = 401, description = "Not an administrator", body = ErrorResponse),
        (status = 404, description = "Inventory item not found", body = ErrorResponse),
        (status = 409, description = "Item has reserved stock or movement history", body = ErrorResponse),
        (status = 503, description = "Database not configured", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "inventory"
)]
pub async fn delete_inventory_item(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(sku): Path<String>,
) -> Result<Json<MutationResponse>, ApiError> {
    state.services()?.ledger.delete_item(&sku).await?;
    tracing::info!("Inventory item {} deleted by {}", sku, admin.email);
    Ok(Json(MutationResponse::message(format!("Inventory item {} deleted", sku))))
}

/// Handler for GET /api/inventory/{sku}/movements
#[utoipa::path(
    get,
    path = "/api/inventory/{sku}/movements",
    params(("sku" = String, Path, description = "Inventory SKU"), HistoryQuery),
    responses(
        (status = 200, description = "Movements, most recent first", body = Vec<StockMovement>),
        (status = 401, description = "Not an administrator", body = ErrorResponse),
        (status = 404, description = "Inventory item not found", body = ErrorResponse),
        (status = 503, description = "Database not configured", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "inventory"
)]
pub async fn get_movement_history(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(sku): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<StockMovement>>, ApiError> {
    let ledger = &state.services()?.ledger;
    let item = ledger.get_item_by_sku(&sku).await?.ok_or_else(|| ApiError::NotFound {
        resource: "Inventory item".to_string(),
        id: sku.clone(),
    })?;
    let movements = ledger.get_movement_history(item.id, query.limit).await?;
    Ok(Json(movements))
}

// ============================================================================
// Admin: stock changes
// ============================================================================

/// Handler for POST /api/inventory/adjust
#[utoipa::path(
    post,
    path = "/api/inventory/adjust",
    request_body = AdjustmentRequest,
    responses(
        (status = 200, description = "Adjustment applied", body = MutationResponse),
        (status = 400, description = "Invalid adjustment or negative result", body = ErrorResponse, example = json!({"error": "Adjustment would result in negative stock: -2"})),
        (status = 401, description = "Not an administrator", body = ErrorResponse),
        (status = 404, description = "Inventory item not found", body = ErrorResponse),
        (status = 503, description = "Database not configured", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "inventory"
)]
pub async fn adjust_inventory(
    State(state): State<AppState>,
    admin: AdminUser,
    payload: Result<Json<AdjustmentRequest>, JsonRejection>,
) -> Result<Json<MutationResponse>, ApiError> {
    let Json(payload) = payload?;
    payload.validate()?;

    let quantity = payload.quantity;
    let item = state
        .services()?
        .ledger
        .adjust(payload, Some(admin.user_id))
        .await?;
    Ok(Json(MutationResponse::with_item(
        format!("Inventory adjusted by {}", quantity),
        item,
    )))
}

/// Handler for POST /api/inventory/restock
#[utoipa::path(
    post,
    path = "/api/inventory/restock",
    request_body = RestockRequest,
    responses(
        (status = 200, description = "Stock received", body = MutationResponse),
        (status = 400, description = "Invalid input data", body = ErrorResponse),
        (status = 401, description = "Not an administrator", body = ErrorResponse),
        (status = 404, description = "Inventory item not found", body = ErrorResponse),
        (status = 503, description = "Database not configured", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "inventory"
)]
pub async fn restock_inventory(
    State(state): State<AppState>,
    admin: AdminUser,
    payload: Result<Json<RestockRequest>, JsonRejection>,
) -> Result<Json<MutationResponse>, ApiError> {
    let Json(payload) = payload?;
    payload.validate()?;

    let quantity = payload.quantity;
    let item = state
        .services()?
        .ledger
        .restock(payload, Some(admin.user_id))
        .await?;
    Ok(Json(MutationResponse::with_item(
        format!("Restocked {} units", quantity),
        item,
    )))
}

/// Handler for POST /api/inventory/reservations
/// Holds stock for an order; all lines or none
#[utoipa::path(
    post,
    path = "/api/inventory/reservations",
    request_body = ReservationRequest,
    responses(
        (status = 200, description = "Stock reserved", body = ReservationResponse),
        (status = 400, description = "Invalid request or insufficient stock", body = ErrorResponse),
        (status = 401, description = "Not an administrator", body = ErrorResponse),
        (status = 404, description = "Inventory item not found", body = ErrorResponse),
        (status = 503, description = "Database not configured", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "inventory"
)]
pub async fn reserve_stock(
    State(state): State<AppState>,
    admin: AdminUser,
    payload: Result<Json<ReservationRequest>, JsonRejection>,
) -> Result<Json<ReservationResponse>, ApiError> {
    let Json(payload) = payload?;
    payload.validate()?;

    let items = state
        .services()?
        .ledger
        .reserve_stock(&payload.items, &payload.order_id, Some(admin.user_id))
        .await?;
    Ok(Json(ReservationResponse {
        success: true,
        order_id: payload.order_id,
        items,
    }))
}

/// Handler for POST /api/inventory/reservations/{order_id}/release
#[utoipa::path(
    post,
    path = "/api/inventory/reservations/{order_id}/release",
    params(("order_id" = String, Path, description = "Order reference used when reserving")),
    responses(
        (status = 200, description = "Outstanding reservations released", body = ReservationResponse),
        (status = 401, description = "Not an administrator", body = ErrorResponse),
        (status = 503, description = "Database not configured", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "inventory"
)]
pub async fn release_stock(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(order_id): Path<String>,
) -> Result<Json<ReservationResponse>, ApiError> {
    let items = state
        .services()?
        .ledger
        .release_stock(&order_id, Some(admin.user_id))
        .await?;
    Ok(Json(ReservationResponse {
        success: true,
        order_id,
        items,
    }))
}

/// Handler for POST /api/inventory/reservations/{order_id}/confirm
/// Called once payment succeeds; reserved units become sold units
#[utoipa::path(
    post,
    path = "/api/inventory/reservations/{order_id}/confirm",
    params(("order_id" = String, Path, description = "Order reference used when reserving")),
    responses(
        (status = 200, description = "Outstanding reservations sold", body = ReservationResponse),
        (status = 401, description = "Not an administrator", body = ErrorResponse),
        (status = 503, description = "Database not configured", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "inventory"
)]
pub async fn confirm_sale(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(order_id): Path<String>,
) -> Result<Json<ReservationResponse>, ApiError> {
    let items = state
        .services()?
        .ledger
        .confirm_sale(&order_id, Some(admin.user_id))
        .await?;
    Ok(Json(ReservationResponse {
        success: true,
        order_id,
        items,
    }))
}

// ============================================================================
// Admin: alerts
// ============================================================================

/// Handler for GET /api/inventory/alerts
/// Open alerts by default, newest first
#[utoipa::path(
    get,
    path = "/api/inventory/alerts",
    params(AlertQuery),
    responses(
        (status = 200, description = "Alerts", body = AlertList),
        (status = 401, description = "Not an administrator", body = ErrorResponse),
        (status = 503, description = "Database not configured", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "alerts"
)]
pub async fn list_alerts(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<AlertQuery>,
) -> Result<Json<AlertList>, ApiError> {
    let alerts = state
        .services()?
        .ledger
        .alerts()
        .list_alerts(query.resolved.unwrap_or(false))
        .await?;
    Ok(Json(AlertList { alerts }))
}

/// Handler for POST /api/inventory/alerts
/// Resolves an alert; resolving twice is a no-op
#[utoipa::path(
    post,
    path = "/api/inventory/alerts",
    request_body = ResolveAlertRequest,
    responses(
        (status = 200, description = "Alert resolved", body = MutationResponse),
        (status = 400, description = "Missing or malformed alertId", body = ErrorResponse),
        (status = 401, description = "Not an administrator", body = ErrorResponse),
        (status = 404, description = "Alert not found", body = ErrorResponse),
        (status = 503, description = "Database not configured", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "alerts"
)]
pub async fn resolve_alert(
    State(state): State<AppState>,
    admin: AdminUser,
    payload: Result<Json<ResolveAlertRequest>, JsonRejection>,
) -> Result<Json<MutationResponse>, ApiError> {
    let Json(payload) = payload?;

    state
        .services()?
        .ledger
        .alerts()
        .resolve_alert(payload.alert_id, Some(admin.user_id))
        .await?;
    Ok(Json(MutationResponse::message("Alert resolved")))
}

// ============================================================================
// Storefront
// ============================================================================

/// Handler for POST /api/cart/validate
#[utoipa::path(
    post,
    path = "/api/cart/validate",
    request_body = CartRequest,
    responses(
        (status = 200, description = "Validation result; see is_valid", body = CartValidation),
        (status = 400, description = "Malformed cart", body = ErrorResponse),
        (status = 503, description = "Database not configured", body = ErrorResponse)
    ),
    tag = "cart"
)]
pub async fn validate_cart(
    State(state): State<AppState>,
    payload: Result<Json<CartRequest>, JsonRejection>,
) -> Result<Json<CartValidation>, ApiError> {
    let Json(payload) = payload?;
    let result = state
        .services()?
        .availability
        .validate_cart_stock(&payload.items)
        .await;
    Ok(Json(result))
}

/// Handler for POST /api/cart/adjust
/// Clamps cart quantities to what is on hand
#[utoipa::path(
    post,
    path = "/api/cart/adjust",
    request_body = CartRequest,
    responses(
        (status = 200, description = "Adjusted cart", body = CartAdjustment),
        (status = 400, description = "Malformed cart", body = ErrorResponse),
        (status = 503, description = "Database not configured", body = ErrorResponse)
    ),
    tag = "cart"
)]
pub async fn adjust_cart(
    State(state): State<AppState>,
    payload: Result<Json<CartRequest>, JsonRejection>,
) -> Result<Json<CartAdjustment>, ApiError> {
    let Json(payload) = payload?;
    let result = state
        .services()?
        .availability
        .adjust_cart_to_stock(payload.items)
        .await;
    Ok(Json(result))
}

/// Handler for POST /api/cart/resolve-sku
/// Derives the inventory SKU for a configured cart line
#[utoipa::path(
    post,
    path = "/api/cart/resolve-sku",
    request_body = CartLine,
    responses(
        (status = 200, description = "Resolved SKU, null when unresolvable", body = ResolvedSku),
        (status = 400, description = "Malformed cart line", body = ErrorResponse)
    ),
    tag = "cart"
)]
pub async fn resolve_sku(
    State(state): State<AppState>,
    payload: Result<Json<CartLine>, JsonRejection>,
) -> Result<Json<ResolvedSku>, ApiError> {
    let Json(line) = payload?;

    let mut pass = ResolvePass::new();
    let configuration = match state.resolver.resolve(&line, &mut pass).await {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("SKU resolution failed for product {}: {}", line.id, e);
            None
        }
    };

    Ok(Json(ResolvedSku {
        sku: configuration.as_ref().map(sku::encode),
        configuration,
    }))
}

/// Handler for GET /api/stock/{product_id}
#[utoipa::path(
    get,
    path = "/api/stock/{product_id}",
    params(("product_id" = Uuid, Path, description = "Product id"), StockQuery),
    responses(
        (status = 200, description = "Stock status for the product", body = ProductStockResponse),
        (status = 503, description = "Database not configured", body = ErrorResponse)
    ),
    tag = "cart"
)]
pub async fn product_stock(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Query(query): Query<StockQuery>,
) -> Result<Json<ProductStockResponse>, ApiError> {
    let availability = &state.services()?.availability;
    let quantity = query.quantity.unwrap_or(1).max(1);

    let status = availability
        .check_product_stock(product_id, quantity, query.variant_id)
        .await;
    let max_quantity = availability.max_quantity(product_id, query.variant_id).await;
    Ok(Json(ProductStockResponse {
        status,
        max_quantity,
    }))
}

/// Handler for GET /api/sku/{sku}/check
/// Lightweight shape check for SKUs typed by staff
#[utoipa::path(
    get,
    path = "/api/sku/{sku}/check",
    params(("sku" = String, Path, description = "Candidate SKU")),
    responses(
        (status = 200, description = "SKU is well-formed"),
        (status = 400, description = "SKU is malformed", body = ErrorResponse)
    ),
    tag = "cart"
)]
pub async fn check_sku_format(Path(candidate): Path<String>) -> Result<StatusCode, ApiError> {
    if sku::is_valid_sku(&candidate) {
        Ok(StatusCode::OK)
    } else {
        Err(ApiError::BadRequest(format!("Malformed SKU: {}", candidate)))
    }
}
