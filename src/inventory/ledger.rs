// Stock Ledger service
//
// The only entry point for changing stock. Validates requests, hands a single
// atomic change to the repository and lets the alert engine react to the new
// quantity.

use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::inventory::alerts::AlertEngine;
use crate::inventory::error::{InventoryError, InventoryResult};
use crate::inventory::models::{
    AdjustmentRequest, CreateInventoryItem, InventoryFilter, InventoryItem, InventoryItemDetail,
    InventoryPage, MovementKind, NewInventoryItem, ReservationLine, RestockRequest,
    SettingsUpdate, StockChange, StockMovement, DEFAULT_HISTORY_LIMIT, DEFAULT_REORDER_POINT,
    DEFAULT_REORDER_QUANTITY,
};
use crate::inventory::repository::InventoryRepository;
use crate::validation::{validate_non_zero_quantity, validate_positive_quantity};

/// Reason recorded when a restock request carries none
pub const DEFAULT_RESTOCK_REASON: &str = "Inventory restocked";
/// Movements shown alongside an item detail
pub const DETAIL_MOVEMENT_LIMIT: i64 = 20;

fn require_sku(sku: &str) -> InventoryResult<&str> {
    let trimmed = sku.trim();
    if trimmed.is_empty() {
        return Err(InventoryError::ValidationError("SKU is required".to_string()));
    }
    Ok(trimmed)
}

/// Trims optional free text and drops it when blank
fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Clone)]
pub struct StockLedger {
    repo: Arc<dyn InventoryRepository>,
    alerts: AlertEngine,
}

impl StockLedger {
    pub fn new(repo: Arc<dyn InventoryRepository>, alerts: AlertEngine) -> Self {
        Self { repo, alerts }
    }

    pub fn alerts(&self) -> &AlertEngine {
        &self.alerts
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Adds received stock. Restock never lowers quantity, so it never fails the
    /// non-negative guard.
    pub async fn restock(
        &self,
        request: RestockRequest,
        performed_by: Option<Uuid>,
    ) -> InventoryResult<InventoryItem> {
        let sku = require_sku(&request.sku)?;
        validate_positive_quantity(request.quantity).map_err(|_| {
            InventoryError::ValidationError("Restock quantity must be greater than zero".to_string())
        })?;

        let mut change = StockChange::new(
            MovementKind::Restock,
            request.quantity,
            clean(request.reason).unwrap_or_else(|| DEFAULT_RESTOCK_REASON.to_string()),
        );
        change.location = clean(request.location);
        change.notes = clean(request.notes);
        change.performed_by = performed_by;

        let item = self.repo.apply_change(sku, change).await?;
        info!(
            "Restocked {} by {} (now {})",
            item.sku, request.quantity, item.quantity_available
        );

        self.alerts.evaluate_after_write(&item).await;
        Ok(item)
    }

    /// Applies a signed manual correction.
    ///
    /// Rejected with `NegativeStock` when it would take the item below zero.
    pub async fn adjust(
        &self,
        request: AdjustmentRequest,
        performed_by: Option<Uuid>,
    ) -> InventoryResult<InventoryItem> {
        let sku = require_sku(&request.sku)?;
        validate_non_zero_quantity(request.quantity).map_err(|_| {
            InventoryError::ValidationError("Adjustment quantity cannot be zero".to_string())
        })?;

        let mut change =
            StockChange::new(MovementKind::Adjustment, request.quantity, request.reason.as_str());
        change.notes = clean(request.notes);
        change.performed_by = performed_by;

        let item = match self.repo.apply_change(sku, change).await {
            Ok(item) => item,
            Err(e @ InventoryError::NegativeStock { .. }) => {
                warn!("Rejected adjustment of {} on {}: {}", request.quantity, sku, e);
                return Err(e);
            }
            Err(e) => return Err(e),
        };
        info!(
            "Adjusted {} by {} ({}), now {}",
            item.sku, request.quantity, request.reason, item.quantity_available
        );

        self.alerts.evaluate_after_write(&item).await;
        Ok(item)
    }

    /// Holds stock for an order. Either every line is reserved or none is.
    pub async fn reserve_stock(
        &self,
        lines: &[ReservationLine],
        order_id: &str,
        performed_by: Option<Uuid>,
    ) -> InventoryResult<Vec<InventoryItem>> {
        let order_id = order_id.trim();
        if order_id.is_empty() {
            return Err(InventoryError::ValidationError("Order id is required".to_string()));
        }
        if lines.is_empty() {
            return Err(InventoryError::ValidationError(
                "At least one line is required".to_string(),
            ));
        }
        for line in lines {
            require_sku(&line.sku)?;
            validate_positive_quantity(line.quantity).map_err(|_| {
                InventoryError::ValidationError(format!(
                    "Reservation quantity for {} must be greater than zero",
                    line.sku
                ))
            })?;
        }

        let items = self.repo.reserve(lines, order_id, performed_by).await?;
        info!("Reserved {} line(s) for order {}", items.len(), order_id);

        for item in &items {
            self.alerts.evaluate_after_write(item).await;
        }
        Ok(items)
    }

    /// Returns whatever is still held for an order. Repeated calls are no-ops.
    pub async fn release_stock(
        &self,
        order_id: &str,
        performed_by: Option<Uuid>,
    ) -> InventoryResult<Vec<InventoryItem>> {
        let order_id = order_id.trim();
        if order_id.is_empty() {
            return Err(InventoryError::ValidationError("Order id is required".to_string()));
        }

        let items = self.repo.release(order_id, performed_by).await?;
        info!("Released {} line(s) for order {}", items.len(), order_id);
        Ok(items)
    }

    /// Settles a paid order: reserved units become sold units.
    /// Available stock is unchanged, so no alert is evaluated.
    pub async fn confirm_sale(
        &self,
        order_id: &str,
        performed_by: Option<Uuid>,
    ) -> InventoryResult<Vec<InventoryItem>> {
        let order_id = order_id.trim();
        if order_id.is_empty() {
            return Err(InventoryError::ValidationError("Order id is required".to_string()));
        }

        let items = self.repo.confirm_sale(order_id, performed_by).await?;
        info!("Confirmed sale of {} line(s) for order {}", items.len(), order_id);
        Ok(items)
    }

    pub async fn create_item(
        &self,
        request: CreateInventoryItem,
        created_by: Option<Uuid>,
    ) -> InventoryResult<InventoryItem> {
        let sku = require_sku(&request.sku)?.to_string();

        let item = self
            .repo
            .create(NewInventoryItem {
                product_id: request.product_id,
                variant_id: request.variant_id,
                sku,
                quantity_available: request.quantity_available.unwrap_or(0).max(0),
                reorder_point: request.reorder_point.unwrap_or(DEFAULT_REORDER_POINT),
                reorder_quantity: request.reorder_quantity.unwrap_or(DEFAULT_REORDER_QUANTITY),
                location: clean(request.location),
                created_by,
            })
            .await?;
        info!("Created inventory item {} ({})", item.sku, item.id);

        self.alerts.evaluate_after_write(&item).await;
        Ok(item)
    }

    pub async fn update_settings(
        &self,
        sku: &str,
        update: SettingsUpdate,
    ) -> InventoryResult<InventoryItem> {
        let update = SettingsUpdate {
            location: clean(update.location),
            ..update
        };
        if update.is_empty() {
            return Err(InventoryError::ValidationError(
                "No valid fields to update".to_string(),
            ));
        }

        let item = self
            .repo
            .update_settings(sku, &update)
            .await?
            .ok_or_else(|| InventoryError::ItemNotFound(sku.to_string()))?;
        info!("Updated settings for {}", item.sku);

        // A raised reorder point can put the item into low stock
        self.alerts.evaluate_after_write(&item).await;
        Ok(item)
    }

    /// Deletes an item that never held stock. Items with reserved units or
    /// movement history are rejected with `ItemInUse`.
    pub async fn delete_item(&self, sku: &str) -> InventoryResult<()> {
        if !self.repo.delete(sku).await? {
            return Err(InventoryError::ItemNotFound(sku.to_string()));
        }
        info!("Deleted inventory item {}", sku);
        Ok(())
    }

    // ========================================================================
    // Reads
    // ========================================================================

    pub async fn get_item_by_sku(&self, sku: &str) -> InventoryResult<Option<InventoryItem>> {
        debug!("Fetching inventory item {}", sku);
        self.repo.find_by_sku(sku).await
    }

    /// Item plus its latest movements
    pub async fn get_item_detail(&self, sku: &str) -> InventoryResult<InventoryItemDetail> {
        let item = self
            .get_item_by_sku(sku)
            .await?
            .ok_or_else(|| InventoryError::ItemNotFound(sku.to_string()))?;
        let movements = self.repo.movements(item.id, DETAIL_MOVEMENT_LIMIT).await?;
        Ok(InventoryItemDetail { item, movements })
    }

    /// Available quantity for a product or variant; 0 when nothing is stocked
    pub async fn get_stock_level(
        &self,
        product_id: Uuid,
        variant_id: Option<Uuid>,
    ) -> InventoryResult<i32> {
        Ok(self
            .repo
            .find_by_product(product_id, variant_id)
            .await?
            .map_or(0, |item| item.quantity_available))
    }

    /// Most recent movements first, 50 by default
    pub async fn get_movement_history(
        &self,
        item_id: Uuid,
        limit: Option<i64>,
    ) -> InventoryResult<Vec<StockMovement>> {
        let limit = limit.unwrap_or(DEFAULT_HISTORY_LIMIT).max(1);
        self.repo.movements(item_id, limit).await
    }

    pub async fn list_items(&self, filter: &InventoryFilter) -> InventoryResult<InventoryPage> {
        debug!("Listing inventory with filter {:?}", filter);
        self.repo.list(filter).await
    }
}
