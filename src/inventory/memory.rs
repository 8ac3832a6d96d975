// In-process inventory store
//
// Mirrors the PostgreSQL repository semantics behind a single async mutex.
// Used for tests and for running the service without a database.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::inventory::error::{InventoryError, InventoryResult};
use crate::inventory::models::{
    AlertType, InventoryAlert, InventoryFilter, InventoryItem, InventoryPage, InventoryStats,
    MovementKind, NewInventoryItem, Pagination, ReservationLine, SettingsUpdate, StockChange,
    StockMovement, StockStatus,
};
use crate::inventory::query::page_offset;
use crate::inventory::repository::{
    AlertRepository, InventoryRepository, INITIAL_STOCK_REASON, RELEASE_REASON,
    RESERVATION_REASON, SALE_REASON,
};

#[derive(Default)]
struct MemoryState {
    items: Vec<InventoryItem>,
    movements: Vec<StockMovement>,
    alerts: Vec<InventoryAlert>,
}

impl MemoryState {
    fn position_by_sku(&self, sku: &str) -> Option<usize> {
        self.items.iter().position(|item| item.sku == sku)
    }

    fn apply(&mut self, index: usize, change: &StockChange) -> InventoryResult<InventoryItem> {
        let now = Utc::now();
        let item = &mut self.items[index];

        let resulting = item
            .quantity_available
            .checked_add(change.delta)
            .ok_or(InventoryError::QuantityOutOfRange)?;
        if resulting < 0 {
            return Err(InventoryError::NegativeStock { resulting });
        }
        let reserved = item
            .quantity_reserved
            .checked_add(change.reserved_delta)
            .ok_or(InventoryError::QuantityOutOfRange)?;
        let sold = item
            .quantity_sold
            .checked_add(change.sold_delta)
            .ok_or(InventoryError::QuantityOutOfRange)?;

        item.quantity_available = resulting;
        item.quantity_reserved = reserved.max(0);
        item.quantity_sold = sold;
        if let Some(ref location) = change.location {
            item.location = Some(location.clone());
        }
        if change.kind == MovementKind::Restock {
            item.last_restocked_at = Some(now);
        }
        item.updated_at = now;
        let updated = item.clone();

        self.movements.push(StockMovement {
            id: Uuid::new_v4(),
            inventory_item_id: updated.id,
            kind: change.kind,
            quantity: change.movement_quantity(),
            reason: change.reason.clone(),
            reference_id: change.reference_id.clone(),
            notes: change.notes.clone(),
            performed_by: change.performed_by,
            performed_at: now,
        });

        Ok(updated)
    }

    /// Quantity still held for an order, per item
    fn held_for_order(&self, order_id: &str) -> InventoryResult<Vec<(Uuid, i32)>> {
        let mut net_by_item: Vec<(Uuid, i32)> = Vec::new();
        for movement in self.movements.iter().filter(|m| {
            m.reference_id.as_deref() == Some(order_id)
                && matches!(
                    m.kind,
                    MovementKind::Reservation | MovementKind::Release | MovementKind::Sale
                )
        }) {
            match net_by_item
                .iter_mut()
                .find(|(id, _)| *id == movement.inventory_item_id)
            {
                Some((_, net)) => {
                    *net = net
                        .checked_add(movement.quantity)
                        .ok_or(InventoryError::QuantityOutOfRange)?;
                }
                None => net_by_item.push((movement.inventory_item_id, movement.quantity)),
            }
        }

        Ok(net_by_item
            .into_iter()
            .filter(|(_, net)| *net < 0)
            .map(|(id, net)| (id, net.saturating_neg()))
            .collect())
    }
}

fn matches_filter(item: &InventoryItem, filter: &InventoryFilter) -> bool {
    let status_ok = match filter.status {
        StockStatus::All => true,
        status => item.status() == status,
    };

    let search_ok = filter.search.as_ref().map_or(true, |search| {
        let needle = search.to_lowercase();
        item.sku.to_lowercase().contains(&needle)
            || item
                .location
                .as_ref()
                .map_or(false, |loc| loc.to_lowercase().contains(&needle))
    });

    let location_ok = filter
        .location
        .as_ref()
        .map_or(true, |location| item.location.as_deref() == Some(location.as_str()));

    status_ok && search_ok && location_ok
}

/// Inventory and alert store held in memory
#[derive(Clone, Default)]
pub struct MemoryInventoryRepository {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryInventoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sum of the movement quantities that count toward `quantity_available`
    pub async fn movement_total(&self, item_id: Uuid) -> i32 {
        let state = self.state.lock().await;
        state
            .movements
            .iter()
            .filter(|m| m.inventory_item_id == item_id && m.kind.moves_available())
            .map(|m| m.quantity)
            .sum()
    }
}

#[async_trait]
impl InventoryRepository for MemoryInventoryRepository {
    async fn find_by_sku(&self, sku: &str) -> InventoryResult<Option<InventoryItem>> {
        let state = self.state.lock().await;
        Ok(state.items.iter().find(|item| item.sku == sku).cloned())
    }

    async fn find_by_product(
        &self,
        product_id: Uuid,
        variant_id: Option<Uuid>,
    ) -> InventoryResult<Option<InventoryItem>> {
        let state = self.state.lock().await;
        Ok(state
            .items
            .iter()
            .find(|item| item.product_id == product_id && item.variant_id == variant_id)
            .cloned())
    }

    async fn list(&self, filter: &InventoryFilter) -> InventoryResult<InventoryPage> {
        let state = self.state.lock().await;

        let mut matching: Vec<&InventoryItem> = state
            .items
            .iter()
            .filter(|item| matches_filter(item, filter))
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.sku.cmp(&b.sku)));

        let total = matching.len() as i64;
        let offset = usize::try_from(page_offset(filter.page, filter.limit)).unwrap_or(usize::MAX);
        let items = matching
            .into_iter()
            .skip(offset)
            .take(filter.limit as usize)
            .cloned()
            .collect();

        Ok(InventoryPage {
            items,
            pagination: Pagination::new(filter.page, filter.limit, total),
            stats: InventoryStats::from_items(&state.items),
        })
    }

    async fn create(&self, new_item: NewInventoryItem) -> InventoryResult<InventoryItem> {
        let mut state = self.state.lock().await;

        if state.position_by_sku(&new_item.sku).is_some() {
            return Err(InventoryError::DuplicateSku(new_item.sku));
        }

        let now = Utc::now();
        let item = InventoryItem {
            id: Uuid::new_v4(),
            product_id: new_item.product_id,
            variant_id: new_item.variant_id,
            sku: new_item.sku,
            quantity_available: 0,
            quantity_reserved: 0,
            quantity_sold: 0,
            reorder_point: new_item.reorder_point,
            reorder_quantity: new_item.reorder_quantity,
            location: new_item.location,
            last_restocked_at: None,
            created_at: now,
            updated_at: now,
        };
        state.items.push(item.clone());

        if new_item.quantity_available > 0 {
            let index = state.items.len() - 1;
            let mut opening = StockChange::new(
                MovementKind::Restock,
                new_item.quantity_available,
                INITIAL_STOCK_REASON,
            );
            opening.performed_by = new_item.created_by;
            return state.apply(index, &opening);
        }

        Ok(item)
    }

    async fn update_settings(
        &self,
        sku: &str,
        update: &SettingsUpdate,
    ) -> InventoryResult<Option<InventoryItem>> {
        let mut state = self.state.lock().await;
        let Some(index) = state.position_by_sku(sku) else {
            return Ok(None);
        };

        let item = &mut state.items[index];
        if let Some(point) = update.reorder_point {
            item.reorder_point = point;
        }
        if let Some(quantity) = update.reorder_quantity {
            item.reorder_quantity = quantity;
        }
        if let Some(ref location) = update.location {
            item.location = Some(location.clone());
        }
        item.updated_at = Utc::now();
        Ok(Some(item.clone()))
    }

    async fn delete(&self, sku: &str) -> InventoryResult<bool> {
        let mut state = self.state.lock().await;
        let Some(index) = state.position_by_sku(sku) else {
            return Ok(false);
        };

        let item = &state.items[index];
        if item.quantity_reserved > 0 {
            return Err(InventoryError::ItemInUse {
                sku: sku.to_string(),
                detail: format!("{} units reserved", item.quantity_reserved),
            });
        }
        let item_id = item.id;
        if state.movements.iter().any(|m| m.inventory_item_id == item_id) {
            return Err(InventoryError::ItemInUse {
                sku: sku.to_string(),
                detail: "movement history exists".to_string(),
            });
        }

        state.items.remove(index);
        state.alerts.retain(|a| a.inventory_item_id != item_id);
        Ok(true)
    }

    async fn apply_change(&self, sku: &str, change: StockChange) -> InventoryResult<InventoryItem> {
        let mut state = self.state.lock().await;
        let index = state
            .position_by_sku(sku)
            .ok_or_else(|| InventoryError::ItemNotFound(sku.to_string()))?;
        state.apply(index, &change)
    }

    async fn reserve(
        &self,
        lines: &[ReservationLine],
        order_id: &str,
        performed_by: Option<Uuid>,
    ) -> InventoryResult<Vec<InventoryItem>> {
        let mut state = self.state.lock().await;

        // Check every line before touching anything
        let mut indexes = Vec::with_capacity(lines.len());
        let mut pending: Vec<(usize, i32)> = Vec::new();
        for line in lines {
            let index = state
                .position_by_sku(&line.sku)
                .ok_or_else(|| InventoryError::ItemNotFound(line.sku.clone()))?;

            let already = pending
                .iter()
                .filter(|(i, _)| *i == index)
                .try_fold(0i32, |acc, (_, q)| acc.checked_add(*q))
                .ok_or(InventoryError::QuantityOutOfRange)?;
            let available = state.items[index].quantity_available - already;
            if available < line.quantity {
                return Err(InventoryError::InsufficientStock {
                    sku: line.sku.clone(),
                    requested: line.quantity,
                    available,
                });
            }
            pending.push((index, line.quantity));
            indexes.push(index);
        }

        let mut reserved = Vec::with_capacity(lines.len());
        for (line, index) in lines.iter().zip(indexes) {
            let mut change =
                StockChange::new(MovementKind::Reservation, -line.quantity, RESERVATION_REASON);
            change.reserved_delta = line.quantity;
            change.reference_id = Some(order_id.to_string());
            change.performed_by = performed_by;
            reserved.push(state.apply(index, &change)?);
        }
        Ok(reserved)
    }

    async fn release(
        &self,
        order_id: &str,
        performed_by: Option<Uuid>,
    ) -> InventoryResult<Vec<InventoryItem>> {
        let mut state = self.state.lock().await;

        let mut released = Vec::new();
        for (item_id, held) in state.held_for_order(order_id)? {
            let Some(index) = state.items.iter().position(|item| item.id == item_id) else {
                continue;
            };
            let mut change = StockChange::new(MovementKind::Release, held, RELEASE_REASON);
            change.reserved_delta = -held;
            change.reference_id = Some(order_id.to_string());
            change.performed_by = performed_by;
            released.push(state.apply(index, &change)?);
        }
        Ok(released)
    }

    async fn confirm_sale(
        &self,
        order_id: &str,
        performed_by: Option<Uuid>,
    ) -> InventoryResult<Vec<InventoryItem>> {
        let mut state = self.state.lock().await;

        let mut sold = Vec::new();
        for (item_id, held) in state.held_for_order(order_id)? {
            let Some(index) = state.items.iter().position(|item| item.id == item_id) else {
                continue;
            };
            let mut change = StockChange::new(MovementKind::Sale, 0, SALE_REASON);
            change.reserved_delta = -held;
            change.sold_delta = held;
            change.reference_id = Some(order_id.to_string());
            change.performed_by = performed_by;
            sold.push(state.apply(index, &change)?);
        }
        Ok(sold)
    }

    async fn movements(&self, item_id: Uuid, limit: i64) -> InventoryResult<Vec<StockMovement>> {
        let state = self.state.lock().await;
        Ok(state
            .movements
            .iter()
            .rev()
            .filter(|m| m.inventory_item_id == item_id)
            .take(usize::try_from(limit.max(0)).unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AlertRepository for MemoryInventoryRepository {
    async fn find_open_alert(
        &self,
        item_id: Uuid,
        alert_type: AlertType,
    ) -> InventoryResult<Option<InventoryAlert>> {
        let state = self.state.lock().await;
        Ok(state
            .alerts
            .iter()
            .find(|a| a.inventory_item_id == item_id && a.alert_type == alert_type && a.is_open())
            .cloned())
    }

    async fn insert_alert(
        &self,
        item_id: Uuid,
        alert_type: AlertType,
        threshold: Option<i32>,
        current_quantity: i32,
    ) -> InventoryResult<Option<InventoryAlert>> {
        let mut state = self.state.lock().await;
        let exists = state
            .alerts
            .iter()
            .any(|a| a.inventory_item_id == item_id && a.alert_type == alert_type && a.is_open());
        if exists {
            return Ok(None);
        }

        let alert = InventoryAlert {
            id: Uuid::new_v4(),
            inventory_item_id: item_id,
            alert_type,
            threshold,
            current_quantity,
            created_at: Utc::now(),
            resolved_at: None,
            resolved_by: None,
        };
        state.alerts.push(alert.clone());
        Ok(Some(alert))
    }

    async fn list_alerts(&self, include_resolved: bool) -> InventoryResult<Vec<InventoryAlert>> {
        let state = self.state.lock().await;
        Ok(state
            .alerts
            .iter()
            .rev()
            .filter(|a| include_resolved || a.is_open())
            .cloned()
            .collect())
    }

    async fn resolve_alert(
        &self,
        alert_id: Uuid,
        resolved_by: Option<Uuid>,
    ) -> InventoryResult<Option<InventoryAlert>> {
        let mut state = self.state.lock().await;
        let Some(alert) = state.alerts.iter_mut().find(|a| a.id == alert_id) else {
            return Ok(None);
        };
        if alert.is_open() {
            alert.resolved_at = Some(Utc::now());
            alert.resolved_by = resolved_by;
        }
        Ok(Some(alert.clone()))
    }
}
