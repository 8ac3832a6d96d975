use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::inventory::error::{is_unique_violation, InventoryError, InventoryResult};
use crate::inventory::models::{
    AlertType, InventoryAlert, InventoryFilter, InventoryItem, InventoryPage, InventoryStats,
    MovementKind, NewInventoryItem, Pagination, ReservationLine, SettingsUpdate, StockChange,
    StockMovement,
};
use crate::inventory::query::InventoryQueryBuilder;

pub const RESERVATION_REASON: &str = "Order reservation";
pub const RELEASE_REASON: &str = "Order cancelled/failed";
pub const INITIAL_STOCK_REASON: &str = "Initial stock";
pub const SALE_REASON: &str = "Sale confirmed";

/// Durable store for inventory items and their movement log.
///
/// Every write that changes a quantity also appends exactly one movement per
/// affected item, atomically.
#[async_trait]
pub trait InventoryRepository: Send + Sync {
    async fn find_by_sku(&self, sku: &str) -> InventoryResult<Option<InventoryItem>>;

    /// Item for a product, optionally narrowed to a variant.
    /// With `variant_id == None` only items without a variant match.
    async fn find_by_product(
        &self,
        product_id: Uuid,
        variant_id: Option<Uuid>,
    ) -> InventoryResult<Option<InventoryItem>>;

    async fn list(&self, filter: &InventoryFilter) -> InventoryResult<InventoryPage>;

    /// Inserts a new item. A positive opening quantity is logged as a restock.
    async fn create(&self, item: NewInventoryItem) -> InventoryResult<InventoryItem>;

    async fn update_settings(
        &self,
        sku: &str,
        update: &SettingsUpdate,
    ) -> InventoryResult<Option<InventoryItem>>;

    /// Removes an item that has no reserved stock and no movement history.
    /// Returns `false` when the SKU is unknown.
    async fn delete(&self, sku: &str) -> InventoryResult<bool>;

    /// Applies one signed change and records its movement.
    /// Fails with `NegativeStock` instead of writing when the result would be below zero.
    async fn apply_change(&self, sku: &str, change: StockChange) -> InventoryResult<InventoryItem>;

    /// Moves quantity from available to reserved for every line, or for none.
    async fn reserve(
        &self,
        lines: &[ReservationLine],
        order_id: &str,
        performed_by: Option<Uuid>,
    ) -> InventoryResult<Vec<InventoryItem>>;

    /// Returns outstanding reserved quantity for an order. Safe to call twice.
    async fn release(
        &self,
        order_id: &str,
        performed_by: Option<Uuid>,
    ) -> InventoryResult<Vec<InventoryItem>>;

    /// Turns outstanding reserved quantity for an order into sold quantity.
    /// `quantity_available` is not touched. Safe to call twice.
    async fn confirm_sale(
        &self,
        order_id: &str,
        performed_by: Option<Uuid>,
    ) -> InventoryResult<Vec<InventoryItem>>;

    /// Movements of an item, most recent first
    async fn movements(&self, item_id: Uuid, limit: i64) -> InventoryResult<Vec<StockMovement>>;
}

/// Store for inventory alerts
#[async_trait]
pub trait AlertRepository: Send + Sync {
    async fn find_open_alert(
        &self,
        item_id: Uuid,
        alert_type: AlertType,
    ) -> InventoryResult<Option<InventoryAlert>>;

    /// Opens an alert. Returns `None` when an open alert of that type already exists.
    async fn insert_alert(
        &self,
        item_id: Uuid,
        alert_type: AlertType,
        threshold: Option<i32>,
        current_quantity: i32,
    ) -> InventoryResult<Option<InventoryAlert>>;

    /// Alerts newest first
    async fn list_alerts(&self, include_resolved: bool) -> InventoryResult<Vec<InventoryAlert>>;

    /// Marks an open alert resolved. Already-resolved alerts are returned unchanged.
    async fn resolve_alert(
        &self,
        alert_id: Uuid,
        resolved_by: Option<Uuid>,
    ) -> InventoryResult<Option<InventoryAlert>>;
}

// ============================================================================
// PostgreSQL
// ============================================================================

/// PostgreSQL-backed inventory and alert store
#[derive(Clone)]
pub struct PgInventoryRepository {
    pool: PgPool,
}

impl PgInventoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn lock_by_sku(
        tx: &mut Transaction<'_, Postgres>,
        sku: &str,
    ) -> InventoryResult<Option<InventoryItem>> {
        let item = sqlx::query_as::<_, InventoryItem>(
            "SELECT * FROM inventory_items WHERE sku = $1 FOR UPDATE",
        )
        .bind(sku)
        .fetch_optional(&mut **tx)
        .await?;
        Ok(item)
    }

    async fn apply_locked(
        tx: &mut Transaction<'_, Postgres>,
        item: &InventoryItem,
        change: &StockChange,
    ) -> InventoryResult<InventoryItem> {
        let resulting = item
            .quantity_available
            .checked_add(change.delta)
            .ok_or(InventoryError::QuantityOutOfRange)?;
        if resulting < 0 {
            return Err(InventoryError::NegativeStock { resulting });
        }
        if item.quantity_reserved.checked_add(change.reserved_delta).is_none()
            || item.quantity_sold.checked_add(change.sold_delta).is_none()
        {
            return Err(InventoryError::QuantityOutOfRange);
        }

        let updated = sqlx::query_as::<_, InventoryItem>(
            r#"
            UPDATE inventory_items
            SET quantity_available = quantity_available + $2,
                quantity_reserved = GREATEST(0, quantity_reserved + $3),
                quantity_sold = quantity_sold + $4,
                location = COALESCE($5, location),
                last_restocked_at = CASE WHEN $6 THEN NOW() ELSE last_restocked_at END,
                updated_at = NOW()
            WHERE id = $1 AND quantity_available + $2 >= 0
            RETURNING *
            "#,
        )
        .bind(item.id)
        .bind(change.delta)
        .bind(change.reserved_delta)
        .bind(change.sold_delta)
        .bind(&change.location)
        .bind(change.kind == MovementKind::Restock)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(InventoryError::NegativeStock { resulting })?;

        Self::insert_movement(tx, item.id, change).await?;
        Ok(updated)
    }

    async fn insert_movement(
        tx: &mut Transaction<'_, Postgres>,
        item_id: Uuid,
        change: &StockChange,
    ) -> InventoryResult<()> {
        sqlx::query(
            r#"
            INSERT INTO inventory_movements
                (id, inventory_item_id, kind, quantity, reason, reference_id, notes, performed_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(item_id)
        .bind(change.kind)
        .bind(change.movement_quantity())
        .bind(&change.reason)
        .bind(&change.reference_id)
        .bind(&change.notes)
        .bind(change.performed_by)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Quantity still held for an order, per item, with each item locked
    async fn lock_held_for_order(
        tx: &mut Transaction<'_, Postgres>,
        order_id: &str,
    ) -> InventoryResult<Vec<(InventoryItem, i32)>> {
        // Reservations are negative; releases and sales are positive
        let outstanding = sqlx::query_as::<_, (Uuid, i64)>(
            r#"
            SELECT inventory_item_id, SUM(quantity)::BIGINT
            FROM inventory_movements
            WHERE reference_id = $1 AND kind IN ('reservation', 'release', 'sale')
            GROUP BY inventory_item_id
            ORDER BY inventory_item_id
            "#,
        )
        .bind(order_id)
        .fetch_all(&mut **tx)
        .await?;

        let mut held = Vec::new();
        for (item_id, net) in outstanding {
            if net >= 0 {
                continue;
            }
            let quantity = i32::try_from(-net).map_err(|_| InventoryError::QuantityOutOfRange)?;

            let item = sqlx::query_as::<_, InventoryItem>(
                "SELECT * FROM inventory_items WHERE id = $1 FOR UPDATE",
            )
            .bind(item_id)
            .fetch_optional(&mut **tx)
            .await?;

            match item {
                Some(item) => held.push((item, quantity)),
                None => {
                    tracing::warn!("Inventory item {} missing while settling {}", item_id, order_id)
                }
            }
        }
        Ok(held)
    }

    async fn stats(&self) -> InventoryResult<InventoryStats> {
        let (total_items, in_stock, low_stock, out_of_stock) =
            sqlx::query_as::<_, (i64, i64, i64, i64)>(
                r#"
                SELECT
                    COUNT(*),
                    COUNT(*) FILTER (WHERE quantity_available > reorder_point),
                    COUNT(*) FILTER (WHERE quantity_available > 0 AND quantity_available <= reorder_point),
                    COUNT(*) FILTER (WHERE quantity_available = 0)
                FROM inventory_items
                "#,
            )
            .fetch_one(&self.pool)
            .await?;

        Ok(InventoryStats {
            total_items,
            in_stock,
            low_stock,
            out_of_stock,
        })
    }
}

#[async_trait]
impl InventoryRepository for PgInventoryRepository {
    async fn find_by_sku(&self, sku: &str) -> InventoryResult<Option<InventoryItem>> {
        let item = sqlx::query_as::<_, InventoryItem>("SELECT * FROM inventory_items WHERE sku = $1")
            .bind(sku)
            .fetch_optional(&self.pool)
            .await?;
        Ok(item)
    }

    async fn find_by_product(
        &self,
        product_id: Uuid,
        variant_id: Option<Uuid>,
    ) -> InventoryResult<Option<InventoryItem>> {
        let item = sqlx::query_as::<_, InventoryItem>(
            r#"
            SELECT * FROM inventory_items
            WHERE product_id = $1 AND variant_id IS NOT DISTINCT FROM $2
            ORDER BY created_at
            LIMIT 1
            "#,
        )
        .bind(product_id)
        .bind(variant_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(item)
    }

    async fn list(&self, filter: &InventoryFilter) -> InventoryResult<InventoryPage> {
        let builder = InventoryQueryBuilder::from_filter(filter);

        let (query_str, params) = builder.build();
        let mut query = sqlx::query_as::<_, InventoryItem>(&query_str);
        for param in &params {
            query = query.bind(param);
        }
        let items = query.fetch_all(&self.pool).await?;

        let (count_str, count_params) = builder.build_count();
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_str);
        for param in &count_params {
            count_query = count_query.bind(param);
        }
        let total = count_query.fetch_one(&self.pool).await?;

        Ok(InventoryPage {
            items,
            pagination: Pagination::new(filter.page, filter.limit, total),
            stats: self.stats().await?,
        })
    }

    async fn create(&self, new_item: NewInventoryItem) -> InventoryResult<InventoryItem> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query_as::<_, InventoryItem>(
            r#"
            INSERT INTO inventory_items
                (id, product_id, variant_id, sku, quantity_available, reorder_point,
                 reorder_quantity, location, last_restocked_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, CASE WHEN $5 > 0 THEN NOW() END)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new_item.product_id)
        .bind(new_item.variant_id)
        .bind(&new_item.sku)
        .bind(new_item.quantity_available)
        .bind(new_item.reorder_point)
        .bind(new_item.reorder_quantity)
        .bind(&new_item.location)
        .fetch_one(&mut *tx)
        .await;

        let item = match inserted {
            Ok(item) => item,
            Err(e) if is_unique_violation(&e) => {
                return Err(InventoryError::DuplicateSku(new_item.sku));
            }
            Err(e) => return Err(e.into()),
        };

        if item.quantity_available > 0 {
            let mut opening = StockChange::new(
                MovementKind::Restock,
                item.quantity_available,
                INITIAL_STOCK_REASON,
            );
            opening.performed_by = new_item.created_by;
            Self::insert_movement(&mut tx, item.id, &opening).await?;
        }

        tx.commit().await?;
        Ok(item)
    }

    async fn update_settings(
        &self,
        sku: &str,
        update: &SettingsUpdate,
    ) -> InventoryResult<Option<InventoryItem>> {
        let item = sqlx::query_as::<_, InventoryItem>(
            r#"
            UPDATE inventory_items
            SET reorder_point = COALESCE($2, reorder_point),
                reorder_quantity = COALESCE($3, reorder_quantity),
                location = COALESCE($4, location),
                updated_at = NOW()
            WHERE sku = $1
            RETURNING *
            "#,
        )
        .bind(sku)
        .bind(update.reorder_point)
        .bind(update.reorder_quantity)
        .bind(&update.location)
        .fetch_optional(&self.pool)
        .await?;
        Ok(item)
    }

    async fn delete(&self, sku: &str) -> InventoryResult<bool> {
        let mut tx = self.pool.begin().await?;

        let Some(item) = Self::lock_by_sku(&mut tx, sku).await? else {
            return Ok(false);
        };
        if item.quantity_reserved > 0 {
            return Err(InventoryError::ItemInUse {
                sku: sku.to_string(),
                detail: format!("{} units reserved", item.quantity_reserved),
            });
        }

        let has_history = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM inventory_movements WHERE inventory_item_id = $1)",
        )
        .bind(item.id)
        .fetch_one(&mut *tx)
        .await?;
        if has_history {
            return Err(InventoryError::ItemInUse {
                sku: sku.to_string(),
                detail: "movement history exists".to_string(),
            });
        }

        sqlx::query("DELETE FROM inventory_items WHERE id = $1")
            .bind(item.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn apply_change(&self, sku: &str, change: StockChange) -> InventoryResult<InventoryItem> {
        let mut tx = self.pool.begin().await?;

        let item = Self::lock_by_sku(&mut tx, sku)
            .await?
            .ok_or_else(|| InventoryError::ItemNotFound(sku.to_string()))?;
        let updated = Self::apply_locked(&mut tx, &item, &change).await?;

        tx.commit().await?;
        Ok(updated)
    }

    async fn reserve(
        &self,
        lines: &[ReservationLine],
        order_id: &str,
        performed_by: Option<Uuid>,
    ) -> InventoryResult<Vec<InventoryItem>> {
        let mut tx = self.pool.begin().await?;
        let mut reserved = Vec::with_capacity(lines.len());

        for line in lines {
            let item = Self::lock_by_sku(&mut tx, &line.sku)
                .await?
                .ok_or_else(|| InventoryError::ItemNotFound(line.sku.clone()))?;

            if item.quantity_available < line.quantity {
                // Dropping tx rolls back earlier lines
                return Err(InventoryError::InsufficientStock {
                    sku: line.sku.clone(),
                    requested: line.quantity,
                    available: item.quantity_available,
                });
            }

            let mut change =
                StockChange::new(MovementKind::Reservation, -line.quantity, RESERVATION_REASON);
            change.reserved_delta = line.quantity;
            change.reference_id = Some(order_id.to_string());
            change.performed_by = performed_by;

            reserved.push(Self::apply_locked(&mut tx, &item, &change).await?);
        }

        tx.commit().await?;
        Ok(reserved)
    }

    async fn release(
        &self,
        order_id: &str,
        performed_by: Option<Uuid>,
    ) -> InventoryResult<Vec<InventoryItem>> {
        let mut tx = self.pool.begin().await?;

        let mut released = Vec::new();
        for (item, held) in Self::lock_held_for_order(&mut tx, order_id).await? {
            let mut change = StockChange::new(MovementKind::Release, held, RELEASE_REASON);
            change.reserved_delta = -held;
            change.reference_id = Some(order_id.to_string());
            change.performed_by = performed_by;

            released.push(Self::apply_locked(&mut tx, &item, &change).await?);
        }

        tx.commit().await?;
        Ok(released)
    }

    async fn confirm_sale(
        &self,
        order_id: &str,
        performed_by: Option<Uuid>,
    ) -> InventoryResult<Vec<InventoryItem>> {
        let mut tx = self.pool.begin().await?;

        let mut sold = Vec::new();
        for (item, held) in Self::lock_held_for_order(&mut tx, order_id).await? {
            let mut change = StockChange::new(MovementKind::Sale, 0, SALE_REASON);
            change.reserved_delta = -held;
            change.sold_delta = held;
            change.reference_id = Some(order_id.to_string());
            change.performed_by = performed_by;

            sold.push(Self::apply_locked(&mut tx, &item, &change).await?);
        }

        tx.commit().await?;
        Ok(sold)
    }

    async fn movements(&self, item_id: Uuid, limit: i64) -> InventoryResult<Vec<StockMovement>> {
        let movements = sqlx::query_as::<_, StockMovement>(
            r#"
            SELECT * FROM inventory_movements
            WHERE inventory_item_id = $1
            ORDER BY performed_at DESC, id
            LIMIT $2
            "#,
        )
        .bind(item_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(movements)
    }
}

#[async_trait]
impl AlertRepository for PgInventoryRepository {
    async fn find_open_alert(
        &self,
        item_id: Uuid,
        alert_type: AlertType,
    ) -> InventoryResult<Option<InventoryAlert>> {
        let alert = sqlx::query_as::<_, InventoryAlert>(
            r#"
            SELECT * FROM inventory_alerts
            WHERE inventory_item_id = $1 AND alert_type = $2 AND resolved_at IS NULL
            "#,
        )
        .bind(item_id)
        .bind(alert_type)
        .fetch_optional(&self.pool)
        .await?;
        Ok(alert)
    }

    async fn insert_alert(
        &self,
        item_id: Uuid,
        alert_type: AlertType,
        threshold: Option<i32>,
        current_quantity: i32,
    ) -> InventoryResult<Option<InventoryAlert>> {
        // The partial unique index on open alerts absorbs concurrent inserts
        let alert = sqlx::query_as::<_, InventoryAlert>(
            r#"
            INSERT INTO inventory_alerts (id, inventory_item_id, alert_type, threshold, current_quantity)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (inventory_item_id, alert_type) WHERE resolved_at IS NULL DO NOTHING
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(item_id)
        .bind(alert_type)
        .bind(threshold)
        .bind(current_quantity)
        .fetch_optional(&self.pool)
        .await?;
        Ok(alert)
    }

    async fn list_alerts(&self, include_resolved: bool) -> InventoryResult<Vec<InventoryAlert>> {
        let alerts = sqlx::query_as::<_, InventoryAlert>(
            r#"
            SELECT * FROM inventory_alerts
            WHERE $1 OR resolved_at IS NULL
            ORDER BY created_at DESC
            "#,
        )
        .bind(include_resolved)
        .fetch_all(&self.pool)
        .await?;
        Ok(alerts)
    }

    async fn resolve_alert(
        &self,
        alert_id: Uuid,
        resolved_by: Option<Uuid>,
    ) -> InventoryResult<Option<InventoryAlert>> {
        let resolved = sqlx::query_as::<_, InventoryAlert>(
            r#"
            UPDATE inventory_alerts
            SET resolved_at = NOW(), resolved_by = $2
            WHERE id = $1 AND resolved_at IS NULL
            RETURNING *
            "#,
        )
        .bind(alert_id)
        .bind(resolved_by)
        .fetch_optional(&self.pool)
        .await?;

        if resolved.is_some() {
            return Ok(resolved);
        }

        // Already resolved, or unknown
        let existing = sqlx::query_as::<_, InventoryAlert>("SELECT * FROM inventory_alerts WHERE id = $1")
            .bind(alert_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(existing)
    }
}
