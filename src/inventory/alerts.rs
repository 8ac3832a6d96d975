// Alert Engine
//
// Watches item quantities after each ledger write and keeps at most one open
// alert per (item, alert type).

use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::inventory::error::{InventoryError, InventoryResult};
use crate::inventory::models::{AlertType, InventoryAlert, InventoryItem};
use crate::inventory::repository::AlertRepository;

/// Alert type an item currently warrants, if any
pub fn alert_for(item: &InventoryItem) -> Option<AlertType> {
    if item.quantity_available == 0 {
        Some(AlertType::OutOfStock)
    } else if item.quantity_available <= item.reorder_point {
        Some(AlertType::LowStock)
    } else {
        None
    }
}

#[derive(Clone)]
pub struct AlertEngine {
    repo: Arc<dyn AlertRepository>,
}

impl AlertEngine {
    pub fn new(repo: Arc<dyn AlertRepository>) -> Self {
        Self { repo }
    }

    /// Opens an alert for the item's new quantity when none of that type is open.
    /// Returns the newly created alert.
    pub async fn evaluate(&self, item: &InventoryItem) -> InventoryResult<Option<InventoryAlert>> {
        let Some(alert_type) = alert_for(item) else {
            return Ok(None);
        };

        if self.repo.find_open_alert(item.id, alert_type).await?.is_some() {
            return Ok(None);
        }

        let created = self
            .repo
            .insert_alert(
                item.id,
                alert_type,
                Some(item.reorder_point),
                item.quantity_available,
            )
            .await?;

        if let Some(ref alert) = created {
            info!(
                "Opened {} alert {} for {} (quantity {})",
                alert_type, alert.id, item.sku, item.quantity_available
            );
        }
        Ok(created)
    }

    /// Runs [`evaluate`](Self::evaluate) after a committed write.
    /// Failures are logged; the ledger write stands.
    pub async fn evaluate_after_write(&self, item: &InventoryItem) {
        if let Err(e) = self.evaluate(item).await {
            warn!("Alert evaluation failed for {}: {}", item.sku, e);
        }
    }

    pub async fn list_alerts(&self, include_resolved: bool) -> InventoryResult<Vec<InventoryAlert>> {
        self.repo.list_alerts(include_resolved).await
    }

    /// Resolves an alert. Resolving twice keeps the first resolution.
    pub async fn resolve_alert(
        &self,
        alert_id: Uuid,
        resolved_by: Option<Uuid>,
    ) -> InventoryResult<InventoryAlert> {
        let alert = self
            .repo
            .resolve_alert(alert_id, resolved_by)
            .await?
            .ok_or(InventoryError::AlertNotFound(alert_id))?;
        info!("Alert {} resolved", alert_id);
        Ok(alert)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::memory::MemoryInventoryRepository;
    use crate::inventory::models::{MovementKind, NewInventoryItem, StockChange};
    use crate::inventory::repository::InventoryRepository;

    async fn setup(quantity: i32) -> (MemoryInventoryRepository, AlertEngine, InventoryItem) {
        let repo = MemoryInventoryRepository::new();
        let item = repo
            .create(NewInventoryItem {
                product_id: Uuid::new_v4(),
                variant_id: None,
                sku: "YW-TER-LA-RECT-NATURAL-140X3000-T28".to_string(),
                quantity_available: quantity,
                reorder_point: 10,
                reorder_quantity: 50,
                location: None,
                created_by: None,
            })
            .await
            .unwrap();
        let engine = AlertEngine::new(Arc::new(repo.clone()));
        (repo, engine, item)
    }

    #[tokio::test]
    async fn test_no_alert_above_reorder_point() {
        let (_, engine, item) = setup(11).await;
        assert!(engine.evaluate(&item).await.unwrap().is_none());
        assert!(engine.list_alerts(true).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_low_stock_alert_opened_once() {
        let (repo, engine, _) = setup(12).await;
        let sku = "YW-TER-LA-RECT-NATURAL-140X3000-T28";

        let after = repo
            .apply_change(sku, StockChange::new(MovementKind::Adjustment, -4, "damaged"))
            .await
            .unwrap();
        let alert = engine.evaluate(&after).await.unwrap().unwrap();
        assert_eq!(alert.alert_type, AlertType::LowStock);
        assert_eq!(alert.current_quantity, 8);
        assert_eq!(alert.threshold, Some(10));

        let again = repo
            .apply_change(sku, StockChange::new(MovementKind::Adjustment, -1, "lost"))
            .await
            .unwrap();
        assert!(engine.evaluate(&again).await.unwrap().is_none());
        assert_eq!(engine.list_alerts(false).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_out_of_stock_alert_at_zero() {
        let (_, engine, item) = setup(0).await;
        let alert = engine.evaluate(&item).await.unwrap().unwrap();
        assert_eq!(alert.alert_type, AlertType::OutOfStock);
    }

    #[tokio::test]
    async fn test_resolve_is_idempotent() {
        let (_, engine, item) = setup(0).await;
        let alert = engine.evaluate(&item).await.unwrap().unwrap();
        let first_actor = Uuid::new_v4();

        let first = engine.resolve_alert(alert.id, Some(first_actor)).await.unwrap();
        let second = engine.resolve_alert(alert.id, Some(Uuid::new_v4())).await.unwrap();

        assert!(first.resolved_at.is_some());
        assert_eq!(first.resolved_at, second.resolved_at);
        assert_eq!(second.resolved_by, Some(first_actor));
        assert!(engine.list_alerts(false).await.unwrap().is_empty());
        assert_eq!(engine.list_alerts(true).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_resolved_alert_allows_new_one() {
        let (_, engine, item) = setup(0).await;
        let alert = engine.evaluate(&item).await.unwrap().unwrap();
        engine.resolve_alert(alert.id, None).await.unwrap();

        let reopened = engine.evaluate(&item).await.unwrap();
        assert!(reopened.is_some());
    }

    #[tokio::test]
    async fn test_resolve_unknown_alert() {
        let (_, engine, _) = setup(20).await;
        let err = engine.resolve_alert(Uuid::new_v4(), None).await.unwrap_err();
        assert!(matches!(err, InventoryError::AlertNotFound(_)));
    }
}
