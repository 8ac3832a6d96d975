// Availability Resolver
//
// Answers "can this be sold?" for single products and whole carts, and
// repairs carts that ask for more than is on hand. Reads only; nothing here
// holds stock, so a check followed by a later decrement can race.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::inventory::error::InventoryResult;
use crate::inventory::models::CartLine;
use crate::inventory::repository::InventoryRepository;

/// Placeholder SKU reported when no inventory item exists
pub const UNKNOWN_SKU: &str = "unknown";

/// Result of checking one product against a requested quantity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StockCheck {
    pub available: bool,
    pub quantity_available: i32,
    pub sku: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UnavailableLine {
    pub id: Uuid,
    pub name: String,
    pub requested: i32,
    pub available: i32,
}

/// Aggregate cart check
///
/// Errors block checkout, warnings are informational.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CartValidation {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub unavailable_items: Vec<UnavailableLine>,
}

impl CartValidation {
    fn valid() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
            unavailable_items: Vec::new(),
        }
    }

    fn add_error(&mut self, message: String) {
        self.is_valid = false;
        self.errors.push(message);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CartAdjustment {
    pub adjusted_items: Vec<CartLine>,
    pub removed_items: Vec<CartLine>,
    pub adjustments: Vec<String>,
}

/// Storefront-friendly variant of [`StockCheck`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ProductStockStatus {
    pub available: bool,
    pub quantity: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Clone)]
pub struct AvailabilityResolver {
    repo: Arc<dyn InventoryRepository>,
}

impl AvailabilityResolver {
    pub fn new(repo: Arc<dyn InventoryRepository>) -> Self {
        Self { repo }
    }

    /// Checks whether `requested` units of a product (or variant) are on hand.
    ///
    /// A product without an inventory item is reported unavailable with zero
    /// stock and the `unknown` SKU.
    pub async fn check_stock(
        &self,
        product_id: Uuid,
        requested: i32,
        variant_id: Option<Uuid>,
    ) -> InventoryResult<StockCheck> {
        let check = match self.repo.find_by_product(product_id, variant_id).await? {
            Some(item) => StockCheck {
                available: item.quantity_available >= requested,
                quantity_available: item.quantity_available,
                sku: item.sku,
            },
            None => StockCheck {
                available: false,
                quantity_available: 0,
                sku: UNKNOWN_SKU.to_string(),
            },
        };

        debug!(
            "Stock check for product {}: requested={}, available={}",
            product_id, requested, check.quantity_available
        );
        Ok(check)
    }

    /// Current stock for a product, 0 when it has no inventory item
    pub async fn stock_level(&self, product_id: Uuid, variant_id: Option<Uuid>) -> InventoryResult<i32> {
        Ok(self
            .repo
            .find_by_product(product_id, variant_id)
            .await?
            .map_or(0, |item| item.quantity_available))
    }

    pub async fn validate_cart_stock(&self, items: &[CartLine]) -> CartValidation {
        let mut result = CartValidation::valid();

        if items.is_empty() {
            result.add_error("Cart is empty".to_string());
            return result;
        }

        for line in items {
            match self.check_stock(line.id, line.quantity, line.variant_id).await {
                Ok(check) if !check.available => {
                    let state = if check.quantity_available == 0 {
                        "out of stock"
                    } else {
                        "low on stock"
                    };
                    result.add_error(format!("{} is {}", line.name, state));
                    result.unavailable_items.push(UnavailableLine {
                        id: line.id,
                        name: line.name.clone(),
                        requested: line.quantity,
                        available: check.quantity_available,
                    });
                }
                Ok(check) => {
                    if check.quantity_available < line.quantity.saturating_mul(2) {
                        result.warnings.push(format!(
                            "{} has limited stock ({} available)",
                            line.name, check.quantity_available
                        ));
                    }
                }
                Err(e) => {
                    error!("Failed to check stock for {}: {}", line.id, e);
                    result.add_error(format!("Unable to verify stock for {}", line.name));
                }
            }
        }

        result
    }

    /// Clamps cart lines to what is on hand. Lines whose lookup fails are kept as-is.
    pub async fn adjust_cart_to_stock(&self, items: Vec<CartLine>) -> CartAdjustment {
        let mut adjustment = CartAdjustment {
            adjusted_items: Vec::with_capacity(items.len()),
            removed_items: Vec::new(),
            adjustments: Vec::new(),
        };

        for line in items {
            match self.stock_level(line.id, line.variant_id).await {
                Ok(0) => {
                    adjustment
                        .adjustments
                        .push(format!("Removed {} (out of stock)", line.name));
                    adjustment.removed_items.push(line);
                }
                Ok(stock) if stock < line.quantity => {
                    adjustment.adjustments.push(format!(
                        "Adjusted {} quantity from {} to {}",
                        line.name, line.quantity, stock
                    ));
                    adjustment.adjusted_items.push(CartLine {
                        quantity: stock,
                        ..line
                    });
                }
                Ok(_) => adjustment.adjusted_items.push(line),
                Err(e) => {
                    error!("Failed to adjust {}: {}", line.id, e);
                    adjustment.adjusted_items.push(line);
                }
            }
        }

        adjustment
    }

    pub async fn check_product_stock(
        &self,
        product_id: Uuid,
        quantity: i32,
        variant_id: Option<Uuid>,
    ) -> ProductStockStatus {
        match self.check_stock(product_id, quantity, variant_id).await {
            Ok(check) => {
                let message = match (check.available, check.quantity_available) {
                    (true, _) => None,
                    (false, 0) => Some("Out of stock".to_string()),
                    (false, n) => Some(format!("Only {} available", n)),
                };
                ProductStockStatus {
                    available: check.available,
                    quantity: check.quantity_available,
                    message,
                }
            }
            Err(e) => {
                error!("Stock check error for {}: {}", product_id, e);
                ProductStockStatus {
                    available: false,
                    quantity: 0,
                    message: Some("Unable to check stock".to_string()),
                }
            }
        }
    }

    /// Largest quantity a customer may add; never negative, 0 on lookup failure
    pub async fn max_quantity(&self, product_id: Uuid, variant_id: Option<Uuid>) -> i32 {
        match self.stock_level(product_id, variant_id).await {
            Ok(level) => level.max(0),
            Err(e) => {
                error!("Failed to get max quantity for {}: {}", product_id, e);
                0
            }
        }
    }
}
