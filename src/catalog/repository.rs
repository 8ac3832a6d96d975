use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::catalog::models::{Product, ProductVariant};
use crate::inventory::error::InventoryResult;

/// Catalog lookups needed to resolve a cart line
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn find_product(&self, id: Uuid) -> InventoryResult<Option<Product>>;
    async fn find_variant(&self, id: Uuid) -> InventoryResult<Option<ProductVariant>>;
}

#[derive(Clone)]
pub struct PgCatalogRepository {
    pool: PgPool,
}

impl PgCatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogRepository for PgCatalogRepository {
    async fn find_product(&self, id: Uuid) -> InventoryResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            "SELECT id, name, wood_type, usage_type FROM products WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(product)
    }

    async fn find_variant(&self, id: Uuid) -> InventoryResult<Option<ProductVariant>> {
        let variant = sqlx::query_as::<_, ProductVariant>(
            "SELECT id, product_id, name, variant_type FROM product_variants WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(variant)
    }
}

/// Catalog held in memory, seeded by the caller
#[derive(Clone, Default)]
pub struct MemoryCatalogRepository {
    products: Arc<RwLock<HashMap<Uuid, Product>>>,
    variants: Arc<RwLock<HashMap<Uuid, ProductVariant>>>,
}

impl MemoryCatalogRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_product(&self, product: Product) {
        self.products.write().await.insert(product.id, product);
    }

    pub async fn insert_variant(&self, variant: ProductVariant) {
        self.variants.write().await.insert(variant.id, variant);
    }
}

#[async_trait]
impl CatalogRepository for MemoryCatalogRepository {
    async fn find_product(&self, id: Uuid) -> InventoryResult<Option<Product>> {
        Ok(self.products.read().await.get(&id).cloned())
    }

    async fn find_variant(&self, id: Uuid) -> InventoryResult<Option<ProductVariant>> {
        Ok(self.variants.read().await.get(&id).cloned())
    }
}
