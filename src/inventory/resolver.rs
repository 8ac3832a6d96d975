// Configuration Resolver
//
// Maps a cart line onto the attribute tuple the SKU encoder needs. Catalog rows
// are memoized for the duration of one resolve pass and, across passes, in a
// pluggable shared cache.

use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::catalog::{CatalogRepository, Product, ProductVariant};
use crate::inventory::cache::{MemoryResolveCache, ResolveCache};
use crate::inventory::error::InventoryResult;
use crate::inventory::models::CartLine;
use crate::inventory::sku::{self, SkuConfig};

/// Thickness assumed for terrace boards when the line carries none
pub const TERRACE_DEFAULT_THICKNESS_MM: f64 = 28.0;
/// Thickness assumed for every other usage
pub const DEFAULT_THICKNESS_MM: f64 = 20.0;

const KNOWN_USAGES: [&str; 4] = ["facade", "terrace", "interior", "fence"];

/// Per-pass memo of catalog rows. Create one per cart and drop it afterwards.
#[derive(Debug, Default)]
pub struct ResolvePass {
    products: HashMap<Uuid, Product>,
    variants: HashMap<Uuid, ProductVariant>,
}

impl ResolvePass {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Lower-cased usage when it is one of the four known values
pub fn normalize_usage(input: Option<&str>) -> Option<String> {
    let value = input?.trim().to_lowercase();
    KNOWN_USAGES
        .contains(&value.as_str())
        .then_some(value)
}

#[derive(Clone)]
pub struct ConfigurationResolver {
    catalog: Option<Arc<dyn CatalogRepository>>,
    cache: Arc<dyn ResolveCache>,
}

impl ConfigurationResolver {
    /// `catalog == None` means the catalog store is not configured
    pub fn new(catalog: Option<Arc<dyn CatalogRepository>>, cache: Arc<dyn ResolveCache>) -> Self {
        Self { catalog, cache }
    }

    /// Resolver backed by a default in-memory cache
    pub fn with_memory_cache(catalog: Option<Arc<dyn CatalogRepository>>) -> Self {
        Self::new(catalog, Arc::new(MemoryResolveCache::default()))
    }

    /// Resolves a cart line into a SKU configuration.
    ///
    /// Returns `Ok(None)` when the catalog is not configured or the product
    /// does not exist; callers treat that as "inventory identity unknown".
    pub async fn resolve(
        &self,
        line: &CartLine,
        pass: &mut ResolvePass,
    ) -> InventoryResult<Option<SkuConfig>> {
        let Some(catalog) = self.catalog.as_ref() else {
            return Ok(None);
        };

        let Some(product) = self.load_product(catalog.as_ref(), line.id, pass).await? else {
            debug!("Product {} not found while resolving SKU", line.id);
            return Ok(None);
        };

        let cfg = line.configuration.clone().unwrap_or_default();

        let usage_type = normalize_usage(cfg.usage_type.as_deref())
            .or_else(|| normalize_usage(product.usage_type.as_deref()));

        let thickness_mm = cfg
            .thickness_mm
            .filter(|t| t.is_finite() && *t > 0.0)
            .unwrap_or(match usage_type.as_deref() {
                Some("terrace") => TERRACE_DEFAULT_THICKNESS_MM,
                _ => DEFAULT_THICKNESS_MM,
            });

        let profile = match cfg.profile_variant_id {
            Some(id) => self.load_variant(catalog.as_ref(), id, pass).await?,
            None => None,
        };
        let color = match cfg.color_variant_id {
            Some(id) => self.load_variant(catalog.as_ref(), id, pass).await?,
            None => None,
        };

        Ok(Some(SkuConfig {
            usage_type,
            wood_type: product.wood_type,
            profile: profile.map(|v| v.name).or_else(|| line.finish.clone()),
            color: color.map(|v| v.name).or_else(|| line.color.clone()),
            width_mm: cfg.width_mm,
            length_mm: cfg.length_mm,
            thickness_mm: Some(thickness_mm),
        }))
    }

    /// Resolves straight to a SKU string. Lookup failures are logged and yield `None`.
    pub async fn resolve_sku(&self, line: &CartLine, pass: &mut ResolvePass) -> Option<String> {
        match self.resolve(line, pass).await {
            Ok(config) => config.map(|c| sku::encode(&c)),
            Err(e) => {
                warn!("Failed to resolve SKU for product {}: {}", line.id, e);
                None
            }
        }
    }

    async fn load_product(
        &self,
        catalog: &dyn CatalogRepository,
        id: Uuid,
        pass: &mut ResolvePass,
    ) -> InventoryResult<Option<Product>> {
        if let Some(product) = pass.products.get(&id) {
            return Ok(Some(product.clone()));
        }

        let key = format!("inventory:product:{}", id);
        let product = match self.read_cache::<Product>(&key).await {
            Some(product) => product,
            None => match catalog.find_product(id).await? {
                Some(product) => {
                    self.write_cache(&key, &product).await;
                    product
                }
                None => return Ok(None),
            },
        };

        pass.products.insert(id, product.clone());
        Ok(Some(product))
    }

    async fn load_variant(
        &self,
        catalog: &dyn CatalogRepository,
        id: Uuid,
        pass: &mut ResolvePass,
    ) -> InventoryResult<Option<ProductVariant>> {
        if let Some(variant) = pass.variants.get(&id) {
            return Ok(Some(variant.clone()));
        }

        let key = format!("inventory:variant:{}", id);
        let variant = match self.read_cache::<ProductVariant>(&key).await {
            Some(variant) => variant,
            None => match catalog.find_variant(id).await? {
                Some(variant) => {
                    self.write_cache(&key, &variant).await;
                    variant
                }
                None => return Ok(None),
            },
        };

        pass.variants.insert(id, variant.clone());
        Ok(Some(variant))
    }

    async fn read_cache<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.cache.get(key).await {
            Ok(Some(raw)) => serde_json::from_str(&raw)
                .map_err(|e| warn!("Discarding unreadable cache entry {}: {}", key, e))
                .ok(),
            Ok(None) => None,
            Err(e) => {
                warn!("Resolve cache read failed for {}: {}", key, e);
                None
            }
        }
    }

    async fn write_cache<T: Serialize>(&self, key: &str, value: &T) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Could not serialize cache entry {}: {}", key, e);
                return;
            }
        };
        if let Err(e) = self.cache.set(key, raw).await {
            warn!("Resolve cache write failed for {}: {}", key, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemoryCatalogRepository;
    use crate::inventory::cache::CacheError;
    use crate::inventory::error::InventoryError;
    use crate::inventory::models::LineConfiguration;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Catalog that counts product lookups
    struct CountingCatalog {
        inner: MemoryCatalogRepository,
        product_lookups: AtomicUsize,
    }

    #[async_trait]
    impl CatalogRepository for CountingCatalog {
        async fn find_product(&self, id: Uuid) -> InventoryResult<Option<Product>> {
            self.product_lookups.fetch_add(1, Ordering::SeqCst);
            self.inner.find_product(id).await
        }

        async fn find_variant(&self, id: Uuid) -> InventoryResult<Option<ProductVariant>> {
            self.inner.find_variant(id).await
        }
    }

    struct FailingCatalog;

    #[async_trait]
    impl CatalogRepository for FailingCatalog {
        async fn find_product(&self, _id: Uuid) -> InventoryResult<Option<Product>> {
            Err(InventoryError::DatabaseError("connection refused".to_string()))
        }

        async fn find_variant(&self, _id: Uuid) -> InventoryResult<Option<ProductVariant>> {
            Err(InventoryError::DatabaseError("connection refused".to_string()))
        }
    }

    struct BrokenCache;

    #[async_trait]
    impl ResolveCache for BrokenCache {
        async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
            Err(CacheError::Backend("down".to_string()))
        }

        async fn set(&self, _key: &str, _value: String) -> Result<(), CacheError> {
            Err(CacheError::Backend("down".to_string()))
        }
    }

    fn product(usage: Option<&str>, wood: Option<&str>) -> Product {
        Product {
            id: Uuid::new_v4(),
            name: "Terrace board".to_string(),
            wood_type: wood.map(str::to_string),
            usage_type: usage.map(str::to_string),
        }
    }

    fn line(product_id: Uuid, configuration: Option<LineConfiguration>) -> CartLine {
        CartLine {
            id: product_id,
            name: "Terrace board".to_string(),
            quantity: 1,
            variant_id: None,
            color: None,
            finish: None,
            configuration,
        }
    }

    async fn catalog_with(product: &Product) -> Arc<MemoryCatalogRepository> {
        let catalog = MemoryCatalogRepository::new();
        catalog.insert_product(product.clone()).await;
        Arc::new(catalog)
    }

    #[tokio::test]
    async fn test_terrace_defaults_to_28mm() {
        let p = product(Some("terrace"), Some("larch"));
        let resolver = ConfigurationResolver::with_memory_cache(Some(catalog_with(&p).await));

        let config = resolver
            .resolve(&line(p.id, None), &mut ResolvePass::new())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(config.thickness_mm, Some(28.0));
        assert_eq!(config.usage_type.as_deref(), Some("terrace"));
    }

    #[tokio::test]
    async fn test_other_usage_defaults_to_20mm() {
        let p = product(Some("facade"), Some("spruce"));
        let resolver = ConfigurationResolver::with_memory_cache(Some(catalog_with(&p).await));

        let config = resolver
            .resolve(&line(p.id, None), &mut ResolvePass::new())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(config.thickness_mm, Some(20.0));
    }

    #[tokio::test]
    async fn test_explicit_usage_overrides_product_usage() {
        let p = product(Some("facade"), Some("larch"));
        let resolver = ConfigurationResolver::with_memory_cache(Some(catalog_with(&p).await));
        let cfg = LineConfiguration {
            usage_type: Some(" Terrace ".to_string()),
            ..Default::default()
        };

        let config = resolver
            .resolve(&line(p.id, Some(cfg)), &mut ResolvePass::new())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(config.usage_type.as_deref(), Some("terrace"));
        assert_eq!(config.thickness_mm, Some(28.0));
    }

    #[tokio::test]
    async fn test_unknown_usage_is_unresolved() {
        let p = product(Some("garden"), Some("larch"));
        let resolver = ConfigurationResolver::with_memory_cache(Some(catalog_with(&p).await));
        let cfg = LineConfiguration {
            usage_type: Some("roofing".to_string()),
            ..Default::default()
        };

        let config = resolver
            .resolve(&line(p.id, Some(cfg)), &mut ResolvePass::new())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(config.usage_type, None);
    }

    #[tokio::test]
    async fn test_variant_names_win_over_legacy_fields() {
        let p = product(Some("terrace"), Some("larch"));
        let catalog = catalog_with(&p).await;
        let profile = ProductVariant {
            id: Uuid::new_v4(),
            product_id: p.id,
            name: "Rectangular".to_string(),
            variant_type: Some("profile".to_string()),
        };
        catalog.insert_variant(profile.clone()).await;
        let resolver = ConfigurationResolver::with_memory_cache(Some(catalog));

        let mut cart_line = line(
            p.id,
            Some(LineConfiguration {
                profile_variant_id: Some(profile.id),
                width_mm: Some(140.0),
                length_mm: Some(3000.0),
                ..Default::default()
            }),
        );
        cart_line.finish = Some("Rhombus".to_string());
        cart_line.color = Some("Natural".to_string());

        let sku = resolver
            .resolve_sku(&cart_line, &mut ResolvePass::new())
            .await
            .unwrap();
        assert_eq!(sku, "YW-TER-LA-RECT-NATURAL-140X3000-T28");
    }

    #[tokio::test]
    async fn test_missing_product_or_catalog_yields_none() {
        let p = product(Some("terrace"), Some("larch"));
        let resolver = ConfigurationResolver::with_memory_cache(Some(catalog_with(&p).await));
        let missing = line(Uuid::new_v4(), None);
        assert_eq!(resolver.resolve_sku(&missing, &mut ResolvePass::new()).await, None);

        let unconfigured = ConfigurationResolver::with_memory_cache(None);
        assert_eq!(unconfigured.resolve_sku(&line(p.id, None), &mut ResolvePass::new()).await, None);
    }

    #[tokio::test]
    async fn test_catalog_failure_yields_none() {
        let resolver = ConfigurationResolver::with_memory_cache(Some(Arc::new(FailingCatalog)));
        let result = resolver
            .resolve_sku(&line(Uuid::new_v4(), None), &mut ResolvePass::new())
            .await;
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn test_product_loaded_once_per_pass_and_then_from_shared_cache() {
        let p = product(Some("terrace"), Some("larch"));
        let inner = MemoryCatalogRepository::new();
        inner.insert_product(p.clone()).await;
        let catalog = Arc::new(CountingCatalog {
            inner,
            product_lookups: AtomicUsize::new(0),
        });
        let resolver = ConfigurationResolver::with_memory_cache(Some(catalog.clone()));

        let mut pass = ResolvePass::new();
        for _ in 0..3 {
            resolver.resolve(&line(p.id, None), &mut pass).await.unwrap();
        }
        assert_eq!(catalog.product_lookups.load(Ordering::SeqCst), 1);

        // A fresh pass is served by the shared cache
        resolver
            .resolve(&line(p.id, None), &mut ResolvePass::new())
            .await
            .unwrap();
        assert_eq!(catalog.product_lookups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_broken_cache_falls_back_to_catalog() {
        let p = product(Some("fence"), Some("spruce"));
        let resolver = ConfigurationResolver::new(
            Some(catalog_with(&p).await),
            Arc::new(BrokenCache),
        );
        let sku = resolver
            .resolve_sku(&line(p.id, None), &mut ResolvePass::new())
            .await;
        assert_eq!(sku.as_deref(), Some("YW-FEN-SP-NOPROFILE-NOCOLOR-NOSIZE-T20"));
    }
}
