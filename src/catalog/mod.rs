// Read-only view of the storefront catalog
//
// Products and variants are owned elsewhere; inventory only needs enough of
// them to derive a SKU for a cart line.

pub mod models;
pub mod repository;

pub use models::{Product, ProductVariant};
pub use repository::{CatalogRepository, MemoryCatalogRepository, PgCatalogRepository};
