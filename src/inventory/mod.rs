// Inventory control: SKU encoding, stock ledger, availability and alerts

pub mod alerts;
pub mod availability;
pub mod cache;
pub mod error;
pub mod handlers;
pub mod ledger;
pub mod memory;
pub mod models;
pub mod query;
pub mod repository;
pub mod resolver;
pub mod sku;

pub use alerts::AlertEngine;
pub use availability::AvailabilityResolver;
pub use cache::{MemoryResolveCache, RedisResolveCache, ResolveCache};
pub use error::{InventoryError, InventoryResult};
pub use ledger::StockLedger;
pub use memory::MemoryInventoryRepository;
pub use repository::{AlertRepository, InventoryRepository, PgInventoryRepository};
pub use resolver::ConfigurationResolver;
