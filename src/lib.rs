// Inventory control service for the timber storefront

pub mod auth;
pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod inventory;
pub mod validation;

use std::sync::Arc;

use axum::{
    extract::FromRef,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
    OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use auth::AuthSettings;
use error::{ApiError, ErrorResponse};
use inventory::{
    alerts::AlertEngine,
    availability::{
        AvailabilityResolver, CartAdjustment, CartValidation, ProductStockStatus, UnavailableLine,
    },
    error::InventoryError,
    handlers,
    ledger::StockLedger,
    models::{
        AdjustmentReason, AdjustmentRequest, AlertList, AlertType, CartLine, CreateInventoryItem,
        InventoryAlert, InventoryItem, InventoryItemDetail, InventoryPage, InventoryStats,
        LineConfiguration, MovementKind, MutationResponse, Pagination, ReservationLine,
        ReservationRequest, ReservationResponse, ResolveAlertRequest, RestockRequest,
        StockMovement, UpdateInventorySettings,
    },
    repository::{AlertRepository, InventoryRepository},
    resolver::ConfigurationResolver,
    sku::SkuConfig,
};

/// OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::list_inventory,
        handlers::create_inventory_item,
        handlers::get_inventory_item,
        handlers::update_inventory_item,
        handlers::delete_inventory_item,
        handlers::get_movement_history,
        handlers::adjust_inventory,
        handlers::restock_inventory,
        handlers::reserve_stock,
        handlers::release_stock,
        handlers::confirm_sale,
        handlers::list_alerts,
        handlers::resolve_alert,
        handlers::validate_cart,
        handlers::adjust_cart,
        handlers::resolve_sku,
        handlers::product_stock,
        handlers::check_sku_format,
    ),
    components(
        schemas(
            InventoryItem, StockMovement, InventoryAlert, MovementKind, AlertType,
            AdjustmentReason, InventoryPage, InventoryStats, Pagination, InventoryItemDetail,
            CreateInventoryItem, UpdateInventorySettings, AdjustmentRequest, RestockRequest,
            ReservationRequest, ReservationLine, ReservationResponse, ResolveAlertRequest,
            MutationResponse, AlertList, CartLine, LineConfiguration, CartValidation,
            UnavailableLine, CartAdjustment, ProductStockStatus, SkuConfig, ErrorResponse,
            handlers::CartRequest, handlers::ResolvedSku, handlers::ProductStockResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "inventory", description = "Stock ledger administration"),
        (name = "alerts", description = "Low and out of stock alerts"),
        (name = "cart", description = "Storefront availability checks")
    ),
    info(
        title = "Timber Inventory API",
        version = "1.0.0",
        description = "Inventory control for configurable timber products"
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }
}

/// Services that need the inventory store
#[derive(Clone)]
pub struct InventoryServices {
    pub ledger: StockLedger,
    pub availability: AvailabilityResolver,
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// `None` when no database is configured; store-backed routes answer 503
    services: Option<InventoryServices>,
    pub resolver: ConfigurationResolver,
    pub auth: AuthSettings,
}

impl AppState {
    /// State backed by an inventory store implementing both repositories
    pub fn with_store<R>(repo: Arc<R>, resolver: ConfigurationResolver, auth: AuthSettings) -> Self
    where
        R: InventoryRepository + AlertRepository + 'static,
    {
        let inventory: Arc<dyn InventoryRepository> = repo.clone();
        let alerts: Arc<dyn AlertRepository> = repo;
        Self {
            services: Some(InventoryServices {
                ledger: StockLedger::new(inventory.clone(), AlertEngine::new(alerts)),
                availability: AvailabilityResolver::new(inventory),
            }),
            resolver,
            auth,
        }
    }

    pub fn without_store(resolver: ConfigurationResolver, auth: AuthSettings) -> Self {
        Self {
            services: None,
            resolver,
            auth,
        }
    }

    pub fn services(&self) -> Result<&InventoryServices, ApiError> {
        self.services
            .as_ref()
            .ok_or_else(|| InventoryError::StoreUnavailable.into())
    }
}

impl FromRef<AppState> for AuthSettings {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}

async fn health(axum::extract::State(state): axum::extract::State<AppState>) -> Json<Value> {
    let store = match state.services {
        Some(_) => "configured",
        None => "not_configured",
    };
    Json(json!({ "status": "ok", "store": store }))
}

/// Creates and configures the application router
/// Maps all API endpoints to their handlers and adds CORS and tracing middleware
pub fn create_router(state: AppState) -> Router {
    // Configure CORS to allow all origins, methods, and headers
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Admin routes
        .route(
            "/api/inventory",
            get(handlers::list_inventory).post(handlers::create_inventory_item),
        )
        .route("/api/inventory/adjust", post(handlers::adjust_inventory))
        .route("/api/inventory/restock", post(handlers::restock_inventory))
        .route(
            "/api/inventory/alerts",
            get(handlers::list_alerts).post(handlers::resolve_alert),
        )
        .route("/api/inventory/reservations", post(handlers::reserve_stock))
        .route(
            "/api/inventory/reservations/:order_id/release",
            post(handlers::release_stock),
        )
        .route(
            "/api/inventory/reservations/:order_id/confirm",
            post(handlers::confirm_sale),
        )
        .route(
            "/api/inventory/:sku",
            get(handlers::get_inventory_item)
                .put(handlers::update_inventory_item)
                .delete(handlers::delete_inventory_item),
        )
        .route("/api/inventory/:sku/movements", get(handlers::get_movement_history))
        // Storefront routes
        .route("/api/cart/validate", post(handlers::validate_cart))
        .route("/api/cart/adjust", post(handlers::adjust_cart))
        .route("/api/cart/resolve-sku", post(handlers::resolve_sku))
        .route("/api/stock/:product_id", get(handlers::product_stock))
        .route("/api/sku/:sku/check", get(handlers::check_sku_format))
        .route("/api/health", get(health))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
