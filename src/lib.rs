/*!
 * # FBA Ledger
 *
 * FIFO inventory ledger and ownership-transfer engine for Amazon FBA sellers.
 * Stock is tracked as cost-bearing batches that move through a fixed location
 * pipeline (production, storage, en_route, fba/receiving) and are consumed in
 * strict FIFO order when sales settle.
 */

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod openapi;
pub mod services;
pub mod stock_lock;
pub mod tracing;

use axum::{extract::State, response::Json, routing::get, Router};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::auth::consts as perm;
use crate::auth::AuthRouterExt;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub services: handlers::AppServices,
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub errors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    pub fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

pub fn api_v1_routes() -> Router<AppState> {
    // Inventory routes with permission gating
    let inventory_read = Router::new()
        .route("/inventory/batches", get(handlers::inventory::list_batches))
        .route(
            "/inventory/availability/{product_id}",
            get(handlers::inventory::availability),
        )
        .with_permission(perm::INVENTORY_READ);

    let inventory_write = Router::new()
        .route(
            "/inventory/batches",
            axum::routing::post(handlers::inventory::receive_stock),
        )
        .route(
            "/inventory/transitions",
            axum::routing::post(handlers::inventory::transition),
        )
        .with_permission(perm::INVENTORY_WRITE);

    // Sales routes with permission gating
    let sales_read = Router::new()
        .route("/sales", get(handlers::sales::list_sales))
        .route("/sales/{snapshot_id}", get(handlers::sales::get_sale))
        .with_permission(perm::SALES_READ);

    let sales_write = Router::new()
        .route("/sales", axum::routing::post(handlers::sales::record_sale))
        .route(
            "/sales/bulk",
            axum::routing::post(handlers::sales::bulk_record_sales),
        )
        .with_permission(perm::SALES_WRITE);

    let sales_delete = Router::new()
        .route(
            "/sales/{snapshot_id}",
            axum::routing::delete(handlers::sales::reverse_sale),
        )
        .with_permission(perm::SALES_DELETE);

    // Shipments routes with permission gating
    let shipments_read = Router::new()
        .route("/shipments", get(handlers::shipments::list_shipments))
        .route(
            "/shipments/{shipment_id}",
            get(handlers::shipments::get_shipment),
        )
        .with_permission(perm::SHIPMENTS_READ);

    let shipments_write = Router::new()
        .route(
            "/shipments",
            axum::routing::post(handlers::shipments::create_shipment),
        )
        .route(
            "/shipments/{shipment_id}/deliver",
            axum::routing::post(handlers::shipments::deliver_shipment),
        )
        .with_permission(perm::SHIPMENTS_WRITE);

    // Warehouse snapshot and reconciliation routes
    let snapshots_read = Router::new()
        .route(
            "/warehouse-snapshots",
            get(handlers::snapshots::list_snapshots),
        )
        .route("/sales-records", get(handlers::snapshots::list_sales_records))
        .with_permission(perm::SNAPSHOTS_READ);

    let snapshots_write = Router::new()
        .route(
            "/warehouse-snapshots",
            axum::routing::post(handlers::snapshots::create_snapshot),
        )
        .route(
            "/warehouse-snapshots/{snapshot_id}",
            axum::routing::put(handlers::snapshots::update_snapshot),
        )
        .route(
            "/warehouse-snapshots/{snapshot_id}/reconcile",
            axum::routing::post(handlers::snapshots::reconcile_snapshot),
        )
        .with_permission(perm::SNAPSHOTS_WRITE);

    let snapshots_delete = Router::new()
        .route(
            "/warehouse-snapshots/{snapshot_id}",
            axum::routing::delete(handlers::snapshots::delete_snapshot),
        )
        .with_permission(perm::SNAPSHOTS_DELETE);

    Router::new()
        // Status and health endpoints (unauthenticated)
        .route("/status", get(api_status))
        .route("/health", get(health_check))
        // Inventory API (auth + permissions)
        .merge(inventory_read)
        .merge(inventory_write)
        // Sales API (auth + permissions)
        .merge(sales_read)
        .merge(sales_write)
        .merge(sales_delete)
        // Shipments API (auth + permissions)
        .merge(shipments_read)
        .merge(shipments_write)
        // Warehouse snapshots API (auth + permissions)
        .merge(snapshots_read)
        .merge(snapshots_write)
        .merge(snapshots_delete)
}

async fn api_status() -> ApiResult<Value> {
    let version = env!("CARGO_PKG_VERSION");
    let git = option_env!("GIT_HASH").unwrap_or("unknown");
    let build_time = option_env!("BUILD_TIME").unwrap_or("unknown");
    let status_data = json!({
        "status": "ok",
        "version": version,
        "git": git,
        "build_time": build_time,
        "service": "fba-ledger",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "environment": std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
    });

    Ok(Json(ApiResponse::success(status_data)))
}

/// Liveness plus a database round-trip. Mounted at both `/health` and
/// `/api/v1/health`.
pub async fn health_check(State(state): State<AppState>) -> ApiResult<Value> {
    let db_status = if db::check_connection(&state.db).await {
        "healthy"
    } else {
        "unhealthy"
    };

    let health_data = json!({
        "status": db_status,
        "checks": {
            "database": db_status,
        },
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    Ok(Json(ApiResponse::success(health_data)))
}

#[cfg(test)]
mod response_tests {
    use super::*;
    use chrono::DateTime;

    #[tokio::test]
    async fn success_response_includes_request_metadata() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("meta-123"), async {
                ApiResponse::success("ok")
            })
            .await;

        let meta = response.meta.expect("metadata expected");
        assert_eq!(meta.request_id.as_deref(), Some("meta-123"));
        DateTime::parse_from_rfc3339(&meta.timestamp).expect("timestamp should parse");
    }

    #[tokio::test]
    async fn error_response_includes_request_metadata() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("meta-err"), async {
                ApiResponse::<()>::error("oops".into())
            })
            .await;

        let meta = response.meta.expect("metadata expected");
        assert_eq!(meta.request_id.as_deref(), Some("meta-err"));
        assert!(!meta.timestamp.is_empty());
    }

    #[tokio::test]
    async fn metadata_has_no_request_id_outside_scope() {
        let response = ApiResponse::success(1u32);
        let meta = response.meta.expect("metadata expected");
        assert!(meta.request_id.is_none());
    }
}
