use crate::auth::AuthUser;
use crate::entities::inventory_batch::LocationType;
use crate::errors::ServiceError;
use crate::services::inventory::{BatchFilters, ReceiveStockCommand, TransitionCommand};
use crate::{ApiResponse, AppState, PaginatedResponse};
use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

fn validate_location(value: &str) -> Result<(), ValidationError> {
    if LocationType::parse_api(value).is_none() {
        let mut err = ValidationError::new("unknown_location");
        err.message = Some("unknown location type".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ReceiveStockRequest {
    pub product_id: Uuid,
    /// Canonical or legacy location spelling.
    #[validate(custom = "validate_location")]
    pub location_type: String,
    #[validate(range(min = 1))]
    pub quantity: i32,
    pub unit_cost: Decimal,
    pub unit_shipping_cost: Option<Decimal>,
    pub source_purchase_order_id: Option<Uuid>,
    #[validate(length(max = 512))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct TransitionRequest {
    pub product_id: Uuid,
    #[validate(custom = "validate_location")]
    pub source: String,
    #[validate(custom = "validate_location")]
    pub destination: String,
    #[validate(range(min = 1))]
    pub quantity: i32,
    #[validate(length(max = 512))]
    pub annotation: Option<String>,
    pub unit_shipping_cost_override: Option<Decimal>,
}

// validated above, parse cannot fail here
fn parse_location(raw: &str) -> Result<LocationType, ServiceError> {
    LocationType::parse_api(raw)
        .ok_or_else(|| ServiceError::ValidationError(format!("unknown location type: {}", raw)))
}

/// List inventory batches visible to the caller's team
#[utoipa::path(
    get,
    path = "/api/v1/inventory/batches",
    params(BatchFilters),
    responses(
        (status = 200, description = "Batch list returned"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn list_batches(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(filters): Query<BatchFilters>,
) -> Result<impl IntoResponse, ServiceError> {
    let team_id = user.require_team()?;
    let page = filters.page.unwrap_or(1).max(1);
    let limit = filters.limit.unwrap_or(50).clamp(1, 200);

    let (batches, total) = state.services.inventory.list_batches(team_id, filters).await?;

    Ok(Json(ApiResponse::success(PaginatedResponse {
        items: batches,
        total,
        page,
        limit,
        total_pages: total.div_ceil(limit),
    })))
}

/// Receive stock into a location as a new batch
#[utoipa::path(
    post,
    path = "/api/v1/inventory/batches",
    request_body = ReceiveStockRequest,
    responses(
        (status = 201, description = "Batch created"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn receive_stock(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<ReceiveStockRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    payload.validate()?;
    let team_id = user.require_team()?;

    let batch = state
        .services
        .inventory
        .receive_stock(
            team_id,
            ReceiveStockCommand {
                product_id: payload.product_id,
                location_type: parse_location(&payload.location_type)?,
                quantity: payload.quantity,
                unit_cost: payload.unit_cost,
                unit_shipping_cost: payload.unit_shipping_cost.unwrap_or(Decimal::ZERO),
                source_purchase_order_id: payload.source_purchase_order_id,
                notes: payload.notes,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(batch))))
}

/// Per-location availability for one product
#[utoipa::path(
    get,
    path = "/api/v1/inventory/availability/{product_id}",
    params(("product_id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 200, description = "Availability returned"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn availability(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(product_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let team_id = user.require_team()?;
    let report = state.services.inventory.availability(team_id, product_id).await?;
    Ok(Json(ApiResponse::success(report)))
}

/// Move stock between locations
#[utoipa::path(
    post,
    path = "/api/v1/inventory/transitions",
    request_body = TransitionRequest,
    responses(
        (status = 200, description = "Transition applied"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn transition(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<TransitionRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    payload.validate()?;
    let team_id = user.require_team()?;

    let result = state
        .services
        .inventory
        .transition(
            team_id,
            TransitionCommand {
                product_id: payload.product_id,
                source: parse_location(&payload.source)?,
                destination: parse_location(&payload.destination)?,
                quantity: payload.quantity,
                annotation: payload.annotation,
                unit_shipping_cost_override: payload.unit_shipping_cost_override,
            },
        )
        .await?;

    Ok(Json(ApiResponse::success(result)))
}
