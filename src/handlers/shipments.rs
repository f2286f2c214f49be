use crate::auth::AuthUser;
use crate::errors::ServiceError;
use crate::services::shipments::{CreateShipmentCommand, ShipmentFilters, ShipmentLineInput};
use crate::{ApiResponse, AppState, PaginatedResponse};
use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, serde::Serialize, Validate, ToSchema)]
pub struct ShipmentLineRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1))]
    pub quantity: i32,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateShipmentRequest {
    #[validate(length(min = 1, max = 64))]
    pub invoice_number: String,
    pub shipping_date: NaiveDate,
    #[validate(length(min = 1, max = 100))]
    pub lines: Vec<ShipmentLineRequest>,
}

/// Create a shipment, moving each line into en_route
#[utoipa::path(
    post,
    path = "/api/v1/shipments",
    request_body = CreateShipmentRequest,
    responses(
        (status = 201, description = "Shipment created"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "shipments"
)]
pub async fn create_shipment(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CreateShipmentRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    payload.validate()?;
    let team_id = user.require_team()?;

    let created = state
        .services
        .shipments
        .create_shipment(
            team_id,
            CreateShipmentCommand {
                invoice_number: payload.invoice_number,
                shipping_date: payload.shipping_date,
                lines: payload
                    .lines
                    .into_iter()
                    .map(|line| ShipmentLineInput {
                        product_id: line.product_id,
                        quantity: line.quantity,
                    })
                    .collect(),
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(created))))
}

/// Mark a shipment delivered, moving its tagged batches to fba
#[utoipa::path(
    post,
    path = "/api/v1/shipments/{shipment_id}/deliver",
    params(("shipment_id" = Uuid, Path, description = "Shipment id")),
    responses(
        (status = 200, description = "Shipment delivered"),
        (status = 400, description = "Already delivered", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Shipment not found", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "shipments"
)]
pub async fn deliver_shipment(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(shipment_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let team_id = user.require_team()?;
    let delivered = state
        .services
        .shipments
        .deliver_shipment(team_id, shipment_id)
        .await?;
    Ok(Json(ApiResponse::success(delivered)))
}

/// Fetch one shipment with its lines
#[utoipa::path(
    get,
    path = "/api/v1/shipments/{shipment_id}",
    params(("shipment_id" = Uuid, Path, description = "Shipment id")),
    responses(
        (status = 200, description = "Shipment returned"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Shipment not found", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "shipments"
)]
pub async fn get_shipment(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(shipment_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let team_id = user.require_team()?;
    let shipment = state
        .services
        .shipments
        .get_shipment(team_id, shipment_id)
        .await?;
    Ok(Json(ApiResponse::success(shipment)))
}

/// List shipments
#[utoipa::path(
    get,
    path = "/api/v1/shipments",
    params(ShipmentFilters),
    responses(
        (status = 200, description = "Shipment list returned"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "shipments"
)]
pub async fn list_shipments(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(filters): Query<ShipmentFilters>,
) -> Result<impl IntoResponse, ServiceError> {
    let team_id = user.require_team()?;
    let page = filters.page.unwrap_or(1).max(1);
    let limit = filters.limit.unwrap_or(50).clamp(1, 200);

    let (shipments, total) = state
        .services
        .shipments
        .list_shipments(team_id, filters)
        .await?;

    Ok(Json(ApiResponse::success(PaginatedResponse {
        items: shipments,
        total,
        page,
        limit,
        total_pages: total.div_ceil(limit),
    })))
}
