use crate::auth::AuthUser;
use crate::errors::ServiceError;
use crate::services::sales::{RecordSaleCommand, SaleFilters};
use crate::{ApiResponse, AppState, PaginatedResponse};
use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, serde::Serialize, Validate, ToSchema)]
pub struct RecordSaleRequest {
    pub product_id: Uuid,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    #[validate(range(min = 1))]
    pub units_sold: i32,
    pub revenue: Option<Decimal>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct BulkSalesRequest {
    #[validate(length(min = 1, max = 500))]
    pub rows: Vec<RecordSaleRequest>,
}

impl From<RecordSaleRequest> for RecordSaleCommand {
    fn from(req: RecordSaleRequest) -> Self {
        Self {
            product_id: req.product_id,
            period_start: req.period_start,
            period_end: req.period_end,
            units_sold: req.units_sold,
            revenue: req.revenue,
        }
    }
}

/// Record a sale for a reporting period
#[utoipa::path(
    post,
    path = "/api/v1/sales",
    request_body = RecordSaleRequest,
    responses(
        (status = 201, description = "Sale recorded"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 409, description = "Duplicate period", body = crate::errors::ErrorResponse),
        (status = 422, description = "Insufficient inventory", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "sales"
)]
pub async fn record_sale(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<RecordSaleRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    payload.validate()?;
    let team_id = user.require_team()?;

    let settlement = state
        .services
        .sales
        .record_sale(team_id, payload.into())
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(settlement))))
}

/// Import many sales rows with per-row error isolation
#[utoipa::path(
    post,
    path = "/api/v1/sales/bulk",
    request_body = BulkSalesRequest,
    responses(
        (status = 200, description = "Bulk outcome returned; check per-row errors"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "sales"
)]
pub async fn bulk_record_sales(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<BulkSalesRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    payload.validate()?;
    let team_id = user.require_team()?;

    let rows = payload.rows.into_iter().map(Into::into).collect();
    let report = state.services.sales.bulk_record_sales(team_id, rows).await?;

    // one bad row does not fail the call; success reflects whether anything
    // was created
    let success = report.created_count > 0;
    Ok(Json(ApiResponse {
        success,
        data: Some(report),
        message: None,
        errors: None,
        meta: Some(crate::ResponseMeta::capture()),
    }))
}

/// Fetch one sales snapshot with its consumption audit
#[utoipa::path(
    get,
    path = "/api/v1/sales/{snapshot_id}",
    params(("snapshot_id" = Uuid, Path, description = "Snapshot id")),
    responses(
        (status = 200, description = "Snapshot returned"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Snapshot not found", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "sales"
)]
pub async fn get_sale(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(snapshot_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let team_id = user.require_team()?;
    let (snapshot, consumptions) = state.services.sales.get_sale(team_id, snapshot_id).await?;

    Ok(Json(ApiResponse::success(json!({
        "snapshot": snapshot,
        "consumptions": consumptions,
    }))))
}

/// List sales snapshots
#[utoipa::path(
    get,
    path = "/api/v1/sales",
    params(SaleFilters),
    responses(
        (status = 200, description = "Snapshot list returned"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "sales"
)]
pub async fn list_sales(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(filters): Query<SaleFilters>,
) -> Result<impl IntoResponse, ServiceError> {
    let team_id = user.require_team()?;
    let page = filters.page.unwrap_or(1).max(1);
    let limit = filters.limit.unwrap_or(50).clamp(1, 200);

    let (snapshots, total) = state.services.sales.list_sales(team_id, filters).await?;

    Ok(Json(ApiResponse::success(PaginatedResponse {
        items: snapshots,
        total,
        page,
        limit,
        total_pages: total.div_ceil(limit),
    })))
}

/// Reverse a recorded sale
#[utoipa::path(
    delete,
    path = "/api/v1/sales/{snapshot_id}",
    params(("snapshot_id" = Uuid, Path, description = "Snapshot id")),
    responses(
        (status = 200, description = "Sale reversed; restored batch returned"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Snapshot not found", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "sales"
)]
pub async fn reverse_sale(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(snapshot_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let team_id = user.require_team()?;
    let restored = state.services.sales.reverse_sale(team_id, snapshot_id).await?;
    Ok(Json(ApiResponse::success(restored)))
}
