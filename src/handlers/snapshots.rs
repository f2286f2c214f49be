use crate::auth::AuthUser;
use crate::errors::ServiceError;
use crate::services::reconciliation::{
    CreateSnapshotCommand, RecordFilters, UpdateSnapshotCommand,
};
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

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateSnapshotRequest {
    pub product_id: Uuid,
    pub snapshot_date: NaiveDate,
    #[validate(range(min = 0))]
    pub quantity: i32,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateSnapshotRequest {
    #[validate(range(min = 0))]
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema, utoipa::IntoParams)]
pub struct SnapshotListQuery {
    pub product_id: Uuid,
}

/// Record a physical warehouse count and reconcile it
#[utoipa::path(
    post,
    path = "/api/v1/warehouse-snapshots",
    request_body = CreateSnapshotRequest,
    responses(
        (status = 201, description = "Snapshot created; reconciliation outcomes returned"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "warehouse-snapshots"
)]
pub async fn create_snapshot(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CreateSnapshotRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    payload.validate()?;
    let team_id = user.require_team()?;

    let mutation = state
        .services
        .reconciliation
        .create_snapshot(
            team_id,
            CreateSnapshotCommand {
                product_id: payload.product_id,
                snapshot_date: payload.snapshot_date,
                quantity: payload.quantity,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(mutation))))
}

/// Correct a warehouse count
#[utoipa::path(
    put,
    path = "/api/v1/warehouse-snapshots/{snapshot_id}",
    params(("snapshot_id" = Uuid, Path, description = "Snapshot id")),
    request_body = UpdateSnapshotRequest,
    responses(
        (status = 200, description = "Snapshot updated; reconciliation outcomes returned"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Snapshot not found", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "warehouse-snapshots"
)]
pub async fn update_snapshot(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(snapshot_id): Path<Uuid>,
    Json(payload): Json<UpdateSnapshotRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    payload.validate()?;
    let team_id = user.require_team()?;

    let mutation = state
        .services
        .reconciliation
        .update_snapshot(
            team_id,
            snapshot_id,
            UpdateSnapshotCommand {
                quantity: payload.quantity,
            },
        )
        .await?;

    Ok(Json(ApiResponse::success(mutation)))
}

/// Remove a warehouse count
#[utoipa::path(
    delete,
    path = "/api/v1/warehouse-snapshots/{snapshot_id}",
    params(("snapshot_id" = Uuid, Path, description = "Snapshot id")),
    responses(
        (status = 200, description = "Snapshot deleted; successor reconciliation returned"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Snapshot not found", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "warehouse-snapshots"
)]
pub async fn delete_snapshot(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(snapshot_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let team_id = user.require_team()?;
    let outcomes = state
        .services
        .reconciliation
        .delete_snapshot(team_id, snapshot_id)
        .await?;
    Ok(Json(ApiResponse::success(outcomes)))
}

/// Re-run reconciliation for one snapshot
#[utoipa::path(
    post,
    path = "/api/v1/warehouse-snapshots/{snapshot_id}/reconcile",
    params(("snapshot_id" = Uuid, Path, description = "Snapshot id")),
    responses(
        (status = 200, description = "Reconciliation outcome returned"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Snapshot not found", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "warehouse-snapshots"
)]
pub async fn reconcile_snapshot(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(snapshot_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let team_id = user.require_team()?;
    let outcome = state
        .services
        .reconciliation
        .reconcile(team_id, snapshot_id)
        .await?;
    Ok(Json(ApiResponse::success(outcome)))
}

/// List warehouse counts for one product, oldest first
#[utoipa::path(
    get,
    path = "/api/v1/warehouse-snapshots",
    params(SnapshotListQuery),
    responses(
        (status = 200, description = "Snapshot list returned"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "warehouse-snapshots"
)]
pub async fn list_snapshots(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<SnapshotListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let team_id = user.require_team()?;
    let snapshots = state
        .services
        .reconciliation
        .list_snapshots(team_id, query.product_id)
        .await?;
    Ok(Json(ApiResponse::success(snapshots)))
}

/// List derived sales records
#[utoipa::path(
    get,
    path = "/api/v1/sales-records",
    params(RecordFilters),
    responses(
        (status = 200, description = "Record list returned"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "warehouse-snapshots"
)]
pub async fn list_sales_records(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(filters): Query<RecordFilters>,
) -> Result<impl IntoResponse, ServiceError> {
    let team_id = user.require_team()?;
    let page = filters.page.unwrap_or(1).max(1);
    let limit = filters.limit.unwrap_or(50).clamp(1, 200);

    let (records, total) = state
        .services
        .reconciliation
        .list_sales_records(team_id, filters)
        .await?;

    Ok(Json(ApiResponse::success(PaginatedResponse {
        items: records,
        total,
        page,
        limit,
        total_pages: total.div_ceil(limit),
    })))
}
