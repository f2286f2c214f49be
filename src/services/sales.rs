//! Sales settlement: FIFO consumption against sellable locations, snapshot
//! and audit persistence, and reversal.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::db::DbPool;
use crate::entities::inventory_batch::{self, LocationType};
use crate::entities::sales_consumption::{self, Entity as SalesConsumption};
use crate::entities::sales_snapshot::{self, Entity as SalesSnapshot};
use crate::errors::{LocationAvailability, ServiceError};
use crate::events::{Event, EventSender};
use crate::services::fifo::{self, ConsumedBatch};
use crate::services::products;
use crate::stock_lock::StockLockRegistry;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RecordSaleCommand {
    pub product_id: Uuid,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub units_sold: i32,
    pub revenue: Option<Decimal>,
}

/// A settled sale: the persisted snapshot plus the exact batches it drained.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SaleSettlement {
    pub snapshot: sales_snapshot::Model,
    pub consumed: Vec<ConsumedBatch>,
}

/// Per-row outcome of a bulk import. Failed rows report the error text in
/// place; the rest of the batch is unaffected.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BulkSaleOutcome {
    pub product_id: Uuid,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub snapshot_id: Option<Uuid>,
    pub units_sold: i32,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BulkSaleReport {
    pub created_count: usize,
    pub failed_count: usize,
    pub outcomes: Vec<BulkSaleOutcome>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, utoipa::IntoParams)]
pub struct SaleFilters {
    pub product_id: Option<Uuid>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Clone)]
pub struct SalesService {
    db_pool: Arc<DbPool>,
    event_sender: EventSender,
    locks: Arc<StockLockRegistry>,
}

impl SalesService {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: EventSender,
        locks: Arc<StockLockRegistry>,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            locks,
        }
    }

    /// Records one sale: duplicate and availability checks, FIFO consumption
    /// across fba then receiving, snapshot and audit persistence. All of it
    /// commits or none of it does.
    pub async fn record_sale(
        &self,
        team_id: Uuid,
        cmd: RecordSaleCommand,
    ) -> Result<SaleSettlement, ServiceError> {
        validate_sale(&cmd)?;

        let db = self.db_pool.as_ref();
        products::resolve_for_team(db, cmd.product_id, team_id).await?;

        // Both sellable locations participate in consumption, so both are
        // locked for the duration.
        let _guards = self
            .locks
            .acquire_all(&[
                (cmd.product_id, LocationType::Fba),
                (cmd.product_id, LocationType::Receiving),
            ])
            .await;

        let txn_cmd = cmd.clone();
        let settlement = db
            .transaction::<_, SaleSettlement, ServiceError>(move |txn| {
                Box::pin(async move {
                    let existing = SalesSnapshot::find()
                        .filter(sales_snapshot::Column::TeamId.eq(team_id))
                        .filter(sales_snapshot::Column::ProductId.eq(txn_cmd.product_id))
                        .filter(sales_snapshot::Column::PeriodStart.eq(txn_cmd.period_start))
                        .filter(sales_snapshot::Column::PeriodEnd.eq(txn_cmd.period_end))
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?;
                    if existing.is_some() {
                        return Err(ServiceError::DuplicatePeriod {
                            product_id: txn_cmd.product_id,
                            period_start: txn_cmd.period_start,
                            period_end: txn_cmd.period_end,
                        });
                    }

                    let mut breakdown = Vec::new();
                    let mut available = 0;
                    for location in LocationType::SELLABLE {
                        let at = crate::services::inventory::available_at(
                            txn,
                            txn_cmd.product_id,
                            location,
                        )
                        .await?;
                        available += at;
                        breakdown.push(LocationAvailability {
                            location_type: location,
                            available: at,
                        });
                    }
                    if available < txn_cmd.units_sold {
                        return Err(ServiceError::InsufficientInventory {
                            needed: txn_cmd.units_sold,
                            available,
                            breakdown,
                        });
                    }

                    let outcome = fifo::consume_across(
                        txn,
                        txn_cmd.product_id,
                        &LocationType::SELLABLE,
                        txn_cmd.units_sold,
                    )
                    .await?;
                    if !outcome.is_satisfied() {
                        // Availability was checked under the same locks, so
                        // this indicates corrupted batch state.
                        error!(
                            product_id = %txn_cmd.product_id,
                            needed = txn_cmd.units_sold,
                            consumed = ?outcome.consumed,
                            shortfall = outcome.remaining_needed,
                            "Consumption fell short after availability check"
                        );
                        return Err(ServiceError::PartialConsumptionFailure(format!(
                            "consumed {} of {} units before running out",
                            outcome.total_consumed(),
                            txn_cmd.units_sold
                        )));
                    }

                    let now = Utc::now();
                    let snapshot = sales_snapshot::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        team_id: Set(team_id),
                        product_id: Set(txn_cmd.product_id),
                        period_start: Set(txn_cmd.period_start),
                        period_end: Set(txn_cmd.period_end),
                        units_sold: Set(txn_cmd.units_sold),
                        revenue: Set(txn_cmd.revenue),
                        created_at: Set(now),
                    }
                    .insert(txn)
                    .await
                    .map_err(|e| {
                        error!(
                            product_id = %txn_cmd.product_id,
                            consumed = ?outcome.consumed,
                            error = %e,
                            "Snapshot persistence failed after consumption; rolling back"
                        );
                        ServiceError::PartialConsumptionFailure(e.to_string())
                    })?;

                    for batch in &outcome.consumed {
                        sales_consumption::ActiveModel {
                            snapshot_id: Set(snapshot.id),
                            batch_id: Set(batch.batch_id),
                            location_type: Set(batch.location_type),
                            quantity: Set(batch.quantity),
                            unit_cost: Set(batch.unit_cost),
                            unit_shipping_cost: Set(batch.unit_shipping_cost),
                            batch_created_at: Set(batch.created_at),
                            consumed_at: Set(now),
                            ..Default::default()
                        }
                        .insert(txn)
                        .await
                        .map_err(|e| {
                            error!(
                                snapshot_id = %snapshot.id,
                                consumed = ?outcome.consumed,
                                error = %e,
                                "Audit persistence failed after consumption; rolling back"
                            );
                            ServiceError::PartialConsumptionFailure(e.to_string())
                        })?;
                    }

                    Ok(SaleSettlement {
                        snapshot,
                        consumed: outcome.consumed,
                    })
                })
            })
            .await
            .map_err(ServiceError::from)?;

        info!(
            snapshot_id = %settlement.snapshot.id,
            product_id = %settlement.snapshot.product_id,
            units_sold = settlement.snapshot.units_sold,
            batches = settlement.consumed.len(),
            "Sale recorded"
        );
        counter!("fba_ledger_sales.units_sold", settlement.snapshot.units_sold as u64);

        self.event_sender
            .send(Event::SaleRecorded {
                snapshot_id: settlement.snapshot.id,
                product_id: settlement.snapshot.product_id,
                units_sold: settlement.snapshot.units_sold,
            })
            .await
            .map_err(ServiceError::EventError)?;

        Ok(settlement)
    }

    /// Reverses a recorded sale. Restores the aggregate quantity as one new
    /// zero-cost fba batch; the original batch boundaries and cost basis are
    /// deliberately not reconstructed. Snapshot and audit rows are removed.
    pub async fn reverse_sale(
        &self,
        team_id: Uuid,
        snapshot_id: Uuid,
    ) -> Result<inventory_batch::Model, ServiceError> {
        let db = self.db_pool.as_ref();

        let snapshot = SalesSnapshot::find_by_id(snapshot_id)
            .filter(sales_snapshot::Column::TeamId.eq(team_id))
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Sales snapshot {} not found", snapshot_id))
            })?;

        let _guard = self
            .locks
            .acquire((snapshot.product_id, LocationType::Fba))
            .await;

        let reversal_snapshot = snapshot.clone();
        let restored = db
            .transaction::<_, inventory_batch::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    SalesConsumption::delete_many()
                        .filter(sales_consumption::Column::SnapshotId.eq(reversal_snapshot.id))
                        .exec(txn)
                        .await
                        .map_err(ServiceError::db_error)?;
                    SalesSnapshot::delete_by_id(reversal_snapshot.id)
                        .exec(txn)
                        .await
                        .map_err(ServiceError::db_error)?;

                    inventory_batch::ActiveModel {
                        product_id: Set(reversal_snapshot.product_id),
                        location_type: Set(LocationType::Fba),
                        quantity: Set(reversal_snapshot.units_sold),
                        unit_cost: Set(Decimal::ZERO),
                        unit_shipping_cost: Set(Decimal::ZERO),
                        source_purchase_order_id: Set(None),
                        notes: Set(Some("restored from deleted snapshot".to_owned())),
                        created_at: Set(Utc::now()),
                        ..Default::default()
                    }
                    .insert(txn)
                    .await
                    .map_err(ServiceError::db_error)
                })
            })
            .await
            .map_err(ServiceError::from)?;

        info!(
            snapshot_id = %snapshot.id,
            product_id = %snapshot.product_id,
            units_restored = snapshot.units_sold,
            "Sale reversed"
        );
        counter!("fba_ledger_sales.reversals", 1);

        self.event_sender
            .send(Event::SaleReversed {
                snapshot_id: snapshot.id,
                product_id: snapshot.product_id,
                units_restored: snapshot.units_sold,
            })
            .await
            .map_err(ServiceError::EventError)?;

        Ok(restored)
    }

    /// Imports many sales rows. Each row settles in its own transaction; a
    /// failure is captured in that row's outcome and later rows still run.
    pub async fn bulk_record_sales(
        &self,
        team_id: Uuid,
        rows: Vec<RecordSaleCommand>,
    ) -> Result<BulkSaleReport, ServiceError> {
        if rows.is_empty() {
            return Err(ServiceError::ValidationError(
                "bulk import requires at least one row".into(),
            ));
        }

        let mut outcomes = Vec::with_capacity(rows.len());
        let mut created_count = 0;

        for row in rows {
            let product_id = row.product_id;
            let period_start = row.period_start;
            let period_end = row.period_end;
            let units_sold = row.units_sold;

            match self.record_sale(team_id, row).await {
                Ok(settlement) => {
                    created_count += 1;
                    outcomes.push(BulkSaleOutcome {
                        product_id,
                        period_start,
                        period_end,
                        snapshot_id: Some(settlement.snapshot.id),
                        units_sold,
                        error: None,
                    });
                }
                Err(e) => {
                    info!(
                        %product_id,
                        %period_start,
                        %period_end,
                        error = %e,
                        "Bulk sale row failed; continuing"
                    );
                    outcomes.push(BulkSaleOutcome {
                        product_id,
                        period_start,
                        period_end,
                        snapshot_id: None,
                        units_sold,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        let failed_count = outcomes.len() - created_count;
        Ok(BulkSaleReport {
            created_count,
            failed_count,
            outcomes,
        })
    }

    /// Fetches one snapshot with its consumption audit rows.
    pub async fn get_sale(
        &self,
        team_id: Uuid,
        snapshot_id: Uuid,
    ) -> Result<(sales_snapshot::Model, Vec<sales_consumption::Model>), ServiceError> {
        let db = self.db_pool.as_ref();

        let snapshot = SalesSnapshot::find_by_id(snapshot_id)
            .filter(sales_snapshot::Column::TeamId.eq(team_id))
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Sales snapshot {} not found", snapshot_id))
            })?;

        let consumptions = SalesConsumption::find()
            .filter(sales_consumption::Column::SnapshotId.eq(snapshot.id))
            .order_by_asc(sales_consumption::Column::BatchCreatedAt)
            .order_by_asc(sales_consumption::Column::BatchId)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        Ok((snapshot, consumptions))
    }

    /// Lists snapshots for the team, newest period first.
    pub async fn list_sales(
        &self,
        team_id: Uuid,
        filters: SaleFilters,
    ) -> Result<(Vec<sales_snapshot::Model>, u64), ServiceError> {
        let db = self.db_pool.as_ref();

        let mut query = SalesSnapshot::find().filter(sales_snapshot::Column::TeamId.eq(team_id));
        if let Some(product_id) = filters.product_id {
            query = query.filter(sales_snapshot::Column::ProductId.eq(product_id));
        }

        let page = filters.page.unwrap_or(1).max(1);
        let limit = filters.limit.unwrap_or(50).clamp(1, 200);

        let paginator = query
            .order_by_desc(sales_snapshot::Column::PeriodEnd)
            .order_by_desc(sales_snapshot::Column::PeriodStart)
            .paginate(db, limit);
        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let snapshots = paginator
            .fetch_page(page - 1)
            .await
            .map_err(ServiceError::db_error)?;

        Ok((snapshots, total))
    }
}

fn validate_sale(cmd: &RecordSaleCommand) -> Result<(), ServiceError> {
    if cmd.units_sold <= 0 {
        return Err(ServiceError::ValidationError(format!(
            "units_sold must be positive, got {}",
            cmd.units_sold
        )));
    }
    if cmd.period_start > cmd.period_end {
        return Err(ServiceError::ValidationError(format!(
            "period_start {} is after period_end {}",
            cmd.period_start, cmd.period_end
        )));
    }
    if let Some(revenue) = cmd.revenue {
        if revenue < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "revenue must not be negative".into(),
            ));
        }
    }
    Ok(())
}
