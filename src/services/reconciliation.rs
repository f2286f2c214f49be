//! Warehouse snapshot reconciliation: derives units-sold records from
//! consecutive physical counts plus the deliveries between them.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use metrics::counter;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, JoinType, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::db::DbPool;
use crate::entities::sales_record::{self, Entity as SalesRecord};
use crate::entities::shipment::{self, ShipmentStatus};
use crate::entities::shipment_line::{self, Entity as ShipmentLine};
use crate::entities::warehouse_snapshot::{self, Entity as WarehouseSnapshot};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::products;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateSnapshotCommand {
    pub product_id: Uuid,
    pub snapshot_date: NaiveDate,
    pub quantity: i32,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateSnapshotCommand {
    pub quantity: i32,
}

/// What reconciling one snapshot produced.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReconcileOutcome {
    /// Derived record written (or rewritten) for the period ending at this
    /// snapshot's date.
    Upserted { record: sales_record::Model },
    /// The count rose beyond what the previous count plus deliveries can
    /// explain. No record is written and any stale one is removed.
    Anomaly {
        product_id: Uuid,
        start_date: NaiveDate,
        end_date: NaiveDate,
        implied_excess: i32,
    },
    /// No earlier snapshot exists; nothing is derivable.
    NoPredecessor,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SnapshotMutation {
    pub snapshot: warehouse_snapshot::Model,
    /// Outcome for the snapshot itself, then for its chronological
    /// successor when one exists.
    pub outcomes: Vec<ReconcileOutcome>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, utoipa::IntoParams)]
pub struct RecordFilters {
    pub product_id: Option<Uuid>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Clone)]
pub struct ReconciliationService {
    db_pool: Arc<DbPool>,
    event_sender: EventSender,
}

impl ReconciliationService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Records a physical count and reconciles it against its neighbors:
    /// the new snapshot gets a derived record, and the next-later snapshot
    /// is recomputed because its predecessor just changed.
    pub async fn create_snapshot(
        &self,
        team_id: Uuid,
        cmd: CreateSnapshotCommand,
    ) -> Result<SnapshotMutation, ServiceError> {
        if cmd.quantity < 0 {
            return Err(ServiceError::ValidationError(format!(
                "snapshot quantity must not be negative, got {}",
                cmd.quantity
            )));
        }

        let db = self.db_pool.as_ref();
        products::resolve_for_team(db, cmd.product_id, team_id).await?;

        let mutation = db
            .transaction::<_, SnapshotMutation, ServiceError>(move |txn| {
                Box::pin(async move {
                    let duplicate = WarehouseSnapshot::find()
                        .filter(warehouse_snapshot::Column::ProductId.eq(cmd.product_id))
                        .filter(warehouse_snapshot::Column::SnapshotDate.eq(cmd.snapshot_date))
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?;
                    if duplicate.is_some() {
                        return Err(ServiceError::InvalidOperation(format!(
                            "a warehouse snapshot for {} on {} already exists",
                            cmd.product_id, cmd.snapshot_date
                        )));
                    }

                    let snapshot = warehouse_snapshot::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        product_id: Set(cmd.product_id),
                        snapshot_date: Set(cmd.snapshot_date),
                        quantity: Set(cmd.quantity),
                        created_at: Set(Utc::now()),
                        updated_at: Set(None),
                    }
                    .insert(txn)
                    .await
                    .map_err(ServiceError::db_error)?;

                    let outcomes = reconcile_with_successor(txn, &snapshot).await?;
                    Ok(SnapshotMutation { snapshot, outcomes })
                })
            })
            .await
            .map_err(ServiceError::from)?;

        self.publish_outcomes(&mutation.outcomes).await?;
        Ok(mutation)
    }

    /// Corrects a recorded count. The snapshot's own record and its
    /// successor's are both recomputed.
    pub async fn update_snapshot(
        &self,
        team_id: Uuid,
        snapshot_id: Uuid,
        cmd: UpdateSnapshotCommand,
    ) -> Result<SnapshotMutation, ServiceError> {
        if cmd.quantity < 0 {
            return Err(ServiceError::ValidationError(format!(
                "snapshot quantity must not be negative, got {}",
                cmd.quantity
            )));
        }

        let db = self.db_pool.as_ref();
        let existing = self.find_snapshot(team_id, snapshot_id).await?;

        let mutation = db
            .transaction::<_, SnapshotMutation, ServiceError>(move |txn| {
                Box::pin(async move {
                    let mut active: warehouse_snapshot::ActiveModel = existing.into();
                    active.quantity = Set(cmd.quantity);
                    active.updated_at = Set(Some(Utc::now()));
                    let snapshot = active.update(txn).await.map_err(ServiceError::db_error)?;

                    let outcomes = reconcile_with_successor(txn, &snapshot).await?;
                    Ok(SnapshotMutation { snapshot, outcomes })
                })
            })
            .await
            .map_err(ServiceError::from)?;

        self.publish_outcomes(&mutation.outcomes).await?;
        Ok(mutation)
    }

    /// Removes a count. Records ending at the deleted date go with it, and
    /// the successor is recomputed against its new, earlier predecessor.
    pub async fn delete_snapshot(
        &self,
        team_id: Uuid,
        snapshot_id: Uuid,
    ) -> Result<Vec<ReconcileOutcome>, ServiceError> {
        let db = self.db_pool.as_ref();
        let existing = self.find_snapshot(team_id, snapshot_id).await?;

        let outcomes = db
            .transaction::<_, Vec<ReconcileOutcome>, ServiceError>(move |txn| {
                Box::pin(async move {
                    SalesRecord::delete_many()
                        .filter(sales_record::Column::ProductId.eq(existing.product_id))
                        .filter(sales_record::Column::EndDate.eq(existing.snapshot_date))
                        .exec(txn)
                        .await
                        .map_err(ServiceError::db_error)?;
                    WarehouseSnapshot::delete_by_id(existing.id)
                        .exec(txn)
                        .await
                        .map_err(ServiceError::db_error)?;

                    let mut outcomes = Vec::new();
                    if let Some(successor) =
                        successor_of(txn, existing.product_id, existing.snapshot_date).await?
                    {
                        outcomes.push(reconcile_on(txn, &successor).await?);
                    }
                    Ok(outcomes)
                })
            })
            .await
            .map_err(ServiceError::from)?;

        info!(%snapshot_id, "Warehouse snapshot deleted");
        self.publish_outcomes(&outcomes).await?;
        Ok(outcomes)
    }

    /// Re-runs reconciliation for one snapshot on demand, without mutating
    /// the snapshot itself.
    pub async fn reconcile(
        &self,
        team_id: Uuid,
        snapshot_id: Uuid,
    ) -> Result<ReconcileOutcome, ServiceError> {
        let db = self.db_pool.as_ref();
        let snapshot = self.find_snapshot(team_id, snapshot_id).await?;

        let outcome = db
            .transaction::<_, ReconcileOutcome, ServiceError>(move |txn| {
                Box::pin(async move { reconcile_on(txn, &snapshot).await })
            })
            .await
            .map_err(ServiceError::from)?;

        self.publish_outcomes(std::slice::from_ref(&outcome)).await?;
        Ok(outcome)
    }

    pub async fn list_snapshots(
        &self,
        team_id: Uuid,
        product_id: Uuid,
    ) -> Result<Vec<warehouse_snapshot::Model>, ServiceError> {
        let db = self.db_pool.as_ref();
        products::resolve_for_team(db, product_id, team_id).await?;

        WarehouseSnapshot::find()
            .filter(warehouse_snapshot::Column::ProductId.eq(product_id))
            .order_by_asc(warehouse_snapshot::Column::SnapshotDate)
            .all(db)
            .await
            .map_err(ServiceError::db_error)
    }

    /// Lists derived records visible to the team, newest period first.
    pub async fn list_sales_records(
        &self,
        team_id: Uuid,
        filters: RecordFilters,
    ) -> Result<(Vec<sales_record::Model>, u64), ServiceError> {
        let db = self.db_pool.as_ref();

        let mut query = SalesRecord::find()
            .join(JoinType::InnerJoin, sales_record::Relation::Product.def())
            .filter(crate::entities::product::Column::TeamId.eq(team_id));
        if let Some(product_id) = filters.product_id {
            query = query.filter(sales_record::Column::ProductId.eq(product_id));
        }

        let page = filters.page.unwrap_or(1).max(1);
        let limit = filters.limit.unwrap_or(50).clamp(1, 200);

        let paginator = query
            .order_by_desc(sales_record::Column::EndDate)
            .paginate(db, limit);
        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let records = paginator
            .fetch_page(page - 1)
            .await
            .map_err(ServiceError::db_error)?;

        Ok((records, total))
    }

    async fn find_snapshot(
        &self,
        team_id: Uuid,
        snapshot_id: Uuid,
    ) -> Result<warehouse_snapshot::Model, ServiceError> {
        let db = self.db_pool.as_ref();
        let snapshot = WarehouseSnapshot::find_by_id(snapshot_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Warehouse snapshot {} not found", snapshot_id))
            })?;
        // Ownership check routes through the product; a foreign snapshot is
        // indistinguishable from a missing one.
        products::resolve_for_team(db, snapshot.product_id, team_id)
            .await
            .map_err(|_| {
                ServiceError::NotFound(format!("Warehouse snapshot {} not found", snapshot_id))
            })?;
        Ok(snapshot)
    }

    async fn publish_outcomes(&self, outcomes: &[ReconcileOutcome]) -> Result<(), ServiceError> {
        for outcome in outcomes {
            match outcome {
                ReconcileOutcome::Upserted { record } => {
                    counter!("fba_ledger_reconciliation.records_upserted", 1);
                    self.event_sender
                        .send(Event::SalesRecordUpserted {
                            product_id: record.product_id,
                            start_date: record.start_date,
                            end_date: record.end_date,
                            units_sold: record.units_sold,
                        })
                        .await
                        .map_err(ServiceError::EventError)?;
                }
                ReconcileOutcome::Anomaly {
                    product_id,
                    start_date,
                    end_date,
                    implied_excess,
                } => {
                    counter!("fba_ledger_reconciliation.anomalies", 1);
                    self.event_sender
                        .send(Event::ReconciliationAnomaly {
                            product_id: *product_id,
                            start_date: *start_date,
                            end_date: *end_date,
                            implied_excess: *implied_excess,
                        })
                        .await
                        .map_err(ServiceError::EventError)?;
                }
                ReconcileOutcome::NoPredecessor => {}
            }
        }
        Ok(())
    }
}

/// Reconciles `current` and then its chronological successor, whose derived
/// record depends on `current` as its predecessor.
async fn reconcile_with_successor<C: ConnectionTrait>(
    conn: &C,
    current: &warehouse_snapshot::Model,
) -> Result<Vec<ReconcileOutcome>, ServiceError> {
    let mut outcomes = vec![reconcile_on(conn, current).await?];
    if let Some(successor) = successor_of(conn, current.product_id, current.snapshot_date).await? {
        outcomes.push(reconcile_on(conn, &successor).await?);
    }
    Ok(outcomes)
}

/// The reconciliation computation for one snapshot:
/// `units_sold = previous.quantity + delivered_in_period - current.quantity`.
/// A non-negative figure upserts the record keyed by
/// `(product, previous.date, current.date)`; a negative one removes any
/// record for the period and reports the anomaly. Records ending at this
/// date but keyed to a different predecessor are stale and removed either
/// way.
async fn reconcile_on<C: ConnectionTrait>(
    conn: &C,
    current: &warehouse_snapshot::Model,
) -> Result<ReconcileOutcome, ServiceError> {
    let previous = WarehouseSnapshot::find()
        .filter(warehouse_snapshot::Column::ProductId.eq(current.product_id))
        .filter(warehouse_snapshot::Column::SnapshotDate.lt(current.snapshot_date))
        .order_by_desc(warehouse_snapshot::Column::SnapshotDate)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?;

    let Some(previous) = previous else {
        // No earlier count; any record still ending at this date describes a
        // predecessor that no longer exists.
        SalesRecord::delete_many()
            .filter(sales_record::Column::ProductId.eq(current.product_id))
            .filter(sales_record::Column::EndDate.eq(current.snapshot_date))
            .exec(conn)
            .await
            .map_err(ServiceError::db_error)?;
        return Ok(ReconcileOutcome::NoPredecessor);
    };

    SalesRecord::delete_many()
        .filter(sales_record::Column::ProductId.eq(current.product_id))
        .filter(sales_record::Column::EndDate.eq(current.snapshot_date))
        .filter(sales_record::Column::StartDate.ne(previous.snapshot_date))
        .exec(conn)
        .await
        .map_err(ServiceError::db_error)?;

    let delivered = delivered_in_period(
        conn,
        current.product_id,
        previous.snapshot_date,
        current.snapshot_date,
    )
    .await?;
    let units_sold = previous.quantity + delivered - current.quantity;

    if units_sold < 0 {
        warn!(
            product_id = %current.product_id,
            start_date = %previous.snapshot_date,
            end_date = %current.snapshot_date,
            previous_count = previous.quantity,
            delivered,
            current_count = current.quantity,
            implied_excess = -units_sold,
            "Warehouse count exceeds previous count plus deliveries"
        );
        SalesRecord::delete_many()
            .filter(sales_record::Column::ProductId.eq(current.product_id))
            .filter(sales_record::Column::StartDate.eq(previous.snapshot_date))
            .filter(sales_record::Column::EndDate.eq(current.snapshot_date))
            .exec(conn)
            .await
            .map_err(ServiceError::db_error)?;
        return Ok(ReconcileOutcome::Anomaly {
            product_id: current.product_id,
            start_date: previous.snapshot_date,
            end_date: current.snapshot_date,
            implied_excess: -units_sold,
        });
    }

    let existing = SalesRecord::find()
        .filter(sales_record::Column::ProductId.eq(current.product_id))
        .filter(sales_record::Column::StartDate.eq(previous.snapshot_date))
        .filter(sales_record::Column::EndDate.eq(current.snapshot_date))
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?;

    let record = match existing {
        Some(record) => {
            let mut active: sales_record::ActiveModel = record.into();
            active.units_sold = Set(units_sold);
            active.starting_inventory = Set(previous.quantity);
            active.ending_inventory = Set(current.quantity);
            active.units_received = Set(delivered);
            active.updated_at = Set(Some(Utc::now()));
            active.update(conn).await.map_err(ServiceError::db_error)?
        }
        None => sales_record::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(current.product_id),
            start_date: Set(previous.snapshot_date),
            end_date: Set(current.snapshot_date),
            units_sold: Set(units_sold),
            starting_inventory: Set(previous.quantity),
            ending_inventory: Set(current.quantity),
            units_received: Set(delivered),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        }
        .insert(conn)
        .await
        .map_err(ServiceError::db_error)?,
    };

    info!(
        product_id = %record.product_id,
        start_date = %record.start_date,
        end_date = %record.end_date,
        units_sold = record.units_sold,
        delivered,
        "Sales record reconciled"
    );
    Ok(ReconcileOutcome::Upserted { record })
}

/// Units of the product that arrived at the warehouse in the window: the sum
/// of `shipped_quantity` over lines of delivered shipments whose
/// `shipping_date` lies in `[start, end]` inclusive.
async fn delivered_in_period<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<i32, ServiceError> {
    let lines = ShipmentLine::find()
        .join(JoinType::InnerJoin, shipment_line::Relation::Shipment.def())
        .filter(shipment_line::Column::ProductId.eq(product_id))
        .filter(shipment::Column::Status.eq(ShipmentStatus::Delivered))
        .filter(shipment::Column::ShippingDate.gte(start))
        .filter(shipment::Column::ShippingDate.lte(end))
        .all(conn)
        .await
        .map_err(ServiceError::db_error)?;
    Ok(lines.iter().map(|l| l.shipped_quantity).sum())
}

async fn successor_of<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    date: NaiveDate,
) -> Result<Option<warehouse_snapshot::Model>, ServiceError> {
    WarehouseSnapshot::find()
        .filter(warehouse_snapshot::Column::ProductId.eq(product_id))
        .filter(warehouse_snapshot::Column::SnapshotDate.gt(date))
        .order_by_asc(warehouse_snapshot::Column::SnapshotDate)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::product;
    use crate::migrator::Migrator;
    use sea_orm::{ConnectOptions, Database, DatabaseConnection};
    use sea_orm_migration::MigratorTrait;
    use tokio::sync::mpsc;

    async fn setup() -> (DatabaseConnection, ReconciliationService, mpsc::Receiver<Event>) {
        let mut opts = ConnectOptions::new("sqlite::memory:".to_owned());
        opts.max_connections(1);
        let db = Database::connect(opts).await.unwrap();
        Migrator::up(&db, None).await.unwrap();

        let (tx, rx) = mpsc::channel(64);
        let service = ReconciliationService::new(Arc::new(db.clone()), EventSender::new(tx));
        (db, service, rx)
    }

    async fn seed_product(db: &DatabaseConnection, team_id: Uuid) -> Uuid {
        let id = Uuid::new_v4();
        product::ActiveModel {
            id: Set(id),
            team_id: Set(team_id),
            sku: Set("SKU-1".into()),
            name: Set("Crate".into()),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        }
        .insert(db)
        .await
        .unwrap();
        id
    }

    async fn seed_delivered_shipment(
        db: &DatabaseConnection,
        team_id: Uuid,
        product_id: Uuid,
        invoice: &str,
        shipping_date: NaiveDate,
        quantity: i32,
    ) {
        let shipment_id = Uuid::new_v4();
        shipment::ActiveModel {
            id: Set(shipment_id),
            team_id: Set(team_id),
            invoice_number: Set(invoice.to_owned()),
            status: Set(ShipmentStatus::Delivered),
            shipping_date: Set(shipping_date),
            delivered_at: Set(Some(Utc::now())),
            created_at: Set(Utc::now()),
        }
        .insert(db)
        .await
        .unwrap();
        shipment_line::ActiveModel {
            shipment_id: Set(shipment_id),
            product_id: Set(product_id),
            quantity: Set(quantity),
            shipped_quantity: Set(quantity),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap();
    }

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn first_record(outcomes: &[ReconcileOutcome]) -> &sales_record::Model {
        for outcome in outcomes {
            if let ReconcileOutcome::Upserted { record } = outcome {
                return record;
            }
        }
        panic!("expected an upserted record in {:?}", outcomes);
    }

    #[tokio::test]
    async fn derives_units_sold_from_count_delta_plus_deliveries() {
        let (db, service, _rx) = setup().await;
        let team = Uuid::new_v4();
        let product = seed_product(&db, team).await;
        seed_delivered_shipment(&db, team, product, "INV-1", date("2026-01-05"), 20).await;

        service
            .create_snapshot(
                team,
                CreateSnapshotCommand {
                    product_id: product,
                    snapshot_date: date("2026-01-01"),
                    quantity: 100,
                },
            )
            .await
            .unwrap();
        let mutation = service
            .create_snapshot(
                team,
                CreateSnapshotCommand {
                    product_id: product,
                    snapshot_date: date("2026-01-10"),
                    quantity: 90,
                },
            )
            .await
            .unwrap();

        // 100 + 20 - 90
        let record = first_record(&mutation.outcomes);
        assert_eq!(record.units_sold, 30);
        assert_eq!(record.starting_inventory, 100);
        assert_eq!(record.ending_inventory, 90);
        assert_eq!(record.units_received, 20);
        assert_eq!(record.start_date, date("2026-01-01"));
        assert_eq!(record.end_date, date("2026-01-10"));
    }

    #[tokio::test]
    async fn window_boundaries_are_inclusive() {
        let (db, service, _rx) = setup().await;
        let team = Uuid::new_v4();
        let product = seed_product(&db, team).await;
        // on both boundary dates, plus one outside
        seed_delivered_shipment(&db, team, product, "INV-2", date("2026-02-01"), 5).await;
        seed_delivered_shipment(&db, team, product, "INV-3", date("2026-02-10"), 7).await;
        seed_delivered_shipment(&db, team, product, "INV-4", date("2026-02-11"), 100).await;

        service
            .create_snapshot(
                team,
                CreateSnapshotCommand {
                    product_id: product,
                    snapshot_date: date("2026-02-01"),
                    quantity: 50,
                },
            )
            .await
            .unwrap();
        let mutation = service
            .create_snapshot(
                team,
                CreateSnapshotCommand {
                    product_id: product,
                    snapshot_date: date("2026-02-10"),
                    quantity: 40,
                },
            )
            .await
            .unwrap();

        // 50 + (5 + 7) - 40; the 2026-02-11 shipment is outside the window
        assert_eq!(first_record(&mutation.outcomes).units_sold, 22);
    }

    #[tokio::test]
    async fn first_snapshot_has_no_predecessor() {
        let (db, service, _rx) = setup().await;
        let team = Uuid::new_v4();
        let product = seed_product(&db, team).await;

        let mutation = service
            .create_snapshot(
                team,
                CreateSnapshotCommand {
                    product_id: product,
                    snapshot_date: date("2026-03-01"),
                    quantity: 10,
                },
            )
            .await
            .unwrap();

        assert_eq!(mutation.outcomes.len(), 1);
        assert!(matches!(
            mutation.outcomes[0],
            ReconcileOutcome::NoPredecessor
        ));
        assert!(SalesRecord::find().all(&db).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn negative_delta_yields_anomaly_and_no_record() {
        let (db, service, mut rx) = setup().await;
        let team = Uuid::new_v4();
        let product = seed_product(&db, team).await;

        service
            .create_snapshot(
                team,
                CreateSnapshotCommand {
                    product_id: product,
                    snapshot_date: date("2026-04-01"),
                    quantity: 10,
                },
            )
            .await
            .unwrap();
        let mutation = service
            .create_snapshot(
                team,
                CreateSnapshotCommand {
                    product_id: product,
                    snapshot_date: date("2026-04-10"),
                    quantity: 25,
                },
            )
            .await
            .unwrap();

        match &mutation.outcomes[0] {
            ReconcileOutcome::Anomaly { implied_excess, .. } => assert_eq!(*implied_excess, 15),
            other => panic!("expected anomaly, got {:?}", other),
        }
        assert!(SalesRecord::find().all(&db).await.unwrap().is_empty());

        match rx.recv().await {
            Some(Event::ReconciliationAnomaly { implied_excess, .. }) => {
                assert_eq!(implied_excess, 15)
            }
            other => panic!("expected anomaly event, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn edit_recomputes_own_and_successor_records() {
        let (db, service, _rx) = setup().await;
        let team = Uuid::new_v4();
        let product = seed_product(&db, team).await;

        service
            .create_snapshot(
                team,
                CreateSnapshotCommand {
                    product_id: product,
                    snapshot_date: date("2026-05-01"),
                    quantity: 100,
                },
            )
            .await
            .unwrap();
        let middle = service
            .create_snapshot(
                team,
                CreateSnapshotCommand {
                    product_id: product,
                    snapshot_date: date("2026-05-10"),
                    quantity: 80,
                },
            )
            .await
            .unwrap();
        service
            .create_snapshot(
                team,
                CreateSnapshotCommand {
                    product_id: product,
                    snapshot_date: date("2026-05-20"),
                    quantity: 60,
                },
            )
            .await
            .unwrap();

        let mutation = service
            .update_snapshot(
                team,
                middle.snapshot.id,
                UpdateSnapshotCommand { quantity: 90 },
            )
            .await
            .unwrap();
        assert_eq!(mutation.outcomes.len(), 2);

        let records = SalesRecord::find()
            .filter(sales_record::Column::ProductId.eq(product))
            .order_by_asc(sales_record::Column::EndDate)
            .all(&db)
            .await
            .unwrap();
        assert_eq!(records.len(), 2);
        // 100 - 90 for the edited period, 90 - 60 for the successor's
        assert_eq!(records[0].units_sold, 10);
        assert_eq!(records[1].units_sold, 30);
    }

    #[tokio::test]
    async fn delete_drops_own_record_and_rebridges_successor() {
        let (db, service, _rx) = setup().await;
        let team = Uuid::new_v4();
        let product = seed_product(&db, team).await;

        service
            .create_snapshot(
                team,
                CreateSnapshotCommand {
                    product_id: product,
                    snapshot_date: date("2026-06-01"),
                    quantity: 100,
                },
            )
            .await
            .unwrap();
        let middle = service
            .create_snapshot(
                team,
                CreateSnapshotCommand {
                    product_id: product,
                    snapshot_date: date("2026-06-10"),
                    quantity: 70,
                },
            )
            .await
            .unwrap();
        service
            .create_snapshot(
                team,
                CreateSnapshotCommand {
                    product_id: product,
                    snapshot_date: date("2026-06-20"),
                    quantity: 50,
                },
            )
            .await
            .unwrap();

        service.delete_snapshot(team, middle.snapshot.id).await.unwrap();

        let records = SalesRecord::find()
            .filter(sales_record::Column::ProductId.eq(product))
            .all(&db)
            .await
            .unwrap();
        // one record spanning the gap the deleted snapshot left
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].start_date, date("2026-06-01"));
        assert_eq!(records[0].end_date, date("2026-06-20"));
        assert_eq!(records[0].units_sold, 50);
    }

    #[tokio::test]
    async fn duplicate_snapshot_date_is_rejected() {
        let (db, service, _rx) = setup().await;
        let team = Uuid::new_v4();
        let product = seed_product(&db, team).await;

        let cmd = CreateSnapshotCommand {
            product_id: product,
            snapshot_date: date("2026-07-01"),
            quantity: 5,
        };
        service.create_snapshot(team, cmd.clone()).await.unwrap();
        let err = service.create_snapshot(team, cmd).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidOperation(_)));
        let _ = db;
    }
}
