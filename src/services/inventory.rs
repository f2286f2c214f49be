//! Stock intake, availability views, and the location transition engine.

use std::sync::Arc;

use chrono::Utc;
use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, JoinType, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::db::DbPool;
use crate::entities::inventory_batch::{self, Entity as InventoryBatch, LocationType};
use crate::entities::product;
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::fifo::{self, ConsumedBatch, CostBasis};
use crate::services::products;
use crate::stock_lock::StockLockRegistry;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ReceiveStockCommand {
    pub product_id: Uuid,
    pub location_type: LocationType,
    pub quantity: i32,
    pub unit_cost: Decimal,
    #[serde(default)]
    pub unit_shipping_cost: Decimal,
    pub source_purchase_order_id: Option<Uuid>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct TransitionCommand {
    pub product_id: Uuid,
    pub source: LocationType,
    pub destination: LocationType,
    pub quantity: i32,
    /// Provenance note stamped on the destination batch.
    pub annotation: Option<String>,
    pub unit_shipping_cost_override: Option<Decimal>,
}

/// What a transition did: how much was asked for, how much actually moved
/// ("ship what's there" means these can differ), and the cost basis stamped
/// on the destination batch.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TransitionResult {
    pub product_id: Uuid,
    pub source: LocationType,
    pub destination: LocationType,
    pub requested: i32,
    pub moved: i32,
    pub consumed: Vec<ConsumedBatch>,
    pub destination_batch_id: Option<i64>,
    pub unit_cost: Decimal,
    pub unit_shipping_cost: Decimal,
}

/// Aggregate quantity of one product at one location. Derived from batches,
/// never stored.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LocationQuantity {
    pub location_type: LocationType,
    /// Legacy display heading; fba and receiving both group as "warehouse".
    pub display_group: &'static str,
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AvailabilityReport {
    pub product_id: Uuid,
    pub locations: Vec<LocationQuantity>,
    /// Sum across fba and receiving, the locations a sale may draw from.
    pub sellable: i32,
    pub total: i32,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, utoipa::IntoParams)]
pub struct BatchFilters {
    pub product_id: Option<Uuid>,
    /// Canonical or legacy location spelling.
    pub location_type: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Clone)]
pub struct InventoryService {
    db_pool: Arc<DbPool>,
    event_sender: EventSender,
    locks: Arc<StockLockRegistry>,
    cost_basis: CostBasis,
}

impl InventoryService {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: EventSender,
        locks: Arc<StockLockRegistry>,
        cost_basis: CostBasis,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            locks,
            cost_basis,
        }
    }

    /// Inserts a new batch at a location: purchase-order intake and any other
    /// path where stock enters the ledger from outside.
    pub async fn receive_stock(
        &self,
        team_id: Uuid,
        cmd: ReceiveStockCommand,
    ) -> Result<inventory_batch::Model, ServiceError> {
        if cmd.quantity <= 0 {
            return Err(ServiceError::ValidationError(format!(
                "received quantity must be positive, got {}",
                cmd.quantity
            )));
        }
        if cmd.unit_cost < Decimal::ZERO || cmd.unit_shipping_cost < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "unit costs must not be negative".into(),
            ));
        }

        let db = self.db_pool.as_ref();
        products::resolve_for_team(db, cmd.product_id, team_id).await?;

        let _guard = self
            .locks
            .acquire((cmd.product_id, cmd.location_type))
            .await;

        let batch = inventory_batch::ActiveModel {
            product_id: Set(cmd.product_id),
            location_type: Set(cmd.location_type),
            quantity: Set(cmd.quantity),
            unit_cost: Set(cmd.unit_cost),
            unit_shipping_cost: Set(cmd.unit_shipping_cost),
            source_purchase_order_id: Set(cmd.source_purchase_order_id),
            notes: Set(cmd.notes),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await
        .map_err(ServiceError::db_error)?;

        info!(
            product_id = %batch.product_id,
            location = %batch.location_type,
            batch_id = batch.id,
            quantity = batch.quantity,
            "Stock received"
        );
        counter!("fba_ledger_inventory.units_received", batch.quantity as u64);

        self.event_sender
            .send(Event::StockReceived {
                product_id: batch.product_id,
                location_type: batch.location_type,
                batch_id: batch.id,
                quantity: batch.quantity,
            })
            .await
            .map_err(ServiceError::EventError)?;

        Ok(batch)
    }

    /// Lists batches visible to the team, optionally narrowed by product and
    /// location, newest first.
    pub async fn list_batches(
        &self,
        team_id: Uuid,
        filters: BatchFilters,
    ) -> Result<(Vec<inventory_batch::Model>, u64), ServiceError> {
        let db = self.db_pool.as_ref();

        let mut query = InventoryBatch::find()
            .join(JoinType::InnerJoin, inventory_batch::Relation::Product.def())
            .filter(product::Column::TeamId.eq(team_id));

        if let Some(product_id) = filters.product_id {
            query = query.filter(inventory_batch::Column::ProductId.eq(product_id));
        }
        if let Some(raw) = filters.location_type.as_deref() {
            let location = LocationType::parse_api(raw).ok_or_else(|| {
                ServiceError::ValidationError(format!("unknown location type: {}", raw))
            })?;
            query = query.filter(inventory_batch::Column::LocationType.eq(location));
        }

        let page = filters.page.unwrap_or(1).max(1);
        let limit = filters.limit.unwrap_or(50).clamp(1, 200);

        let paginator = query
            .order_by_desc(inventory_batch::Column::CreatedAt)
            .order_by_desc(inventory_batch::Column::Id)
            .paginate(db, limit);
        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let batches = paginator
            .fetch_page(page - 1)
            .await
            .map_err(ServiceError::db_error)?;

        Ok((batches, total))
    }

    /// Per-location aggregate quantities for one product, with the legacy
    /// "warehouse" display grouping preserved for the UI.
    pub async fn availability(
        &self,
        team_id: Uuid,
        product_id: Uuid,
    ) -> Result<AvailabilityReport, ServiceError> {
        let db = self.db_pool.as_ref();
        products::resolve_for_team(db, product_id, team_id).await?;

        let batches = InventoryBatch::find()
            .filter(inventory_batch::Column::ProductId.eq(product_id))
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        let locations: Vec<LocationQuantity> = [
            LocationType::Production,
            LocationType::Storage,
            LocationType::EnRoute,
            LocationType::Fba,
            LocationType::Receiving,
        ]
        .into_iter()
        .map(|location| LocationQuantity {
            location_type: location,
            display_group: location.display_group(),
            quantity: batches
                .iter()
                .filter(|b| b.location_type == location)
                .map(|b| b.quantity)
                .sum(),
        })
        .collect();

        let sellable = locations
            .iter()
            .filter(|l| LocationType::SELLABLE.contains(&l.location_type))
            .map(|l| l.quantity)
            .sum();
        let total = locations.iter().map(|l| l.quantity).sum();

        Ok(AvailabilityReport {
            product_id,
            locations,
            sellable,
            total,
        })
    }

    /// Moves up to `quantity` units from source to destination as one atomic
    /// step: FIFO consumption at the source, one insertion at the
    /// destination. If the source holds fewer units than requested, whatever
    /// is there moves and the result reports the smaller figure.
    pub async fn transition(
        &self,
        team_id: Uuid,
        cmd: TransitionCommand,
    ) -> Result<TransitionResult, ServiceError> {
        if cmd.quantity <= 0 {
            return Err(ServiceError::ValidationError(format!(
                "transition quantity must be positive, got {}",
                cmd.quantity
            )));
        }
        if cmd.source == cmd.destination {
            return Err(ServiceError::InvalidOperation(format!(
                "source and destination are both {}",
                cmd.source
            )));
        }

        let db = self.db_pool.as_ref();
        products::resolve_for_team(db, cmd.product_id, team_id).await?;

        let _guards = self
            .locks
            .acquire_all(&[
                (cmd.product_id, cmd.source),
                (cmd.product_id, cmd.destination),
            ])
            .await;

        let this = self.clone();
        let txn_cmd = cmd.clone();
        let result = db
            .transaction::<_, TransitionResult, ServiceError>(move |txn| {
                Box::pin(async move { this.transition_on(txn, &txn_cmd).await })
            })
            .await
            .map_err(ServiceError::from)?;

        info!(
            product_id = %result.product_id,
            from = %result.source,
            to = %result.destination,
            requested = result.requested,
            moved = result.moved,
            "Location transition"
        );
        counter!("fba_ledger_inventory.units_transitioned", result.moved as u64);

        self.event_sender
            .send(Event::LocationTransitioned {
                product_id: result.product_id,
                from: result.source,
                to: result.destination,
                requested: result.requested,
                moved: result.moved,
            })
            .await
            .map_err(ServiceError::EventError)?;

        Ok(result)
    }

    /// Transition body, runnable on any connection. Callers composing larger
    /// operations (shipment create) thread their own transaction through and
    /// hold the stock locks themselves.
    pub(crate) async fn transition_on<C: ConnectionTrait>(
        &self,
        conn: &C,
        cmd: &TransitionCommand,
    ) -> Result<TransitionResult, ServiceError> {
        let outcome = fifo::consume_at(conn, cmd.product_id, cmd.source, cmd.quantity).await?;
        self.insert_destination_batch(
            conn,
            cmd.product_id,
            cmd.source,
            cmd.destination,
            cmd.quantity,
            outcome.consumed,
            cmd.annotation.clone(),
            cmd.unit_shipping_cost_override,
        )
        .await
    }

    /// Tag-targeted transition for shipment delivery: consumes exactly the
    /// source batches carrying `tag`, regardless of age, and re-creates them
    /// as one destination batch.
    pub(crate) async fn transition_tagged_on<C: ConnectionTrait>(
        &self,
        conn: &C,
        product_id: Uuid,
        source: LocationType,
        destination: LocationType,
        tag: &str,
        annotation: Option<String>,
    ) -> Result<TransitionResult, ServiceError> {
        let consumed = fifo::consume_tagged(conn, product_id, source, tag).await?;
        let requested: i32 = consumed.iter().map(|c| c.quantity).sum();
        self.insert_destination_batch(
            conn,
            product_id,
            source,
            destination,
            requested,
            consumed,
            annotation,
            None,
        )
        .await
    }

    #[allow(clippy::too_many_arguments)]
    async fn insert_destination_batch<C: ConnectionTrait>(
        &self,
        conn: &C,
        product_id: Uuid,
        source: LocationType,
        destination: LocationType,
        requested: i32,
        consumed: Vec<ConsumedBatch>,
        annotation: Option<String>,
        unit_shipping_cost_override: Option<Decimal>,
    ) -> Result<TransitionResult, ServiceError> {
        let moved: i32 = consumed.iter().map(|c| c.quantity).sum();
        let unit_cost = self.cost_basis.unit_cost(&consumed);
        let unit_shipping_cost = unit_shipping_cost_override
            .unwrap_or_else(|| self.cost_basis.unit_shipping_cost(&consumed));

        // Nothing at the source: nothing moves, nothing is created.
        let destination_batch_id = if moved > 0 {
            let batch = inventory_batch::ActiveModel {
                product_id: Set(product_id),
                location_type: Set(destination),
                quantity: Set(moved),
                unit_cost: Set(unit_cost),
                unit_shipping_cost: Set(unit_shipping_cost),
                source_purchase_order_id: Set(None),
                notes: Set(annotation),
                created_at: Set(Utc::now()),
                ..Default::default()
            }
            .insert(conn)
            .await
            .map_err(ServiceError::db_error)?;
            Some(batch.id)
        } else {
            None
        };

        Ok(TransitionResult {
            product_id,
            source,
            destination,
            requested,
            moved,
            consumed,
            destination_batch_id,
            unit_cost,
            unit_shipping_cost,
        })
    }
}

/// Sums remaining quantity of a product at one location. Lives here rather
/// than on the service so settlement can call it inside its transaction.
pub async fn available_at<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    location: LocationType,
) -> Result<i32, ServiceError> {
    let batches = InventoryBatch::find()
        .filter(inventory_batch::Column::ProductId.eq(product_id))
        .filter(inventory_batch::Column::LocationType.eq(location))
        .all(conn)
        .await
        .map_err(ServiceError::db_error)?;
    Ok(batches.iter().map(|b| b.quantity).sum())
}
