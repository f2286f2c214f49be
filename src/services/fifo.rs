//! FIFO consumption engine.
//!
//! Everything here is generic over [`ConnectionTrait`] so callers decide the
//! transaction boundary: an orchestrating service opens one transaction per
//! logical operation and threads it through every consumption call, so a
//! shortfall or downstream failure rolls the whole walk back.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::inventory_batch::{self, Entity as InventoryBatch, LocationType};
use crate::errors::ServiceError;

/// What one consumption took from one batch, at the cost basis the batch
/// carried. Returned to callers so transitions and settlements can propagate
/// cost and persist audit detail.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ConsumedBatch {
    pub batch_id: i64,
    pub location_type: LocationType,
    pub quantity: i32,
    pub unit_cost: Decimal,
    pub unit_shipping_cost: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Result of a FIFO walk over one or more locations.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ConsumptionOutcome {
    pub consumed: Vec<ConsumedBatch>,
    /// Zero on full satisfaction; the shortfall otherwise.
    pub remaining_needed: i32,
}

impl ConsumptionOutcome {
    pub fn total_consumed(&self) -> i32 {
        self.consumed.iter().map(|c| c.quantity).sum()
    }

    pub fn is_satisfied(&self) -> bool {
        self.remaining_needed == 0
    }
}

/// Consumes up to `quantity` units of a product at one location, oldest
/// batches first (`created_at`, ties by insertion id). A fully drained batch
/// is deleted; the boundary batch is reduced in place and the walk stops.
///
/// Never leaves a batch negative and touches no batch once the requested
/// quantity is covered. Mutations land on `conn`; run inside a transaction
/// when a shortfall must not persist partial state.
pub async fn consume_at<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    location: LocationType,
    quantity: i32,
) -> Result<ConsumptionOutcome, ServiceError> {
    if quantity <= 0 {
        return Err(ServiceError::ValidationError(format!(
            "consumption quantity must be positive, got {}",
            quantity
        )));
    }

    let batches = InventoryBatch::find()
        .filter(inventory_batch::Column::ProductId.eq(product_id))
        .filter(inventory_batch::Column::LocationType.eq(location))
        .order_by_asc(inventory_batch::Column::CreatedAt)
        .order_by_asc(inventory_batch::Column::Id)
        .all(conn)
        .await
        .map_err(ServiceError::db_error)?;

    let mut remaining = quantity;
    let mut consumed = Vec::new();

    for batch in batches {
        if remaining == 0 {
            break;
        }
        let take = batch.quantity.min(remaining);

        if batch.quantity <= remaining {
            // Fully drained; zero-quantity batches are never retained.
            InventoryBatch::delete_by_id(batch.id)
                .exec(conn)
                .await
                .map_err(ServiceError::db_error)?;
        } else {
            let mut active: inventory_batch::ActiveModel = batch.clone().into();
            active.quantity = Set(batch.quantity - remaining);
            active.update(conn).await.map_err(ServiceError::db_error)?;
        }

        remaining -= take;
        consumed.push(ConsumedBatch {
            batch_id: batch.id,
            location_type: batch.location_type,
            quantity: take,
            unit_cost: batch.unit_cost,
            unit_shipping_cost: batch.unit_shipping_cost,
            created_at: batch.created_at,
        });
    }

    debug!(
        %product_id,
        %location,
        requested = quantity,
        consumed = quantity - remaining,
        batches_touched = consumed.len(),
        "FIFO consumption walk"
    );

    Ok(ConsumptionOutcome {
        consumed,
        remaining_needed: remaining,
    })
}

/// Consumes `quantity` units drawing from `locations` in priority order,
/// each location receiving the remainder the previous one could not cover.
/// Consumed lists are aggregated in walk order.
pub async fn consume_across<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    locations: &[LocationType],
    quantity: i32,
) -> Result<ConsumptionOutcome, ServiceError> {
    if quantity <= 0 {
        return Err(ServiceError::ValidationError(format!(
            "consumption quantity must be positive, got {}",
            quantity
        )));
    }

    let mut outcome = ConsumptionOutcome {
        consumed: Vec::new(),
        remaining_needed: quantity,
    };

    for &location in locations {
        if outcome.remaining_needed == 0 {
            break;
        }
        let step = consume_at(conn, product_id, location, outcome.remaining_needed).await?;
        outcome.consumed.extend(step.consumed);
        outcome.remaining_needed = step.remaining_needed;
    }

    Ok(outcome)
}

/// Consumes, in full, every batch of `product_id` at `location` whose notes
/// carry `tag`. Used by shipment delivery, which must move exactly the
/// en-route batches a shipment created, not the oldest ones in general.
pub async fn consume_tagged<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    location: LocationType,
    tag: &str,
) -> Result<Vec<ConsumedBatch>, ServiceError> {
    let batches = InventoryBatch::find()
        .filter(inventory_batch::Column::ProductId.eq(product_id))
        .filter(inventory_batch::Column::LocationType.eq(location))
        .filter(inventory_batch::Column::Notes.contains(tag))
        .order_by_asc(inventory_batch::Column::CreatedAt)
        .order_by_asc(inventory_batch::Column::Id)
        .all(conn)
        .await
        .map_err(ServiceError::db_error)?;

    let mut consumed = Vec::with_capacity(batches.len());
    for batch in batches {
        InventoryBatch::delete_by_id(batch.id)
            .exec(conn)
            .await
            .map_err(ServiceError::db_error)?;
        consumed.push(ConsumedBatch {
            batch_id: batch.id,
            location_type: batch.location_type,
            quantity: batch.quantity,
            unit_cost: batch.unit_cost,
            unit_shipping_cost: batch.unit_shipping_cost,
            created_at: batch.created_at,
        });
    }

    Ok(consumed)
}

/// How a transition derives the destination batch's cost basis from the
/// batches it consumed.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display, strum::EnumString, Serialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CostBasis {
    /// First consumed batch's per-unit cost, ignoring later batches.
    /// The historical behavior of the ledger; deliberately simple.
    #[default]
    FirstBatch,
    /// Quantity-weighted average across every consumed batch.
    WeightedAverage,
}

impl CostBasis {
    /// Parses the configured strategy name, falling back to the default on
    /// anything unrecognized (config validation should have caught it).
    pub fn from_config(value: &str) -> Self {
        CostBasis::from_str(value).unwrap_or_else(|_| {
            warn!(value, "Unknown cost_basis setting; using first_batch");
            CostBasis::default()
        })
    }

    pub fn unit_cost(&self, consumed: &[ConsumedBatch]) -> Decimal {
        self.apply(consumed, |c| c.unit_cost)
    }

    pub fn unit_shipping_cost(&self, consumed: &[ConsumedBatch]) -> Decimal {
        self.apply(consumed, |c| c.unit_shipping_cost)
    }

    fn apply(&self, consumed: &[ConsumedBatch], cost: impl Fn(&ConsumedBatch) -> Decimal) -> Decimal {
        match self {
            CostBasis::FirstBatch => consumed.first().map(&cost).unwrap_or(Decimal::ZERO),
            CostBasis::WeightedAverage => {
                let total_units: i32 = consumed.iter().map(|c| c.quantity).sum();
                if total_units == 0 {
                    return Decimal::ZERO;
                }
                let weighted: Decimal = consumed
                    .iter()
                    .map(|c| cost(c) * Decimal::from(c.quantity))
                    .sum();
                weighted / Decimal::from(total_units)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::product;
    use crate::migrator::Migrator;
    use chrono::Duration;
    use rust_decimal_macros::dec;
    use sea_orm::{
        ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, TransactionTrait,
    };
    use sea_orm_migration::MigratorTrait;

    async fn setup() -> DatabaseConnection {
        let mut opts = ConnectOptions::new("sqlite::memory:".to_owned());
        opts.max_connections(1);
        let db = Database::connect(opts).await.expect("sqlite connects");
        Migrator::up(&db, None).await.expect("migrations apply");
        db
    }

    async fn seed_product(db: &DatabaseConnection) -> Uuid {
        let id = Uuid::new_v4();
        product::ActiveModel {
            id: Set(id),
            team_id: Set(Uuid::new_v4()),
            sku: Set("SKU-1".into()),
            name: Set("Widget".into()),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        }
        .insert(db)
        .await
        .expect("product inserts");
        id
    }

    async fn seed_batch(
        db: &DatabaseConnection,
        product_id: Uuid,
        location: LocationType,
        quantity: i32,
        unit_cost: Decimal,
        age_minutes: i64,
        notes: Option<&str>,
    ) -> i64 {
        let batch = inventory_batch::ActiveModel {
            product_id: Set(product_id),
            location_type: Set(location),
            quantity: Set(quantity),
            unit_cost: Set(unit_cost),
            unit_shipping_cost: Set(dec!(0.50)),
            source_purchase_order_id: Set(None),
            notes: Set(notes.map(str::to_string)),
            created_at: Set(Utc::now() - Duration::minutes(age_minutes)),
            ..Default::default()
        }
        .insert(db)
        .await
        .expect("batch inserts");
        batch.id
    }

    async fn remaining_quantities(
        db: &DatabaseConnection,
        product_id: Uuid,
        location: LocationType,
    ) -> Vec<(i64, i32)> {
        InventoryBatch::find()
            .filter(inventory_batch::Column::ProductId.eq(product_id))
            .filter(inventory_batch::Column::LocationType.eq(location))
            .order_by_asc(inventory_batch::Column::CreatedAt)
            .order_by_asc(inventory_batch::Column::Id)
            .all(db)
            .await
            .unwrap()
            .into_iter()
            .map(|b| (b.id, b.quantity))
            .collect()
    }

    #[tokio::test]
    async fn consumes_oldest_batches_first() {
        let db = setup().await;
        let product = seed_product(&db).await;
        let b1 = seed_batch(&db, product, LocationType::Fba, 5, dec!(2.00), 30, None).await;
        let b2 = seed_batch(&db, product, LocationType::Fba, 5, dec!(2.50), 20, None).await;
        let b3 = seed_batch(&db, product, LocationType::Fba, 5, dec!(3.00), 10, None).await;

        let outcome = consume_at(&db, product, LocationType::Fba, 7).await.unwrap();

        assert!(outcome.is_satisfied());
        assert_eq!(outcome.total_consumed(), 7);
        assert_eq!(outcome.consumed.len(), 2);
        assert_eq!(outcome.consumed[0].batch_id, b1);
        assert_eq!(outcome.consumed[0].quantity, 5);
        assert_eq!(outcome.consumed[1].batch_id, b2);
        assert_eq!(outcome.consumed[1].quantity, 2);

        // batch1 deleted, batch2 reduced to 3, batch3 untouched
        let left = remaining_quantities(&db, product, LocationType::Fba).await;
        assert_eq!(left, vec![(b2, 3), (b3, 5)]);
    }

    #[tokio::test]
    async fn created_at_ties_break_by_insertion_id() {
        let db = setup().await;
        let product = seed_product(&db).await;
        let now = Utc::now();
        let mut ids = Vec::new();
        for _ in 0..2 {
            let batch = inventory_batch::ActiveModel {
                product_id: Set(product),
                location_type: Set(LocationType::Storage),
                quantity: Set(4),
                unit_cost: Set(dec!(1.00)),
                unit_shipping_cost: Set(Decimal::ZERO),
                source_purchase_order_id: Set(None),
                notes: Set(None),
                created_at: Set(now),
                ..Default::default()
            }
            .insert(&db)
            .await
            .unwrap();
            ids.push(batch.id);
        }

        let outcome = consume_at(&db, product, LocationType::Storage, 4).await.unwrap();
        assert_eq!(outcome.consumed[0].batch_id, ids[0]);
        let left = remaining_quantities(&db, product, LocationType::Storage).await;
        assert_eq!(left, vec![(ids[1], 4)]);
    }

    #[tokio::test]
    async fn shortfall_reports_remaining_needed() {
        let db = setup().await;
        let product = seed_product(&db).await;
        seed_batch(&db, product, LocationType::Fba, 4, dec!(2.00), 10, None).await;

        let outcome = consume_at(&db, product, LocationType::Fba, 10).await.unwrap();
        assert_eq!(outcome.total_consumed(), 4);
        assert_eq!(outcome.remaining_needed, 6);
    }

    #[tokio::test]
    async fn shortfall_inside_transaction_leaves_batches_untouched() {
        let db = setup().await;
        let product = seed_product(&db).await;
        let b1 = seed_batch(&db, product, LocationType::Fba, 3, dec!(2.00), 20, None).await;
        let b2 = seed_batch(&db, product, LocationType::Fba, 4, dec!(2.00), 10, None).await;

        let result = db
            .transaction::<_, (), ServiceError>(move |txn| {
                Box::pin(async move {
                    let outcome = consume_at(txn, product, LocationType::Fba, 100).await?;
                    if !outcome.is_satisfied() {
                        return Err(ServiceError::InsufficientInventory {
                            needed: 100,
                            available: outcome.total_consumed(),
                            breakdown: vec![],
                        });
                    }
                    Ok(())
                })
            })
            .await;
        assert!(result.is_err());

        // rollback must restore every batch exactly
        let left = remaining_quantities(&db, product, LocationType::Fba).await;
        assert_eq!(left, vec![(b1, 3), (b2, 4)]);
    }

    #[tokio::test]
    async fn multi_location_fallback_drains_in_priority_order() {
        let db = setup().await;
        let product = seed_product(&db).await;
        seed_batch(&db, product, LocationType::Fba, 6, dec!(2.00), 20, None).await;
        seed_batch(&db, product, LocationType::Receiving, 10, dec!(1.50), 30, None).await;

        let outcome =
            consume_across(&db, product, &LocationType::SELLABLE, 9).await.unwrap();

        assert!(outcome.is_satisfied());
        assert_eq!(outcome.consumed.len(), 2);
        assert_eq!(outcome.consumed[0].location_type, LocationType::Fba);
        assert_eq!(outcome.consumed[0].quantity, 6);
        assert_eq!(outcome.consumed[1].location_type, LocationType::Receiving);
        assert_eq!(outcome.consumed[1].quantity, 3);

        assert!(remaining_quantities(&db, product, LocationType::Fba).await.is_empty());
        let receiving = remaining_quantities(&db, product, LocationType::Receiving).await;
        assert_eq!(receiving[0].1, 7);
    }

    #[tokio::test]
    async fn tagged_consumption_ignores_untagged_batches() {
        let db = setup().await;
        let product = seed_product(&db).await;
        let tagged = seed_batch(
            &db,
            product,
            LocationType::EnRoute,
            12,
            dec!(2.00),
            20,
            Some("Shipment INV-55"),
        )
        .await;
        let other = seed_batch(
            &db,
            product,
            LocationType::EnRoute,
            8,
            dec!(2.00),
            30,
            Some("Shipment INV-56"),
        )
        .await;

        let consumed = consume_tagged(&db, product, LocationType::EnRoute, "Shipment INV-55")
            .await
            .unwrap();

        assert_eq!(consumed.len(), 1);
        assert_eq!(consumed[0].batch_id, tagged);
        assert_eq!(consumed[0].quantity, 12);

        let left = remaining_quantities(&db, product, LocationType::EnRoute).await;
        assert_eq!(left, vec![(other, 8)]);
    }

    #[tokio::test]
    async fn non_positive_quantity_is_rejected() {
        let db = setup().await;
        let product = seed_product(&db).await;

        let err = consume_at(&db, product, LocationType::Fba, 0).await.unwrap_err();
        assert!(matches!(err, ServiceError::ValidationError(_)));
        let err = consume_across(&db, product, &LocationType::SELLABLE, -3)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::ValidationError(_)));
    }

    fn consumed(quantity: i32, unit_cost: Decimal, shipping: Decimal) -> ConsumedBatch {
        ConsumedBatch {
            batch_id: 0,
            location_type: LocationType::Storage,
            quantity,
            unit_cost,
            unit_shipping_cost: shipping,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn first_batch_strategy_takes_first_cost_only() {
        let lots = vec![
            consumed(10, dec!(2.00), dec!(0.10)),
            consumed(30, dec!(4.00), dec!(0.30)),
        ];
        assert_eq!(CostBasis::FirstBatch.unit_cost(&lots), dec!(2.00));
        assert_eq!(CostBasis::FirstBatch.unit_shipping_cost(&lots), dec!(0.10));
    }

    #[test]
    fn weighted_average_strategy_weights_by_quantity() {
        let lots = vec![
            consumed(10, dec!(2.00), dec!(0.10)),
            consumed(30, dec!(4.00), dec!(0.30)),
        ];
        // (10*2 + 30*4) / 40 = 3.5
        assert_eq!(CostBasis::WeightedAverage.unit_cost(&lots), dec!(3.5));
        assert_eq!(
            CostBasis::WeightedAverage.unit_shipping_cost(&lots),
            dec!(0.25)
        );
    }

    #[test]
    fn empty_consumption_yields_zero_cost() {
        assert_eq!(CostBasis::FirstBatch.unit_cost(&[]), Decimal::ZERO);
        assert_eq!(CostBasis::WeightedAverage.unit_cost(&[]), Decimal::ZERO);
    }

    #[test]
    fn strategy_parses_from_config() {
        assert_eq!(CostBasis::from_config("first_batch"), CostBasis::FirstBatch);
        assert_eq!(
            CostBasis::from_config("weighted_average"),
            CostBasis::WeightedAverage
        );
        assert_eq!(CostBasis::from_config("lifo"), CostBasis::FirstBatch);
    }
}
