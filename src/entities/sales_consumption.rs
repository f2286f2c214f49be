use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::inventory_batch::LocationType;

/// Audit row recording exactly what one sale took from one batch: which
/// batch, where it sat, how many units, and at what cost basis. Kept outside
/// the live batch table so aggregate sums stay untouched by history.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[schema(as = SalesConsumption)]
#[sea_orm(table_name = "sales_consumptions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub snapshot_id: Uuid,

    /// Id the consumed batch had at consumption time. The batch itself may
    /// be gone (fully consumed), so this is not a foreign key.
    pub batch_id: i64,

    pub location_type: LocationType,

    pub quantity: i32,

    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub unit_cost: Decimal,

    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub unit_shipping_cost: Decimal,

    /// FIFO key the batch carried, preserved for audit ordering.
    pub batch_created_at: DateTime<Utc>,

    pub consumed_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::sales_snapshot::Entity",
        from = "Column::SnapshotId",
        to = "super::sales_snapshot::Column::Id"
    )]
    Snapshot,
}

impl Related<super::sales_snapshot::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Snapshot.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
