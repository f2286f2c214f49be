use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Minimal product surface the ledger needs: ownership (team) plus identity.
/// Full product management lives outside this service.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[schema(as = Product)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Owning team; every lookup is scoped by this.
    pub team_id: Uuid,

    pub sku: String,

    pub name: String,

    pub created_at: DateTime<Utc>,

    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::inventory_batch::Entity")]
    InventoryBatches,
    #[sea_orm(has_many = "super::warehouse_snapshot::Entity")]
    WarehouseSnapshots,
}

impl Related<super::inventory_batch::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InventoryBatches.def()
    }
}

impl Related<super::warehouse_snapshot::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WarehouseSnapshots.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
