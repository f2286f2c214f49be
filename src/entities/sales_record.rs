use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Units-sold figure derived from two consecutive warehouse counts plus the
/// deliveries between them. Independent of the settlement ledger; the two
/// figures may legitimately diverge. One record per
/// (product_id, start_date, end_date).
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[schema(as = SalesRecord)]
#[sea_orm(table_name = "sales_records")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub product_id: Uuid,

    /// Date of the earlier bounding snapshot.
    pub start_date: NaiveDate,

    /// Date of the later bounding snapshot.
    pub end_date: NaiveDate,

    pub units_sold: i32,

    pub starting_inventory: i32,

    pub ending_inventory: i32,

    /// Delivered into the warehouse during the period.
    pub units_received: i32,

    pub created_at: DateTime<Utc>,

    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
