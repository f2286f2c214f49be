use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum ShipmentStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "delivered")]
    Delivered,
}

/// The provenance tag stamped on en-route batches created for a shipment,
/// e.g. "Shipment INV-55". Delivery looks batches up by this exact prefix.
pub fn provenance_tag(invoice_number: &str) -> String {
    format!("Shipment {}", invoice_number)
}

/// An outbound movement of stock toward Amazon. Creating one transitions
/// each line storage→en_route; marking it delivered transitions the tagged
/// en-route batches en_route→fba.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[schema(as = Shipment)]
#[sea_orm(table_name = "shipments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub team_id: Uuid,

    /// Carrier/commercial invoice number, unique per team. Embedded in batch
    /// notes as the provenance tag.
    pub invoice_number: String,

    pub status: ShipmentStatus,

    /// Date the shipment left storage; the reconciliation window key.
    pub shipping_date: NaiveDate,

    pub delivered_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::shipment_line::Entity")]
    Lines,
}

impl Related<super::shipment_line::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Lines.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
