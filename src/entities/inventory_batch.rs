use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// The supply-chain stage a batch currently occupies. This is the one closed
/// vocabulary for locations; legacy spellings are folded in by [`LocationType::parse_api`].
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum LocationType {
    #[sea_orm(string_value = "production")]
    Production,
    #[sea_orm(string_value = "storage")]
    Storage,
    #[sea_orm(string_value = "en_route")]
    EnRoute,
    #[sea_orm(string_value = "fba")]
    Fba,
    #[sea_orm(string_value = "receiving")]
    Receiving,
}

impl LocationType {
    /// Locations a sale may draw from, in consumption priority order.
    pub const SELLABLE: [LocationType; 2] = [LocationType::Fba, LocationType::Receiving];

    pub fn as_str(&self) -> &'static str {
        match self {
            LocationType::Production => "production",
            LocationType::Storage => "storage",
            LocationType::EnRoute => "en_route",
            LocationType::Fba => "fba",
            LocationType::Receiving => "receiving",
        }
    }

    /// Parses API input, accepting the deprecated historical spellings that
    /// older clients still send: `warehouse` (the Amazon warehouse, i.e. FBA),
    /// `in_storage`, and `in_production`.
    pub fn parse_api(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "production" | "in_production" => Some(LocationType::Production),
            "storage" | "in_storage" => Some(LocationType::Storage),
            "en_route" | "enroute" => Some(LocationType::EnRoute),
            "fba" | "warehouse" => Some(LocationType::Fba),
            "receiving" => Some(LocationType::Receiving),
            _ => None,
        }
    }

    /// Grouping label used by availability displays. `fba` and `receiving`
    /// still roll up under the legacy "warehouse" heading; every other
    /// location displays as itself.
    pub fn display_group(&self) -> &'static str {
        match self {
            LocationType::Fba | LocationType::Receiving => "warehouse",
            other => other.as_str(),
        }
    }
}

impl std::fmt::Display for LocationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable-until-consumed lot of stock. Quantity only ever decreases
/// (FIFO consumption) and a batch reaching zero is deleted, never kept.
/// Cost basis and location are fixed per batch instance; moving stock means
/// consuming here and inserting a fresh batch at the destination.
///
/// The integer primary key is assigned by insertion order and breaks
/// `created_at` ties so consumption stays deterministic.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[schema(as = InventoryBatch)]
#[sea_orm(table_name = "inventory_batches")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub product_id: Uuid,

    pub location_type: LocationType,

    /// Remaining units in this batch, always >= 0.
    pub quantity: i32,

    /// Product cost per unit.
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub unit_cost: Decimal,

    /// Shipping cost allocated per unit.
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub unit_shipping_cost: Decimal,

    /// Purchase order that created the batch, if any. Deleting the order
    /// does not cascade here.
    pub source_purchase_order_id: Option<Uuid>,

    /// Free-text provenance, e.g. "PO 123 In Production" or
    /// "Shipment INV-55 Delivered".
    pub notes: Option<String>,

    /// FIFO ordering key.
    pub created_at: DateTime<Utc>,
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
