//! Shipment lifecycle: creation moves stock storage→en_route under a
//! provenance tag, delivery moves exactly the tagged batches en_route→fba.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use metrics::counter;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::db::DbPool;
use crate::entities::inventory_batch::LocationType;
use crate::entities::shipment::{self, provenance_tag, Entity as Shipment, ShipmentStatus};
use crate::entities::shipment_line::{self, Entity as ShipmentLine};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::inventory::{InventoryService, TransitionCommand};
use crate::services::products;
use crate::stock_lock::{StockKey, StockLockRegistry};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ShipmentLineInput {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateShipmentCommand {
    pub invoice_number: String,
    pub shipping_date: NaiveDate,
    pub lines: Vec<ShipmentLineInput>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ShipmentWithLines {
    pub shipment: shipment::Model,
    pub lines: Vec<shipment_line::Model>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, utoipa::IntoParams)]
pub struct ShipmentFilters {
    pub status: Option<ShipmentStatus>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Clone)]
pub struct ShipmentService {
    db_pool: Arc<DbPool>,
    event_sender: EventSender,
    locks: Arc<StockLockRegistry>,
    inventory: InventoryService,
}

impl ShipmentService {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: EventSender,
        locks: Arc<StockLockRegistry>,
        inventory: InventoryService,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            locks,
            inventory,
        }
    }

    /// Creates a shipment and moves each line storage→en_route in one
    /// transaction. Lines whose storage stock runs short ship what's there;
    /// `shipped_quantity` records what actually moved.
    pub async fn create_shipment(
        &self,
        team_id: Uuid,
        cmd: CreateShipmentCommand,
    ) -> Result<ShipmentWithLines, ServiceError> {
        let invoice_number = cmd.invoice_number.trim().to_owned();
        if invoice_number.is_empty() {
            return Err(ServiceError::ValidationError(
                "invoice_number must not be empty".into(),
            ));
        }
        if cmd.lines.is_empty() {
            return Err(ServiceError::ValidationError(
                "a shipment needs at least one line".into(),
            ));
        }
        for line in &cmd.lines {
            if line.quantity <= 0 {
                return Err(ServiceError::ValidationError(format!(
                    "line quantity must be positive, got {} for product {}",
                    line.quantity, line.product_id
                )));
            }
        }

        let db = self.db_pool.as_ref();

        let duplicate = Shipment::find()
            .filter(shipment::Column::TeamId.eq(team_id))
            .filter(shipment::Column::InvoiceNumber.eq(invoice_number.clone()))
            .one(db)
            .await
            .map_err(ServiceError::db_error)?;
        if duplicate.is_some() {
            return Err(ServiceError::InvalidOperation(format!(
                "shipment with invoice {} already exists",
                invoice_number
            )));
        }

        for line in &cmd.lines {
            products::resolve_for_team(db, line.product_id, team_id).await?;
        }

        // Every line's storage and en_route keys, taken together and sorted
        // by the registry, cover the whole multi-product move.
        let keys: Vec<StockKey> = cmd
            .lines
            .iter()
            .flat_map(|line| {
                [
                    (line.product_id, LocationType::Storage),
                    (line.product_id, LocationType::EnRoute),
                ]
            })
            .collect();
        let _guards = self.locks.acquire_all(&keys).await;

        let inventory = self.inventory.clone();
        let tag = provenance_tag(&invoice_number);
        let txn_invoice = invoice_number.clone();
        let txn_lines = cmd.lines.clone();
        let shipping_date = cmd.shipping_date;

        let created = db
            .transaction::<_, ShipmentWithLines, ServiceError>(move |txn| {
                Box::pin(async move {
                    let record = shipment::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        team_id: Set(team_id),
                        invoice_number: Set(txn_invoice),
                        status: Set(ShipmentStatus::Pending),
                        shipping_date: Set(shipping_date),
                        delivered_at: Set(None),
                        created_at: Set(Utc::now()),
                    }
                    .insert(txn)
                    .await
                    .map_err(ServiceError::db_error)?;

                    let mut lines = Vec::with_capacity(txn_lines.len());
                    for line in txn_lines {
                        let result = inventory
                            .transition_on(
                                txn,
                                &TransitionCommand {
                                    product_id: line.product_id,
                                    source: LocationType::Storage,
                                    destination: LocationType::EnRoute,
                                    quantity: line.quantity,
                                    annotation: Some(tag.clone()),
                                    unit_shipping_cost_override: None,
                                },
                            )
                            .await?;

                        let persisted = shipment_line::ActiveModel {
                            shipment_id: Set(record.id),
                            product_id: Set(line.product_id),
                            quantity: Set(line.quantity),
                            shipped_quantity: Set(result.moved),
                            ..Default::default()
                        }
                        .insert(txn)
                        .await
                        .map_err(ServiceError::db_error)?;
                        lines.push(persisted);
                    }

                    Ok(ShipmentWithLines {
                        shipment: record,
                        lines,
                    })
                })
            })
            .await
            .map_err(ServiceError::from)?;

        let shipped: i32 = created.lines.iter().map(|l| l.shipped_quantity).sum();
        info!(
            shipment_id = %created.shipment.id,
            invoice = %created.shipment.invoice_number,
            lines = created.lines.len(),
            shipped,
            "Shipment created"
        );
        counter!("fba_ledger_shipments.created", 1);

        for line in &created.lines {
            self.event_sender
                .send(Event::LocationTransitioned {
                    product_id: line.product_id,
                    from: LocationType::Storage,
                    to: LocationType::EnRoute,
                    requested: line.quantity,
                    moved: line.shipped_quantity,
                })
                .await
                .map_err(ServiceError::EventError)?;
        }

        Ok(created)
    }

    /// Marks a pending shipment delivered: for each line, the en-route
    /// batches tagged with this shipment's invoice move to fba. Targeting by
    /// tag rather than age keeps concurrent shipments of the same product
    /// from delivering each other's stock.
    pub async fn deliver_shipment(
        &self,
        team_id: Uuid,
        shipment_id: Uuid,
    ) -> Result<ShipmentWithLines, ServiceError> {
        let db = self.db_pool.as_ref();

        let record = Shipment::find_by_id(shipment_id)
            .filter(shipment::Column::TeamId.eq(team_id))
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Shipment {} not found", shipment_id))
            })?;
        if record.status == ShipmentStatus::Delivered {
            return Err(ServiceError::InvalidOperation(format!(
                "shipment {} is already delivered",
                record.invoice_number
            )));
        }

        let lines = ShipmentLine::find()
            .filter(shipment_line::Column::ShipmentId.eq(record.id))
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        let keys: Vec<StockKey> = lines
            .iter()
            .flat_map(|line| {
                [
                    (line.product_id, LocationType::EnRoute),
                    (line.product_id, LocationType::Fba),
                ]
            })
            .collect();
        let _guards = self.locks.acquire_all(&keys).await;

        let inventory = self.inventory.clone();
        let tag = provenance_tag(&record.invoice_number);
        let annotation = format!("{} Delivered", tag);
        let txn_record = record.clone();
        let txn_lines = lines.clone();

        let delivered = db
            .transaction::<_, shipment::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    for line in &txn_lines {
                        inventory
                            .transition_tagged_on(
                                txn,
                                line.product_id,
                                LocationType::EnRoute,
                                LocationType::Fba,
                                &tag,
                                Some(annotation.clone()),
                            )
                            .await?;
                    }

                    let mut active: shipment::ActiveModel = txn_record.into();
                    active.status = Set(ShipmentStatus::Delivered);
                    active.delivered_at = Set(Some(Utc::now()));
                    active.update(txn).await.map_err(ServiceError::db_error)
                })
            })
            .await
            .map_err(ServiceError::from)?;

        info!(
            shipment_id = %delivered.id,
            invoice = %delivered.invoice_number,
            "Shipment delivered"
        );
        counter!("fba_ledger_shipments.delivered", 1);

        self.event_sender
            .send(Event::ShipmentDelivered {
                shipment_id: delivered.id,
                invoice_number: delivered.invoice_number.clone(),
            })
            .await
            .map_err(ServiceError::EventError)?;

        Ok(ShipmentWithLines {
            shipment: delivered,
            lines,
        })
    }

    pub async fn get_shipment(
        &self,
        team_id: Uuid,
        shipment_id: Uuid,
    ) -> Result<ShipmentWithLines, ServiceError> {
        let db = self.db_pool.as_ref();

        let record = Shipment::find_by_id(shipment_id)
            .filter(shipment::Column::TeamId.eq(team_id))
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Shipment {} not found", shipment_id))
            })?;

        let lines = ShipmentLine::find()
            .filter(shipment_line::Column::ShipmentId.eq(record.id))
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        Ok(ShipmentWithLines {
            shipment: record,
            lines,
        })
    }

    pub async fn list_shipments(
        &self,
        team_id: Uuid,
        filters: ShipmentFilters,
    ) -> Result<(Vec<shipment::Model>, u64), ServiceError> {
        let db = self.db_pool.as_ref();

        let mut query = Shipment::find().filter(shipment::Column::TeamId.eq(team_id));
        if let Some(status) = filters.status {
            query = query.filter(shipment::Column::Status.eq(status));
        }

        let page = filters.page.unwrap_or(1).max(1);
        let limit = filters.limit.unwrap_or(50).clamp(1, 200);

        let paginator = query
            .order_by_desc(shipment::Column::ShippingDate)
            .order_by_desc(shipment::Column::CreatedAt)
            .paginate(db, limit);
        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let shipments = paginator
            .fetch_page(page - 1)
            .await
            .map_err(ServiceError::db_error)?;

        Ok((shipments, total))
    }
}
