pub mod inventory;
pub mod sales;
pub mod shipments;
pub mod snapshots;

use std::sync::Arc;

use crate::db::DbPool;
use crate::events::EventSender;
use crate::services::fifo::CostBasis;
use crate::stock_lock::StockLockRegistry;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub inventory: Arc<crate::services::inventory::InventoryService>,
    pub sales: Arc<crate::services::sales::SalesService>,
    pub shipments: Arc<crate::services::shipments::ShipmentService>,
    pub reconciliation: Arc<crate::services::reconciliation::ReconciliationService>,
}

impl AppServices {
    /// Wires every service over one pool, one event channel, and one shared
    /// stock-lock registry; a second registry would void the serialization
    /// guarantee.
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender, cost_basis: CostBasis) -> Self {
        let locks = Arc::new(StockLockRegistry::new());

        let inventory = crate::services::inventory::InventoryService::new(
            db_pool.clone(),
            event_sender.clone(),
            locks.clone(),
            cost_basis,
        );
        let sales = Arc::new(crate::services::sales::SalesService::new(
            db_pool.clone(),
            event_sender.clone(),
            locks.clone(),
        ));
        let shipments = Arc::new(crate::services::shipments::ShipmentService::new(
            db_pool.clone(),
            event_sender.clone(),
            locks,
            inventory.clone(),
        ));
        let reconciliation = Arc::new(
            crate::services::reconciliation::ReconciliationService::new(db_pool, event_sender),
        );

        Self {
            inventory: Arc::new(inventory),
            sales,
            shipments,
            reconciliation,
        }
    }
}
