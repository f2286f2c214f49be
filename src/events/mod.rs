use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::entities::inventory_batch::LocationType;

/// Cloneable handle services use to publish domain events.
#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Domain events emitted after a mutation commits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    StockReceived {
        product_id: Uuid,
        location_type: LocationType,
        batch_id: i64,
        quantity: i32,
    },
    LocationTransitioned {
        product_id: Uuid,
        from: LocationType,
        to: LocationType,
        requested: i32,
        moved: i32,
    },
    ShipmentDelivered {
        shipment_id: Uuid,
        invoice_number: String,
    },
    SaleRecorded {
        snapshot_id: Uuid,
        product_id: Uuid,
        units_sold: i32,
    },
    SaleReversed {
        snapshot_id: Uuid,
        product_id: Uuid,
        units_restored: i32,
    },
    SalesRecordUpserted {
        product_id: Uuid,
        start_date: NaiveDate,
        end_date: NaiveDate,
        units_sold: i32,
    },
    /// A warehouse count exceeded what the previous count plus deliveries
    /// can explain; needs a human decision, never silently dropped.
    ReconciliationAnomaly {
        product_id: Uuid,
        start_date: NaiveDate,
        end_date: NaiveDate,
        implied_excess: i32,
    },
}

/// Drains the event channel, logging every event. Anomalies log at warn so
/// they stand out in aggregated output.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::ReconciliationAnomaly {
                product_id,
                start_date,
                end_date,
                implied_excess,
            } => {
                warn!(
                    %product_id,
                    %start_date,
                    %end_date,
                    implied_excess,
                    "Reconciliation anomaly: count rose beyond deliveries"
                );
            }
            other => info!(event = ?other, "Domain event"),
        }
    }

    info!("Event processing loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_delivers_to_receiver() {
        let (tx, mut rx) = mpsc::channel(8);
        let sender = EventSender::new(tx);

        sender
            .send(Event::SaleRecorded {
                snapshot_id: Uuid::new_v4(),
                product_id: Uuid::new_v4(),
                units_sold: 3,
            })
            .await
            .unwrap();

        match rx.recv().await {
            Some(Event::SaleRecorded { units_sold, .. }) => assert_eq!(units_sold, 3),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn send_fails_when_receiver_dropped() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);

        let result = sender
            .send(Event::ShipmentDelivered {
                shipment_id: Uuid::new_v4(),
                invoice_number: "INV-1".into(),
            })
            .await;
        assert!(result.is_err());
    }
}
