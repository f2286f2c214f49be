//! End-to-end ledger lifecycle: stock is received into storage, shipped to
//! Amazon under an invoice, delivered into fba, sold, and finally the sale is
//! reversed. Unit conservation is checked at every step.

mod common;

use chrono::NaiveDate;
use fba_ledger::entities::inventory_batch::LocationType;
use fba_ledger::errors::ServiceError;
use fba_ledger::services::inventory::ReceiveStockCommand;
use fba_ledger::services::sales::RecordSaleCommand;
use fba_ledger::services::shipments::{CreateShipmentCommand, ShipmentLineInput};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

#[tokio::test]
async fn full_lifecycle_conserves_units_and_cost() {
    let db = common::test_db().await;
    let services = common::test_services(db.clone()).await;
    let team = Uuid::new_v4();
    let product = common::seed_product(&db, team, "WIDGET-1").await;

    // Receive 50 units into storage at $2.00 each.
    let batch = services
        .inventory
        .receive_stock(
            team,
            ReceiveStockCommand {
                product_id: product,
                location_type: LocationType::Storage,
                quantity: 50,
                unit_cost: dec!(2.00),
                unit_shipping_cost: dec!(0.25),
                source_purchase_order_id: None,
                notes: Some("PO-1001".into()),
            },
        )
        .await
        .unwrap();
    assert_eq!(batch.quantity, 50);
    assert_eq!(batch.unit_cost, dec!(2.00));

    // Ship 30 of them to Amazon.
    let created = services
        .shipments
        .create_shipment(
            team,
            CreateShipmentCommand {
                invoice_number: "INV-100".into(),
                shipping_date: date("2026-03-01"),
                lines: vec![ShipmentLineInput {
                    product_id: product,
                    quantity: 30,
                }],
            },
        )
        .await
        .unwrap();
    assert_eq!(created.lines.len(), 1);
    assert_eq!(created.lines[0].shipped_quantity, 30);

    let report = services.inventory.availability(team, product).await.unwrap();
    assert_eq!(quantity_at(&report, LocationType::Storage), 20);
    assert_eq!(quantity_at(&report, LocationType::EnRoute), 30);
    assert_eq!(report.sellable, 0);
    assert_eq!(report.total, 50);

    // Delivery moves exactly the tagged units into fba.
    let delivered = services
        .shipments
        .deliver_shipment(team, created.shipment.id)
        .await
        .unwrap();
    assert!(delivered.shipment.delivered_at.is_some());

    let report = services.inventory.availability(team, product).await.unwrap();
    assert_eq!(quantity_at(&report, LocationType::EnRoute), 0);
    assert_eq!(quantity_at(&report, LocationType::Fba), 30);
    assert_eq!(report.sellable, 30);
    assert_eq!(report.total, 50);

    // Sell 10 units for the first week of March.
    let settlement = services
        .sales
        .record_sale(
            team,
            RecordSaleCommand {
                product_id: product,
                period_start: date("2026-03-02"),
                period_end: date("2026-03-08"),
                units_sold: 10,
                revenue: Some(dec!(199.90)),
            },
        )
        .await
        .unwrap();
    assert_eq!(settlement.snapshot.units_sold, 10);
    let consumed_total: i32 = settlement.consumed.iter().map(|c| c.quantity).sum();
    assert_eq!(consumed_total, 10);
    // Cost basis flows through from the original storage batch.
    assert!(settlement
        .consumed
        .iter()
        .all(|c| c.unit_cost == dec!(2.00)));

    let report = services.inventory.availability(team, product).await.unwrap();
    assert_eq!(report.sellable, 20);
    assert_eq!(report.total, 40);

    // Reversal restores the sold units as one zero-cost fba batch.
    let restored = services
        .sales
        .reverse_sale(team, settlement.snapshot.id)
        .await
        .unwrap();
    assert_eq!(restored.location_type, LocationType::Fba);
    assert_eq!(restored.quantity, 10);
    assert_eq!(restored.unit_cost, Decimal::ZERO);

    let report = services.inventory.availability(team, product).await.unwrap();
    assert_eq!(report.sellable, 30);
    assert_eq!(report.total, 50);

    // The audit trail is gone with the snapshot.
    let err = services
        .sales
        .get_sale(team, settlement.snapshot.id)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn delivery_ignores_unrelated_en_route_stock() {
    let db = common::test_db().await;
    let services = common::test_services(db.clone()).await;
    let team = Uuid::new_v4();
    let product = common::seed_product(&db, team, "WIDGET-2").await;

    services
        .inventory
        .receive_stock(
            team,
            ReceiveStockCommand {
                product_id: product,
                location_type: LocationType::Storage,
                quantity: 40,
                unit_cost: dec!(1.50),
                unit_shipping_cost: Decimal::ZERO,
                source_purchase_order_id: None,
                notes: None,
            },
        )
        .await
        .unwrap();

    let first = services
        .shipments
        .create_shipment(
            team,
            CreateShipmentCommand {
                invoice_number: "INV-200".into(),
                shipping_date: date("2026-04-01"),
                lines: vec![ShipmentLineInput {
                    product_id: product,
                    quantity: 15,
                }],
            },
        )
        .await
        .unwrap();
    let second = services
        .shipments
        .create_shipment(
            team,
            CreateShipmentCommand {
                invoice_number: "INV-201".into(),
                shipping_date: date("2026-04-02"),
                lines: vec![ShipmentLineInput {
                    product_id: product,
                    quantity: 25,
                }],
            },
        )
        .await
        .unwrap();

    // Delivering the second shipment must leave the first one's 15 units
    // sitting in en_route.
    services
        .shipments
        .deliver_shipment(team, second.shipment.id)
        .await
        .unwrap();

    let report = services.inventory.availability(team, product).await.unwrap();
    assert_eq!(quantity_at(&report, LocationType::EnRoute), 15);
    assert_eq!(quantity_at(&report, LocationType::Fba), 25);

    services
        .shipments
        .deliver_shipment(team, first.shipment.id)
        .await
        .unwrap();
    let report = services.inventory.availability(team, product).await.unwrap();
    assert_eq!(quantity_at(&report, LocationType::EnRoute), 0);
    assert_eq!(quantity_at(&report, LocationType::Fba), 40);
}

#[tokio::test]
async fn oversold_sale_reports_sellable_breakdown() {
    let db = common::test_db().await;
    let services = common::test_services(db.clone()).await;
    let team = Uuid::new_v4();
    let product = common::seed_product(&db, team, "WIDGET-3").await;

    services
        .inventory
        .receive_stock(
            team,
            ReceiveStockCommand {
                product_id: product,
                location_type: LocationType::Fba,
                quantity: 4,
                unit_cost: dec!(3.00),
                unit_shipping_cost: Decimal::ZERO,
                source_purchase_order_id: None,
                notes: None,
            },
        )
        .await
        .unwrap();

    let err = services
        .sales
        .record_sale(
            team,
            RecordSaleCommand {
                product_id: product,
                period_start: date("2026-05-01"),
                period_end: date("2026-05-07"),
                units_sold: 9,
                revenue: None,
            },
        )
        .await
        .unwrap_err();

    match err {
        ServiceError::InsufficientInventory {
            needed,
            available,
            breakdown,
        } => {
            assert_eq!(needed, 9);
            assert_eq!(available, 4);
            assert_eq!(breakdown.len(), 2);
        }
        other => panic!("expected InsufficientInventory, got {other:?}"),
    }

    // The failed sale must not have consumed anything.
    let report = services.inventory.availability(team, product).await.unwrap();
    assert_eq!(report.sellable, 4);
}

#[tokio::test]
async fn cross_team_access_is_not_found() {
    let db = common::test_db().await;
    let services = common::test_services(db.clone()).await;
    let owner = Uuid::new_v4();
    let intruder = Uuid::new_v4();
    let product = common::seed_product(&db, owner, "WIDGET-4").await;

    let err = services
        .inventory
        .receive_stock(
            intruder,
            ReceiveStockCommand {
                product_id: product,
                location_type: LocationType::Storage,
                quantity: 5,
                unit_cost: dec!(1.00),
                unit_shipping_cost: Decimal::ZERO,
                source_purchase_order_id: None,
                notes: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));

    let err = services
        .inventory
        .availability(intruder, product)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

fn quantity_at(
    report: &fba_ledger::services::inventory::AvailabilityReport,
    location: LocationType,
) -> i32 {
    report
        .locations
        .iter()
        .find(|l| l.location_type == location)
        .map(|l| l.quantity)
        .unwrap_or(0)
}
