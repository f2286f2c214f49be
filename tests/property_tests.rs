//! Property-based tests for the pure pieces of the ledger: cost-basis math
//! and location-name parsing.

use chrono::Utc;
use fba_ledger::entities::inventory_batch::LocationType;
use fba_ledger::entities::shipment::provenance_tag;
use fba_ledger::services::fifo::{ConsumedBatch, CostBasis};
use proptest::prelude::*;
use rust_decimal::Decimal;

fn consumed_batch_strategy() -> impl Strategy<Value = ConsumedBatch> {
    (1i32..1_000, 0i64..100_000, 0i64..10_000).prop_map(|(quantity, cost_cents, ship_cents)| {
        ConsumedBatch {
            batch_id: 0,
            location_type: LocationType::Fba,
            quantity,
            unit_cost: Decimal::new(cost_cents, 2),
            unit_shipping_cost: Decimal::new(ship_cents, 2),
            created_at: Utc::now(),
        }
    })
}

proptest! {
    #[test]
    fn weighted_average_stays_within_batch_bounds(
        consumed in prop::collection::vec(consumed_batch_strategy(), 1..8)
    ) {
        let avg = CostBasis::WeightedAverage.unit_cost(&consumed);
        let min = consumed.iter().map(|c| c.unit_cost).min().unwrap();
        let max = consumed.iter().map(|c| c.unit_cost).max().unwrap();
        prop_assert!(avg >= min && avg <= max,
            "average {avg} outside [{min}, {max}]");
    }

    #[test]
    fn first_batch_cost_is_the_oldest_batch_cost(
        consumed in prop::collection::vec(consumed_batch_strategy(), 1..8)
    ) {
        let cost = CostBasis::FirstBatch.unit_cost(&consumed);
        prop_assert_eq!(cost, consumed[0].unit_cost);
    }

    #[test]
    fn uniform_cost_is_preserved_by_both_strategies(
        qtys in prop::collection::vec(1i32..1_000, 1..8),
        cost_cents in 1i64..100_000
    ) {
        let cost = Decimal::new(cost_cents, 2);
        let consumed: Vec<ConsumedBatch> = qtys
            .into_iter()
            .map(|quantity| ConsumedBatch {
                batch_id: 0,
                location_type: LocationType::Receiving,
                quantity,
                unit_cost: cost,
                unit_shipping_cost: Decimal::ZERO,
                created_at: Utc::now(),
            })
            .collect();
        prop_assert_eq!(CostBasis::FirstBatch.unit_cost(&consumed), cost);
        prop_assert_eq!(CostBasis::WeightedAverage.unit_cost(&consumed), cost);
    }

    #[test]
    fn canonical_location_names_round_trip(raw in "production|storage|en_route|fba|receiving") {
        let parsed = LocationType::parse_api(&raw).expect("canonical name must parse");
        prop_assert_eq!(parsed.as_str(), raw);
    }

    #[test]
    fn provenance_tag_embeds_the_invoice(invoice in "[A-Z]{2,4}-[0-9]{1,8}") {
        let tag = provenance_tag(&invoice);
        prop_assert!(tag.contains(&invoice));
        // Tags for different invoices must not collide by prefix alone.
        prop_assert!(tag.ends_with(&invoice));
    }
}
