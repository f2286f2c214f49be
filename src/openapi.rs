use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "FBA Ledger API",
        description = r#"
# FBA Ledger

FIFO inventory ledger and ownership-transfer engine for Amazon FBA sellers.

## Concepts

- **Batches**: stock enters as cost-bearing batches and is consumed oldest-first.
- **Locations**: production, storage, en_route, fba, receiving. Sellable stock
  lives in fba and receiving.
- **Shipments**: move storage stock to en_route under a provenance tag, then
  deliver exactly the tagged units into fba.
- **Sales**: settle against sellable locations in FIFO order and leave a
  per-batch consumption audit. Reversal restores the sold units as a single
  zero-cost fba batch.
- **Warehouse snapshots**: periodic counts reconciled into derived sales
  records; impossible counts surface as anomalies.

## Authentication

All endpoints except `/status` and `/health` require a JWT bearer
token:

```
Authorization: Bearer <token>
```

## Pagination

List endpoints accept `page` and `limit` query parameters.
        "#,
    ),
    servers(
        (url = "http://localhost:8080/api/v1", description = "Local development")
    ),
    tags(
        (name = "inventory", description = "Batch intake, availability, and location transitions"),
        (name = "sales", description = "Sales settlement, audit, and reversal"),
        (name = "shipments", description = "Shipment creation and delivery"),
        (name = "warehouse-snapshots", description = "Snapshot intake and reconciliation")
    ),
    paths(
        // Inventory
        crate::handlers::inventory::list_batches,
        crate::handlers::inventory::receive_stock,
        crate::handlers::inventory::availability,
        crate::handlers::inventory::transition,

        // Sales
        crate::handlers::sales::record_sale,
        crate::handlers::sales::bulk_record_sales,
        crate::handlers::sales::get_sale,
        crate::handlers::sales::list_sales,
        crate::handlers::sales::reverse_sale,

        // Shipments
        crate::handlers::shipments::create_shipment,
        crate::handlers::shipments::deliver_shipment,
        crate::handlers::shipments::get_shipment,
        crate::handlers::shipments::list_shipments,

        // Warehouse snapshots
        crate::handlers::snapshots::create_snapshot,
        crate::handlers::snapshots::update_snapshot,
        crate::handlers::snapshots::delete_snapshot,
        crate::handlers::snapshots::reconcile_snapshot,
        crate::handlers::snapshots::list_snapshots,
        crate::handlers::snapshots::list_sales_records,
    ),
    components(
        schemas(
            // Common types
            crate::ApiResponse<serde_json::Value>,
            crate::PaginatedResponse<serde_json::Value>,
            crate::errors::ErrorResponse,
            crate::entities::inventory_batch::LocationType,
            crate::entities::inventory_batch::Model,
            crate::entities::sales_snapshot::Model,
            crate::entities::sales_consumption::Model,
            crate::entities::sales_record::Model,
            crate::entities::warehouse_snapshot::Model,
            crate::entities::shipment::Model,
            crate::entities::shipment::ShipmentStatus,
            crate::entities::shipment_line::Model,

            // Inventory types
            crate::handlers::inventory::ReceiveStockRequest,
            crate::handlers::inventory::TransitionRequest,
            crate::services::inventory::TransitionResult,
            crate::services::inventory::LocationQuantity,
            crate::services::inventory::AvailabilityReport,

            // Sales types
            crate::handlers::sales::RecordSaleRequest,
            crate::handlers::sales::BulkSalesRequest,
            crate::services::sales::SaleSettlement,
            crate::services::sales::BulkSaleOutcome,
            crate::services::sales::BulkSaleReport,
            crate::services::fifo::ConsumedBatch,

            // Shipment types
            crate::handlers::shipments::ShipmentLineRequest,
            crate::handlers::shipments::CreateShipmentRequest,
            crate::services::shipments::ShipmentWithLines,

            // Reconciliation types
            crate::handlers::snapshots::CreateSnapshotRequest,
            crate::handlers::snapshots::UpdateSnapshotRequest,
            crate::services::reconciliation::ReconcileOutcome,
            crate::services::reconciliation::SnapshotMutation,
        )
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}
