pub mod inventory_batch;
pub mod product;
pub mod sales_consumption;
pub mod sales_record;
pub mod sales_snapshot;
pub mod shipment;
pub mod shipment_line;
pub mod warehouse_snapshot;

