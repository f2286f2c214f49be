// Ledger engines, leaves first: the FIFO consumption primitive, then the
// transition/settlement orchestrators built on top of it.
pub mod fifo;
pub mod inventory;
pub mod sales;

// Shipping and reconciliation workflows
pub mod reconciliation;
pub mod shipments;

// Tenant scoping
pub mod products;
