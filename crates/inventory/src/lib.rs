//! Inventory domain module.
//!
//! Species/variation catalog, purchased lots and the FIFO cost ledger,
//! implemented purely as deterministic domain logic (no IO, no HTTP, no storage).

pub mod catalog;
pub mod ledger;
pub mod lot;

pub use catalog::{Species, Variation};
pub use ledger::{plan_consumption, Consumption, LedgerError, LotAllocation};
pub use lot::{InventoryLot, RecordPurchase, StockSummary};
