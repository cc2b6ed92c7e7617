//! Sales domain module.
//!
//! Resale records with their cost basis, profit reporting and the plain-text
//! renderings (receipts, mirror rows) of a completed sale. Pure domain logic.

pub mod receipt;
pub mod report;
pub mod sale;

pub use receipt::{render_receipt, LedgerRow};
pub use report::{ProfitDashboard, ProfitLine, SaleDetails};
pub use sale::{RecordSale, Sale, ValidatedSale};
