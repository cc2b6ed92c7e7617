//! Infrastructure layer: storage, config, external side channels and the
//! sale recording pipeline that ties them together.

pub mod config;
pub mod external;
pub mod ledger;
pub mod reports;
pub mod sale_recorder;
pub mod store;

pub use config::LedgerConfig;
pub use ledger::{consume_inventory_cost, ConsumeError};
pub use sale_recorder::{RecordedSale, SaleError, SaleRecorder};
pub use store::{InMemoryLedgerStore, LedgerStore, LedgerTx, PostgresLedgerStore, StoreError};
