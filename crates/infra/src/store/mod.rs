//! Ledger storage boundary.
//!
//! `LedgerStore` covers plain reads and single-row inserts. Anything that must
//! commit atomically (consuming lots + inserting the sale) goes through a
//! `LedgerTx` unit of work obtained from [`LedgerStore::begin`]; dropping a
//! unit of work without calling [`LedgerTx::commit`] discards its writes.

use async_trait::async_trait;
use thiserror::Error;

use durian_core::{Kilograms, LotId, SpeciesId, VariationId};
use durian_inventory::{InventoryLot, Species, Variation};
use durian_sales::Sale;

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryLedgerStore;
pub use postgres::PostgresLedgerStore;

/// Storage operation error.
///
/// Infrastructure failures, as opposed to domain errors (validation,
/// invariants) which never reach the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A referenced row does not exist (unknown species/variation, missing lot).
    #[error("not found: {0}")]
    NotFound(String),

    /// A uniqueness constraint was hit (e.g. species name already taken).
    #[error("duplicate: {0}")]
    Duplicate(String),

    /// A concurrent transaction won; the operation may be retried.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(String),
}

impl StoreError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }
}

/// Reads and single-row writes against the ledger tables.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Fails with `Duplicate` if the name is taken.
    async fn insert_species(&self, species: &Species) -> Result<(), StoreError>;

    async fn get_species(&self, id: SpeciesId) -> Result<Option<Species>, StoreError>;

    /// Ordered by name.
    async fn list_species(&self) -> Result<Vec<Species>, StoreError>;

    /// Fails with `NotFound` if the species does not exist.
    async fn insert_variation(&self, variation: &Variation) -> Result<(), StoreError>;

    async fn get_variation(&self, id: VariationId) -> Result<Option<Variation>, StoreError>;

    /// Ordered by species, then name.
    async fn list_variations(&self) -> Result<Vec<Variation>, StoreError>;

    /// Append a purchased lot at the back of its variation's FIFO queue.
    /// Fails with `NotFound` if the variation does not exist.
    async fn insert_lot(&self, lot: &InventoryLot) -> Result<(), StoreError>;

    /// Lots in FIFO order (oldest first), optionally limited to one variation.
    async fn list_lots(&self, variation_id: Option<VariationId>) -> Result<Vec<InventoryLot>, StoreError>;

    /// Newest first.
    async fn list_sales(&self) -> Result<Vec<Sale>, StoreError>;

    /// Open a unit of work.
    async fn begin(&self) -> Result<Box<dyn LedgerTx>, StoreError>;
}

/// A unit of work over the ledger tables.
///
/// Implementations serialize units of work touching the same variation:
/// once [`LedgerTx::lock_lots`] returns, no other unit of work can consume
/// those lots until this one commits or is dropped.
#[async_trait]
pub trait LedgerTx: Send {
    async fn species(&mut self, id: SpeciesId) -> Result<Option<Species>, StoreError>;

    async fn variation(&mut self, id: VariationId) -> Result<Option<Variation>, StoreError>;

    /// Lock the variation and return its lots oldest first.
    async fn lock_lots(&mut self, variation_id: VariationId) -> Result<Vec<InventoryLot>, StoreError>;

    async fn set_lot_remaining(&mut self, lot_id: LotId, remaining: Kilograms) -> Result<(), StoreError>;

    async fn delete_lot(&mut self, lot_id: LotId) -> Result<(), StoreError>;

    async fn insert_sale(&mut self, sale: &Sale) -> Result<(), StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}
