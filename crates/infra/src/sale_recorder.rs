//! Records a sale end to end.
//!
//! ```text
//! RecordSale
//!   -> validate (weight > 0, price >= 0)
//!   -> unit of work: resolve names, lock + consume lots FIFO, insert sale
//!   -> commit (retried on serialization conflicts)
//!   -> receipt file, spreadsheet mirror (best effort, after commit)
//! ```
//!
//! The lot updates and the sale row commit together or not at all. Nothing
//! after the commit can fail the sale.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use durian_core::{DomainError, SaleId};
use durian_inventory::{Consumption, LedgerError};
use durian_sales::{RecordSale, Sale, SaleDetails, ValidatedSale};

use crate::external::{ReceiptWriter, SaleMirror};
use crate::ledger::{consume_inventory_cost, ConsumeError};
use crate::store::{LedgerStore, StoreError};

#[derive(Debug, Error)]
pub enum SaleError {
    #[error(transparent)]
    Validation(DomainError),

    #[error("not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Ledger(LedgerError),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for SaleError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound(what) => SaleError::NotFound(what),
            other => SaleError::Store(other),
        }
    }
}

impl From<ConsumeError> for SaleError {
    fn from(value: ConsumeError) -> Self {
        match value {
            ConsumeError::Ledger(e) => SaleError::Ledger(e),
            ConsumeError::Store(e) => e.into(),
        }
    }
}

impl SaleError {
    fn is_retryable(&self) -> bool {
        matches!(self, SaleError::Store(e) if e.is_retryable())
    }
}

/// A committed sale plus what happened around it.
#[derive(Debug, Clone)]
pub struct RecordedSale {
    pub details: SaleDetails,
    pub consumption: Consumption,
    /// `None` if the receipt could not be written.
    pub receipt: Option<PathBuf>,
}

pub struct SaleRecorder {
    store: Arc<dyn LedgerStore>,
    receipts: Arc<dyn ReceiptWriter>,
    mirror: Arc<dyn SaleMirror>,
    conflict_retries: u32,
}

impl SaleRecorder {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        receipts: Arc<dyn ReceiptWriter>,
        mirror: Arc<dyn SaleMirror>,
        conflict_retries: u32,
    ) -> Self {
        Self {
            store,
            receipts,
            mirror,
            conflict_retries,
        }
    }

    #[instrument(
        skip_all,
        fields(
            purchase_variation_id = %command.purchase_variation_id,
            sold_variation_id = %command.sold_variation_id,
            weight_kg = %command.weight_kg,
        ),
        err
    )]
    pub async fn record_sale(&self, command: RecordSale) -> Result<RecordedSale, SaleError> {
        let input = command.validate().map_err(SaleError::Validation)?;

        let mut attempt = 0;
        let (details, consumption) = loop {
            match self.commit_sale(&input).await {
                Err(e) if e.is_retryable() && attempt < self.conflict_retries => {
                    attempt += 1;
                    warn!(attempt, error = %e, "sale conflicted with a concurrent write, retrying");
                }
                result => break result?,
            }
        };

        info!(
            sale_id = %details.sale.id,
            cost_per_kg = %details.sale.cost_per_kg,
            profit = %details.sale.profit(),
            "sale recorded"
        );

        let receipt = match self.receipts.write(&details).await {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(sale_id = %details.sale.id, error = %e, "failed to write receipt");
                None
            }
        };

        if self.mirror.is_enabled() {
            let mirror = Arc::clone(&self.mirror);
            let mirrored = details.clone();
            tokio::spawn(async move {
                if let Err(e) = mirror.append(&mirrored).await {
                    warn!(sale_id = %mirrored.sale.id, error = %e, "spreadsheet mirror failed");
                }
            });
        }

        Ok(RecordedSale {
            details,
            consumption,
            receipt,
        })
    }

    /// One attempt: everything between `begin` and `commit`.
    async fn commit_sale(&self, input: &ValidatedSale) -> Result<(SaleDetails, Consumption), SaleError> {
        let mut tx = self.store.begin().await?;

        let purchased_as = tx
            .variation(input.purchase_variation_id)
            .await?
            .ok_or_else(|| SaleError::NotFound(format!("variation {}", input.purchase_variation_id)))?;
        let sold_as = tx
            .variation(input.sold_variation_id)
            .await?
            .ok_or_else(|| SaleError::NotFound(format!("variation {}", input.sold_variation_id)))?;
        if sold_as.species_id != purchased_as.species_id {
            debug!(
                purchased_species = %purchased_as.species_id,
                sold_species = %sold_as.species_id,
                "sold-as variation belongs to a different species"
            );
        }
        let species = tx
            .species(purchased_as.species_id)
            .await?
            .ok_or_else(|| SaleError::NotFound(format!("species {}", purchased_as.species_id)))?;

        let consumption =
            consume_inventory_cost(tx.as_mut(), input.purchase_variation_id, input.weight_kg).await?;
        let sale = Sale::from_consumption(
            SaleId::new(),
            purchased_as.species_id,
            input,
            &consumption,
            Utc::now(),
        );
        tx.insert_sale(&sale).await?;
        tx.commit().await?;

        let details = SaleDetails {
            sale,
            species_name: species.name,
            purchase_variation_name: purchased_as.name,
            sold_variation_name: sold_as.name,
        };
        Ok((details, consumption))
    }
}
