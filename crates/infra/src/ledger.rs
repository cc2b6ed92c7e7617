//! Applies a FIFO consumption plan inside a unit of work.

use tracing::{debug, instrument};

use durian_core::{Kilograms, VariationId};
use durian_inventory::{plan_consumption, Consumption, LedgerError};

use crate::store::{LedgerTx, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum ConsumeError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Lock the variation's lots, plan the FIFO draw and write it back.
///
/// Nothing is written when the plan fails (e.g. insufficient stock). Writes
/// only become visible once the caller commits `tx`.
#[instrument(skip_all, fields(variation_id = %variation_id, weight_kg = %weight), err)]
pub async fn consume_inventory_cost(
    tx: &mut dyn LedgerTx,
    variation_id: VariationId,
    weight: Kilograms,
) -> Result<Consumption, ConsumeError> {
    let lots = tx.lock_lots(variation_id).await?;
    let consumption = plan_consumption(variation_id, &lots, weight)?;

    for allocation in &consumption.allocations {
        if allocation.exhausts_lot() {
            tx.delete_lot(allocation.lot_id).await?;
        } else {
            tx.set_lot_remaining(allocation.lot_id, allocation.remaining)
                .await?;
        }
    }

    debug!(
        lots_touched = consumption.allocations.len(),
        total_cost = %consumption.total_cost,
        average_cost_per_kg = %consumption.average_cost_per_kg,
        "consumed inventory"
    );
    Ok(consumption)
}
