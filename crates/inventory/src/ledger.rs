//! FIFO inventory-cost consumption.
//!
//! Recording a sale draws its weight from the variation's oldest lots first
//! and attributes the blended cost of what was drawn to the sale. Planning is
//! separated from applying: [`plan_consumption`] only reads lots and returns
//! the per-lot allocations, so a shortfall is detected before anything is
//! touched and the caller applies the plan inside its own unit of work.

use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use durian_core::{Kilograms, LotId, PricePerKg, VariationId};

use crate::lot::InventoryLot;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("insufficient stock for variation {variation_id}: requested {requested} kg, available {available} kg")]
    InsufficientStock {
        variation_id: VariationId,
        requested: Kilograms,
        available: Kilograms,
    },

    #[error("requested weight must be greater than zero")]
    NothingRequested,

    #[error("cost overflow while consuming lots of variation {0}")]
    Overflow(VariationId),
}

/// Weight drawn from a single lot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LotAllocation {
    pub lot_id: LotId,
    pub used: Kilograms,
    pub cost_per_kg: PricePerKg,
    /// Weight left in the lot after this allocation.
    pub remaining: Kilograms,
}

impl LotAllocation {
    /// The lot has nothing left and must be removed.
    pub fn exhausts_lot(&self) -> bool {
        self.remaining.is_zero()
    }
}

/// Outcome of a successful consumption plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Consumption {
    pub variation_id: VariationId,
    pub requested: Kilograms,
    /// Oldest lot first.
    pub allocations: Vec<LotAllocation>,
    pub total_cost: Decimal,
    pub average_cost_per_kg: PricePerKg,
}

#[cfg(test)]
impl Consumption {
    /// Apply the plan to a plain lot list: exhausted lots are removed,
    /// partially used lots get their new remaining weight.
    fn apply(&self, lots: &mut Vec<InventoryLot>) {
        for allocation in &self.allocations {
            if allocation.exhausts_lot() {
                lots.retain(|lot| lot.id != allocation.lot_id);
            } else if let Some(lot) = lots.iter_mut().find(|lot| lot.id == allocation.lot_id) {
                lot.remaining = allocation.remaining;
            }
        }
    }
}

/// Plan the consumption of `weight_needed` from `lots`.
///
/// `lots` must be the variation's lots in FIFO order (oldest first); lots of
/// other variations are ignored.
pub fn plan_consumption(
    variation_id: VariationId,
    lots: &[InventoryLot],
    weight_needed: Kilograms,
) -> Result<Consumption, LedgerError> {
    if weight_needed.is_zero() {
        return Err(LedgerError::NothingRequested);
    }

    let lots: Vec<&InventoryLot> = lots
        .iter()
        .filter(|lot| lot.variation_id == variation_id)
        .collect();

    let available: Kilograms = lots.iter().map(|lot| lot.remaining).sum();
    if available < weight_needed {
        return Err(LedgerError::InsufficientStock {
            variation_id,
            requested: weight_needed,
            available,
        });
    }

    let mut still_needed = weight_needed;
    let mut total_cost = Decimal::ZERO;
    let mut allocations = Vec::new();

    for lot in lots {
        if still_needed.is_zero() {
            break;
        }
        let used = lot.remaining.min(still_needed);
        if used.is_zero() {
            continue;
        }

        let cost = lot
            .cost_per_kg
            .value()
            .checked_mul(used.value())
            .ok_or(LedgerError::Overflow(variation_id))?;
        total_cost = total_cost
            .checked_add(cost)
            .ok_or(LedgerError::Overflow(variation_id))?;

        // `used <= lot.remaining` and `used <= still_needed` hold by construction.
        let remaining = lot.remaining.checked_sub(used).unwrap_or(Kilograms::ZERO);
        still_needed = still_needed.checked_sub(used).unwrap_or(Kilograms::ZERO);

        allocations.push(LotAllocation {
            lot_id: lot.id,
            used,
            cost_per_kg: lot.cost_per_kg,
            remaining,
        });
    }

    let average = total_cost
        .checked_div(weight_needed.value())
        .ok_or(LedgerError::Overflow(variation_id))?;
    let average_cost_per_kg =
        PricePerKg::computed(average).map_err(|_| LedgerError::Overflow(variation_id))?;

    Ok(Consumption {
        variation_id,
        requested: weight_needed,
        allocations,
        total_cost,
        average_cost_per_kg,
    })
}
