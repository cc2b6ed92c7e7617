use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use durian_core::{DomainError, DomainResult, Entity, Kilograms, LotId, PricePerKg, VariationId};

/// A batch of purchased stock with its own cost basis.
///
/// `remaining` starts at the purchased weight and only ever shrinks through
/// the FIFO ledger; a lot with nothing remaining is deleted rather than kept
/// at zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryLot {
    pub id: LotId,
    pub variation_id: VariationId,
    pub remaining: Kilograms,
    pub cost_per_kg: PricePerKg,
    pub received_at: DateTime<Utc>,
}

impl Entity for InventoryLot {
    type Id = LotId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Command: record a purchase of stock for a variation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordPurchase {
    pub variation_id: VariationId,
    pub weight_kg: Decimal,
    pub cost_per_kg: Decimal,
    pub received_at: DateTime<Utc>,
}

impl RecordPurchase {
    /// Validate the purchase and turn it into a new lot.
    pub fn into_lot(self, id: LotId) -> DomainResult<InventoryLot> {
        let remaining = Kilograms::positive(self.weight_kg)?;
        let cost_per_kg = PricePerKg::new(self.cost_per_kg)?;
        Ok(InventoryLot {
            id,
            variation_id: self.variation_id,
            remaining,
            cost_per_kg,
            received_at: self.received_at,
        })
    }
}

/// Remaining stock of one variation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockSummary {
    pub variation_id: VariationId,
    pub lots: usize,
    pub total_weight: Kilograms,
    /// Total cost of what is still on hand.
    pub total_value: Decimal,
    /// `None` when no stock remains.
    pub average_cost_per_kg: Option<PricePerKg>,
}

impl StockSummary {
    /// Fails only if the total value leaves `Decimal` range.
    pub fn from_lots<'a>(
        variation_id: VariationId,
        lots: impl IntoIterator<Item = &'a InventoryLot>,
    ) -> DomainResult<Self> {
        let mut count = 0;
        let mut total_weight = Kilograms::ZERO;
        let mut total_value = Decimal::ZERO;
        for lot in lots.into_iter().filter(|l| l.variation_id == variation_id) {
            count += 1;
            total_weight += lot.remaining;
            total_value = total_value
                .checked_add(lot.cost_per_kg * lot.remaining)
                .ok_or_else(|| DomainError::invariant(format!("stock value of variation {variation_id} overflows")))?;
        }

        let average_cost_per_kg = if total_weight.is_zero() {
            None
        } else {
            PricePerKg::computed(total_value / total_weight.value()).ok()
        };

        Ok(Self {
            variation_id,
            lots: count,
            total_weight,
            total_value,
            average_cost_per_kg,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn purchase(weight: Decimal, cost: Decimal) -> RecordPurchase {
        RecordPurchase {
            variation_id: VariationId::new(),
            weight_kg: weight,
            cost_per_kg: cost,
            received_at: Utc::now(),
        }
    }

    #[test]
    fn purchase_requires_positive_weight() {
        assert!(purchase(dec!(0), dec!(2)).into_lot(LotId::new()).is_err());
        assert!(purchase(dec!(-4), dec!(2)).into_lot(LotId::new()).is_err());
    }

    #[test]
    fn purchase_rejects_negative_cost() {
        assert!(purchase(dec!(4), dec!(-2)).into_lot(LotId::new()).is_err());
    }

    #[test]
    fn purchase_rejects_out_of_range_numbers() {
        let huge = Decimal::from(10_i128.pow(20));
        assert!(purchase(huge, dec!(2)).into_lot(LotId::new()).is_err());
        assert!(purchase(dec!(4), huge).into_lot(LotId::new()).is_err());
    }

    #[test]
    fn summary_of_largest_lots_is_exact() {
        let variation_id = VariationId::new();
        let mut lot = purchase(dec!(99999999999.999), dec!(99999999999999.9999))
            .into_lot(LotId::new())
            .unwrap();
        lot.variation_id = variation_id;

        let summary = StockSummary::from_lots(variation_id, [&lot, &lot]).unwrap();
        assert_eq!(summary.lots, 2);
        assert_eq!(summary.total_weight.value(), dec!(199999999999.998));
        assert_eq!(
            summary.average_cost_per_kg.unwrap().value().round_dp(2),
            dec!(100000000000000)
        );
    }

    #[test]
    fn summary_reports_overflowing_value_instead_of_panicking() {
        let variation_id = VariationId::new();
        let mut lot = purchase(dec!(99999999999.999), dec!(99999999999999.9999))
            .into_lot(LotId::new())
            .unwrap();
        lot.variation_id = variation_id;

        let lots = vec![lot; 10_000];
        let err = StockSummary::from_lots(variation_id, &lots).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn summary_weights_cost_by_remaining_weight() {
        let variation_id = VariationId::new();
        let mut a = purchase(dec!(10), dec!(2)).into_lot(LotId::new()).unwrap();
        let mut b = purchase(dec!(5), dec!(3)).into_lot(LotId::new()).unwrap();
        a.variation_id = variation_id;
        b.variation_id = variation_id;
        let other = purchase(dec!(100), dec!(9)).into_lot(LotId::new()).unwrap();

        let summary = StockSummary::from_lots(variation_id, [&a, &b, &other]).unwrap();
        assert_eq!(summary.lots, 2);
        assert_eq!(summary.total_weight.value(), dec!(15));
        assert_eq!(summary.total_value, dec!(35));
        assert_eq!(
            summary.average_cost_per_kg.unwrap().value().round_dp(4),
            dec!(2.3333)
        );
    }

    #[test]
    fn empty_summary_has_no_average() {
        let summary = StockSummary::from_lots(VariationId::new(), &Vec::<InventoryLot>::new()).unwrap();
        assert_eq!(summary.lots, 0);
        assert!(summary.average_cost_per_kg.is_none());
    }
}
