use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use durian_core::{DomainResult, Entity, Kilograms, PricePerKg, SaleId, SpeciesId, VariationId};
use durian_inventory::Consumption;

/// A recorded resale. Immutable once created.
///
/// `purchase_variation_id` is the variation the stock was bought (and costed)
/// as; `sold_variation_id` is how it was graded at sale time. The two may
/// differ.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sale {
    pub id: SaleId,
    pub species_id: SpeciesId,
    pub purchase_variation_id: VariationId,
    pub sold_variation_id: VariationId,
    pub weight_kg: Kilograms,
    pub sale_price_per_kg: PricePerKg,
    /// Weighted-average FIFO cost basis of the sold weight.
    pub cost_per_kg: PricePerKg,
    pub recorded_at: DateTime<Utc>,
}

impl Sale {
    /// Build the sale from validated input and the ledger's consumption.
    pub fn from_consumption(
        id: SaleId,
        species_id: SpeciesId,
        input: &ValidatedSale,
        consumption: &Consumption,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            species_id,
            purchase_variation_id: input.purchase_variation_id,
            sold_variation_id: input.sold_variation_id,
            weight_kg: input.weight_kg,
            sale_price_per_kg: input.sale_price_per_kg,
            cost_per_kg: consumption.average_cost_per_kg,
            recorded_at,
        }
    }

    pub fn revenue(&self) -> Decimal {
        self.sale_price_per_kg * self.weight_kg
    }

    pub fn cost(&self) -> Decimal {
        self.cost_per_kg * self.weight_kg
    }

    pub fn profit(&self) -> Decimal {
        self.revenue() - self.cost()
    }
}

impl Entity for Sale {
    type Id = SaleId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Command: RecordSale (raw input).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSale {
    pub purchase_variation_id: VariationId,
    pub sold_variation_id: VariationId,
    pub weight_kg: Decimal,
    pub sale_price_per_kg: Decimal,
}

/// A [`RecordSale`] whose numbers passed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatedSale {
    pub purchase_variation_id: VariationId,
    pub sold_variation_id: VariationId,
    pub weight_kg: Kilograms,
    pub sale_price_per_kg: PricePerKg,
}

impl RecordSale {
    pub fn validate(&self) -> DomainResult<ValidatedSale> {
        Ok(ValidatedSale {
            purchase_variation_id: self.purchase_variation_id,
            sold_variation_id: self.sold_variation_id,
            weight_kg: Kilograms::positive(self.weight_kg)?,
            sale_price_per_kg: PricePerKg::new(self.sale_price_per_kg)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use durian_core::DomainError;
    use rust_decimal_macros::dec;

    fn sale(weight: Decimal, price: Decimal, cost: Decimal) -> Sale {
        Sale {
            id: SaleId::new(),
            species_id: SpeciesId::new(),
            purchase_variation_id: VariationId::new(),
            sold_variation_id: VariationId::new(),
            weight_kg: Kilograms::new(weight).unwrap(),
            sale_price_per_kg: PricePerKg::new(price).unwrap(),
            cost_per_kg: PricePerKg::computed(cost).unwrap(),
            recorded_at: Utc::now(),
        }
    }

    #[test]
    fn profit_is_revenue_minus_cost() {
        let s = sale(dec!(12), dec!(4), dec!(2.5));
        assert_eq!(s.revenue(), dec!(48));
        assert_eq!(s.cost(), dec!(30));
        assert_eq!(s.profit(), dec!(18));
    }

    #[test]
    fn selling_below_cost_is_a_loss() {
        let s = sale(dec!(2), dec!(1), dec!(3));
        assert_eq!(s.profit(), dec!(-4));
    }

    #[test]
    fn validation_rejects_bad_numbers() {
        let base = RecordSale {
            purchase_variation_id: VariationId::new(),
            sold_variation_id: VariationId::new(),
            weight_kg: dec!(3),
            sale_price_per_kg: dec!(9.5),
        };
        assert!(base.validate().is_ok());

        let zero_weight = RecordSale {
            weight_kg: Decimal::ZERO,
            ..base.clone()
        };
        assert!(matches!(zero_weight.validate(), Err(DomainError::Validation(_))));

        let negative_price = RecordSale {
            sale_price_per_kg: dec!(-1),
            ..base
        };
        assert!(matches!(negative_price.validate(), Err(DomainError::Validation(_))));
    }
}
