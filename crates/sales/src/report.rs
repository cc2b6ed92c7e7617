use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;

use durian_core::{DomainError, DomainResult, Kilograms};

use crate::sale::Sale;

/// A sale together with the names it references (what receipts, mirror rows
/// and the dashboard display).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaleDetails {
    pub sale: Sale,
    pub species_name: String,
    pub purchase_variation_name: String,
    pub sold_variation_name: String,
}

/// Totals for one (species, purchased-as, sold-as) mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfitLine {
    pub species: String,
    pub purchased_as: String,
    pub sold_as: String,
    pub sales: usize,
    pub weight_kg: Kilograms,
    pub revenue: Decimal,
    pub profit: Decimal,
}

/// Read model: overall profit plus per-mapping totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfitDashboard {
    pub total_profit: Decimal,
    pub total_revenue: Decimal,
    /// Sorted by species, then purchased-as, then sold-as.
    pub lines: Vec<ProfitLine>,
}

fn add_money(total: &mut Decimal, amount: Decimal) -> DomainResult<()> {
    *total = total
        .checked_add(amount)
        .ok_or_else(|| DomainError::invariant("dashboard totals overflow"))?;
    Ok(())
}

impl ProfitDashboard {
    /// Fails only if a total leaves `Decimal` range.
    pub fn from_sales<'a>(sales: impl IntoIterator<Item = &'a SaleDetails>) -> DomainResult<Self> {
        let mut total_profit = Decimal::ZERO;
        let mut total_revenue = Decimal::ZERO;
        let mut by_mapping: BTreeMap<(String, String, String), ProfitLine> = BTreeMap::new();

        for details in sales {
            let revenue = details.sale.revenue();
            let profit = details.sale.profit();
            add_money(&mut total_profit, profit)?;
            add_money(&mut total_revenue, revenue)?;

            let key = (
                details.species_name.clone(),
                details.purchase_variation_name.clone(),
                details.sold_variation_name.clone(),
            );
            let line = by_mapping.entry(key).or_insert_with(|| ProfitLine {
                species: details.species_name.clone(),
                purchased_as: details.purchase_variation_name.clone(),
                sold_as: details.sold_variation_name.clone(),
                sales: 0,
                weight_kg: Kilograms::ZERO,
                revenue: Decimal::ZERO,
                profit: Decimal::ZERO,
            });
            line.sales += 1;
            line.weight_kg += details.sale.weight_kg;
            add_money(&mut line.revenue, revenue)?;
            add_money(&mut line.profit, profit)?;
        }

        Ok(Self {
            total_profit,
            total_revenue,
            lines: by_mapping.into_values().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use durian_core::{PricePerKg, SaleId, SpeciesId, VariationId};
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn details(species: &str, bought: &str, sold: &str, kg: Decimal, price: Decimal, cost: Decimal) -> SaleDetails {
        SaleDetails {
            sale: Sale {
                id: SaleId::new(),
                species_id: SpeciesId::new(),
                purchase_variation_id: VariationId::new(),
                sold_variation_id: VariationId::new(),
                weight_kg: Kilograms::new(kg).unwrap(),
                sale_price_per_kg: PricePerKg::new(price).unwrap(),
                cost_per_kg: PricePerKg::computed(cost).unwrap(),
                recorded_at: Utc::now(),
            },
            species_name: species.to_string(),
            purchase_variation_name: bought.to_string(),
            sold_variation_name: sold.to_string(),
        }
    }

    #[test]
    fn groups_by_species_and_both_variations() {
        let sales = vec![
            details("Musang King", "A", "A", dec!(2), dec!(10), dec!(6)),
            details("Musang King", "A", "B", dec!(1), dec!(7), dec!(6)),
            details("Musang King", "A", "A", dec!(3), dec!(11), dec!(6)),
            details("D24", "A", "A", dec!(5), dec!(4), dec!(3)),
        ];

        let dash = ProfitDashboard::from_sales(&sales).unwrap();
        assert_eq!(dash.lines.len(), 3);
        assert_eq!(dash.total_profit, dec!(8) + dec!(1) + dec!(15) + dec!(5));

        let d24 = &dash.lines[0];
        assert_eq!(d24.species, "D24");

        let mk_a_a = &dash.lines[1];
        assert_eq!((mk_a_a.purchased_as.as_str(), mk_a_a.sold_as.as_str()), ("A", "A"));
        assert_eq!(mk_a_a.sales, 2);
        assert_eq!(mk_a_a.weight_kg.value(), dec!(5));
        assert_eq!(mk_a_a.revenue, dec!(53));
        assert_eq!(mk_a_a.profit, dec!(23));
    }

    #[test]
    fn empty_dashboard_is_zero() {
        let dash = ProfitDashboard::from_sales(&Vec::<SaleDetails>::new()).unwrap();
        assert_eq!(dash.total_profit, Decimal::ZERO);
        assert!(dash.lines.is_empty());
    }

    #[test]
    fn largest_sales_total_without_panicking() {
        let kg = dec!(99999999999.999);
        let price = dec!(99999999999999.9999);
        let big = details("S", "A", "B", kg, price, Decimal::ZERO);

        let dash = ProfitDashboard::from_sales(&vec![big.clone(); 2]).unwrap();
        assert_eq!(dash.total_revenue, big.sale.revenue() + big.sale.revenue());

        let err = ProfitDashboard::from_sales(&vec![big; 10_000]).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    proptest! {
        /// Property: the overall profit equals the sum of the per-mapping profits.
        #[test]
        fn line_profits_sum_to_total(
            rows in prop::collection::vec((0usize..3, 1i64..10_000, 0i64..50_000, 0i64..50_000), 0..20)
        ) {
            let names = ["A", "B", "C"];
            let sales: Vec<SaleDetails> = rows
                .iter()
                .map(|(n, g, p, c)| details(
                    "S",
                    names[*n],
                    names[(*n + 1) % 3],
                    Decimal::new(*g, 3),
                    Decimal::new(*p, 2),
                    Decimal::new(*c, 2),
                ))
                .collect();

            let dash = ProfitDashboard::from_sales(&sales).unwrap();
            let summed: Decimal = dash.lines.iter().map(|l| l.profit).sum();
            prop_assert_eq!(summed, dash.total_profit);
            prop_assert_eq!(dash.lines.iter().map(|l| l.sales).sum::<usize>(), sales.len());
        }
    }
}
