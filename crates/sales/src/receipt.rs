//! Plain-text renderings of a completed sale.

use std::fmt::Write as _;

use chrono::SecondsFormat;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::report::SaleDetails;

const COST_DP: u32 = 4;
const MONEY_DP: u32 = 2;

/// Render the receipt text for a completed sale.
pub fn render_receipt(details: &SaleDetails) -> String {
    let sale = &details.sale;
    let mut out = String::new();
    let mut line = |label: &str, value: &dyn std::fmt::Display| {
        // Writing into a String cannot fail.
        let _ = writeln!(out, "{label}: {value}");
    };

    line("Sale", &sale.id);
    line("Date", &sale.recorded_at.to_rfc3339_opts(SecondsFormat::Secs, true));
    line("Species", &details.species_name);
    line("Purchased as", &details.purchase_variation_name);
    line("Sold as", &details.sold_variation_name);
    line("Weight (kg)", &sale.weight_kg);
    line("Cost per kg", &sale.cost_per_kg.value().round_dp(COST_DP));
    line("Sale price per kg", &sale.sale_price_per_kg);
    line("Total cost", &money(sale.cost()));
    line("Total revenue", &money(sale.revenue()));
    line("Profit", &money(sale.profit()));
    out
}

/// Rounded and padded to whole cents.
fn money(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp(MONEY_DP);
    rounded.rescale(MONEY_DP);
    rounded
}

/// One row of the external sales ledger (spreadsheet mirror).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerRow {
    pub timestamp: String,
    pub species: String,
    pub purchased_as: String,
    pub sold_as: String,
    pub weight_kg: Decimal,
    pub cost_per_kg: Decimal,
    pub sale_price_per_kg: Decimal,
    pub revenue: Decimal,
    pub profit: Decimal,
}

impl LedgerRow {
    pub fn from_details(details: &SaleDetails) -> Self {
        let sale = &details.sale;
        Self {
            timestamp: sale.recorded_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            species: details.species_name.clone(),
            purchased_as: details.purchase_variation_name.clone(),
            sold_as: details.sold_variation_name.clone(),
            weight_kg: sale.weight_kg.value(),
            cost_per_kg: sale.cost_per_kg.value().round_dp(COST_DP),
            sale_price_per_kg: sale.sale_price_per_kg.value(),
            revenue: money(sale.revenue()),
            profit: money(sale.profit()),
        }
    }

    /// Cells in sheet column order.
    pub fn cells(&self) -> Vec<String> {
        vec![
            self.timestamp.clone(),
            self.species.clone(),
            self.purchased_as.clone(),
            self.sold_as.clone(),
            self.weight_kg.to_string(),
            self.cost_per_kg.to_string(),
            self.sale_price_per_kg.to_string(),
            self.revenue.to_string(),
            self.profit.to_string(),
        ]
    }
}
