use std::str::FromStr;

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use durian_core::{DomainError, Kilograms, PricePerKg, SaleId, VariationId};
use durian_infra::RecordedSale;
use durian_sales::SaleDetails;

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateSpeciesRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateVariationRequest {
    pub species_id: String,
    pub name: String,
}

/// Decimals accept JSON numbers or strings.
#[derive(Debug, Deserialize)]
pub struct RecordPurchaseRequest {
    pub variation_id: String,
    pub weight_kg: Decimal,
    pub cost_per_kg: Decimal,
    pub received_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct RecordSaleRequest {
    pub purchase_variation_id: String,
    pub sold_variation_id: String,
    pub weight_kg: Decimal,
    pub sale_price_per_kg: Decimal,
}

#[derive(Debug, Default, Deserialize)]
pub struct LotsQuery {
    pub variation_id: Option<String>,
}

// -------------------------
// Response DTOs
// -------------------------

/// A sale as the API shows it: names resolved, money derived.
#[derive(Debug, Serialize)]
pub struct SaleView {
    pub id: SaleId,
    pub recorded_at: DateTime<Utc>,
    pub species: String,
    pub purchased_as: String,
    pub sold_as: String,
    pub purchase_variation_id: VariationId,
    pub sold_variation_id: VariationId,
    pub weight_kg: Kilograms,
    pub cost_per_kg: PricePerKg,
    pub sale_price_per_kg: PricePerKg,
    pub cost: Decimal,
    pub revenue: Decimal,
    pub profit: Decimal,
}

impl From<&SaleDetails> for SaleView {
    fn from(details: &SaleDetails) -> Self {
        let sale = &details.sale;
        Self {
            id: sale.id,
            recorded_at: sale.recorded_at,
            species: details.species_name.clone(),
            purchased_as: details.purchase_variation_name.clone(),
            sold_as: details.sold_variation_name.clone(),
            purchase_variation_id: sale.purchase_variation_id,
            sold_variation_id: sale.sold_variation_id,
            weight_kg: sale.weight_kg,
            cost_per_kg: sale.cost_per_kg,
            sale_price_per_kg: sale.sale_price_per_kg,
            cost: sale.cost(),
            revenue: sale.revenue(),
            profit: sale.profit(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RecordedSaleResponse {
    #[serde(flatten)]
    pub sale: SaleView,
    /// Lots drawn, oldest first.
    pub lots_consumed: usize,
    pub receipt: Option<String>,
}

impl From<&RecordedSale> for RecordedSaleResponse {
    fn from(recorded: &RecordedSale) -> Self {
        Self {
            sale: SaleView::from(&recorded.details),
            lots_consumed: recorded.consumption.allocations.len(),
            receipt: recorded
                .receipt
                .as_ref()
                .map(|p| p.display().to_string()),
        }
    }
}

// -------------------------
// Mapping helpers
// -------------------------

/// Parse a typed id from a request field, answering 400 on failure.
pub fn parse_id<T>(raw: &str, field: &str) -> Result<T, axum::response::Response>
where
    T: FromStr<Err = DomainError>,
{
    raw.parse().map_err(|_| {
        errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", format!("invalid {field}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use durian_core::SpeciesId;

    #[test]
    fn parse_id_rejects_garbage_with_400() {
        let err = parse_id::<SpeciesId>("not-a-uuid", "species_id").unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let id = SpeciesId::new();
        assert_eq!(parse_id::<SpeciesId>(&id.to_string(), "species_id").unwrap(), id);
    }

    #[test]
    fn sale_request_accepts_numbers_and_strings() {
        let body = r#"{
            "purchase_variation_id": "x",
            "sold_variation_id": "y",
            "weight_kg": 1.25,
            "sale_price_per_kg": "4.50"
        }"#;
        let req: RecordSaleRequest = serde_json::from_str(body).unwrap();
        assert_eq!(req.weight_kg, Decimal::new(125, 2));
        assert_eq!(req.sale_price_per_kg, Decimal::new(450, 2));
    }
}
