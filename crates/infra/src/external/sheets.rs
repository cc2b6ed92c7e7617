//! Spreadsheet mirror of recorded sales.
//!
//! Appends one row per sale through the Sheets `values:append` endpoint.
//! Columns follow [`LedgerRow::cells`].

use async_trait::async_trait;
use serde_json::json;
use tracing::instrument;

use durian_sales::{LedgerRow, SaleDetails};

use super::ExternalError;

pub const SHEETS_API_BASE: &str = "https://sheets.googleapis.com";

#[async_trait]
pub trait SaleMirror: Send + Sync {
    async fn append(&self, details: &SaleDetails) -> Result<(), ExternalError>;

    fn is_enabled(&self) -> bool {
        true
    }
}

/// Used when no spreadsheet is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledMirror;

#[async_trait]
impl SaleMirror for DisabledMirror {
    async fn append(&self, _details: &SaleDetails) -> Result<(), ExternalError> {
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone)]
pub struct GoogleSheetsMirror {
    client: reqwest::Client,
    base_url: String,
    spreadsheet_id: String,
    range: String,
    access_token: String,
}

impl GoogleSheetsMirror {
    pub fn new(
        spreadsheet_id: impl Into<String>,
        range: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Self {
        Self::with_base_url(SHEETS_API_BASE, spreadsheet_id, range, access_token)
    }

    pub fn with_base_url(
        base_url: impl Into<String>,
        spreadsheet_id: impl Into<String>,
        range: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            spreadsheet_id: spreadsheet_id.into(),
            range: range.into(),
            access_token: access_token.into(),
        }
    }

    fn append_url(&self) -> String {
        format!(
            "{}/v4/spreadsheets/{}/values/{}:append?valueInputOption=USER_ENTERED",
            self.base_url, self.spreadsheet_id, self.range
        )
    }
}

#[async_trait]
impl SaleMirror for GoogleSheetsMirror {
    #[instrument(skip_all, fields(sale_id = %details.sale.id), err)]
    async fn append(&self, details: &SaleDetails) -> Result<(), ExternalError> {
        let row = LedgerRow::from_details(details);
        let response = self
            .client
            .post(self.append_url())
            .bearer_auth(&self.access_token)
            .json(&json!({ "values": [row.cells()] }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExternalError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use durian_core::{Kilograms, PricePerKg, SaleId, SpeciesId, VariationId};
    use durian_sales::Sale;
    use rust_decimal_macros::dec;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn details() -> SaleDetails {
        SaleDetails {
            sale: Sale {
                id: SaleId::new(),
                species_id: SpeciesId::new(),
                purchase_variation_id: VariationId::new(),
                sold_variation_id: VariationId::new(),
                weight_kg: Kilograms::new(dec!(1.5)).unwrap(),
                sale_price_per_kg: PricePerKg::new(dec!(10)).unwrap(),
                cost_per_kg: PricePerKg::new(dec!(6)).unwrap(),
                recorded_at: Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap(),
            },
            species_name: "Musang King".to_string(),
            purchase_variation_name: "A".to_string(),
            sold_variation_name: "B".to_string(),
        }
    }

    #[tokio::test]
    async fn appends_row_with_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v4/spreadsheets/sheet-123/values/Sales:append"))
            .and(query_param("valueInputOption", "USER_ENTERED"))
            .and(header("authorization", "Bearer token-abc"))
            .and(body_partial_json(json!({
                "values": [["2026-03-02T08:00:00Z", "Musang King", "A", "B", "1.5", "6", "10", "15.00", "6.00"]]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "updates": {} })))
            .expect(1)
            .mount(&server)
            .await;

        let mirror = GoogleSheetsMirror::with_base_url(server.uri(), "sheet-123", "Sales", "token-abc");
        mirror.append(&details()).await.unwrap();
    }

    #[tokio::test]
    async fn non_success_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .mount(&server)
            .await;

        let mirror = GoogleSheetsMirror::with_base_url(server.uri(), "sheet-123", "Sales", "bad");
        let err = mirror.append(&details()).await.unwrap_err();
        assert!(matches!(err, ExternalError::Rejected { status: 403, .. }));
    }

    #[tokio::test]
    async fn disabled_mirror_is_a_no_op() {
        assert!(!DisabledMirror.is_enabled());
        DisabledMirror.append(&details()).await.unwrap();
    }
}
