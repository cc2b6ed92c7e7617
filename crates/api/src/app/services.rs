use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use thiserror::Error;
use tracing::{info, instrument};

use durian_core::{DomainError, LotId, SpeciesId, VariationId};
use durian_infra::{
    config::LedgerConfig,
    external::{DisabledMirror, FileReceiptWriter, GoogleSheetsMirror, ReceiptWriter, SaleMirror},
    reports,
    store::{InMemoryLedgerStore, LedgerStore, PostgresLedgerStore, StoreError},
    RecordedSale, SaleError, SaleRecorder,
};
use durian_inventory::{InventoryLot, RecordPurchase, Species, StockSummary, Variation};
use durian_sales::{ProfitDashboard, RecordSale, SaleDetails};

/// Errors from the catalog, purchase and read-side operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Everything the handlers need, shared behind an `Arc`.
#[derive(Clone)]
pub struct AppServices {
    store: Arc<dyn LedgerStore>,
    sales: Arc<SaleRecorder>,
}

impl AppServices {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        receipts: Arc<dyn ReceiptWriter>,
        mirror: Arc<dyn SaleMirror>,
        sale_conflict_retries: u32,
    ) -> Self {
        let sales = Arc::new(SaleRecorder::new(
            Arc::clone(&store),
            receipts,
            mirror,
            sale_conflict_retries,
        ));
        Self { store, sales }
    }

    /// In-memory wiring (dev/test): no database, no spreadsheet mirror.
    pub fn in_memory(receipts_dir: impl Into<PathBuf>) -> Self {
        Self::new(
            Arc::new(InMemoryLedgerStore::new()),
            Arc::new(FileReceiptWriter::new(receipts_dir)),
            Arc::new(DisabledMirror),
            durian_infra::config::DEFAULT_SALE_CONFLICT_RETRIES,
        )
    }

    pub async fn from_config(config: &LedgerConfig) -> anyhow::Result<Self> {
        let store: Arc<dyn LedgerStore> = match &config.database {
            Some(db) => {
                let store = PostgresLedgerStore::connect(&db.url, db.max_connections)
                    .await
                    .context("failed to connect to the ledger database")?;
                info!("using postgres ledger store");
                Arc::new(store)
            }
            None => {
                info!("using in-memory ledger store");
                Arc::new(InMemoryLedgerStore::new())
            }
        };

        let mirror: Arc<dyn SaleMirror> = match &config.sheets {
            Some(sheets) => Arc::new(GoogleSheetsMirror::new(
                sheets.spreadsheet_id.clone(),
                sheets.range.clone(),
                sheets.access_token.clone(),
            )),
            None => Arc::new(DisabledMirror),
        };

        Ok(Self::new(
            store,
            Arc::new(FileReceiptWriter::new(config.receipts_dir.clone())),
            mirror,
            config.sale_conflict_retries,
        ))
    }

    #[instrument(skip(self), err)]
    pub async fn create_species(&self, name: &str) -> Result<Species, ServiceError> {
        let species = Species::register(SpeciesId::new(), name)?;
        self.store.insert_species(&species).await?;
        Ok(species)
    }

    pub async fn list_species(&self) -> Result<Vec<Species>, ServiceError> {
        Ok(self.store.list_species().await?)
    }

    #[instrument(skip(self), err)]
    pub async fn create_variation(
        &self,
        species_id: SpeciesId,
        name: &str,
    ) -> Result<Variation, ServiceError> {
        let variation = Variation::register(VariationId::new(), species_id, name)?;
        if self.store.get_species(species_id).await?.is_none() {
            return Err(DomainError::not_found(format!("species {species_id}")).into());
        }
        self.store.insert_variation(&variation).await?;
        Ok(variation)
    }

    pub async fn list_variations(&self) -> Result<Vec<Variation>, ServiceError> {
        Ok(self.store.list_variations().await?)
    }

    #[instrument(skip(self, purchase), fields(variation_id = %purchase.variation_id), err)]
    pub async fn record_purchase(&self, purchase: RecordPurchase) -> Result<InventoryLot, ServiceError> {
        let lot = purchase.into_lot(LotId::new())?;
        self.require_variation(lot.variation_id).await?;
        self.store.insert_lot(&lot).await?;
        info!(lot_id = %lot.id, weight_kg = %lot.remaining, cost_per_kg = %lot.cost_per_kg, "purchase recorded");
        Ok(lot)
    }

    pub async fn list_lots(&self, variation_id: Option<VariationId>) -> Result<Vec<InventoryLot>, ServiceError> {
        Ok(self.store.list_lots(variation_id).await?)
    }

    pub async fn stock_summary(&self, variation_id: VariationId) -> Result<StockSummary, ServiceError> {
        self.require_variation(variation_id).await?;
        let lots = self.store.list_lots(Some(variation_id)).await?;
        Ok(StockSummary::from_lots(variation_id, &lots)?)
    }

    pub async fn record_sale(&self, command: RecordSale) -> Result<RecordedSale, SaleError> {
        self.sales.record_sale(command).await
    }

    pub async fn list_sales(&self) -> Result<Vec<SaleDetails>, ServiceError> {
        Ok(reports::list_sale_details(self.store.as_ref()).await?)
    }

    pub async fn dashboard(&self) -> Result<ProfitDashboard, ServiceError> {
        let details = reports::list_sale_details(self.store.as_ref()).await?;
        Ok(ProfitDashboard::from_sales(&details)?)
    }

    async fn require_variation(&self, id: VariationId) -> Result<Variation, ServiceError> {
        self.store
            .get_variation(id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("variation {id}")).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn purchase(variation_id: VariationId, kg: i64) -> RecordPurchase {
        RecordPurchase {
            variation_id,
            weight_kg: Decimal::from(kg),
            cost_per_kg: Decimal::from(2),
            received_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn catalog_and_stock_flow() {
        let tmp = tempfile::tempdir().unwrap();
        let services = AppServices::in_memory(tmp.path());

        let species = services.create_species("  Musang King ").await.unwrap();
        assert_eq!(species.name, "Musang King");
        let variation = services.create_variation(species.id, "A").await.unwrap();

        services.record_purchase(purchase(variation.id, 10)).await.unwrap();
        services.record_purchase(purchase(variation.id, 5)).await.unwrap();

        let summary = services.stock_summary(variation.id).await.unwrap();
        assert_eq!(summary.lots, 2);
        assert_eq!(summary.total_weight.value(), Decimal::from(15));
    }

    #[tokio::test]
    async fn unknown_references_are_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let services = AppServices::in_memory(tmp.path());

        let err = services.create_variation(SpeciesId::new(), "A").await.unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::NotFound(_))));

        let err = services.record_purchase(purchase(VariationId::new(), 1)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::NotFound(_))));
    }

    #[tokio::test]
    async fn duplicate_species_is_a_store_duplicate() {
        let tmp = tempfile::tempdir().unwrap();
        let services = AppServices::in_memory(tmp.path());
        services.create_species("D24").await.unwrap();
        let err = services.create_species("D24").await.unwrap_err();
        assert!(matches!(err, ServiceError::Store(StoreError::Duplicate(_))));
    }
}
