use std::path::PathBuf;

use async_trait::async_trait;
use tracing::instrument;

use durian_sales::{render_receipt, SaleDetails};

use super::ExternalError;

#[async_trait]
pub trait ReceiptWriter: Send + Sync {
    /// Persist the receipt for a committed sale; returns where it went.
    async fn write(&self, details: &SaleDetails) -> Result<PathBuf, ExternalError>;
}

/// Writes `sale_<id>.txt` into a directory, creating it on first use.
#[derive(Debug, Clone)]
pub struct FileReceiptWriter {
    dir: PathBuf,
}

impl FileReceiptWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, details: &SaleDetails) -> PathBuf {
        self.dir.join(format!("sale_{}.txt", details.sale.id))
    }
}

#[async_trait]
impl ReceiptWriter for FileReceiptWriter {
    #[instrument(skip_all, fields(sale_id = %details.sale.id), err)]
    async fn write(&self, details: &SaleDetails) -> Result<PathBuf, ExternalError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(details);
        tokio::fs::write(&path, render_receipt(details)).await?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use durian_core::{Kilograms, PricePerKg, SaleId, SpeciesId, VariationId};
    use durian_sales::Sale;
    use rust_decimal_macros::dec;

    fn details() -> SaleDetails {
        SaleDetails {
            sale: Sale {
                id: SaleId::new(),
                species_id: SpeciesId::new(),
                purchase_variation_id: VariationId::new(),
                sold_variation_id: VariationId::new(),
                weight_kg: Kilograms::new(dec!(2)).unwrap(),
                sale_price_per_kg: PricePerKg::new(dec!(5)).unwrap(),
                cost_per_kg: PricePerKg::new(dec!(3)).unwrap(),
                recorded_at: Utc::now(),
            },
            species_name: "Black Thorn".to_string(),
            purchase_variation_name: "A".to_string(),
            sold_variation_name: "A".to_string(),
        }
    }

    #[tokio::test]
    async fn writes_receipt_into_nested_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let writer = FileReceiptWriter::new(tmp.path().join("receipts"));
        let details = details();

        let path = writer.write(&details).await.unwrap();

        assert_eq!(
            path.file_name().unwrap().to_string_lossy(),
            format!("sale_{}.txt", details.sale.id)
        );
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("Species: Black Thorn"));
        assert!(text.contains("Profit: 4.00"));
    }
}
