//! Read-side views that join sales with catalog names.

use std::collections::HashMap;

use durian_core::{SpeciesId, VariationId};
use durian_sales::{Sale, SaleDetails};

use crate::store::{LedgerStore, StoreError};

/// Resolve species/variation names for `sales`, keeping their order.
///
/// Catalog rows are never deleted, so a missing name means the store is
/// inconsistent and is reported as `NotFound`.
pub async fn sale_details(
    store: &dyn LedgerStore,
    sales: Vec<Sale>,
) -> Result<Vec<SaleDetails>, StoreError> {
    if sales.is_empty() {
        return Ok(Vec::new());
    }

    let species: HashMap<SpeciesId, String> = store
        .list_species()
        .await?
        .into_iter()
        .map(|s| (s.id, s.name))
        .collect();
    let variations: HashMap<VariationId, String> = store
        .list_variations()
        .await?
        .into_iter()
        .map(|v| (v.id, v.name))
        .collect();

    let variation_name = |id: VariationId| {
        variations
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("variation {id}")))
    };

    sales
        .into_iter()
        .map(|sale| -> Result<SaleDetails, StoreError> {
            let species_name = species
                .get(&sale.species_id)
                .cloned()
                .ok_or_else(|| StoreError::NotFound(format!("species {}", sale.species_id)))?;
            Ok(SaleDetails {
                species_name,
                purchase_variation_name: variation_name(sale.purchase_variation_id)?,
                sold_variation_name: variation_name(sale.sold_variation_id)?,
                sale,
            })
        })
        .collect()
}

/// All sales, newest first, with names.
pub async fn list_sale_details(store: &dyn LedgerStore) -> Result<Vec<SaleDetails>, StoreError> {
    let sales = store.list_sales().await?;
    sale_details(store, sales).await
}
