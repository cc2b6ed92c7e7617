use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use durian_core::{Kilograms, LotId, SpeciesId, VariationId};
use durian_inventory::{InventoryLot, Species, Variation};
use durian_sales::Sale;

use super::{LedgerStore, LedgerTx, StoreError};

#[derive(Debug, Clone, Default)]
struct LedgerState {
    species: Vec<Species>,
    variations: Vec<Variation>,
    /// Insertion order is FIFO order.
    lots: Vec<InventoryLot>,
    /// Insertion order; listed newest first.
    sales: Vec<Sale>,
}

impl LedgerState {
    fn has_species(&self, id: SpeciesId) -> bool {
        self.species.iter().any(|s| s.id == id)
    }

    fn has_variation(&self, id: VariationId) -> bool {
        self.variations.iter().any(|v| v.id == id)
    }
}

/// In-memory ledger store.
///
/// Intended for tests/dev. A unit of work holds the store lock for its whole
/// lifetime and works on a staged copy of the state, so units of work are
/// fully serialized and a dropped one leaves no trace.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedgerStore {
    state: Arc<Mutex<LedgerState>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn insert_species(&self, species: &Species) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        if state.species.iter().any(|s| s.name == species.name) {
            return Err(StoreError::Duplicate(format!(
                "species '{}' already exists",
                species.name
            )));
        }
        state.species.push(species.clone());
        Ok(())
    }

    async fn get_species(&self, id: SpeciesId) -> Result<Option<Species>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.species.iter().find(|s| s.id == id).cloned())
    }

    async fn list_species(&self) -> Result<Vec<Species>, StoreError> {
        let state = self.state.lock().await;
        let mut species = state.species.clone();
        species.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(species)
    }

    async fn insert_variation(&self, variation: &Variation) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        if !state.has_species(variation.species_id) {
            return Err(StoreError::NotFound(format!("species {}", variation.species_id)));
        }
        state.variations.push(variation.clone());
        Ok(())
    }

    async fn get_variation(&self, id: VariationId) -> Result<Option<Variation>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.variations.iter().find(|v| v.id == id).cloned())
    }

    async fn list_variations(&self) -> Result<Vec<Variation>, StoreError> {
        let state = self.state.lock().await;
        let species_name = |id: SpeciesId| {
            state
                .species
                .iter()
                .find(|s| s.id == id)
                .map(|s| s.name.clone())
                .unwrap_or_default()
        };
        let mut variations = state.variations.clone();
        variations.sort_by_cached_key(|v| (species_name(v.species_id), v.name.clone()));
        Ok(variations)
    }

    async fn insert_lot(&self, lot: &InventoryLot) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        if !state.has_variation(lot.variation_id) {
            return Err(StoreError::NotFound(format!("variation {}", lot.variation_id)));
        }
        state.lots.push(lot.clone());
        Ok(())
    }

    async fn list_lots(&self, variation_id: Option<VariationId>) -> Result<Vec<InventoryLot>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .lots
            .iter()
            .filter(|lot| variation_id.is_none_or(|v| lot.variation_id == v))
            .cloned()
            .collect())
    }

    async fn list_sales(&self) -> Result<Vec<Sale>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.sales.iter().rev().cloned().collect())
    }

    async fn begin(&self) -> Result<Box<dyn LedgerTx>, StoreError> {
        let guard = self.state.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(InMemoryLedgerTx { guard, staged }))
    }
}

struct InMemoryLedgerTx {
    guard: OwnedMutexGuard<LedgerState>,
    staged: LedgerState,
}

#[async_trait]
impl LedgerTx for InMemoryLedgerTx {
    async fn species(&mut self, id: SpeciesId) -> Result<Option<Species>, StoreError> {
        Ok(self.staged.species.iter().find(|s| s.id == id).cloned())
    }

    async fn variation(&mut self, id: VariationId) -> Result<Option<Variation>, StoreError> {
        Ok(self.staged.variations.iter().find(|v| v.id == id).cloned())
    }

    async fn lock_lots(&mut self, variation_id: VariationId) -> Result<Vec<InventoryLot>, StoreError> {
        // The whole store is already locked by this unit of work.
        if !self.staged.has_variation(variation_id) {
            return Err(StoreError::NotFound(format!("variation {variation_id}")));
        }
        Ok(self
            .staged
            .lots
            .iter()
            .filter(|lot| lot.variation_id == variation_id)
            .cloned()
            .collect())
    }

    async fn set_lot_remaining(&mut self, lot_id: LotId, remaining: Kilograms) -> Result<(), StoreError> {
        let lot = self
            .staged
            .lots
            .iter_mut()
            .find(|lot| lot.id == lot_id)
            .ok_or_else(|| StoreError::NotFound(format!("lot {lot_id}")))?;
        lot.remaining = remaining;
        Ok(())
    }

    async fn delete_lot(&mut self, lot_id: LotId) -> Result<(), StoreError> {
        let before = self.staged.lots.len();
        self.staged.lots.retain(|lot| lot.id != lot_id);
        if self.staged.lots.len() == before {
            return Err(StoreError::NotFound(format!("lot {lot_id}")));
        }
        Ok(())
    }

    async fn insert_sale(&mut self, sale: &Sale) -> Result<(), StoreError> {
        if !self.staged.has_species(sale.species_id) {
            return Err(StoreError::NotFound(format!("species {}", sale.species_id)));
        }
        for variation_id in [sale.purchase_variation_id, sale.sold_variation_id] {
            if !self.staged.has_variation(variation_id) {
                return Err(StoreError::NotFound(format!("variation {variation_id}")));
            }
        }
        if self.staged.sales.iter().any(|s| s.id == sale.id) {
            return Err(StoreError::Duplicate(format!("sale {}", sale.id)));
        }
        self.staged.sales.push(sale.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let InMemoryLedgerTx { mut guard, staged } = *self;
        *guard = staged;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use durian_core::PricePerKg;
    use rust_decimal_macros::dec;

    async fn seeded() -> (InMemoryLedgerStore, Variation) {
        let store = InMemoryLedgerStore::new();
        let species = Species::register(SpeciesId::new(), "Musang King").unwrap();
        store.insert_species(&species).await.unwrap();
        let variation = Variation::register(VariationId::new(), species.id, "A").unwrap();
        store.insert_variation(&variation).await.unwrap();
        (store, variation)
    }

    fn lot(variation_id: VariationId, weight: rust_decimal::Decimal) -> InventoryLot {
        InventoryLot {
            id: LotId::new(),
            variation_id,
            remaining: Kilograms::new(weight).unwrap(),
            cost_per_kg: PricePerKg::new(dec!(2)).unwrap(),
            received_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn duplicate_species_name_is_rejected() {
        let (store, _) = seeded().await;
        let again = Species::register(SpeciesId::new(), "Musang King").unwrap();
        let err = store.insert_species(&again).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
    }

    #[tokio::test]
    async fn variation_requires_existing_species() {
        let store = InMemoryLedgerStore::new();
        let orphan = Variation::register(VariationId::new(), SpeciesId::new(), "A").unwrap();
        let err = store.insert_variation(&orphan).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn lots_are_listed_in_insertion_order() {
        let (store, variation) = seeded().await;
        let first = lot(variation.id, dec!(1));
        let second = lot(variation.id, dec!(2));
        store.insert_lot(&first).await.unwrap();
        store.insert_lot(&second).await.unwrap();

        let lots = store.list_lots(Some(variation.id)).await.unwrap();
        assert_eq!(lots, vec![first, second]);
        assert!(store.list_lots(Some(VariationId::new())).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn dropped_unit_of_work_discards_writes() {
        let (store, variation) = seeded().await;
        let l = lot(variation.id, dec!(5));
        store.insert_lot(&l).await.unwrap();

        {
            let mut tx = store.begin().await.unwrap();
            tx.delete_lot(l.id).await.unwrap();
        }
        assert_eq!(store.list_lots(None).await.unwrap(), vec![l.clone()]);

        let mut tx = store.begin().await.unwrap();
        tx.set_lot_remaining(l.id, Kilograms::new(dec!(1.5)).unwrap()).await.unwrap();
        tx.commit().await.unwrap();
        let lots = store.list_lots(None).await.unwrap();
        assert_eq!(lots[0].remaining.value(), dec!(1.5));
    }
}
