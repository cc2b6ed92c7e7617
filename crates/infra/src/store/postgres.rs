//! Postgres-backed ledger store.
//!
//! ## Error Mapping
//!
//! | PostgreSQL Error Code | StoreError | Scenario |
//! |-----------------------|------------|----------|
//! | `23505` unique violation | `Duplicate` | species name already taken |
//! | `23503` foreign key violation | `NotFound` | unknown species/variation referenced |
//! | `40001` serialization failure | `Conflict` | concurrent transaction won, retry |
//! | `40P01` deadlock detected | `Conflict` | concurrent transaction won, retry |
//! | anything else | `Database` | |
//!
//! ## Concurrency
//!
//! `lock_lots` takes `FOR UPDATE` row locks on the variation row and on all of
//! its lots inside the transaction. Two sales against the same variation are
//! therefore serialized; sales against different variations proceed in
//! parallel. Locking the variation row as well covers the case where the
//! variation currently has no lots.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, Row, Transaction};
use tracing::instrument;

use durian_core::{DomainError, Kilograms, LotId, PricePerKg, SaleId, SpeciesId, VariationId};
use durian_inventory::{InventoryLot, Species, Variation};
use durian_sales::Sale;

use super::{LedgerStore, LedgerTx, StoreError};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS species (
    id          UUID PRIMARY KEY,
    name        TEXT NOT NULL UNIQUE,
    created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS variations (
    id          UUID PRIMARY KEY,
    species_id  UUID NOT NULL REFERENCES species (id),
    name        TEXT NOT NULL,
    created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS inventory_lots (
    seq           BIGSERIAL PRIMARY KEY,
    id            UUID NOT NULL UNIQUE,
    variation_id  UUID NOT NULL REFERENCES variations (id),
    weight_kg     NUMERIC(14, 3) NOT NULL CHECK (weight_kg > 0),
    cost_per_kg   NUMERIC(18, 4) NOT NULL CHECK (cost_per_kg >= 0),
    received_at   TIMESTAMPTZ NOT NULL
);

CREATE INDEX IF NOT EXISTS inventory_lots_fifo
    ON inventory_lots (variation_id, seq);

CREATE TABLE IF NOT EXISTS sales (
    seq                    BIGSERIAL PRIMARY KEY,
    id                     UUID NOT NULL UNIQUE,
    species_id             UUID NOT NULL REFERENCES species (id),
    purchase_variation_id  UUID NOT NULL REFERENCES variations (id),
    sold_variation_id      UUID NOT NULL REFERENCES variations (id),
    weight_kg              NUMERIC(14, 3) NOT NULL CHECK (weight_kg > 0),
    sale_price_per_kg      NUMERIC(18, 4) NOT NULL CHECK (sale_price_per_kg >= 0),
    cost_per_kg            NUMERIC NOT NULL CHECK (cost_per_kg >= 0),
    recorded_at            TIMESTAMPTZ NOT NULL
);
"#;

const SELECT_LOTS: &str =
    "SELECT id, variation_id, weight_kg, cost_per_kg, received_at FROM inventory_lots ORDER BY seq";

const SELECT_VARIATION_LOTS: &str = "SELECT id, variation_id, weight_kg, cost_per_kg, received_at \
     FROM inventory_lots WHERE variation_id = $1 ORDER BY seq";

const LOCK_VARIATION_LOTS: &str = "SELECT id, variation_id, weight_kg, cost_per_kg, received_at \
     FROM inventory_lots WHERE variation_id = $1 ORDER BY seq FOR UPDATE";

/// Postgres-backed ledger store.
///
/// Uses the SQLx connection pool (thread-safe); every unit of work is a
/// database transaction.
#[derive(Debug, Clone)]
pub struct PostgresLedgerStore {
    pool: Arc<PgPool>,
}

impl PostgresLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Connect and make sure the schema exists.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        let store = Self::new(pool);
        store.ensure_schema().await?;
        Ok(store)
    }

    /// Idempotently create the ledger tables.
    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for PostgresLedgerStore {
    #[instrument(skip(self, species), fields(species_id = %species.id), err)]
    async fn insert_species(&self, species: &Species) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO species (id, name) VALUES ($1, $2)")
            .bind(species.id.as_uuid())
            .bind(&species.name)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert_species", e))?;
        Ok(())
    }

    async fn get_species(&self, id: SpeciesId) -> Result<Option<Species>, StoreError> {
        let row = sqlx::query("SELECT id, name FROM species WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_species", e))?;
        row.map(|r| species_from_row(&r)).transpose()
    }

    async fn list_species(&self) -> Result<Vec<Species>, StoreError> {
        let rows = sqlx::query("SELECT id, name FROM species ORDER BY name")
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_species", e))?;
        rows.iter().map(species_from_row).collect()
    }

    #[instrument(skip(self, variation), fields(variation_id = %variation.id), err)]
    async fn insert_variation(&self, variation: &Variation) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO variations (id, species_id, name) VALUES ($1, $2, $3)")
            .bind(variation.id.as_uuid())
            .bind(variation.species_id.as_uuid())
            .bind(&variation.name)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert_variation", e))?;
        Ok(())
    }

    async fn get_variation(&self, id: VariationId) -> Result<Option<Variation>, StoreError> {
        let row = sqlx::query("SELECT id, species_id, name FROM variations WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_variation", e))?;
        row.map(|r| variation_from_row(&r)).transpose()
    }

    async fn list_variations(&self) -> Result<Vec<Variation>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT v.id, v.species_id, v.name
            FROM variations v
            JOIN species s ON s.id = v.species_id
            ORDER BY s.name, v.name
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_variations", e))?;
        rows.iter().map(variation_from_row).collect()
    }

    #[instrument(skip(self, lot), fields(lot_id = %lot.id, variation_id = %lot.variation_id), err)]
    async fn insert_lot(&self, lot: &InventoryLot) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO inventory_lots (id, variation_id, weight_kg, cost_per_kg, received_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(lot.id.as_uuid())
        .bind(lot.variation_id.as_uuid())
        .bind(lot.remaining.value())
        .bind(lot.cost_per_kg.value())
        .bind(lot.received_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_lot", e))?;
        Ok(())
    }

    async fn list_lots(&self, variation_id: Option<VariationId>) -> Result<Vec<InventoryLot>, StoreError> {
        let rows = match variation_id {
            Some(v) => {
                sqlx::query(SELECT_VARIATION_LOTS)
                    .bind(v.as_uuid())
                    .fetch_all(&*self.pool)
                    .await
            }
            None => sqlx::query(SELECT_LOTS).fetch_all(&*self.pool).await,
        }
        .map_err(|e| map_sqlx_error("list_lots", e))?;
        rows.iter().map(lot_from_row).collect()
    }

    async fn list_sales(&self) -> Result<Vec<Sale>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, species_id, purchase_variation_id, sold_variation_id,
                   weight_kg, sale_price_per_kg, cost_per_kg, recorded_at
            FROM sales
            ORDER BY recorded_at DESC, seq DESC
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_sales", e))?;
        rows.iter().map(sale_from_row).collect()
    }

    async fn begin(&self) -> Result<Box<dyn LedgerTx>, StoreError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;
        Ok(Box::new(PostgresLedgerTx { tx }))
    }
}

/// Transaction-backed unit of work. Rolls back on drop.
struct PostgresLedgerTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl LedgerTx for PostgresLedgerTx {
    async fn species(&mut self, id: SpeciesId) -> Result<Option<Species>, StoreError> {
        let row = sqlx::query("SELECT id, name FROM species WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("tx_get_species", e))?;
        row.map(|r| species_from_row(&r)).transpose()
    }

    async fn variation(&mut self, id: VariationId) -> Result<Option<Variation>, StoreError> {
        let row = sqlx::query("SELECT id, species_id, name FROM variations WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("tx_get_variation", e))?;
        row.map(|r| variation_from_row(&r)).transpose()
    }

    #[instrument(skip(self), fields(variation_id = %variation_id), err)]
    async fn lock_lots(&mut self, variation_id: VariationId) -> Result<Vec<InventoryLot>, StoreError> {
        let locked = sqlx::query("SELECT id FROM variations WHERE id = $1 FOR UPDATE")
            .bind(variation_id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("lock_variation", e))?;
        if locked.is_none() {
            return Err(StoreError::NotFound(format!("variation {variation_id}")));
        }

        let rows = sqlx::query(LOCK_VARIATION_LOTS)
            .bind(variation_id.as_uuid())
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("lock_lots", e))?;
        rows.iter().map(lot_from_row).collect()
    }

    async fn set_lot_remaining(&mut self, lot_id: LotId, remaining: Kilograms) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE inventory_lots SET weight_kg = $2 WHERE id = $1")
            .bind(lot_id.as_uuid())
            .bind(remaining.value())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("update_lot", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("lot {lot_id}")));
        }
        Ok(())
    }

    async fn delete_lot(&mut self, lot_id: LotId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM inventory_lots WHERE id = $1")
            .bind(lot_id.as_uuid())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("delete_lot", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("lot {lot_id}")));
        }
        Ok(())
    }

    async fn insert_sale(&mut self, sale: &Sale) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO sales (
                id, species_id, purchase_variation_id, sold_variation_id,
                weight_kg, sale_price_per_kg, cost_per_kg, recorded_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(sale.id.as_uuid())
        .bind(sale.species_id.as_uuid())
        .bind(sale.purchase_variation_id.as_uuid())
        .bind(sale.sold_variation_id.as_uuid())
        .bind(sale.weight_kg.value())
        .bind(sale.sale_price_per_kg.value())
        .bind(sale.cost_per_kg.value())
        .bind(sale.recorded_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_sale", e))?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx
            .commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }
}

// SQLx row mapping

fn species_from_row(row: &sqlx::postgres::PgRow) -> Result<Species, StoreError> {
    Ok(Species {
        id: SpeciesId::from_uuid(get(row, "id")?),
        name: get(row, "name")?,
    })
}

fn variation_from_row(row: &sqlx::postgres::PgRow) -> Result<Variation, StoreError> {
    Ok(Variation {
        id: VariationId::from_uuid(get(row, "id")?),
        species_id: SpeciesId::from_uuid(get(row, "species_id")?),
        name: get(row, "name")?,
    })
}

fn lot_from_row(row: &sqlx::postgres::PgRow) -> Result<InventoryLot, StoreError> {
    Ok(InventoryLot {
        id: LotId::from_uuid(get(row, "id")?),
        variation_id: VariationId::from_uuid(get(row, "variation_id")?),
        remaining: Kilograms::new(get::<Decimal>(row, "weight_kg")?).map_err(corrupt_row)?,
        cost_per_kg: PricePerKg::computed(get::<Decimal>(row, "cost_per_kg")?).map_err(corrupt_row)?,
        received_at: get::<DateTime<Utc>>(row, "received_at")?,
    })
}

fn sale_from_row(row: &sqlx::postgres::PgRow) -> Result<Sale, StoreError> {
    Ok(Sale {
        id: SaleId::from_uuid(get(row, "id")?),
        species_id: SpeciesId::from_uuid(get(row, "species_id")?),
        purchase_variation_id: VariationId::from_uuid(get(row, "purchase_variation_id")?),
        sold_variation_id: VariationId::from_uuid(get(row, "sold_variation_id")?),
        weight_kg: Kilograms::new(get::<Decimal>(row, "weight_kg")?).map_err(corrupt_row)?,
        sale_price_per_kg: PricePerKg::computed(get::<Decimal>(row, "sale_price_per_kg")?)
            .map_err(corrupt_row)?,
        cost_per_kg: PricePerKg::computed(get::<Decimal>(row, "cost_per_kg")?).map_err(corrupt_row)?,
        recorded_at: get::<DateTime<Utc>>(row, "recorded_at")?,
    })
}

fn get<'r, T>(row: &'r sqlx::postgres::PgRow, column: &str) -> Result<T, StoreError>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(column)
        .map_err(|e| StoreError::Database(format!("failed to read column {column}: {e}")))
}

fn corrupt_row(err: DomainError) -> StoreError {
    StoreError::Database(format!("stored row violates domain rules: {err}"))
}

/// Map SQLx errors to `StoreError`.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Duplicate(msg),
                Some("23503") => StoreError::NotFound(msg),
                Some("40001") | Some("40P01") => StoreError::Conflict(msg),
                _ => StoreError::Database(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Database(format!("connection pool closed in {}", operation))
        }
        sqlx::Error::RowNotFound => StoreError::NotFound(format!("row not found in {}", operation)),
        _ => StoreError::Database(format!("sqlx error in {}: {}", operation, err)),
    }
}
