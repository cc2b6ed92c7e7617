//! Process configuration, read once from the environment at startup.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

pub const DEFAULT_HTTP_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_RECEIPTS_DIR: &str = "receipts";
pub const DEFAULT_SHEETS_RANGE: &str = "Sheet1";
pub const DEFAULT_SALE_CONFLICT_RETRIES: u32 = 3;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SheetsConfig {
    pub spreadsheet_id: String,
    pub range: String,
    pub access_token: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LedgerConfig {
    pub http_addr: String,
    /// `None` keeps everything in memory.
    pub database: Option<DatabaseConfig>,
    pub receipts_dir: PathBuf,
    /// `None` disables the spreadsheet mirror.
    pub sheets: Option<SheetsConfig>,
    pub sale_conflict_retries: u32,
}

impl LedgerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup (the environment in production).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let http_addr = var("HTTP_ADDR").unwrap_or_else(|| DEFAULT_HTTP_ADDR.to_string());

        let persistent = var("USE_PERSISTENT_STORES")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);
        let database = if persistent {
            let url = var("DATABASE_URL")
                .context("DATABASE_URL is required when USE_PERSISTENT_STORES is set")?;
            let max_connections = match var("DATABASE_MAX_CONNECTIONS") {
                Some(v) => v
                    .trim()
                    .parse()
                    .with_context(|| format!("DATABASE_MAX_CONNECTIONS is not a number: {v}"))?,
                None => DEFAULT_MAX_CONNECTIONS,
            };
            Some(DatabaseConfig {
                url,
                max_connections,
            })
        } else {
            None
        };

        let receipts_dir =
            PathBuf::from(var("RECEIPTS_DIR").unwrap_or_else(|| DEFAULT_RECEIPTS_DIR.to_string()));

        let sheets = match (var("SHEETS_SPREADSHEET_ID"), var("SHEETS_ACCESS_TOKEN")) {
            (Some(spreadsheet_id), Some(access_token)) => Some(SheetsConfig {
                spreadsheet_id,
                range: var("SHEETS_RANGE").unwrap_or_else(|| DEFAULT_SHEETS_RANGE.to_string()),
                access_token,
            }),
            (None, None) => None,
            (Some(_), None) => bail!("SHEETS_ACCESS_TOKEN is required when SHEETS_SPREADSHEET_ID is set"),
            (None, Some(_)) => bail!("SHEETS_SPREADSHEET_ID is required when SHEETS_ACCESS_TOKEN is set"),
        };

        let sale_conflict_retries = match var("SALE_CONFLICT_RETRIES") {
            Some(v) => v
                .trim()
                .parse()
                .with_context(|| format!("SALE_CONFLICT_RETRIES is not a number: {v}"))?,
            None => DEFAULT_SALE_CONFLICT_RETRIES,
        };

        Ok(Self {
            http_addr,
            database,
            receipts_dir,
            sheets,
            sale_conflict_retries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<LedgerConfig> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        LedgerConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_to_in_memory_without_mirror() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.http_addr, DEFAULT_HTTP_ADDR);
        assert!(cfg.database.is_none());
        assert!(cfg.sheets.is_none());
        assert_eq!(cfg.receipts_dir, PathBuf::from("receipts"));
        assert_eq!(cfg.sale_conflict_retries, 3);
    }

    #[test]
    fn persistent_stores_require_database_url() {
        let err = config(&[("USE_PERSISTENT_STORES", "true")]).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));

        let cfg = config(&[
            ("USE_PERSISTENT_STORES", "1"),
            ("DATABASE_URL", "postgres://localhost/durian"),
            ("DATABASE_MAX_CONNECTIONS", "4"),
        ])
        .unwrap();
        assert_eq!(
            cfg.database,
            Some(DatabaseConfig {
                url: "postgres://localhost/durian".to_string(),
                max_connections: 4,
            })
        );
    }

    #[test]
    fn sheets_need_both_id_and_token() {
        assert!(config(&[("SHEETS_SPREADSHEET_ID", "abc")]).is_err());

        let cfg = config(&[("SHEETS_SPREADSHEET_ID", "abc"), ("SHEETS_ACCESS_TOKEN", "t")]).unwrap();
        let sheets = cfg.sheets.unwrap();
        assert_eq!(sheets.range, DEFAULT_SHEETS_RANGE);
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        assert!(config(&[("SALE_CONFLICT_RETRIES", "many")]).is_err());
    }
}
