//! Durable key-value storage for reports using redb.
//!
//! # Table design
//!
//! A single `REPORTS` table maps the composite string key
//! `"{site_key}:{week_key}"` to the JSON-encoded report. Because week keys
//! are zero-padded ISO dates, byte order of keys within one site equals
//! calendar order.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use redb::{Database, ReadableTable, TableDefinition};
use serde_json::Value;
use tokio::task::spawn_blocking;

use crate::error::SourceError;
use crate::sources::KeyValueStore;

/// Key: composite `site:week` string. Value: JSON bytes.
const REPORTS: TableDefinition<&str, &[u8]> = TableDefinition::new("reports");

fn db_err(e: impl std::fmt::Display) -> SourceError {
    SourceError::Upstream(format!("report database: {e}"))
}

/// Transactions run on the blocking pool; `commit` fsyncs.
pub struct RedbStore {
    db: Arc<Database>,
}

impl RedbStore {
    /// Open or create the database at `path`, creating the table if needed.
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(db_err)?;
        }
        let db = Database::create(path).map_err(db_err)?;
        let wt = db.begin_write().map_err(db_err)?;
        wt.open_table(REPORTS).map_err(db_err)?;
        wt.commit().map_err(db_err)?;
        Ok(Self { db: Arc::new(db) })
    }

    /// All keys starting with `prefix`, in key order.
    pub fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, SourceError> {
        let rt = self.db.begin_read().map_err(db_err)?;
        let table = rt.open_table(REPORTS).map_err(db_err)?;
        let mut keys = Vec::new();
        for entry in table.range(prefix..).map_err(db_err)? {
            let (k, _) = entry.map_err(db_err)?;
            let key = k.value();
            if !key.starts_with(prefix) {
                break;
            }
            keys.push(key.to_string());
        }
        Ok(keys)
    }
}

fn read_value(db: &Database, key: &str) -> Result<Option<Value>, SourceError> {
    let rt = db.begin_read().map_err(db_err)?;
    let table = rt.open_table(REPORTS).map_err(db_err)?;
    let Some(guard) = table.get(key).map_err(db_err)? else {
        return Ok(None);
    };
    let value = serde_json::from_slice(guard.value()).map_err(db_err)?;
    Ok(Some(value))
}

fn write_value(db: &Database, key: &str, bytes: &[u8]) -> Result<(), SourceError> {
    let wt = db.begin_write().map_err(db_err)?;
    {
        let mut table = wt.open_table(REPORTS).map_err(db_err)?;
        table.insert(key, bytes).map_err(db_err)?;
    }
    wt.commit().map_err(db_err)
}

#[async_trait]
impl KeyValueStore for RedbStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, SourceError> {
        let db = Arc::clone(&self.db);
        let key = key.to_string();
        spawn_blocking(move || read_value(&db, &key))
            .await
            .map_err(|e| db_err(format!("task join error: {e}")))?
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), SourceError> {
        let bytes = serde_json::to_vec(&value).map_err(db_err)?;
        let db = Arc::clone(&self.db);
        let key = key.to_string();
        spawn_blocking(move || write_value(&db, &key, &bytes))
            .await
            .map_err(|e| db_err(format!("task join error: {e}")))?
    }
}
