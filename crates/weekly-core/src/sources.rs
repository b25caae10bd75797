//! Interfaces to the external collaborators a report is built from.
//!
//! Every collaborator is injected as a trait object. When a collaborator is
//! not configured, its null-object implementation is injected instead; those
//! answer every call with [`SourceError::Unavailable`] so callers fall to
//! their next tier without probing for presence.

use crate::error::{SourceError, WeeklyError};
use crate::paths;
use crate::report::{Report, UNKNOWN_USER};
use crate::week::WeekKey;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// One warehouse result row: column name → scalar.
pub type Row = serde_json::Map<String, Value>;

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

#[async_trait]
pub trait Warehouse: Send + Sync {
    async fn query(&self, sql: &str) -> Result<Vec<Row>, SourceError>;
}

/// Options for one reasoning request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AskOptions {
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    /// Named external tool capabilities the service may use.
    pub tools: Vec<String>,
}

#[async_trait]
pub trait Reasoner: Send + Sync {
    /// Free-text answer; callers locate any JSON inside it themselves.
    async fn ask(&self, prompt: &str, options: &AskOptions) -> Result<String, SourceError>;
}

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, SourceError>;
    async fn set(&self, key: &str, value: Value) -> Result<(), SourceError>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub email: Option<String>,
    pub name: Option<String>,
}

impl Identity {
    /// Email, else name, else `"Unknown"`.
    pub fn attribution(&self) -> String {
        present(&self.email)
            .or_else(|| present(&self.name))
            .unwrap_or(UNKNOWN_USER)
            .to_string()
    }
}

fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn current_user(&self) -> Result<Identity, SourceError>;
}

/// Externally produced per-week report files.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn load(&self, week: &WeekKey) -> Result<Option<Report>, SourceError>;
}

// ---------------------------------------------------------------------------
// Sources bundle
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct Sources {
    pub warehouse: Arc<dyn Warehouse>,
    pub reasoner: Arc<dyn Reasoner>,
    pub identity: Arc<dyn IdentityProvider>,
    pub snapshots: Arc<dyn SnapshotSource>,
}

impl Sources {
    /// Every collaborator replaced by its null object.
    pub fn offline() -> Self {
        Self {
            warehouse: Arc::new(NoWarehouse),
            reasoner: Arc::new(NoReasoner),
            identity: Arc::new(NoIdentity),
            snapshots: Arc::new(NoSnapshots),
        }
    }
}

// ---------------------------------------------------------------------------
// Null objects
// ---------------------------------------------------------------------------

pub struct NoWarehouse;

#[async_trait]
impl Warehouse for NoWarehouse {
    async fn query(&self, _sql: &str) -> Result<Vec<Row>, SourceError> {
        Err(SourceError::Unavailable("warehouse"))
    }
}

pub struct NoReasoner;

#[async_trait]
impl Reasoner for NoReasoner {
    async fn ask(&self, _prompt: &str, _options: &AskOptions) -> Result<String, SourceError> {
        Err(SourceError::Unavailable("AI service"))
    }
}

pub struct NoIdentity;

#[async_trait]
impl IdentityProvider for NoIdentity {
    async fn current_user(&self) -> Result<Identity, SourceError> {
        Err(SourceError::Unavailable("identity service"))
    }
}

pub struct NoSnapshots;

#[async_trait]
impl SnapshotSource for NoSnapshots {
    async fn load(&self, _week: &WeekKey) -> Result<Option<Report>, SourceError> {
        Ok(None)
    }
}

// ---------------------------------------------------------------------------
// EnvIdentity
// ---------------------------------------------------------------------------

pub const USER_EMAIL_ENV: &str = "WEEKLY_USER_EMAIL";
pub const USER_NAME_ENV: &str = "WEEKLY_USER_NAME";

/// Identity read from `WEEKLY_USER_EMAIL` / `WEEKLY_USER_NAME`.
pub struct EnvIdentity;

#[async_trait]
impl IdentityProvider for EnvIdentity {
    async fn current_user(&self) -> Result<Identity, SourceError> {
        let read = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        Ok(Identity {
            email: read(USER_EMAIL_ENV),
            name: read(USER_NAME_ENV),
        })
    }
}

// ---------------------------------------------------------------------------
// FileSnapshots
// ---------------------------------------------------------------------------

/// Reads `week-YYYY-MM-DD.json` files from a directory.
pub struct FileSnapshots {
    dir: PathBuf,
}

impl FileSnapshots {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl SnapshotSource for FileSnapshots {
    async fn load(&self, week: &WeekKey) -> Result<Option<Report>, SourceError> {
        let path = self.dir.join(paths::snapshot_file_name(week));
        let data = match tokio::fs::read_to_string(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(SourceError::upstream(WeeklyError::Io(e))),
        };
        let report: Report = serde_json::from_str(&data).map_err(SourceError::upstream)?;
        Ok(Some(report))
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// In-process key-value store. Records every `set` so callers can assert
/// on write traffic.
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, Value>>,
    writes: Mutex<Vec<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys passed to `set`, in call order.
    pub fn writes(&self) -> Vec<String> {
        self.writes.lock().map(|w| w.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, SourceError> {
        let values = self
            .values
            .lock()
            .map_err(|_| SourceError::Upstream("memory store poisoned".into()))?;
        Ok(values.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), SourceError> {
        if let Ok(mut writes) = self.writes.lock() {
            writes.push(key.to_string());
        }
        let mut values = self
            .values
            .lock()
            .map_err(|_| SourceError::Upstream("memory store poisoned".into()))?;
        values.insert(key.to_string(), value);
        Ok(())
    }
}
