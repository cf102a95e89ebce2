use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use furion_schema::{Migrations, PrimaryKey, SchemaError, SchemaLayout, SchemaOp};
use furion_types::{RecordBody, RecordId, SchemaVersion, StoredRecord};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub mod backend;
pub use backend::{DisabledBackend, LogEntry, StorageBackend};

pub mod memory;
pub use memory::MemoryBackend;

pub mod file;
pub use file::FileBackend;

pub mod config;
pub use config::{BackendKind, ConfigError, StoreConfig};

pub mod diagnosis;
pub use diagnosis::DiagnosticStore;

pub mod export;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Persistence disabled, full, denied or unreadable. Never retried here.
    #[error("storage unavailable: {reason}")]
    StorageUnavailable { reason: String },
    #[error("schema migration failed: {0}")]
    SchemaMigration(#[from] SchemaError),
    #[error("unknown table '{0}'")]
    UnknownTable(String),
    #[error("record for '{table}' must not carry identity field '{field}'")]
    IdentityProvided { table: String, field: String },
    #[error("invalid record: {0}")]
    InvalidRecord(String),
    #[error("invalid database name '{0}'")]
    InvalidName(String),
    #[error("export error: {0}")]
    Export(String),
}

impl StoreError {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        StoreError::StorageUnavailable {
            reason: reason.into(),
        }
    }
}

#[derive(Default)]
struct TableState {
    records: BTreeMap<RecordId, RecordBody>,
}

/// Handle on one open local database.
///
/// Writes go through a single lock, so one caller's inserts reach the backend
/// in issue order. Identities come from the backend, which serializes every
/// handle on the same database; records written through another handle show
/// up here on the next open.
pub struct LocalStore {
    name: String,
    session: Uuid,
    layout: SchemaLayout,
    backend: Arc<dyn StorageBackend>,
    tables: Mutex<HashMap<String, TableState>>,
}

impl LocalStore {
    /// Open `name` at `version`, replaying its log and running any pending upgrade.
    ///
    /// Opening at the persisted version is a no-op on the log. A version with
    /// no declared path, or older than the persisted one, fails.
    pub async fn open(
        backend: Arc<dyn StorageBackend>,
        name: &str,
        version: SchemaVersion,
        migrations: &Migrations,
    ) -> Result<Self, StoreError> {
        backend::check_database_name(name)?;
        let session = Uuid::new_v4();
        let entries = backend.load(name).await?;

        let persisted = entries
            .iter()
            .filter_map(|e| match e {
                LogEntry::SchemaUpgraded { version } => Some(*version),
                _ => None,
            })
            .max()
            .unwrap_or(SchemaVersion::EMPTY);
        if persisted > version {
            return Err(SchemaError::Downgrade {
                persisted,
                requested: version,
            }
            .into());
        }
        // Fail before touching anything if the target is unreachable.
        migrations.plan(persisted, version)?;

        let mut layout = SchemaLayout::default();
        let mut tables: HashMap<String, TableState> = HashMap::new();
        for entry in entries {
            match entry {
                LogEntry::SchemaUpgraded { version: v } => {
                    for (step, ops) in migrations.plan(layout.version(), v)? {
                        layout.apply(step, ops)?;
                        apply_to_tables(&mut tables, ops);
                    }
                }
                LogEntry::Inserted { table, id, body } => {
                    replayed_table(&mut tables, name, &table)?
                        .records
                        .insert(id, body);
                }
                LogEntry::Deleted { table, id } => {
                    replayed_table(&mut tables, name, &table)?
                        .records
                        .remove(&id);
                }
            }
        }

        if layout.version() != version {
            info!(database = name, %session, from = %layout.version(), to = %version, "upgrading schema");
            let steps = migrations.plan(layout.version(), version)?;
            let mut next = layout.clone();
            for (step, ops) in &steps {
                next.apply(*step, ops)?;
            }
            backend
                .append(name, &LogEntry::SchemaUpgraded { version })
                .await?;
            for (_, ops) in &steps {
                apply_to_tables(&mut tables, ops);
            }
            layout = next;
        }

        info!(database = name, %session, version = %version, tables = tables.len(), "store open");
        Ok(Self {
            name: name.to_string(),
            session,
            layout,
            backend,
            tables: Mutex::new(tables),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn session(&self) -> Uuid {
        self.session
    }

    pub fn version(&self) -> SchemaVersion {
        self.layout.version()
    }

    pub fn layout(&self) -> &SchemaLayout {
        &self.layout
    }

    /// Insert a record into an auto-increment table; returns the new identity.
    pub async fn insert(&self, table: &str, body: RecordBody) -> Result<RecordId, StoreError> {
        let def = self
            .layout
            .table(table)
            .ok_or_else(|| StoreError::UnknownTable(table.to_string()))?;
        let PrimaryKey::AutoIncrement(field) = &def.primary_key else {
            return Err(StoreError::InvalidRecord(format!(
                "table '{table}' has no auto-increment key"
            )));
        };
        if body.contains_key(field) {
            return Err(StoreError::IdentityProvided {
                table: table.to_string(),
                field: field.clone(),
            });
        }

        let mut tables = self.tables.lock().await;
        let t = tables
            .get_mut(table)
            .ok_or_else(|| StoreError::UnknownTable(table.to_string()))?;
        let id = match self.backend.append_insert(&self.name, table, &body).await {
            Ok(id) => id,
            Err(e) => {
                warn!(database = %self.name, table, error = %e, "insert not recorded");
                return Err(e);
            }
        };
        t.records.insert(id, body);
        debug!(database = %self.name, table, %id, "inserted");
        Ok(id)
    }

    /// Like `insert`, for a JSON value that must be an object.
    pub async fn insert_json(&self, table: &str, value: Value) -> Result<RecordId, StoreError> {
        match value {
            Value::Object(body) => self.insert(table, body).await,
            other => Err(StoreError::InvalidRecord(format!(
                "expected a JSON object, got {other}"
            ))),
        }
    }

    /// Primary-key lookup. `Ok(None)` when the identity is not present.
    pub async fn get(&self, table: &str, id: RecordId) -> Result<Option<StoredRecord>, StoreError> {
        self.backend.probe(&self.name).await?;
        let tables = self.tables.lock().await;
        let t = tables
            .get(table)
            .ok_or_else(|| StoreError::UnknownTable(table.to_string()))?;
        Ok(t.records.get(&id).map(|body| StoredRecord {
            id,
            body: body.clone(),
        }))
    }

    /// Remove a record. Deleting an absent identity is a no-op.
    pub async fn delete(&self, table: &str, id: RecordId) -> Result<(), StoreError> {
        self.backend.probe(&self.name).await?;
        let mut tables = self.tables.lock().await;
        let t = tables
            .get_mut(table)
            .ok_or_else(|| StoreError::UnknownTable(table.to_string()))?;
        if !t.records.contains_key(&id) {
            return Ok(());
        }
        let entry = LogEntry::Deleted {
            table: table.to_string(),
            id,
        };
        if let Err(e) = self.backend.append(&self.name, &entry).await {
            warn!(database = %self.name, table, %id, error = %e, "delete not recorded");
            return Err(e);
        }
        t.records.remove(&id);
        debug!(database = %self.name, table, %id, "deleted");
        Ok(())
    }

    /// Every record of a table in identity order.
    pub async fn scan(&self, table: &str) -> Result<Vec<StoredRecord>, StoreError> {
        self.backend.probe(&self.name).await?;
        let tables = self.tables.lock().await;
        let t = tables
            .get(table)
            .ok_or_else(|| StoreError::UnknownTable(table.to_string()))?;
        Ok(t.records
            .iter()
            .map(|(id, body)| StoredRecord {
                id: *id,
                body: body.clone(),
            })
            .collect())
    }

    pub async fn count(&self, table: &str) -> Result<usize, StoreError> {
        self.backend.probe(&self.name).await?;
        let tables = self.tables.lock().await;
        tables
            .get(table)
            .map(|t| t.records.len())
            .ok_or_else(|| StoreError::UnknownTable(table.to_string()))
    }
}

/// A logged mutation must target a table the replayed schema has.
fn replayed_table<'a>(
    tables: &'a mut HashMap<String, TableState>,
    database: &str,
    table: &str,
) -> Result<&'a mut TableState, StoreError> {
    tables.get_mut(table).ok_or_else(|| {
        StoreError::unavailable(format!(
            "log of '{database}' touches unknown table '{table}'"
        ))
    })
}

fn apply_to_tables(tables: &mut HashMap<String, TableState>, ops: &[SchemaOp]) {
    for op in ops {
        match op {
            SchemaOp::CreateTable(def) => {
                tables.entry(def.name.clone()).or_default();
            }
            SchemaOp::DropTable(name) => {
                tables.remove(name);
            }
            SchemaOp::AddIndex { .. } | SchemaOp::DropIndex { .. } => {}
        }
    }
}
