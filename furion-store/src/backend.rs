use async_trait::async_trait;
use furion_types::{RecordBody, RecordId, SchemaVersion};
use serde::{Deserialize, Serialize};

use crate::StoreError;

/// One durable mutation. A database is the replay of its entries, oldest first.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum LogEntry {
    SchemaUpgraded {
        version: SchemaVersion,
    },
    Inserted {
        table: String,
        id: RecordId,
        body: RecordBody,
    },
    Deleted {
        table: String,
        id: RecordId,
    },
}

/// The persistence layer under a `LocalStore`.
///
/// Backends keep an ordered log per database and are the single point where
/// writes to it are serialized, so they also hand out identities. The store
/// owns replay and schema checks.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Every entry logged for `database`, oldest first. Unknown databases are empty.
    async fn load(&self, database: &str) -> Result<Vec<LogEntry>, StoreError>;

    /// Durably append one entry.
    async fn append(&self, database: &str, entry: &LogEntry) -> Result<(), StoreError>;

    /// Durably log an insert into `table` under the next identity for it and
    /// return that identity.
    ///
    /// The identity is one past the highest ever logged for `table`, chosen
    /// under the same lock as the write: every handle sharing this backend
    /// gets distinct identities. Nothing is consumed when the write fails.
    async fn append_insert(
        &self,
        database: &str,
        table: &str,
        body: &RecordBody,
    ) -> Result<RecordId, StoreError>;

    /// Availability check for read paths.
    async fn probe(&self, _database: &str) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Backend for environments where local persistence is turned off.
pub struct DisabledBackend;

#[async_trait]
impl StorageBackend for DisabledBackend {
    async fn load(&self, _database: &str) -> Result<Vec<LogEntry>, StoreError> {
        Err(StoreError::unavailable("local persistence is disabled"))
    }

    async fn append(&self, _database: &str, _entry: &LogEntry) -> Result<(), StoreError> {
        Err(StoreError::unavailable("local persistence is disabled"))
    }

    async fn append_insert(
        &self,
        _database: &str,
        _table: &str,
        _body: &RecordBody,
    ) -> Result<RecordId, StoreError> {
        Err(StoreError::unavailable("local persistence is disabled"))
    }

    async fn probe(&self, _database: &str) -> Result<(), StoreError> {
        Err(StoreError::unavailable("local persistence is disabled"))
    }
}

/// Highest identity ever logged for `table`, plus one.
pub(crate) fn next_identity<'a>(
    entries: impl IntoIterator<Item = &'a LogEntry>,
    table: &str,
) -> RecordId {
    let last = entries
        .into_iter()
        .filter_map(|e| match e {
            LogEntry::Inserted { table: t, id, .. } if t == table => Some(id.0),
            _ => None,
        })
        .max()
        .unwrap_or(0);
    RecordId(last + 1)
}

/// Database names double as file stems, so keep them boring.
pub(crate) fn check_database_name(name: &str) -> Result<(), StoreError> {
    let ok = !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if ok {
        Ok(())
    } else {
        Err(StoreError::InvalidName(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn log_entries_are_tagged() {
        let entry = LogEntry::Inserted {
            table: "routingDiagnosis".into(),
            id: RecordId(7),
            body: json!({"source": "route-a"}).as_object().unwrap().clone(),
        };
        let text = serde_json::to_string(&entry).unwrap();
        assert_eq!(
            text,
            r#"{"op":"inserted","table":"routingDiagnosis","id":7,"body":{"source":"route-a"}}"#
        );
        let back: LogEntry = serde_json::from_str(&text).unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn next_identity_counts_past_deleted_records() {
        let inserted = |table: &str, id| LogEntry::Inserted {
            table: table.into(),
            id: RecordId(id),
            body: RecordBody::new(),
        };
        let log = vec![
            LogEntry::SchemaUpgraded { version: SchemaVersion(1) },
            inserted("routingDiagnosis", 1),
            inserted("routingDiagnosis", 2),
            LogEntry::Deleted {
                table: "routingDiagnosis".into(),
                id: RecordId(2),
            },
            inserted("explore", 9),
        ];
        assert_eq!(next_identity(&log, "routingDiagnosis"), RecordId(3));
        assert_eq!(next_identity(&log, "explore"), RecordId(10));
        assert_eq!(next_identity(&log, "other"), RecordId(1));
    }

    #[test]
    fn database_names() {
        assert!(check_database_name("furion-kit").is_ok());
        assert!(check_database_name("diag_db.v1").is_ok());
        assert!(check_database_name("").is_err());
        assert!(check_database_name("../etc").is_err());
        assert!(check_database_name("a/b").is_err());
    }

    #[tokio::test]
    async fn disabled_backend_refuses_everything() {
        let b = DisabledBackend;
        assert!(matches!(b.load("x").await, Err(StoreError::StorageUnavailable { .. })));
        assert!(matches!(b.probe("x").await, Err(StoreError::StorageUnavailable { .. })));
        assert!(matches!(
            b.append_insert("x", "t", &RecordBody::new()).await,
            Err(StoreError::StorageUnavailable { .. })
        ));
    }
}
