use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use furion_types::{RecordBody, RecordId};
use tokio::sync::Mutex;

use crate::backend::next_identity;
use crate::{LogEntry, StorageBackend, StoreError};

/// In-process backend.
///
/// Survives closing and reopening a `LocalStore` on the same instance, but not
/// the process. Used for tests and for hosts without a writable data dir.
pub struct MemoryBackend {
    logs: Mutex<HashMap<String, Vec<LogEntry>>>,
    available: AtomicBool,
    max_entries: Option<usize>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            logs: Mutex::new(HashMap::new()),
            available: AtomicBool::new(true),
            max_entries: None,
        }
    }

    /// Cap the number of log entries per database; further appends report a full store.
    pub fn with_max_entries(mut self, max: usize) -> Self {
        self.max_entries = Some(max);
        self
    }

    /// Simulate the persistence layer being switched off (or back on).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Logged entries for a database (debug hook).
    pub async fn entries(&self, database: &str) -> Vec<LogEntry> {
        let logs = self.logs.lock().await;
        logs.get(database).cloned().unwrap_or_default()
    }

    fn check_quota(&self, len: usize) -> Result<(), StoreError> {
        match self.max_entries {
            Some(max) if len >= max => Err(StoreError::unavailable(format!(
                "quota exceeded: {max} entries"
            ))),
            _ => Ok(()),
        }
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::unavailable("memory backend switched off"))
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn load(&self, database: &str) -> Result<Vec<LogEntry>, StoreError> {
        self.check_available()?;
        Ok(self.entries(database).await)
    }

    async fn append(&self, database: &str, entry: &LogEntry) -> Result<(), StoreError> {
        self.check_available()?;
        let mut logs = self.logs.lock().await;
        let log = logs.entry(database.to_string()).or_default();
        self.check_quota(log.len())?;
        log.push(entry.clone());
        Ok(())
    }

    async fn append_insert(
        &self,
        database: &str,
        table: &str,
        body: &RecordBody,
    ) -> Result<RecordId, StoreError> {
        self.check_available()?;
        let mut logs = self.logs.lock().await;
        let log = logs.entry(database.to_string()).or_default();
        self.check_quota(log.len())?;
        let id = next_identity(log.iter(), table);
        log.push(LogEntry::Inserted {
            table: table.to_string(),
            id,
            body: body.clone(),
        });
        Ok(id)
    }

    async fn probe(&self, _database: &str) -> Result<(), StoreError> {
        self.check_available()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use furion_types::SchemaVersion;

    #[tokio::test]
    async fn quota_is_enforced_per_database() {
        let b = MemoryBackend::new().with_max_entries(1);
        let e = LogEntry::SchemaUpgraded {
            version: SchemaVersion(1),
        };
        b.append("a", &e).await.unwrap();
        assert!(matches!(
            b.append("a", &e).await,
            Err(StoreError::StorageUnavailable { .. })
        ));
        b.append("b", &e).await.unwrap();
        assert_eq!(b.entries("a").await.len(), 1);
    }

    #[tokio::test]
    async fn identities_are_assigned_per_table() {
        let b = MemoryBackend::new();
        let body = RecordBody::new();
        assert_eq!(b.append_insert("a", "t", &body).await.unwrap(), RecordId(1));
        assert_eq!(b.append_insert("a", "t", &body).await.unwrap(), RecordId(2));
        assert_eq!(b.append_insert("a", "u", &body).await.unwrap(), RecordId(1));
        assert_eq!(b.append_insert("b", "t", &body).await.unwrap(), RecordId(1));
    }

    #[tokio::test]
    async fn switched_off_backend_is_unavailable() {
        let b = MemoryBackend::new();
        b.set_available(false);
        assert!(b.load("a").await.is_err());
        assert!(b.probe("a").await.is_err());
        b.set_available(true);
        assert!(b.load("a").await.unwrap().is_empty());
    }
}
