use std::sync::Arc;

use furion_schema::{furion_kit_schema, FURION_KIT_DATABASE, FURION_KIT_VERSION, ROUTING_DIAGNOSIS};
use furion_types::{RecordBody, RecordId, StoredRecord};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::{LocalStore, StorageBackend, StoreError};

/// The dashboard's routing-diagnosis table, opened at the fixed schema.
///
/// Cheap to clone; every clone shares one handle and one write lock.
#[derive(Clone)]
pub struct DiagnosticStore {
    inner: Arc<LocalStore>,
}

impl DiagnosticStore {
    pub async fn open(backend: Arc<dyn StorageBackend>) -> Result<Self, StoreError> {
        Self::open_named(backend, FURION_KIT_DATABASE).await
    }

    pub async fn open_named(
        backend: Arc<dyn StorageBackend>,
        name: &str,
    ) -> Result<Self, StoreError> {
        let migrations = furion_kit_schema()?;
        let inner = LocalStore::open(backend, name, FURION_KIT_VERSION, &migrations).await?;
        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    pub fn store(&self) -> &LocalStore {
        &self.inner
    }

    pub async fn insert(&self, record: RecordBody) -> Result<RecordId, StoreError> {
        self.inner.insert(ROUTING_DIAGNOSIS, record).await
    }

    /// Insert any serializable value that renders as a JSON object without `id`.
    pub async fn insert_as<T: Serialize>(&self, record: &T) -> Result<RecordId, StoreError> {
        let value =
            serde_json::to_value(record).map_err(|e| StoreError::InvalidRecord(e.to_string()))?;
        self.inner.insert_json(ROUTING_DIAGNOSIS, value).await
    }

    pub async fn get(&self, id: RecordId) -> Result<Option<StoredRecord>, StoreError> {
        self.inner.get(ROUTING_DIAGNOSIS, id).await
    }

    /// Typed lookup; the identity is visible to `T` as field `id`.
    pub async fn get_as<T: DeserializeOwned>(&self, id: RecordId) -> Result<Option<T>, StoreError> {
        match self.get(id).await? {
            Some(rec) => serde_json::from_value(rec.to_json())
                .map(Some)
                .map_err(|e| StoreError::InvalidRecord(e.to_string())),
            None => Ok(None),
        }
    }

    pub async fn delete(&self, id: RecordId) -> Result<(), StoreError> {
        self.inner.delete(ROUTING_DIAGNOSIS, id).await
    }

    pub async fn scan(&self) -> Result<Vec<StoredRecord>, StoreError> {
        self.inner.scan(ROUTING_DIAGNOSIS).await
    }
}
