//! Arrow snapshot of a table, for handing diagnostics to offline analysis.

use std::sync::Arc;

use arrow::array::{ArrayRef, StringArray, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use furion_types::StoredRecord;

use crate::{LocalStore, StoreError};

/// `id: UInt64` plus the record body serialized as JSON in `payload: Utf8`.
pub fn snapshot_schema() -> Schema {
    Schema::new(vec![
        Field::new("id", DataType::UInt64, false),
        Field::new("payload", DataType::Utf8, false),
    ])
}

pub fn records_to_batch(records: &[StoredRecord]) -> Result<RecordBatch, StoreError> {
    let ids: Vec<u64> = records.iter().map(|r| r.id.0).collect();
    let payloads = records
        .iter()
        .map(|r| serde_json::to_string(&r.body))
        .collect::<Result<Vec<String>, _>>()
        .map_err(|e| StoreError::Export(e.to_string()))?;

    let columns: Vec<ArrayRef> = vec![
        Arc::new(UInt64Array::from(ids)),
        Arc::new(StringArray::from(payloads)),
    ];
    RecordBatch::try_new(Arc::new(snapshot_schema()), columns)
        .map_err(|e| StoreError::Export(e.to_string()))
}

impl LocalStore {
    /// Current contents of `table` as one Arrow batch.
    pub async fn export(&self, table: &str) -> Result<RecordBatch, StoreError> {
        let records = self.scan(table).await?;
        records_to_batch(&records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::Array;
    use furion_types::RecordId;
    use serde_json::json;

    #[test]
    fn batch_has_one_row_per_record() {
        let records = vec![
            StoredRecord {
                id: RecordId(1),
                body: json!({"source": "route-a"}).as_object().unwrap().clone(),
            },
            StoredRecord {
                id: RecordId(4),
                body: Default::default(),
            },
        ];
        let batch = records_to_batch(&records).unwrap();
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.num_columns(), 2);

        let ids = batch
            .column(0)
            .as_any()
            .downcast_ref::<UInt64Array>()
            .unwrap();
        assert_eq!(ids.value(1), 4);
        let payloads = batch
            .column(1)
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(payloads.value(0), r#"{"source":"route-a"}"#);
        assert_eq!(payloads.value(1), "{}");
        assert!(!ids.is_null(0));
    }

    #[test]
    fn empty_snapshot_is_valid() {
        let batch = records_to_batch(&[]).unwrap();
        assert_eq!(batch.num_rows(), 0);
    }
}
