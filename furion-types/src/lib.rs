use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Name of the implicit identity column on every auto-increment table.
pub const IDENTITY_FIELD: &str = "id";

/// Identity assigned by the store on insert. Never reused after deletion.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub u64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonically increasing schema version. `0` means "nothing created yet".
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaVersion(pub u32);

impl SchemaVersion {
    pub const EMPTY: SchemaVersion = SchemaVersion(0);
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Attribute set of a record. Open by design: no field is assumed beyond identity.
pub type RecordBody = Map<String, Value>;

/// A record as held by the store: identity plus its body.
#[derive(Clone, Debug, PartialEq)]
pub struct StoredRecord {
    pub id: RecordId,
    pub body: RecordBody,
}

impl StoredRecord {
    /// JSON view with the identity merged into the body, e.g. `{"id":1,"source":"route-a"}`.
    pub fn to_json(&self) -> Value {
        let mut obj = Map::with_capacity(self.body.len() + 1);
        obj.insert(IDENTITY_FIELD.to_string(), Value::from(self.id.0));
        for (k, v) in &self.body {
            obj.insert(k.clone(), v.clone());
        }
        Value::Object(obj)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn stored_record_merges_identity() {
        let body = json!({"source": "route-a", "detail": "timeout"});
        let rec = StoredRecord {
            id: RecordId(1),
            body: body.as_object().unwrap().clone(),
        };
        assert_eq!(
            rec.to_json(),
            json!({"id": 1, "source": "route-a", "detail": "timeout"})
        );
    }

    #[test]
    fn versions_order() {
        assert!(SchemaVersion::EMPTY < SchemaVersion(1));
        assert_eq!(SchemaVersion(3).to_string(), "v3");
    }
}
