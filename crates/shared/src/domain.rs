use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A loosely typed entity as exchanged with the remote collection endpoint.
pub type Record = Map<String, Value>;

pub const DEFAULT_ID_FIELD: &str = "id";
pub const CREATED_AT_FIELD: &str = "createdAt";
pub const UPDATED_AT_FIELD: &str = "updatedAt";

/// Names the attribute that carries a record's identifier.
///
/// Most collections key on `id`, but some entities are addressed by an
/// externally issued identifier (`uid`, `accountId`, ...). Lookups go through
/// this accessor so the rest of the engine never hardcodes the field name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityKey(String);

impl Default for EntityKey {
    fn default() -> Self {
        Self(DEFAULT_ID_FIELD.to_string())
    }
}

impl EntityKey {
    pub fn new(field: impl Into<String>) -> Self {
        Self(field.into())
    }

    pub fn field(&self) -> &str {
        &self.0
    }

    /// Reads the identifier. Numeric identifiers are rendered in decimal.
    pub fn id_of(&self, record: &Record) -> Option<String> {
        match record.get(&self.0)? {
            Value::String(id) => Some(id.clone()),
            Value::Number(id) => Some(id.to_string()),
            _ => None,
        }
    }

    pub fn matches(&self, record: &Record, id: &str) -> bool {
        match record.get(&self.0) {
            Some(Value::String(value)) => value == id,
            Some(Value::Number(value)) => value.to_string() == id,
            _ => false,
        }
    }

    pub fn set_id(&self, record: &mut Record, id: impl Into<String>) {
        record.insert(self.0.clone(), Value::String(id.into()));
    }

    pub fn position(&self, records: &[Record], id: &str) -> Option<usize> {
        records.iter().position(|record| self.matches(record, id))
    }
}

/// Shallow merge: every top-level field of `overlay` replaces the one in `base`.
pub fn merge_fields(base: &mut Record, overlay: &Record) {
    for (field, value) in overlay {
        base.insert(field.clone(), value.clone());
    }
}

/// Current time as an RFC 3339 timestamp with millisecond precision (`2024-05-01T10:00:00.000Z`).
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
