use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An opaque record as returned by a source, plus any fields derived by the
/// pipeline (e.g. a key copied from a parent request onto a detail record).
///
/// Ownership passes to every sink that accepts the record; from that point
/// it is read-only.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HarvestedRecord(Map<String, Value>);

impl HarvestedRecord {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Accepts JSON objects only; sources report records as objects.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self(fields)),
            _ => None,
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Attaches a derived field, replacing any source-supplied value.
    pub fn set(&mut self, field: impl Into<String>, value: Value) {
        self.0.insert(field.into(), value);
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for HarvestedRecord {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}
