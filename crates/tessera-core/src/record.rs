//! Records and field writes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::query::{Sort, SortKey};
use crate::types::{CollectionName, RecordId};

/// Schema-flexible field map of a document.
pub type Fields = serde_json::Map<String, Value>;

/// Field stamped with the store clock on every update.
pub const UPDATED_AT: &str = "updated_at";

/// Field stamped with the store clock when a record is created.
pub const CREATED_AT: &str = "created_at";

/// One document of a collection.
///
/// Records are snapshots: changing a record means sending a
/// [`MutationRequest`](crate::MutationRequest) and reading again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Identifier, unique within the collection.
    pub id: RecordId,

    /// Field values.
    #[serde(default)]
    pub fields: Fields,
}

impl Record {
    /// Create a record from its id and fields.
    pub fn new(id: RecordId, fields: Fields) -> Self {
        Self { id, fields }
    }

    /// Get a field value.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Returns true if every `(field, value)` pair holds on this record.
    pub fn matches<'a>(&self, mut filters: impl Iterator<Item = (&'a str, &'a Value)>) -> bool {
        filters.all(|(field, value)| self.fields.get(field) == Some(value))
    }

    /// Position of this record in the order defined by `sort`.
    pub fn sort_key(&self, sort: Option<&Sort>) -> SortKey {
        let value = sort
            .and_then(|s| self.fields.get(&s.field))
            .filter(|v| !v.is_null())
            .cloned();
        SortKey {
            value,
            id: self.id.clone(),
        }
    }
}

/// Slash-separated document path, used in error messages and logs.
pub fn doc_path(collection: &CollectionName, id: &RecordId) -> String {
    format!("{}/{}", collection, id)
}

/// A value to write into a field.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteValue {
    /// A literal JSON value.
    Value(Value),

    /// Replaced by the store's own clock at write time.
    ServerTimestamp,
}

/// The set of fields written by one update, merged into the target document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldWrites(BTreeMap<String, WriteValue>);

impl FieldWrites {
    /// Create an empty write set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field to a literal value.
    pub fn set(mut self, field: impl Into<String>, value: Value) -> Self {
        self.0.insert(field.into(), WriteValue::Value(value));
        self
    }

    /// Set a field to the store's clock.
    pub fn server_timestamp(mut self, field: impl Into<String>) -> Self {
        self.0.insert(field.into(), WriteValue::ServerTimestamp);
        self
    }

    /// Returns true if no field is written.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of written fields.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate over the written fields in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &WriteValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Names of the written fields.
    pub fn field_paths(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Merge these writes into `fields`, substituting `now` for every
    /// server timestamp.
    pub fn merge_into(&self, fields: &mut Fields, now: &Value) {
        for (field, value) in &self.0 {
            let value = match value {
                WriteValue::Value(v) => v.clone(),
                WriteValue::ServerTimestamp => now.clone(),
            };
            fields.insert(field.clone(), value);
        }
    }
}

/// A field value a conditional write requires the stored document to hold.
///
/// `expected: None` matches a field that is missing or null.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldCondition {
    pub field: String,
    pub expected: Option<Value>,
}

impl FieldCondition {
    pub fn new(field: impl Into<String>, expected: Option<Value>) -> Self {
        Self {
            field: field.into(),
            expected: expected.filter(|v| !v.is_null()),
        }
    }

    /// Returns true if `fields` holds the expected value.
    pub fn holds(&self, fields: &Fields) -> bool {
        fields.get(&self.field).filter(|v| !v.is_null()) == self.expected.as_ref()
    }
}

impl From<Fields> for FieldWrites {
    fn from(fields: Fields) -> Self {
        Self(
            fields
                .into_iter()
                .map(|(k, v)| (k, WriteValue::Value(v)))
                .collect(),
        )
    }
}
