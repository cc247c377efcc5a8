//! Composite index declarations.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use tessera_core::{CollectionName, Sort, StoreQuery};

/// A composite index: equality fields plus one sort field.
///
/// Stored as an array in `<root>/indexes.json`:
///
/// ```json
/// [
///   {
///     "collection": "notifications",
///     "fields": ["user_id"],
///     "sort": { "field": "created_at", "direction": "descending" }
///   }
/// ]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositeIndex {
    pub collection: CollectionName,
    pub fields: Vec<String>,
    pub sort: Sort,
}

impl CompositeIndex {
    pub fn new(collection: CollectionName, fields: Vec<String>, sort: Sort) -> Self {
        Self {
            collection,
            fields,
            sort,
        }
    }

    /// Returns true if this index can serve `query` natively.
    ///
    /// The collection and sort must match exactly and the equality fields
    /// must be the same set, in any order.
    pub fn serves(&self, query: &StoreQuery) -> bool {
        if self.collection != query.collection || query.sort.as_ref() != Some(&self.sort) {
            return false;
        }
        let wanted: BTreeSet<&str> = query.filters.iter().map(|f| f.field.as_str()).collect();
        let covered: BTreeSet<&str> = self.fields.iter().map(String::as_str).collect();
        wanted == covered
    }

    /// Two declarations that serve the same queries.
    pub(crate) fn same_shape(&self, other: &CompositeIndex) -> bool {
        let ours: BTreeSet<&str> = self.fields.iter().map(String::as_str).collect();
        let theirs: BTreeSet<&str> = other.fields.iter().map(String::as_str).collect();
        self.collection == other.collection && self.sort == other.sort && ours == theirs
    }
}

impl fmt::Display for CompositeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] by {} {}",
            self.collection,
            self.fields.join(", "),
            self.sort.field,
            self.sort.direction
        )
    }
}
