//! Query descriptors.
//!
//! A [`QueryDescriptor`] is what callers hand to
//! [`ResilientReader::read`](crate::ResilientReader::read). The reader turns
//! it into one or two [`StoreQuery`] values for the backend.

mod cursor;
pub mod ordering;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::InvalidInputError;
use crate::types::CollectionName;

pub use cursor::{Cursor, SortKey};

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Ascending => "asc",
            Direction::Descending => "desc",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = InvalidInputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(Direction::Ascending),
            "desc" | "descending" => Ok(Direction::Descending),
            _ => Err(InvalidInputError::Other {
                message: format!("unknown sort direction '{}'", s),
            }),
        }
    }
}

/// Requested ordering: one field and a direction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sort {
    pub field: String,
    pub direction: Direction,
}

impl Sort {
    pub fn new(field: impl Into<String>, direction: Direction) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }
}

/// Equality filter: `field == value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub field: String,
    pub value: Value,
}

impl Filter {
    pub fn new(field: impl Into<String>, value: Value) -> Self {
        Self {
            field: field.into(),
            value,
        }
    }
}

/// An immutable description of a read.
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use tessera_core::{CollectionName, Direction, QueryDescriptor};
///
/// let query = QueryDescriptor::new(CollectionName::new("notifications").unwrap())
///     .filter("user_id", json!("u1"))
///     .order_by("created_at", Direction::Descending)
///     .limit(20);
///
/// assert!(query.is_index_sensitive());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct QueryDescriptor {
    collection: CollectionName,
    filters: Vec<Filter>,
    sort: Option<Sort>,
    limit: Option<u32>,
    cursor: Option<Cursor>,
}

impl QueryDescriptor {
    /// Start a query over a whole collection.
    pub fn new(collection: CollectionName) -> Self {
        Self {
            collection,
            filters: Vec::new(),
            sort: None,
            limit: None,
            cursor: None,
        }
    }

    /// Add an equality filter. Filters combine with AND.
    pub fn filter(mut self, field: impl Into<String>, value: Value) -> Self {
        self.filters.push(Filter::new(field, value));
        self
    }

    /// Order results by `field`.
    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.sort = Some(Sort::new(field, direction));
        self
    }

    /// Cap the number of returned records. Must be positive.
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Resume after the position encoded in `cursor`.
    pub fn after(mut self, cursor: Cursor) -> Self {
        self.cursor = Some(cursor);
        self
    }

    pub fn collection(&self) -> &CollectionName {
        &self.collection
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn sort(&self) -> Option<&Sort> {
        self.sort.as_ref()
    }

    pub fn limit_value(&self) -> Option<u32> {
        self.limit
    }

    pub fn cursor(&self) -> Option<&Cursor> {
        self.cursor.as_ref()
    }

    /// A sorted query with equality filters may need a composite index.
    pub fn is_index_sensitive(&self) -> bool {
        self.sort.is_some() && !self.filters.is_empty()
    }

    /// Identity of the query shape (collection, filters, sort), ignoring
    /// limit and cursor. Cursors carry it so they cannot be replayed
    /// against another query.
    ///
    /// The identity is the compact JSON of the shape with filters in field
    /// order, so it is stable across builds and platforms.
    pub fn fingerprint(&self) -> String {
        let mut filters: Vec<(&str, &Value)> = self
            .filters
            .iter()
            .map(|f| (f.field.as_str(), &f.value))
            .collect();
        filters.sort_by(|a, b| a.0.cmp(b.0).then_with(|| a.1.to_string().cmp(&b.1.to_string())));

        json!({
            "c": self.collection.as_str(),
            "f": filters,
            "s": self.sort,
        })
        .to_string()
    }
}

/// The query a backend is asked to run.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreQuery {
    pub collection: CollectionName,
    pub filters: Vec<Filter>,
    pub sort: Option<Sort>,
    pub limit: Option<u32>,
    /// Only return records strictly after this position.
    pub start_after: Option<SortKey>,
}

impl StoreQuery {
    /// The same equality filters with no sort, cap or cursor.
    pub fn filters_only(&self) -> Self {
        Self {
            collection: self.collection.clone(),
            filters: self.filters.clone(),
            sort: None,
            limit: None,
            start_after: None,
        }
    }

    /// Filters as `(field, value)` pairs.
    pub fn filter_pairs(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.filters.iter().map(|f| (f.field.as_str(), &f.value))
    }

    /// Returns true if the query needs a composite index.
    pub fn is_index_sensitive(&self) -> bool {
        self.sort.is_some() && !self.filters.is_empty()
    }
}
