//! Collection name type.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::InvalidInputError;

use super::segment_violation;

/// A validated collection name (e.g. `notifications`, `email_insights`).
///
/// # Example
///
/// ```
/// use tessera_core::CollectionName;
///
/// let tasks = CollectionName::new("tasks").unwrap();
/// assert_eq!(tasks.as_str(), "tasks");
/// assert!(CollectionName::new("tasks/1").is_err());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CollectionName(String);

impl CollectionName {
    /// Create a new collection name, validating the format.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty, too long, reserved, or contains
    /// a path separator.
    pub fn new(s: impl Into<String>) -> Result<Self, InvalidInputError> {
        let s = s.into();
        if let Some(reason) = segment_violation(&s) {
            return Err(InvalidInputError::Collection { value: s, reason });
        }
        Ok(Self(s))
    }

    /// Returns the collection name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CollectionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CollectionName {
    type Err = InvalidInputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for CollectionName {
    type Error = InvalidInputError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<CollectionName> for String {
    fn from(name: CollectionName) -> Self {
        name.0
    }
}

impl AsRef<str> for CollectionName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
