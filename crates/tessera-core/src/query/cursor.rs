//! Pagination cursors.

use std::fmt;
use std::str::FromStr;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{InvalidInputError, ReadError};
use crate::types::RecordId;

/// A position in the total order `(sort value, id)`.
///
/// `value` is `None` when the record has no value for the sort field (or
/// the query is unsorted); such records come after every present value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortKey {
    #[serde(rename = "v", default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(rename = "i")]
    pub id: RecordId,
}

/// "Resume after this record", bound to the query that produced it.
///
/// The cursor holds the sort key of the last record of a page rather than a
/// backend token, so it stays meaningful whether the page was served by the
/// store's sorted query or by the client-side fallback. Callers see it as an
/// opaque URL-safe string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cursor {
    #[serde(rename = "q")]
    fingerprint: String,
    #[serde(flatten)]
    key: SortKey,
}

impl Cursor {
    pub(crate) fn new(fingerprint: String, key: SortKey) -> Self {
        Self { fingerprint, key }
    }

    /// The position this cursor resumes after.
    pub fn key(&self) -> &SortKey {
        &self.key
    }

    /// Opaque string form.
    pub fn encode(&self) -> String {
        // A struct of strings and JSON values always serializes.
        let json = serde_json::to_vec(self).unwrap_or_default();
        URL_SAFE_NO_PAD.encode(json)
    }

    /// Parse the opaque string form.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is not one this crate produced.
    pub fn decode(token: &str) -> Result<Self, InvalidInputError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(token.trim())
            .map_err(|e| InvalidInputError::Cursor {
                reason: e.to_string(),
            })?;
        serde_json::from_slice(&bytes).map_err(|e| InvalidInputError::Cursor {
            reason: e.to_string(),
        })
    }

    /// The resume position, if this cursor was issued for `fingerprint`.
    pub(crate) fn resolve(&self, fingerprint: &str) -> Result<&SortKey, ReadError> {
        if self.fingerprint != fingerprint {
            return Err(ReadError::InvalidCursor {
                reason: "cursor was issued for a different query".to_string(),
            });
        }
        Ok(&self.key)
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for Cursor {
    type Err = InvalidInputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}
