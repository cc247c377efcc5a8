//! Review status of extracted items (email insights and the like).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::InvalidInputError;
use crate::record::Fields;

/// Review state of a document produced by the extraction pipeline.
///
/// `Pending` moves to `Approved` or `Rejected`; both are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl ReviewStatus {
    /// Field holding the status.
    pub const FIELD: &'static str = "status";

    /// Field stamped with the store clock when a review decision is made.
    pub const REVIEWED_AT: &'static str = "reviewed_at";

    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::Pending => "pending",
            ReviewStatus::Approved => "approved",
            ReviewStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ReviewStatus::Pending)
    }

    pub fn can_transition_to(&self, next: ReviewStatus) -> bool {
        *self == ReviewStatus::Pending && next.is_terminal()
    }

    /// Status of a stored document. A missing or null field reads as pending.
    ///
    /// # Errors
    ///
    /// Returns an error if the field holds anything but a known status string.
    pub fn from_fields(fields: &Fields) -> Result<Self, InvalidInputError> {
        match fields.get(Self::FIELD) {
            None | Some(Value::Null) => Ok(ReviewStatus::Pending),
            Some(Value::String(s)) => s.parse(),
            Some(other) => Err(InvalidInputError::Status {
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReviewStatus {
    type Err = InvalidInputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ReviewStatus::Pending),
            "approved" => Ok(ReviewStatus::Approved),
            "rejected" => Ok(ReviewStatus::Rejected),
            _ => Err(InvalidInputError::Status {
                value: s.to_string(),
            }),
        }
    }
}
