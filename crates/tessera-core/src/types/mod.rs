//! Validated identifier types.
//!
//! Collection names and record ids become path segments in every backend,
//! so they are checked once at construction.

mod collection;
mod record_id;
mod store_url;

pub use collection::CollectionName;
pub use record_id::RecordId;
pub use store_url::StoreUrl;

/// Maximum length of a collection name or record id, in bytes.
pub(crate) const MAX_SEGMENT_LEN: usize = 1500;

/// Checks the rules shared by collection names and record ids.
///
/// Returns the reason the segment is rejected, if any.
pub(crate) fn segment_violation(s: &str) -> Option<String> {
    if s.is_empty() {
        return Some("cannot be empty".to_string());
    }
    if s.len() > MAX_SEGMENT_LEN {
        return Some(format!(
            "exceeds maximum length of {} bytes",
            MAX_SEGMENT_LEN
        ));
    }
    if s == "." || s == ".." {
        return Some("cannot be '.' or '..'".to_string());
    }
    if s.starts_with("__") && s.ends_with("__") {
        return Some("names matching __*__ are reserved".to_string());
    }
    if let Some(c) = s.chars().find(|c| matches!(c, '/' | '\\') || c.is_control()) {
        return Some(format!("contains invalid character {:?}", c));
    }
    None
}
