//! Store URL type.

use std::fmt;
use std::path::PathBuf;
use url::Url;

use crate::error::InvalidInputError;

/// Where a store lives: a hosted endpoint (HTTPS, or HTTP on localhost)
/// or a directory (`file://`).
///
/// # Example
///
/// ```
/// use tessera_core::StoreUrl;
///
/// let remote = StoreUrl::new("https://firestore.googleapis.com").unwrap();
/// assert_eq!(remote.endpoint("v1/projects/demo"),
///            "https://firestore.googleapis.com/v1/projects/demo");
///
/// let local = StoreUrl::new("file:///tmp/assistant-store").unwrap();
/// assert!(local.is_local());
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreUrl(Url);

impl StoreUrl {
    /// Create a new store URL from a string, validating the format.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL does not parse, is relative, or uses
    /// plain HTTP against a non-local host.
    pub fn new(s: impl AsRef<str>) -> Result<Self, InvalidInputError> {
        let raw = s.as_ref();
        let rejected = |reason: String| InvalidInputError::StoreUrl {
            value: raw.to_string(),
            reason,
        };

        let mut url = Url::parse(raw).map_err(|e| rejected(e.to_string()))?;
        if let Some(reason) = Self::problem(&url) {
            return Err(rejected(reason.to_string()));
        }
        if url.path() == "/" {
            url.set_path("");
        }
        Ok(Self(url))
    }

    /// Returns the URL of an API path below this base.
    pub fn endpoint(&self, path: &str) -> String {
        // `Url` keeps a trailing slash on root paths.
        let base = self.0.as_str().trim_end_matches('/');
        format!("{}/{}", base, path.trim_start_matches('/'))
    }

    /// Returns true for filesystem stores (`file://`).
    pub fn is_local(&self) -> bool {
        self.0.scheme() == "file"
    }

    /// Returns the filesystem path for `file://` URLs.
    pub fn to_file_path(&self) -> Option<PathBuf> {
        if self.is_local() {
            self.0.to_file_path().ok()
        } else {
            None
        }
    }

    fn problem(url: &Url) -> Option<&'static str> {
        if url.cannot_be_a_base() {
            return Some("must be an absolute URL");
        }
        match url.scheme() {
            "file" if url.path().is_empty() => Some("file:// URL must have a path"),
            "file" | "https" => None,
            "http" => match url.host_str() {
                Some("localhost" | "127.0.0.1" | "[::1]") => None,
                _ => Some("must use HTTPS (HTTP allowed only for localhost)"),
            },
            _ => Some("must use https:// or file://"),
        }
    }
}

impl fmt::Display for StoreUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
