//! Connection settings for the HTTP store.

use std::time::Duration;

use tessera_core::{CollectionName, RecordId, StoreUrl};

/// Database used when none is configured.
pub const DEFAULT_DATABASE: &str = "(default)";

/// Per-request timeout used when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Largest commit the hosted store accepts.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 500;

/// Where and how to reach a hosted document store.
#[derive(Debug, Clone)]
pub struct HttpStoreConfig {
    pub base_url: StoreUrl,
    pub project: String,
    pub database: String,
    pub token: Option<String>,
    pub timeout: Duration,
    pub max_batch_size: usize,
}

impl HttpStoreConfig {
    pub fn new(base_url: StoreUrl, project: impl Into<String>) -> Self {
        Self {
            base_url,
            project: project.into(),
            database: DEFAULT_DATABASE.to_string(),
            token: None,
            timeout: DEFAULT_TIMEOUT,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
        }
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// Send `Authorization: Bearer <token>` with every request.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_batch_size(mut self, limit: usize) -> Self {
        self.max_batch_size = limit;
        self
    }

    /// Resource name of the database's document root.
    pub(crate) fn documents_root(&self) -> String {
        format!(
            "projects/{}/databases/{}/documents",
            self.project, self.database
        )
    }

    /// Full resource name of one document.
    pub(crate) fn document_name(&self, collection: &CollectionName, id: &RecordId) -> String {
        format!("{}/{}/{}", self.documents_root(), collection, id)
    }

    /// URL of an API resource or method below `v1/`.
    pub(crate) fn url(&self, resource: &str) -> String {
        self.base_url.endpoint(&format!("v1/{}", resource))
    }
}
