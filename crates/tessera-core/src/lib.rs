//! tessera-core - resilient reads and audited writes over document stores.
//!
//! Application pages hand a [`QueryDescriptor`] to a [`ResilientReader`] and
//! get back records in the requested order, whether or not the store has the
//! composite index the query needs. Changes go through a
//! [`MutationGateway`], which stamps every update with the store's clock.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use serde_json::json;
//! use tessera_core::{
//!     CollectionName, Direction, DocumentStore, MutationGateway, MutationRequest,
//!     QueryDescriptor, RecordId, ResilientReader,
//! };
//!
//! # async fn example<S: DocumentStore>(store: Arc<S>) -> Result<(), Box<dyn std::error::Error>> {
//! let reader = ResilientReader::new(store.clone());
//! let gateway = MutationGateway::new(store);
//!
//! let notifications = CollectionName::new("notifications")?;
//! let page = reader
//!     .read(
//!         &QueryDescriptor::new(notifications.clone())
//!             .filter("user_id", json!("u1"))
//!             .order_by("created_at", Direction::Descending)
//!             .limit(20),
//!     )
//!     .await?;
//!
//! if page.degraded {
//!     eprintln!("index still building; results sorted locally");
//! }
//!
//! let mut fields = serde_json::Map::new();
//! fields.insert("is_read".into(), json!(true));
//! gateway
//!     .apply(MutationRequest::Update {
//!         collection: notifications,
//!         id: RecordId::new("n1")?,
//!         fields,
//!     })
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod gateway;
pub mod query;
pub mod reader;
pub mod record;
pub mod status;
pub mod traits;
pub mod types;

pub use error::{InvalidInputError, MutationError, ProtocolError, ReadError, StoreError};
pub use gateway::{Ack, MutationGateway, MutationRequest};
pub use query::{Cursor, Direction, Filter, QueryDescriptor, Sort, SortKey, StoreQuery};
pub use reader::{OrderedRecords, ResilientReader};
pub use record::{
    CREATED_AT, FieldCondition, FieldWrites, Fields, Record, UPDATED_AT, WriteValue, doc_path,
};
pub use status::ReviewStatus;
pub use traits::DocumentStore;
pub use types::{CollectionName, RecordId, StoreUrl};

/// Result type for store operations.
pub type Result<T, E = StoreError> = std::result::Result<T, E>;
