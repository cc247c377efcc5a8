//! Document store trait.

use async_trait::async_trait;

use crate::Result;
use crate::query::StoreQuery;
use crate::record::{FieldCondition, FieldWrites, Record};
use crate::types::{CollectionName, RecordId};

/// A hosted or local document database.
///
/// Implementations report failures as typed [`StoreError`](crate::StoreError)
/// values; in particular a sorted query with equality filters that lacks a
/// composite index must fail with `IndexUnavailable` so the reader can fall
/// back.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Run a query.
    ///
    /// Records come back in the order defined by
    /// [`ordering`](crate::query::ordering) for `query.sort`, starting
    /// strictly after `query.start_after` and capped at `query.limit`.
    async fn query(&self, query: &StoreQuery) -> Result<Vec<Record>>;

    /// Fetch one document. Fails with `NotFound` if it does not exist.
    async fn get(&self, collection: &CollectionName, id: &RecordId) -> Result<Record>;

    /// Merge `writes` into an existing document.
    ///
    /// Fails with `NotFound` if the document does not exist.
    async fn merge_update(
        &self,
        collection: &CollectionName,
        id: &RecordId,
        writes: &FieldWrites,
    ) -> Result<()>;

    /// Merge `writes` into an existing document if `condition` still holds.
    ///
    /// The check and the write are atomic with respect to other writers.
    /// Fails with `PreconditionFailed` if the stored document no longer
    /// satisfies `condition`, and with `NotFound` if it does not exist.
    async fn merge_update_if(
        &self,
        collection: &CollectionName,
        id: &RecordId,
        writes: &FieldWrites,
        condition: &FieldCondition,
    ) -> Result<()>;

    /// Merge `writes` into every listed document as one atomic unit.
    ///
    /// Either every document is updated or none is.
    async fn batch_update(
        &self,
        collection: &CollectionName,
        ids: &[RecordId],
        writes: &FieldWrites,
    ) -> Result<()>;

    /// Delete a document. Fails with `NotFound` if it does not exist.
    async fn delete(&self, collection: &CollectionName, id: &RecordId) -> Result<()>;

    /// Largest number of documents one atomic batch may touch.
    fn max_batch_size(&self) -> usize;
}
