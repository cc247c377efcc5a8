//! [`DocumentStore`] over a [`FileStore`].

use std::path::Path;

use async_trait::async_trait;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use tessera_core::error::InvalidInputError;
use tessera_core::query::ordering::{skip_through, sort_records};
use tessera_core::{
    CREATED_AT, CollectionName, DocumentStore, FieldCondition, FieldWrites, Fields, Record,
    RecordId, Result, StoreError, StoreQuery, doc_path,
};

use crate::index::CompositeIndex;
use crate::store::FileStore;

/// Default cap on documents per atomic batch.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 500;

/// Filesystem-backed document store.
#[derive(Debug, Clone)]
pub struct FileBackend {
    store: FileStore,
    max_batch_size: usize,
}

impl FileBackend {
    /// Open (or lazily create) a store at the given root directory.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            store: FileStore::new(root),
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
        }
    }

    pub fn with_max_batch_size(mut self, limit: usize) -> Self {
        self.max_batch_size = limit;
        self
    }

    /// Access the underlying file store.
    pub fn store(&self) -> &FileStore {
        &self.store
    }

    /// List the declared composite indexes.
    pub fn indexes(&self) -> Result<Vec<CompositeIndex>> {
        self.store.read_indexes()
    }

    /// Declare a composite index. Returns false if an index of the same
    /// shape was already declared.
    #[instrument(skip(self, index), fields(index = %index))]
    pub fn declare_index(&self, index: CompositeIndex) -> Result<bool> {
        let _lock = self.store.lock_indexes()?;
        let mut indexes = self.store.read_indexes()?;
        if indexes.iter().any(|existing| existing.same_shape(&index)) {
            debug!("Index already declared");
            return Ok(false);
        }
        indexes.push(index);
        self.store.write_indexes(&indexes)?;
        info!("Declared composite index");
        Ok(true)
    }

    /// Create a document, stamping `created_at` with the store clock.
    ///
    /// A random id is generated when `id` is `None`. Fails if a document
    /// with the id already exists.
    #[instrument(skip(self, fields))]
    pub async fn insert(
        &self,
        collection: &CollectionName,
        id: Option<RecordId>,
        mut fields: Fields,
    ) -> Result<Record> {
        let id = match id {
            Some(id) => id,
            None => RecordId::new(Uuid::new_v4().simple().to_string())?,
        };

        let _lock = self.store.lock_exclusive(collection)?;
        if self.store.read_fields(collection, &id)?.is_some() {
            return Err(StoreError::InvalidInput(InvalidInputError::Other {
                message: format!("document {} already exists", doc_path(collection, &id)),
            }));
        }

        fields.insert(CREATED_AT.to_string(), FileStore::now());
        self.store.write_fields(collection, &id, &fields)?;

        debug!(path = %doc_path(collection, &id), "Inserted document");
        Ok(Record::new(id, fields))
    }

    fn check_index(&self, query: &StoreQuery) -> Result<()> {
        if !query.is_index_sensitive() {
            return Ok(());
        }
        let indexes = self.store.read_indexes()?;
        if indexes.iter().any(|index| index.serves(query)) {
            return Ok(());
        }

        let fields: Vec<&str> = query.filters.iter().map(|f| f.field.as_str()).collect();
        let sort = query
            .sort
            .as_ref()
            .map(|s| format!("{} {}", s.field, s.direction))
            .unwrap_or_default();
        Err(StoreError::IndexUnavailable {
            message: format!(
                "The query requires an index on {} [{}] by {}",
                query.collection,
                fields.join(", "),
                sort
            ),
        })
    }
}

#[async_trait]
impl DocumentStore for FileBackend {
    #[instrument(skip(self, query), fields(collection = %query.collection))]
    async fn query(&self, query: &StoreQuery) -> Result<Vec<Record>> {
        self.check_index(query)?;

        let _lock = self.store.lock_shared(&query.collection)?;
        let mut records = self.store.load_collection(&query.collection)?;
        records.retain(|r| r.matches(query.filter_pairs()));
        sort_records(&mut records, query.sort.as_ref());

        if let Some(key) = &query.start_after {
            let skipped = records.len() - skip_through(&records, key, query.sort.as_ref()).len();
            records.drain(..skipped);
        }
        if let Some(limit) = query.limit {
            records.truncate(limit as usize);
        }

        debug!(count = records.len(), "Query served");
        Ok(records)
    }

    #[instrument(skip(self))]
    async fn get(&self, collection: &CollectionName, id: &RecordId) -> Result<Record> {
        let _lock = self.store.lock_shared(collection)?;
        let fields = self.store.require_fields(collection, id)?;
        Ok(Record::new(id.clone(), fields))
    }

    #[instrument(skip(self, writes))]
    async fn merge_update(
        &self,
        collection: &CollectionName,
        id: &RecordId,
        writes: &FieldWrites,
    ) -> Result<()> {
        let _lock = self.store.lock_exclusive(collection)?;
        let mut fields = self.store.require_fields(collection, id)?;
        writes.merge_into(&mut fields, &FileStore::now());
        self.store.write_fields(collection, id, &fields)?;
        debug!(path = %doc_path(collection, id), "Merged update");
        Ok(())
    }

    #[instrument(skip(self, writes, condition), fields(field = %condition.field))]
    async fn merge_update_if(
        &self,
        collection: &CollectionName,
        id: &RecordId,
        writes: &FieldWrites,
        condition: &FieldCondition,
    ) -> Result<()> {
        let _lock = self.store.lock_exclusive(collection)?;
        let mut fields = self.store.require_fields(collection, id)?;
        if !condition.holds(&fields) {
            return Err(StoreError::PreconditionFailed {
                path: doc_path(collection, id),
            });
        }
        writes.merge_into(&mut fields, &FileStore::now());
        self.store.write_fields(collection, id, &fields)?;
        debug!(path = %doc_path(collection, id), "Merged conditional update");
        Ok(())
    }

    #[instrument(skip(self, ids, writes), fields(count = ids.len()))]
    async fn batch_update(
        &self,
        collection: &CollectionName,
        ids: &[RecordId],
        writes: &FieldWrites,
    ) -> Result<()> {
        if ids.len() > self.max_batch_size {
            return Err(StoreError::BatchTooLarge {
                requested: ids.len(),
                limit: self.max_batch_size,
            });
        }

        let _lock = self.store.lock_exclusive(collection)?;
        let now = FileStore::now();
        let mut staged = Vec::with_capacity(ids.len());
        for id in ids {
            let original = self.store.require_fields(collection, id)?;
            let mut updated = original.clone();
            writes.merge_into(&mut updated, &now);
            staged.push((id.clone(), original, updated));
        }

        self.store.write_batch(collection, &staged)
    }

    #[instrument(skip(self))]
    async fn delete(&self, collection: &CollectionName, id: &RecordId) -> Result<()> {
        let _lock = self.store.lock_exclusive(collection)?;
        if !self.store.remove(collection, id)? {
            return Err(StoreError::NotFound {
                path: doc_path(collection, id),
            });
        }
        debug!(path = %doc_path(collection, id), "Deleted document");
        Ok(())
    }

    fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }
}
