//! Store wrapper for CLI use.

use async_trait::async_trait;

use tessera_core::{
    CollectionName, DocumentStore, FieldCondition, FieldWrites, Record, RecordId, Result,
    StoreQuery,
};
use tessera_file::FileBackend;
use tessera_http::HttpStore;

/// Either backend, chosen by the store URL scheme.
#[derive(Debug)]
pub enum CliStore {
    File(FileBackend),
    Http(HttpStore),
}

impl CliStore {
    pub fn as_file(&self) -> Option<&FileBackend> {
        match self {
            CliStore::File(store) => Some(store),
            CliStore::Http(_) => None,
        }
    }
}

#[async_trait]
impl DocumentStore for CliStore {
    async fn query(&self, query: &StoreQuery) -> Result<Vec<Record>> {
        match self {
            CliStore::File(store) => store.query(query).await,
            CliStore::Http(store) => store.query(query).await,
        }
    }

    async fn get(&self, collection: &CollectionName, id: &RecordId) -> Result<Record> {
        match self {
            CliStore::File(store) => store.get(collection, id).await,
            CliStore::Http(store) => store.get(collection, id).await,
        }
    }

    async fn merge_update(
        &self,
        collection: &CollectionName,
        id: &RecordId,
        writes: &FieldWrites,
    ) -> Result<()> {
        match self {
            CliStore::File(store) => store.merge_update(collection, id, writes).await,
            CliStore::Http(store) => store.merge_update(collection, id, writes).await,
        }
    }

    async fn merge_update_if(
        &self,
        collection: &CollectionName,
        id: &RecordId,
        writes: &FieldWrites,
        condition: &FieldCondition,
    ) -> Result<()> {
        match self {
            CliStore::File(store) => {
                store
                    .merge_update_if(collection, id, writes, condition)
                    .await
            }
            CliStore::Http(store) => {
                store
                    .merge_update_if(collection, id, writes, condition)
                    .await
            }
        }
    }

    async fn batch_update(
        &self,
        collection: &CollectionName,
        ids: &[RecordId],
        writes: &FieldWrites,
    ) -> Result<()> {
        match self {
            CliStore::File(store) => store.batch_update(collection, ids, writes).await,
            CliStore::Http(store) => store.batch_update(collection, ids, writes).await,
        }
    }

    async fn delete(&self, collection: &CollectionName, id: &RecordId) -> Result<()> {
        match self {
            CliStore::File(store) => store.delete(collection, id).await,
            CliStore::Http(store) => store.delete(collection, id).await,
        }
    }

    fn max_batch_size(&self) -> usize {
        match self {
            CliStore::File(store) => store.max_batch_size(),
            CliStore::Http(store) => store.max_batch_size(),
        }
    }
}
