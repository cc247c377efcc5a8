#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde_json::Value;

use tessera_core::query::ordering::{skip_through, sort_records};
use tessera_core::{
    CollectionName, DocumentStore, FieldCondition, FieldWrites, Fields, Record, RecordId, Result,
    StoreError, StoreQuery, doc_path,
};

type Collection = BTreeMap<RecordId, Fields>;

/// A write that lands just before the next conditional write is checked.
struct CompetingWrite {
    collection: CollectionName,
    id: RecordId,
    fields: Fields,
}

/// In-memory store with switchable index support and write fault injection.
pub struct MockStore {
    docs: Mutex<BTreeMap<CollectionName, Collection>>,
    indexed: bool,
    batch_limit: usize,
    fail_batch_write: Mutex<Option<usize>>,
    competing_write: Mutex<Option<CompetingWrite>>,
    clock: AtomicU64,
    queries: Mutex<Vec<StoreQuery>>,
}

impl MockStore {
    /// A store that serves every sorted query natively.
    pub fn new() -> Self {
        Self {
            docs: Mutex::new(BTreeMap::new()),
            indexed: true,
            batch_limit: 500,
            fail_batch_write: Mutex::new(None),
            competing_write: Mutex::new(None),
            clock: AtomicU64::new(0),
            queries: Mutex::new(Vec::new()),
        }
    }

    /// A store that rejects every sorted query with `IndexUnavailable`.
    pub fn without_indexes() -> Self {
        Self {
            indexed: false,
            ..Self::new()
        }
    }

    pub fn with_batch_limit(mut self, limit: usize) -> Self {
        self.batch_limit = limit;
        self
    }

    /// Make the `n`th write (1-based) of the next batch fail.
    pub fn fail_batch_write(&self, n: usize) {
        *self.fail_batch_write.lock().unwrap() = Some(n);
    }

    /// Let another writer merge `fields` into a document between the read
    /// and the write of the next conditional update.
    pub fn race_next_conditional_write(&self, collection: &str, id: &str, fields: Value) {
        let Value::Object(fields) = fields else {
            panic!("fields must be an object");
        };
        *self.competing_write.lock().unwrap() = Some(CompetingWrite {
            collection: CollectionName::new(collection).unwrap(),
            id: RecordId::new(id).unwrap(),
            fields,
        });
    }

    pub fn insert(&self, collection: &str, id: &str, fields: Value) {
        let Value::Object(fields) = fields else {
            panic!("fields must be an object");
        };
        self.docs
            .lock()
            .unwrap()
            .entry(CollectionName::new(collection).unwrap())
            .or_default()
            .insert(RecordId::new(id).unwrap(), fields);
    }

    pub fn fields(&self, collection: &str, id: &str) -> Option<Fields> {
        self.docs
            .lock()
            .unwrap()
            .get(&CollectionName::new(collection).unwrap())
            .and_then(|c| c.get(&RecordId::new(id).unwrap()))
            .cloned()
    }

    pub fn queries(&self) -> Vec<StoreQuery> {
        self.queries.lock().unwrap().clone()
    }

    fn now(&self) -> Value {
        let tick = self.clock.fetch_add(1, Ordering::SeqCst) + 1;
        Value::String(format!("2024-06-01T00:00:00.{:06}Z", tick))
    }

    fn not_found(collection: &CollectionName, id: &RecordId) -> StoreError {
        StoreError::NotFound {
            path: doc_path(collection, id),
        }
    }
}

#[async_trait]
impl DocumentStore for MockStore {
    async fn query(&self, query: &StoreQuery) -> Result<Vec<Record>> {
        self.queries.lock().unwrap().push(query.clone());

        if query.sort.is_some() && !self.indexed {
            return Err(StoreError::IndexUnavailable {
                message: "The query requires an index".to_string(),
            });
        }

        let mut records: Vec<Record> = self
            .docs
            .lock()
            .unwrap()
            .get(&query.collection)
            .map(|c| {
                c.iter()
                    .map(|(id, fields)| Record::new(id.clone(), fields.clone()))
                    .filter(|r| r.matches(query.filter_pairs()))
                    .collect()
            })
            .unwrap_or_default();

        sort_records(&mut records, query.sort.as_ref());
        if let Some(key) = &query.start_after {
            records = skip_through(&records, key, query.sort.as_ref()).to_vec();
        }
        if let Some(limit) = query.limit {
            records.truncate(limit as usize);
        }
        Ok(records)
    }

    async fn get(&self, collection: &CollectionName, id: &RecordId) -> Result<Record> {
        self.docs
            .lock()
            .unwrap()
            .get(collection)
            .and_then(|c| c.get(id))
            .map(|fields| Record::new(id.clone(), fields.clone()))
            .ok_or_else(|| Self::not_found(collection, id))
    }

    async fn merge_update(
        &self,
        collection: &CollectionName,
        id: &RecordId,
        writes: &FieldWrites,
    ) -> Result<()> {
        let now = self.now();
        let mut docs = self.docs.lock().unwrap();
        let fields = docs
            .get_mut(collection)
            .and_then(|c| c.get_mut(id))
            .ok_or_else(|| Self::not_found(collection, id))?;
        writes.merge_into(fields, &now);
        Ok(())
    }

    async fn merge_update_if(
        &self,
        collection: &CollectionName,
        id: &RecordId,
        writes: &FieldWrites,
        condition: &FieldCondition,
    ) -> Result<()> {
        let now = self.now();
        let competing = self.competing_write.lock().unwrap().take();
        let mut docs = self.docs.lock().unwrap();

        if let Some(write) = competing {
            if let Some(fields) = docs
                .get_mut(&write.collection)
                .and_then(|c| c.get_mut(&write.id))
            {
                fields.extend(write.fields);
            }
        }

        let fields = docs
            .get_mut(collection)
            .and_then(|c| c.get_mut(id))
            .ok_or_else(|| Self::not_found(collection, id))?;
        if !condition.holds(fields) {
            return Err(StoreError::PreconditionFailed {
                path: doc_path(collection, id),
            });
        }
        writes.merge_into(fields, &now);
        Ok(())
    }

    async fn batch_update(
        &self,
        collection: &CollectionName,
        ids: &[RecordId],
        writes: &FieldWrites,
    ) -> Result<()> {
        let now = self.now();
        let fail_at = self.fail_batch_write.lock().unwrap().take();
        let mut docs = self.docs.lock().unwrap();
        let mut staged = docs.get(collection).cloned().unwrap_or_default();

        for (n, id) in ids.iter().enumerate() {
            if fail_at == Some(n + 1) {
                return Err(StoreError::Transport {
                    message: format!("injected failure on write {}", n + 1),
                });
            }
            let fields = staged
                .get_mut(id)
                .ok_or_else(|| Self::not_found(collection, id))?;
            writes.merge_into(fields, &now);
        }

        docs.insert(collection.clone(), staged);
        Ok(())
    }

    async fn delete(&self, collection: &CollectionName, id: &RecordId) -> Result<()> {
        self.docs
            .lock()
            .unwrap()
            .get_mut(collection)
            .and_then(|c| c.remove(id))
            .map(|_| ())
            .ok_or_else(|| Self::not_found(collection, id))
    }

    fn max_batch_size(&self) -> usize {
        self.batch_limit
    }
}

pub fn collection(name: &str) -> CollectionName {
    CollectionName::new(name).unwrap()
}

pub fn id(raw: &str) -> RecordId {
    RecordId::new(raw).unwrap()
}

pub fn ids(records: &[Record]) -> Vec<String> {
    records.iter().map(|r| r.id.to_string()).collect()
}
