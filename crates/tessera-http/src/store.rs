//! [`DocumentStore`] over the REST API.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::de::IgnoredAny;
use tracing::{debug, instrument};

use tessera_core::{
    CollectionName, DocumentStore, FieldCondition, FieldWrites, Record, RecordId, Result,
    StoreError, StoreQuery, WriteValue, doc_path,
};

use crate::client::HttpClient;
use crate::config::HttpStoreConfig;
use crate::value::WireValue;
use crate::wire::{
    CommitRequest, DocumentMask, DocumentUpdate, FieldTransform, Precondition, RunQueryItem,
    RunQueryRequest, StructuredQuery, WireDocument, Write, decode_documents, quote_field_path,
};

/// A hosted document store reached over HTTP.
///
/// Sorted queries run natively: documents whose sort field holds a value
/// come first, in sort order, followed by documents whose sort field is
/// null, in id order. The hosted store cannot list documents that lack the
/// sort field entirely, so a sorted query omits them. They are still
/// returned by unsorted queries and by the degraded read path.
#[derive(Debug, Clone)]
pub struct HttpStore {
    client: HttpClient,
}

impl HttpStore {
    /// Create a store client.
    ///
    /// # Errors
    ///
    /// Returns `Transport` if the HTTP client cannot be built.
    pub fn new(config: HttpStoreConfig) -> Result<Self> {
        Ok(Self {
            client: HttpClient::new(config)?,
        })
    }

    pub fn config(&self) -> &HttpStoreConfig {
        self.client.config()
    }

    fn update_write(&self, collection: &CollectionName, id: &RecordId, writes: &FieldWrites) -> Write {
        let mut fields = BTreeMap::new();
        let mut mask = Vec::new();
        let mut transforms = Vec::new();

        for (field, value) in writes.iter() {
            match value {
                WriteValue::Value(v) => {
                    fields.insert(field.to_string(), WireValue::from(v));
                    mask.push(quote_field_path(field));
                }
                WriteValue::ServerTimestamp => transforms.push(FieldTransform {
                    field_path: quote_field_path(field),
                    set_to_server_value: "REQUEST_TIME",
                }),
            }
        }

        Write {
            update: Some(DocumentUpdate {
                name: self.config().document_name(collection, id),
                fields,
            }),
            delete: None,
            update_mask: Some(DocumentMask { field_paths: mask }),
            update_transforms: transforms,
            current_document: Precondition::exists(),
        }
    }

    async fn run_query(&self, structured_query: StructuredQuery) -> Result<Vec<Record>> {
        let items: Vec<RunQueryItem> = self
            .client
            .post(
                &format!("{}:runQuery", self.config().documents_root()),
                &RunQueryRequest { structured_query },
                None,
            )
            .await?;
        decode_documents(items)
    }

    async fn fetch(&self, collection: &CollectionName, id: &RecordId) -> Result<WireDocument> {
        let path = doc_path(collection, id);
        self.client
            .get(&self.config().document_name(collection, id), Some(&path))
            .await
    }

    async fn commit(&self, writes: Vec<Write>, doc_path: Option<&str>) -> Result<()> {
        let resource = format!("{}:commit", self.config().documents_root());
        let _: IgnoredAny = self
            .client
            .post(&resource, &CommitRequest { writes }, doc_path)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for HttpStore {
    #[instrument(skip(self, query), fields(collection = %query.collection))]
    async fn query(&self, query: &StoreQuery) -> Result<Vec<Record>> {
        let root = self.config().documents_root();
        let Some(sort) = &query.sort else {
            let records = self.run_query(StructuredQuery::unsorted(query, &root)).await?;
            debug!(count = records.len(), "Query served");
            return Ok(records);
        };

        let resume_in_nulls = query
            .start_after
            .as_ref()
            .is_some_and(|key| key.value.is_none());

        let mut records = if resume_in_nulls {
            Vec::new()
        } else {
            self.run_query(StructuredQuery::present_values(query, sort, &root))
                .await?
        };

        let remaining = match query.limit {
            Some(limit) => {
                let served = u32::try_from(records.len()).unwrap_or(u32::MAX);
                if served >= limit {
                    debug!(count = records.len(), "Query served");
                    return Ok(records);
                }
                Some(limit - served)
            }
            None => None,
        };

        let nulls = self
            .run_query(StructuredQuery::null_values(query, sort, &root, remaining))
            .await?;
        debug!(
            count = records.len() + nulls.len(),
            nulls = nulls.len(),
            "Query served"
        );
        records.extend(nulls);
        Ok(records)
    }

    #[instrument(skip(self))]
    async fn get(&self, collection: &CollectionName, id: &RecordId) -> Result<Record> {
        self.fetch(collection, id).await?.into_record()
    }

    #[instrument(skip(self, writes))]
    async fn merge_update(
        &self,
        collection: &CollectionName,
        id: &RecordId,
        writes: &FieldWrites,
    ) -> Result<()> {
        let path = doc_path(collection, id);
        self.commit(vec![self.update_write(collection, id, writes)], Some(&path))
            .await?;
        debug!(%path, "Merged update");
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
        let path = doc_path(collection, id);
        let document = self.fetch(collection, id).await?;
        let version = document.update_time.clone();
        let record = document.into_record()?;
        if !condition.holds(&record.fields) {
            return Err(StoreError::PreconditionFailed { path });
        }

        let mut write = self.update_write(collection, id, writes);
        if let Some(version) = version {
            write.current_document = Precondition::updated_at(version);
        }
        self.commit(vec![write], Some(&path)).await?;
        debug!(%path, "Merged conditional update");
        Ok(())
    }

    #[instrument(skip(self, ids, writes), fields(count = ids.len()))]
    async fn batch_update(
        &self,
        collection: &CollectionName,
        ids: &[RecordId],
        writes: &FieldWrites,
    ) -> Result<()> {
        let limit = self.max_batch_size();
        if ids.len() > limit {
            return Err(StoreError::BatchTooLarge {
                requested: ids.len(),
                limit,
            });
        }

        let batch = ids
            .iter()
            .map(|id| self.update_write(collection, id, writes))
            .collect();
        // The server does not say which member was missing.
        self.commit(batch, None).await?;
        debug!(%collection, "Committed batch");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, collection: &CollectionName, id: &RecordId) -> Result<()> {
        let path = doc_path(collection, id);
        let write = Write {
            update: None,
            delete: Some(self.config().document_name(collection, id)),
            update_mask: None,
            update_transforms: Vec::new(),
            current_document: Precondition::exists(),
        };
        self.commit(vec![write], Some(&path)).await?;
        debug!(%path, "Deleted document");
        Ok(())
    }

    fn max_batch_size(&self) -> usize {
        self.config().max_batch_size
    }
}
