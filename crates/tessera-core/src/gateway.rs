//! Mutation gateway.
//!
//! Applies one [`MutationRequest`] to the store, exactly once, and reports
//! the outcome. Failures are never retried here; the caller decides.

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info, instrument};

use crate::error::{MutationError, StoreError};
use crate::record::{FieldCondition, FieldWrites, Fields, UPDATED_AT, doc_path};
use crate::status::ReviewStatus;
use crate::traits::DocumentStore;
use crate::types::{CollectionName, RecordId};

/// A change requested by a caller.
#[derive(Debug, Clone, PartialEq)]
pub enum MutationRequest {
    /// Merge `fields` into one document.
    Update {
        collection: CollectionName,
        id: RecordId,
        fields: Fields,
    },

    /// Merge the same `fields` into every listed document, atomically.
    BatchUpdate {
        collection: CollectionName,
        ids: Vec<RecordId>,
        fields: Fields,
    },

    /// Remove one document. Deleting an absent document succeeds.
    Delete {
        collection: CollectionName,
        id: RecordId,
    },

    /// Move a document's review status out of `pending`.
    Transition {
        collection: CollectionName,
        id: RecordId,
        status: ReviewStatus,
    },
}

impl MutationRequest {
    pub fn collection(&self) -> &CollectionName {
        match self {
            MutationRequest::Update { collection, .. }
            | MutationRequest::BatchUpdate { collection, .. }
            | MutationRequest::Delete { collection, .. }
            | MutationRequest::Transition { collection, .. } => collection,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            MutationRequest::Update { .. } => "update",
            MutationRequest::BatchUpdate { .. } => "batch_update",
            MutationRequest::Delete { .. } => "delete",
            MutationRequest::Transition { .. } => "transition",
        }
    }
}

/// Successful outcome of [`MutationGateway::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Ack {
    /// Number of documents written or removed.
    pub written: usize,

    /// Set by a `Delete` whose target was already gone.
    pub already_absent: bool,
}

/// Applies mutations through a [`DocumentStore`].
#[derive(Debug)]
pub struct MutationGateway<S: ?Sized> {
    store: Arc<S>,
}

impl<S: ?Sized> Clone for MutationGateway<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: DocumentStore + ?Sized> MutationGateway<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Apply a mutation.
    ///
    /// Every update also stamps `updated_at` with the store's clock.
    ///
    /// # Errors
    ///
    /// - `MalformedRequest` for empty field sets, empty or duplicate batch
    ///   ids, and illegal status transitions.
    /// - `BatchTooLarge` when a batch exceeds the store's atomic limit.
    /// - `NotFound`, `PermissionDenied`, `Timeout` or `MutationFailed` as
    ///   reported by the store.
    #[instrument(skip(self, request), fields(collection = %request.collection(), kind = request.kind()))]
    pub async fn apply(&self, request: MutationRequest) -> Result<Ack, MutationError> {
        match request {
            MutationRequest::Update {
                collection,
                id,
                fields,
            } => {
                let writes = stamped(fields)?;
                self.store.merge_update(&collection, &id, &writes).await?;
                info!(path = %doc_path(&collection, &id), fields = writes.len(), "Updated document");
                Ok(Ack {
                    written: 1,
                    already_absent: false,
                })
            }
            MutationRequest::BatchUpdate {
                collection,
                ids,
                fields,
            } => {
                check_batch(&ids, self.store.max_batch_size())?;
                let writes = stamped(fields)?;
                self.store.batch_update(&collection, &ids, &writes).await?;
                info!(%collection, count = ids.len(), "Batch updated documents");
                Ok(Ack {
                    written: ids.len(),
                    already_absent: false,
                })
            }
            MutationRequest::Delete { collection, id } => {
                match self.store.delete(&collection, &id).await {
                    Ok(()) => {
                        info!(path = %doc_path(&collection, &id), "Deleted document");
                        Ok(Ack {
                            written: 1,
                            already_absent: false,
                        })
                    }
                    Err(StoreError::NotFound { path }) => {
                        debug!(%path, "Document already absent");
                        Ok(Ack {
                            written: 0,
                            already_absent: true,
                        })
                    }
                    Err(err) => Err(err.into()),
                }
            }
            MutationRequest::Transition {
                collection,
                id,
                status,
            } => self.transition(&collection, &id, status).await,
        }
    }

    async fn transition(
        &self,
        collection: &CollectionName,
        id: &RecordId,
        next: ReviewStatus,
    ) -> Result<Ack, MutationError> {
        let record = self.store.get(collection, id).await?;
        let current = ReviewStatus::from_fields(&record.fields).map_err(|e| {
            MutationError::MalformedRequest {
                reason: e.to_string(),
            }
        })?;

        if !current.can_transition_to(next) {
            return Err(MutationError::MalformedRequest {
                reason: format!(
                    "cannot move {} from {} to {}",
                    doc_path(collection, id),
                    current,
                    next
                ),
            });
        }

        let writes = FieldWrites::new()
            .set(ReviewStatus::FIELD, json!(next.as_str()))
            .server_timestamp(ReviewStatus::REVIEWED_AT)
            .server_timestamp(UPDATED_AT);
        let condition = FieldCondition::new(
            ReviewStatus::FIELD,
            record.fields.get(ReviewStatus::FIELD).cloned(),
        );
        match self
            .store
            .merge_update_if(collection, id, &writes, &condition)
            .await
        {
            Ok(()) => {}
            Err(StoreError::PreconditionFailed { path }) => {
                return Err(MutationError::MalformedRequest {
                    reason: format!("status of {} changed while moving it to {}", path, next),
                });
            }
            Err(err) => return Err(err.into()),
        }

        info!(path = %doc_path(collection, id), from = %current, to = %next, "Review status changed");
        Ok(Ack {
            written: 1,
            already_absent: false,
        })
    }
}

fn stamped(fields: Fields) -> Result<FieldWrites, MutationError> {
    if fields.is_empty() {
        return Err(MutationError::MalformedRequest {
            reason: "update names no fields".to_string(),
        });
    }
    Ok(FieldWrites::from(fields).server_timestamp(UPDATED_AT))
}

fn check_batch(ids: &[RecordId], limit: usize) -> Result<(), MutationError> {
    if ids.is_empty() {
        return Err(MutationError::MalformedRequest {
            reason: "batch names no documents".to_string(),
        });
    }
    if ids.len() > limit {
        return Err(MutationError::BatchTooLarge {
            requested: ids.len(),
            limit,
        });
    }
    let mut seen = HashSet::with_capacity(ids.len());
    if let Some(dup) = ids.iter().find(|id| !seen.insert(*id)) {
        return Err(MutationError::MalformedRequest {
            reason: format!("document {} listed twice", dup),
        });
    }
    Ok(())
}
