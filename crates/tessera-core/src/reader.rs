//! Resilient collection reader.
//!
//! Runs the sorted query directly against the store and, when the store
//! answers `IndexUnavailable`, serves the same result from a filters-only
//! query sorted and capped in memory.

use std::sync::Arc;

use futures_core::Stream;
use tracing::{debug, instrument, warn};

use crate::error::{ReadError, StoreError};
use crate::query::ordering::{skip_through, sort_records};
use crate::query::{Cursor, QueryDescriptor, StoreQuery};
use crate::record::Record;
use crate::traits::DocumentStore;

/// Result of a read.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedRecords {
    /// Records in query order.
    pub records: Vec<Record>,

    /// True when the page was served by the client-side fallback because
    /// the store lacked a composite index. Callers may surface an advisory;
    /// the records are still correct.
    pub degraded: bool,

    /// Cursor for the next page, present when the page is full.
    pub next_cursor: Option<Cursor>,
}

impl OrderedRecords {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Reads collections through a [`DocumentStore`], masking missing composite
/// indexes.
///
/// The reader holds no state besides the shared store handle; every call is
/// a fresh fetch.
#[derive(Debug)]
pub struct ResilientReader<S: ?Sized> {
    store: Arc<S>,
}

impl<S: ?Sized> Clone for ResilientReader<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: DocumentStore + ?Sized> ResilientReader<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// The underlying store handle.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Read one page.
    ///
    /// # Errors
    ///
    /// - `InvalidQuery` for a zero limit.
    /// - `InvalidCursor` for a cursor issued by a different query.
    /// - `Timeout`, `PermissionDenied` or `ReadFailed` when the store fails,
    ///   including when the fallback query itself fails.
    #[instrument(skip(self, descriptor), fields(collection = %descriptor.collection()))]
    pub async fn read(&self, descriptor: &QueryDescriptor) -> Result<OrderedRecords, ReadError> {
        if descriptor.limit_value() == Some(0) {
            return Err(ReadError::InvalidQuery {
                reason: "limit must be positive".to_string(),
            });
        }

        let fingerprint = descriptor.fingerprint();
        let start_after = descriptor
            .cursor()
            .map(|c| c.resolve(&fingerprint).cloned())
            .transpose()?;

        let query = StoreQuery {
            collection: descriptor.collection().clone(),
            filters: descriptor.filters().to_vec(),
            sort: descriptor.sort().cloned(),
            limit: descriptor.limit_value(),
            start_after,
        };

        debug!(sorted = query.sort.is_some(), filters = query.filters.len(), "Primary read");
        let (records, degraded) = match self.store.query(&query).await {
            Ok(records) => (records, false),
            Err(StoreError::IndexUnavailable { message }) if query.sort.is_some() => {
                warn!(%message, "Composite index unavailable, sorting client-side");
                (self.fallback(&query).await?, true)
            }
            Err(err) => return Err(err.into()),
        };

        let next_cursor = match query.limit {
            Some(limit) if records.len() == limit as usize => records
                .last()
                .map(|last| Cursor::new(fingerprint, last.sort_key(query.sort.as_ref()))),
            _ => None,
        };

        debug!(count = records.len(), degraded, "Read complete");
        Ok(OrderedRecords {
            records,
            degraded,
            next_cursor,
        })
    }

    async fn fallback(&self, query: &StoreQuery) -> Result<Vec<Record>, ReadError> {
        let mut records = self.store.query(&query.filters_only()).await?;

        records.retain(|r| r.matches(query.filter_pairs()));
        sort_records(&mut records, query.sort.as_ref());

        let start = match &query.start_after {
            Some(key) => records.len() - skip_through(&records, key, query.sort.as_ref()).len(),
            None => 0,
        };
        let end = match query.limit {
            Some(limit) => records.len().min(start + limit as usize),
            None => records.len(),
        };

        debug!(matched = records.len(), start, end, "Fallback read");
        Ok(records.drain(start..end).collect())
    }

    /// Stream every page of a query, following cursors until the last page.
    ///
    /// An empty first page is yielded; empty trailing pages are not. The
    /// stream ends after the first error.
    pub fn pages(
        &self,
        descriptor: QueryDescriptor,
    ) -> impl Stream<Item = Result<OrderedRecords, ReadError>> + '_ {
        async_stream::stream! {
            let mut descriptor = descriptor;
            let mut first = true;
            loop {
                match self.read(&descriptor).await {
                    Ok(page) => {
                        let next = page.next_cursor.clone();
                        if first || !page.is_empty() {
                            yield Ok(page);
                        }
                        first = false;
                        match next {
                            Some(cursor) => descriptor = descriptor.after(cursor),
                            None => break,
                        }
                    }
                    Err(err) => {
                        yield Err(err);
                        break;
                    }
                }
            }
        }
    }
}
