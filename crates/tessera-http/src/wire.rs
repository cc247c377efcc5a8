//! Request and response bodies of the REST API.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use tessera_core::{Direction, Filter, Record, RecordId, Result, Sort, StoreError, StoreQuery};

use crate::value::{WireValue, decode_fields};

/// Field path of a document's own name.
pub(crate) const NAME_FIELD: &str = "__name__";

// ============================================================================
// runQuery
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RunQueryRequest {
    pub structured_query: StructuredQuery,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StructuredQuery {
    pub from: Vec<CollectionSelector>,
    #[serde(rename = "where", skip_serializing_if = "Option::is_none")]
    pub filter: Option<WireFilter>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub order_by: Vec<Order>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_at: Option<QueryCursor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CollectionSelector {
    pub collection_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) enum WireFilter {
    FieldFilter(FieldFilter),
    UnaryFilter(UnaryFilter),
    CompositeFilter(CompositeFilter),
}

#[derive(Debug, Serialize)]
pub(crate) struct FieldFilter {
    pub field: FieldReference,
    pub op: &'static str,
    pub value: WireValue,
}

#[derive(Debug, Serialize)]
pub(crate) struct UnaryFilter {
    pub field: FieldReference,
    pub op: &'static str,
}

#[derive(Debug, Serialize)]
pub(crate) struct CompositeFilter {
    pub op: &'static str,
    pub filters: Vec<WireFilter>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FieldReference {
    pub field_path: String,
}

impl FieldReference {
    pub fn new(field: &str) -> Self {
        Self {
            field_path: quote_field_path(field),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct Order {
    pub field: FieldReference,
    pub direction: &'static str,
}

#[derive(Debug, Serialize)]
pub(crate) struct QueryCursor {
    pub values: Vec<WireValue>,
    pub before: bool,
}

/// One element of the streamed runQuery response. Elements without a
/// document only report progress.
#[derive(Debug, Deserialize)]
pub(crate) struct RunQueryItem {
    #[serde(default)]
    pub document: Option<WireDocument>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireDocument {
    pub name: String,
    #[serde(default)]
    pub fields: BTreeMap<String, WireValue>,
    /// Version stamp, echoed back to make a write conditional.
    #[serde(default)]
    pub update_time: Option<String>,
}

impl WireDocument {
    pub fn into_record(self) -> Result<Record> {
        let raw_id = self.name.rsplit('/').next().unwrap_or_default();
        let id = RecordId::new(raw_id)?;
        Ok(Record::new(id, decode_fields(self.fields)?))
    }
}

fn direction(direction: Direction) -> &'static str {
    match direction {
        Direction::Ascending => "ASCENDING",
        Direction::Descending => "DESCENDING",
    }
}

/// Quote a field name as a single path segment unless it is a plain
/// identifier.
pub(crate) fn quote_field_path(field: &str) -> String {
    let mut chars = field.chars();
    let simple = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if simple {
        field.to_string()
    } else {
        format!("`{}`", field.replace('\\', "\\\\").replace('`', "\\`"))
    }
}

fn equality(filter: &Filter) -> WireFilter {
    let field = FieldReference::new(&filter.field);
    if filter.value.is_null() {
        WireFilter::UnaryFilter(UnaryFilter {
            field,
            op: "IS_NULL",
        })
    } else {
        WireFilter::FieldFilter(FieldFilter {
            field,
            op: "EQUAL",
            value: WireValue::from(&filter.value),
        })
    }
}

fn unary(field: &str, op: &'static str) -> WireFilter {
    WireFilter::UnaryFilter(UnaryFilter {
        field: FieldReference::new(field),
        op,
    })
}

fn by_name() -> Order {
    Order {
        field: FieldReference {
            field_path: NAME_FIELD.to_string(),
        },
        direction: direction(Direction::Ascending),
    }
}

/// Reference value naming a document, as used in query cursors.
fn reference(document_root: &str, query: &StoreQuery, id: &RecordId) -> WireValue {
    WireValue::ReferenceValue(format!("{}/{}/{}", document_root, query.collection, id))
}

// The hosted store orders nulls before every other value and cannot list
// documents that lack the sort field at all. A sorted read is therefore
// served as two queries: the documents holding a value, in sort order, and
// then the documents holding null, in name order.
impl StructuredQuery {
    fn build(
        query: &StoreQuery,
        sort_filter: Option<WireFilter>,
        sort_order: Option<Order>,
        start_at: Option<Vec<WireValue>>,
        limit: Option<u32>,
    ) -> Self {
        let mut filters: Vec<WireFilter> = query.filters.iter().map(equality).collect();
        filters.extend(sort_filter);

        let filter = match filters.len() {
            0 => None,
            1 => filters.pop(),
            _ => Some(WireFilter::CompositeFilter(CompositeFilter {
                op: "AND",
                filters,
            })),
        };

        Self {
            from: vec![CollectionSelector {
                collection_id: query.collection.to_string(),
            }],
            filter,
            order_by: sort_order.into_iter().chain([by_name()]).collect(),
            start_at: start_at.map(|values| QueryCursor {
                values,
                before: false,
            }),
            limit,
        }
    }

    /// Name-ordered query for a store query without a sort.
    pub fn unsorted(query: &StoreQuery, document_root: &str) -> Self {
        let start_at = query
            .start_after
            .as_ref()
            .map(|key| vec![reference(document_root, query, &key.id)]);
        Self::build(query, None, None, start_at, query.limit)
    }

    /// Documents whose sort field holds a value, in sort order then name.
    ///
    /// Resumes after `query.start_after` when that key has a value.
    pub fn present_values(query: &StoreQuery, sort: &Sort, document_root: &str) -> Self {
        let start_at = query.start_after.as_ref().and_then(|key| {
            key.value
                .as_ref()
                .map(|value| vec![WireValue::from(value), reference(document_root, query, &key.id)])
        });
        Self::build(
            query,
            Some(unary(&sort.field, "IS_NOT_NULL")),
            Some(Order {
                field: FieldReference::new(&sort.field),
                direction: direction(sort.direction),
            }),
            start_at,
            query.limit,
        )
    }

    /// Documents whose sort field is null, in name order.
    ///
    /// Resumes after `query.start_after` only when that key has no value;
    /// a key with a value lies before every null.
    pub fn null_values(
        query: &StoreQuery,
        sort: &Sort,
        document_root: &str,
        limit: Option<u32>,
    ) -> Self {
        let start_at = query
            .start_after
            .as_ref()
            .filter(|key| key.value.is_none())
            .map(|key| vec![reference(document_root, query, &key.id)]);
        Self::build(
            query,
            Some(unary(&sort.field, "IS_NULL")),
            None,
            start_at,
            limit,
        )
    }
}

// ============================================================================
// commit
// ============================================================================

#[derive(Debug, Serialize)]
pub(crate) struct CommitRequest {
    pub writes: Vec<Write>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Write {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update: Option<DocumentUpdate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_mask: Option<DocumentMask>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub update_transforms: Vec<FieldTransform>,
    pub current_document: Precondition,
}

#[derive(Debug, Serialize)]
pub(crate) struct DocumentUpdate {
    pub name: String,
    pub fields: BTreeMap<String, WireValue>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DocumentMask {
    pub field_paths: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FieldTransform {
    pub field_path: String,
    pub set_to_server_value: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Precondition {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exists: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_time: Option<String>,
}

impl Precondition {
    /// The document must exist.
    pub fn exists() -> Self {
        Self {
            exists: Some(true),
            update_time: None,
        }
    }

    /// The document must still be at the version read earlier.
    pub fn updated_at(update_time: String) -> Self {
        Self {
            exists: None,
            update_time: Some(update_time),
        }
    }
}

// ============================================================================
// errors
// ============================================================================

/// Error body. `runQuery` wraps it in a one-element array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ErrorPayload {
    One(ErrorEnvelope),
    Many(Vec<ErrorEnvelope>),
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl ErrorPayload {
    pub fn into_body(self) -> Option<ErrorBody> {
        match self {
            ErrorPayload::One(envelope) => Some(envelope.error),
            ErrorPayload::Many(envelopes) => envelopes.into_iter().next().map(|e| e.error),
        }
    }
}

pub(crate) fn decode_documents(items: Vec<RunQueryItem>) -> Result<Vec<Record>> {
    items
        .into_iter()
        .filter_map(|item| item.document)
        .map(WireDocument::into_record)
        .collect::<Result<Vec<_>>>()
        .map_err(|e| match e {
            StoreError::InvalidInput(err) => StoreError::InvalidData {
                message: err.to_string(),
            },
            other => other,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tessera_core::{CollectionName, SortKey};

    const ROOT: &str = "projects/demo/databases/(default)/documents";

    fn query() -> StoreQuery {
        StoreQuery {
            collection: CollectionName::new("notifications").unwrap(),
            filters: vec![Filter::new("user_id", json!("u1"))],
            sort: Some(Sort::new("created_at", Direction::Descending)),
            limit: Some(20),
            start_after: None,
        }
    }

    fn sorted() -> Sort {
        Sort::new("created_at", Direction::Descending)
    }

    #[test]
    fn present_values_are_sorted_then_named() {
        let body =
            serde_json::to_value(StructuredQuery::present_values(&query(), &sorted(), ROOT)).unwrap();
        assert_eq!(
            body,
            json!({
                "from": [{ "collectionId": "notifications" }],
                "where": { "compositeFilter": { "op": "AND", "filters": [
                    { "fieldFilter": {
                        "field": { "fieldPath": "user_id" },
                        "op": "EQUAL",
                        "value": { "stringValue": "u1" }
                    } },
                    { "unaryFilter": { "field": { "fieldPath": "created_at" }, "op": "IS_NOT_NULL" } }
                ] } },
                "orderBy": [
                    { "field": { "fieldPath": "created_at" }, "direction": "DESCENDING" },
                    { "field": { "fieldPath": "__name__" }, "direction": "ASCENDING" }
                ],
                "limit": 20
            })
        );
    }

    #[test]
    fn resume_position_becomes_start_at_after() {
        let mut q = query();
        q.start_after = Some(SortKey {
            value: Some(json!("2024-03-01T09:00:00.000000Z")),
            id: RecordId::new("n1").unwrap(),
        });
        let body =
            serde_json::to_value(StructuredQuery::present_values(&q, &sorted(), ROOT)).unwrap();
        assert_eq!(
            body["startAt"],
            json!({
                "values": [
                    { "timestampValue": "2024-03-01T09:00:00.000000Z" },
                    { "referenceValue": format!("{}/notifications/n1", ROOT) }
                ],
                "before": false
            })
        );
    }

    #[test]
    fn null_values_are_named_in_order() {
        let body =
            serde_json::to_value(StructuredQuery::null_values(&query(), &sorted(), ROOT, Some(5)))
                .unwrap();
        assert_eq!(
            body["where"]["compositeFilter"]["filters"][1],
            json!({ "unaryFilter": { "field": { "fieldPath": "created_at" }, "op": "IS_NULL" } })
        );
        assert_eq!(
            body["orderBy"],
            json!([{ "field": { "fieldPath": "__name__" }, "direction": "ASCENDING" }])
        );
        assert_eq!(body["limit"], 5);
        assert!(body.get("startAt").is_none());
    }

    #[test]
    fn null_values_resume_by_name_only_from_a_null_key() {
        let mut q = query();
        q.start_after = Some(SortKey {
            value: None,
            id: RecordId::new("n4").unwrap(),
        });
        let body =
            serde_json::to_value(StructuredQuery::null_values(&q, &sorted(), ROOT, None)).unwrap();
        assert_eq!(
            body["startAt"]["values"],
            json!([{ "referenceValue": format!("{}/notifications/n4", ROOT) }])
        );

        q.start_after = Some(SortKey {
            value: Some(json!("2024-03-01T09:00:00.000000Z")),
            id: RecordId::new("n1").unwrap(),
        });
        let body =
            serde_json::to_value(StructuredQuery::null_values(&q, &sorted(), ROOT, None)).unwrap();
        assert!(body.get("startAt").is_none());
    }

    #[test]
    fn preconditions_carry_one_condition() {
        assert_eq!(
            serde_json::to_value(Precondition::exists()).unwrap(),
            json!({ "exists": true })
        );
        assert_eq!(
            serde_json::to_value(Precondition::updated_at("2024-06-01T00:00:00.123456789Z".into()))
                .unwrap(),
            json!({ "updateTime": "2024-06-01T00:00:00.123456789Z" })
        );
    }

    #[test]
    fn null_filter_is_unary() {
        let filter = equality(&Filter::new("due", json!(null)));
        assert_eq!(
            serde_json::to_value(filter).unwrap(),
            json!({ "unaryFilter": { "field": { "fieldPath": "due" }, "op": "IS_NULL" } })
        );
    }

    #[test]
    fn unusual_field_names_are_quoted() {
        assert_eq!(quote_field_path("created_at"), "created_at");
        assert_eq!(quote_field_path("due date"), "`due date`");
        assert_eq!(quote_field_path("a.b"), "`a.b`");
        assert_eq!(quote_field_path("9lives"), "`9lives`");
    }

    #[test]
    fn error_payload_accepts_object_and_array() {
        let one: ErrorPayload = serde_json::from_value(json!({
            "error": { "code": 400, "message": "bad", "status": "INVALID_ARGUMENT" }
        }))
        .unwrap();
        assert_eq!(one.into_body().unwrap().status.as_deref(), Some("INVALID_ARGUMENT"));

        let many: ErrorPayload = serde_json::from_value(json!([{
            "error": { "code": 400, "message": "The query requires an index.", "status": "FAILED_PRECONDITION" }
        }]))
        .unwrap();
        assert_eq!(
            many.into_body().unwrap().message.as_deref(),
            Some("The query requires an index.")
        );
    }
}
