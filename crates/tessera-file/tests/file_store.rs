//! File store behind the reader and gateway.

use std::sync::Arc;

use serde_json::{Value, json};
use tempfile::TempDir;

use tessera_core::{
    CollectionName, Direction, DocumentStore, FieldCondition, FieldWrites, Fields, MutationError,
    MutationGateway, MutationRequest, QueryDescriptor, RecordId, ResilientReader, Sort,
    StoreError, StoreQuery,
};
use tessera_file::{CompositeIndex, FileBackend};

fn fields(value: Value) -> Fields {
    match value {
        Value::Object(map) => map,
        _ => panic!("fields must be an object"),
    }
}

fn notifications() -> CollectionName {
    CollectionName::new("notifications").unwrap()
}

fn id(raw: &str) -> RecordId {
    RecordId::new(raw).unwrap()
}

fn ids(records: &[tessera_core::Record]) -> Vec<&str> {
    records.iter().map(|r| r.id.as_str()).collect()
}

async fn seeded() -> (TempDir, Arc<FileBackend>) {
    let dir = TempDir::new().unwrap();
    let backend = FileBackend::new(dir.path());
    let rows = [
        ("n1", json!({ "user_id": "u1", "sent_at": "2024-03-01" })),
        ("n2", json!({ "user_id": "u2", "sent_at": "2024-03-02" })),
        ("n3", json!({ "user_id": "u1", "sent_at": "2024-03-03" })),
        ("n4", json!({ "user_id": "u1" })),
    ];
    for (raw, value) in rows {
        backend
            .insert(&notifications(), Some(id(raw)), fields(value))
            .await
            .unwrap();
    }
    (dir, Arc::new(backend))
}

fn by_user() -> QueryDescriptor {
    QueryDescriptor::new(notifications())
        .filter("user_id", json!("u1"))
        .order_by("sent_at", Direction::Descending)
}

#[tokio::test]
async fn test_insert_stamps_created_at_and_generates_ids() {
    let dir = TempDir::new().unwrap();
    let backend = FileBackend::new(dir.path());

    let record = backend
        .insert(&notifications(), None, fields(json!({ "title": "Hello" })))
        .await
        .unwrap();

    assert_eq!(record.id.as_str().len(), 32);
    assert!(record.get("created_at").and_then(Value::as_str).is_some());
    let read = backend.get(&notifications(), &record.id).await.unwrap();
    assert_eq!(read, record);
}

#[tokio::test]
async fn test_insert_rejects_existing_id() {
    let (_dir, backend) = seeded().await;

    let err = backend
        .insert(&notifications(), Some(id("n1")), Fields::new())
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidInput(_)));
}

#[tokio::test]
async fn test_sorted_filtered_query_needs_declared_index() {
    let (_dir, backend) = seeded().await;
    let query = StoreQuery {
        collection: notifications(),
        filters: vec![tessera_core::Filter::new("user_id", json!("u1"))],
        sort: Some(Sort::new("sent_at", Direction::Descending)),
        limit: None,
        start_after: None,
    };

    let err = backend.query(&query).await.unwrap_err();
    assert!(err.is_index_unavailable());

    let declared = backend
        .declare_index(CompositeIndex::new(
            notifications(),
            vec!["user_id".into()],
            Sort::new("sent_at", Direction::Descending),
        ))
        .unwrap();
    assert!(declared);
    assert_eq!(ids(&backend.query(&query).await.unwrap()), ["n3", "n1", "n4"]);
}

#[tokio::test]
async fn test_declaring_same_index_twice_is_a_no_op() {
    let (_dir, backend) = seeded().await;
    let index = CompositeIndex::new(
        notifications(),
        vec!["user_id".into()],
        Sort::new("sent_at", Direction::Ascending),
    );

    assert!(backend.declare_index(index.clone()).unwrap());
    assert!(!backend.declare_index(index).unwrap());
    assert_eq!(backend.indexes().unwrap().len(), 1);
}

#[tokio::test]
async fn test_reader_degrades_then_recovers_once_index_exists() {
    let (_dir, backend) = seeded().await;
    let reader = ResilientReader::new(backend.clone());

    let degraded = reader.read(&by_user()).await.unwrap();
    assert!(degraded.degraded);
    assert_eq!(ids(&degraded.records), ["n3", "n1", "n4"]);

    backend
        .declare_index(CompositeIndex::new(
            notifications(),
            vec!["user_id".into()],
            Sort::new("sent_at", Direction::Descending),
        ))
        .unwrap();

    let primary = reader.read(&by_user()).await.unwrap();
    assert!(!primary.degraded);
    assert_eq!(primary.records, degraded.records);
}

#[tokio::test]
async fn test_cursor_pages_through_degraded_reads() {
    let (_dir, backend) = seeded().await;
    let reader = ResilientReader::new(backend);

    let first = reader.read(&by_user().limit(2)).await.unwrap();
    assert_eq!(ids(&first.records), ["n3", "n1"]);

    let cursor = first.next_cursor.unwrap();
    let second = reader.read(&by_user().limit(2).after(cursor)).await.unwrap();
    assert_eq!(ids(&second.records), ["n4"]);
    assert!(second.next_cursor.is_none());
}

#[tokio::test]
async fn test_update_merges_and_stamps_updated_at() {
    let (_dir, backend) = seeded().await;
    let gateway = MutationGateway::new(backend.clone());

    gateway
        .apply(MutationRequest::Update {
            collection: notifications(),
            id: id("n1"),
            fields: fields(json!({ "is_read": true })),
        })
        .await
        .unwrap();

    let record = backend.get(&notifications(), &id("n1")).await.unwrap();
    assert_eq!(record.get("is_read"), Some(&json!(true)));
    assert_eq!(record.get("user_id"), Some(&json!("u1")));
    assert!(record.get("updated_at").and_then(Value::as_str).is_some());
}

#[tokio::test]
async fn test_batch_with_missing_member_changes_nothing() {
    let (_dir, backend) = seeded().await;
    let gateway = MutationGateway::new(backend.clone());

    let err = gateway
        .apply(MutationRequest::BatchUpdate {
            collection: notifications(),
            ids: vec![id("n1"), id("n2"), id("n9")],
            fields: fields(json!({ "is_read": true })),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, MutationError::NotFound { ref path } if path == "notifications/n9"));

    for raw in ["n1", "n2"] {
        let record = backend.get(&notifications(), &id(raw)).await.unwrap();
        assert!(record.get("is_read").is_none());
    }
}

#[tokio::test]
async fn test_batch_updates_every_member_with_one_timestamp() {
    let (_dir, backend) = seeded().await;
    let gateway = MutationGateway::new(backend.clone());

    let ack = gateway
        .apply(MutationRequest::BatchUpdate {
            collection: notifications(),
            ids: vec![id("n1"), id("n3"), id("n4")],
            fields: fields(json!({ "is_read": true })),
        })
        .await
        .unwrap();
    assert_eq!(ack.written, 3);

    let mut stamps = Vec::new();
    for raw in ["n1", "n3", "n4"] {
        let record = backend.get(&notifications(), &id(raw)).await.unwrap();
        assert_eq!(record.get("is_read"), Some(&json!(true)));
        stamps.push(record.get("updated_at").cloned().unwrap());
    }
    assert!(stamps.windows(2).all(|w| w[0] == w[1]));
}

#[tokio::test]
async fn test_batch_limit_is_configurable() {
    let dir = TempDir::new().unwrap();
    let backend = Arc::new(FileBackend::new(dir.path()).with_max_batch_size(2));
    let gateway = MutationGateway::new(backend);

    let err = gateway
        .apply(MutationRequest::BatchUpdate {
            collection: notifications(),
            ids: vec![id("a"), id("b"), id("c")],
            fields: fields(json!({ "is_read": true })),
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        MutationError::BatchTooLarge {
            requested: 3,
            limit: 2
        }
    ));
}

#[tokio::test]
async fn test_delete_twice_reports_already_absent() {
    let (_dir, backend) = seeded().await;
    let gateway = MutationGateway::new(backend.clone());
    let delete = MutationRequest::Delete {
        collection: notifications(),
        id: id("n2"),
    };

    assert!(!gateway.apply(delete.clone()).await.unwrap().already_absent);
    assert!(gateway.apply(delete).await.unwrap().already_absent);
    assert!(matches!(
        backend.get(&notifications(), &id("n2")).await,
        Err(StoreError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_conditional_update_checks_the_stored_value() {
    let (_dir, backend) = seeded().await;
    let writes = FieldWrites::new().set("status", json!("approved"));

    // n1 has no status yet, so a write expecting `pending` is refused.
    let err = backend
        .merge_update_if(
            &notifications(),
            &id("n1"),
            &writes,
            &FieldCondition::new("status", Some(json!("pending"))),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::PreconditionFailed { ref path } if path == "notifications/n1"));
    let record = backend.get(&notifications(), &id("n1")).await.unwrap();
    assert!(record.get("status").is_none());

    backend
        .merge_update_if(
            &notifications(),
            &id("n1"),
            &writes,
            &FieldCondition::new("status", None),
        )
        .await
        .unwrap();
    let record = backend.get(&notifications(), &id("n1")).await.unwrap();
    assert_eq!(record.get("status"), Some(&json!("approved")));
}
