use std::collections::HashSet;
use std::sync::Arc;

use furion_store::{DiagnosticStore, DisabledBackend, FileBackend, MemoryBackend, StoreError};
use furion_types::{RecordBody, RecordId};
use futures_util::future::join_all;
use serde_json::{json, Value};

fn body(v: Value) -> RecordBody {
    v.as_object().unwrap().clone()
}

async fn diag_db(backend: Arc<MemoryBackend>) -> DiagnosticStore {
    DiagnosticStore::open_named(backend, "diag-db").await.unwrap()
}

#[tokio::test]
async fn insert_get_delete_scenario() {
    let store = diag_db(Arc::new(MemoryBackend::new())).await;

    let first = store
        .insert(body(json!({"source": "route-a", "detail": "timeout"})))
        .await
        .unwrap();
    let second = store
        .insert(body(json!({"source": "route-b", "detail": "refused"})))
        .await
        .unwrap();
    assert_eq!(first, RecordId(1));
    assert_eq!(second, RecordId(2));

    let got = store.get(RecordId(1)).await.unwrap().unwrap();
    assert_eq!(
        got.to_json(),
        json!({"id": 1, "source": "route-a", "detail": "timeout"})
    );

    store.delete(RecordId(1)).await.unwrap();
    assert!(store.get(RecordId(1)).await.unwrap().is_none());
    assert!(store.get(RecordId(2)).await.unwrap().is_some());
}

#[tokio::test]
async fn unknown_ids_are_not_found_and_delete_is_idempotent() {
    let store = diag_db(Arc::new(MemoryBackend::new())).await;
    assert!(store.get(RecordId(42)).await.unwrap().is_none());

    store.delete(RecordId(42)).await.unwrap();
    assert!(store.get(RecordId(42)).await.unwrap().is_none());

    let id = store.insert(body(json!({"source": "x"}))).await.unwrap();
    store.delete(id).await.unwrap();
    store.delete(id).await.unwrap();
    assert!(store.get(id).await.unwrap().is_none());
}

#[tokio::test]
async fn round_trip_preserves_body() {
    let store = diag_db(Arc::new(MemoryBackend::new())).await;
    let records = [
        json!({}),
        json!({"source": "route-a", "nested": {"hops": [1, 2, 3]}}),
        json!({"detail": null, "ok": false, "latency_ms": 12.5}),
    ];
    for r in records {
        let id = store.insert(body(r.clone())).await.unwrap();
        let got = store.get(id).await.unwrap().unwrap();
        assert_eq!(Value::Object(got.body), r);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_inserts_get_unique_ids() {
    let store = diag_db(Arc::new(MemoryBackend::new())).await;

    let tasks = (0..64).map(|n| {
        let store = store.clone();
        tokio::spawn(async move { store.insert(body(json!({"n": n}))).await })
    });
    let ids: Vec<RecordId> = join_all(tasks)
        .await
        .into_iter()
        .map(|r| r.unwrap().unwrap())
        .collect();

    let unique: HashSet<RecordId> = ids.iter().copied().collect();
    assert_eq!(unique.len(), 64);
    assert_eq!(ids.iter().map(|id| id.0).max(), Some(64));
    assert_eq!(store.scan().await.unwrap().len(), 64);
}

#[tokio::test]
async fn sequential_inserts_persist_in_issue_order() {
    let backend = Arc::new(MemoryBackend::new());
    let store = diag_db(backend.clone()).await;
    for n in 0..5 {
        store.insert(body(json!({"n": n}))).await.unwrap();
    }
    let scanned: Vec<Value> = store
        .scan()
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.body["n"].clone())
        .collect();
    assert_eq!(scanned, vec![json!(0), json!(1), json!(2), json!(3), json!(4)]);
}

#[tokio::test]
async fn file_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    {
        let store = DiagnosticStore::open(Arc::new(FileBackend::new(dir.path())))
            .await
            .unwrap();
        store.insert(body(json!({"source": "route-a"}))).await.unwrap();
        store.insert(body(json!({"source": "route-b"}))).await.unwrap();
        store.delete(RecordId(2)).await.unwrap();
    }

    let store = DiagnosticStore::open(Arc::new(FileBackend::new(dir.path())))
        .await
        .unwrap();
    let all = store.scan().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].body["source"], json!("route-a"));
    assert_eq!(
        store.insert(RecordBody::new()).await.unwrap(),
        RecordId(3)
    );
}

#[tokio::test]
async fn disabled_or_full_storage_is_surfaced() {
    assert!(matches!(
        DiagnosticStore::open(Arc::new(DisabledBackend)).await,
        Err(StoreError::StorageUnavailable { .. })
    ));

    // One entry for the schema upgrade, one for a record.
    let backend = Arc::new(MemoryBackend::new().with_max_entries(2));
    let store = diag_db(backend).await;
    store.insert(RecordBody::new()).await.unwrap();
    assert!(matches!(
        store.insert(RecordBody::new()).await,
        Err(StoreError::StorageUnavailable { .. })
    ));
    // The rest of the store keeps working.
    assert!(store.get(RecordId(1)).await.unwrap().is_some());
}

#[tokio::test]
async fn reopening_a_database_keeps_identities_unique() {
    let backend = Arc::new(MemoryBackend::new());
    let a = DiagnosticStore::open(backend.clone()).await.unwrap();
    let b = DiagnosticStore::open(backend.clone()).await.unwrap();

    let from_a = a.insert(body(json!({"who": "a"}))).await.unwrap();
    let from_b = b.insert(body(json!({"who": "b"}))).await.unwrap();
    assert_ne!(from_a, from_b);

    let store = DiagnosticStore::open(backend).await.unwrap();
    assert_eq!(store.scan().await.unwrap().len(), 2);
    assert_eq!(store.get(from_a).await.unwrap().unwrap().body["who"], json!("a"));
    assert_eq!(store.get(from_b).await.unwrap().unwrap().body["who"], json!("b"));
}

#[tokio::test]
async fn interrupted_append_does_not_lose_committed_records() {
    let dir = tempfile::tempdir().unwrap();
    let id = {
        let store = DiagnosticStore::open(Arc::new(FileBackend::new(dir.path())))
            .await
            .unwrap();
        store.insert(body(json!({"source": "route-a"}))).await.unwrap()
    };

    let path = FileBackend::new(dir.path()).log_path("furion-kit");
    let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
    std::io::Write::write_all(&mut file, b"deadbeef\t{\"op\":\"ins").unwrap();
    drop(file);

    let store = DiagnosticStore::open(Arc::new(FileBackend::new(dir.path())))
        .await
        .unwrap();
    let got = store.get(id).await.unwrap().unwrap();
    assert_eq!(got.body["source"], json!("route-a"));

    let next = store.insert(body(json!({"source": "route-b"}))).await.unwrap();
    assert_eq!(next, RecordId(id.0 + 1));

    let reopened = DiagnosticStore::open(Arc::new(FileBackend::new(dir.path())))
        .await
        .unwrap();
    assert_eq!(reopened.scan().await.unwrap().len(), 2);
}
