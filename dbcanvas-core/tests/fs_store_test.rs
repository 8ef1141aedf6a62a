use std::sync::Arc;

use dbcanvas::collaborators::{CanvasStore, FsCanvasStore};
use dbcanvas::schema::Canvas;
use dbcanvas::{DuplicationService, EngineConfig, OwnerContext};
use dbcanvas_test_utils::{fixtures, StaticQuota, TempDir};

#[tokio::test]
async fn test_put_get_delete_roundtrip() {
    let temp = TempDir::new().unwrap();
    let store = FsCanvasStore::new(temp.path());

    assert_eq!(store.get("owner-1", "canvas_1").await.unwrap(), None);

    store.put("owner-1", "canvas_1", "{\"id\":\"canvas_1\"}").await.unwrap();
    assert!(temp.join("owner-1/canvas_1.json").exists());
    assert_eq!(
        store.get("owner-1", "canvas_1").await.unwrap().as_deref(),
        Some("{\"id\":\"canvas_1\"}")
    );

    store.delete("owner-1", "canvas_1").await.unwrap();
    let err = store.delete("owner-1", "canvas_1").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_duplicate_into_filesystem() {
    let temp = TempDir::new().unwrap();
    let store = Arc::new(FsCanvasStore::new(temp.path()));
    let quota = Arc::new(StaticQuota::with_count(0));
    let service = DuplicationService::new(store.clone(), quota, EngineConfig::default());

    let source = fixtures::project_tracker().unwrap();
    let outcome = service
        .duplicate(&source, &OwnerContext::new("owner-1"))
        .await
        .unwrap();

    let json = store
        .get("owner-1", &outcome.canvas_id)
        .await
        .unwrap()
        .unwrap();
    let loaded = Canvas::from_json_str(&json).unwrap();
    assert_eq!(loaded.source_canvas_id.as_deref(), Some("canvas_tracker"));
    assert_eq!(loaded.graph.databases.len(), 3);
}
