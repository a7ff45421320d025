//! Integration tests for file-backed databases

#![allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect

use std::sync::Arc;
use todo_store_core::dao::{DaoError, TodoDao};
use todo_store_core::environment::Clock;
use todo_store_core::{Priority, Todo, TodoId};
use todo_store_runtime::persistence::SCHEMA_VERSION;
use todo_store_runtime::{
    DatabaseConfig, TodoDatabase, TodoRepository, TodoViewModel, ViewModelConfig,
};
use todo_store_testing::helpers::{contents, wait_until};
use todo_store_testing::{SteppingClock, test_clock};

async fn open(path: &std::path::Path) -> TodoDatabase {
    TodoDatabase::open(DatabaseConfig::default().with_path(path))
        .await
        .unwrap()
}

#[tokio::test]
async fn rows_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("todo_database.bin");
    let now = test_clock().now();

    let (kept, completed) = {
        let db = open(&path).await;
        let kept = db
            .insert(Todo::new("Buy milk", Priority::Medium, now))
            .await
            .unwrap();
        let completed = db
            .insert(Todo::new("Ship release", Priority::High, now))
            .await
            .unwrap();
        db.set_completed(completed, true).await.unwrap();
        (kept, completed)
    };

    let db = open(&path).await;
    assert_eq!(db.len().await, 2);
    let kept = db.get_by_id(kept).await.unwrap().unwrap();
    assert_eq!(kept.content, "Buy milk");
    assert!(db.get_by_id(completed).await.unwrap().unwrap().completed);
}

#[tokio::test]
async fn ids_are_not_reused_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("todo_database.bin");

    let deleted = {
        let db = open(&path).await;
        db.insert(Todo::new("a", Priority::Low, test_clock().now()))
            .await
            .unwrap();
        let b = db
            .insert(Todo::new("b", Priority::Low, test_clock().now()))
            .await
            .unwrap();
        db.delete_by_id(b).await.unwrap();
        b
    };

    let db = open(&path).await;
    let fresh = db
        .insert(Todo::new("c", Priority::Low, test_clock().now()))
        .await
        .unwrap();
    assert!(fresh > deleted);
    assert_eq!(fresh, TodoId::new(3));
}

#[tokio::test]
async fn view_model_sees_persisted_rows_on_open() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("todo_database.bin");
    {
        let db = open(&path).await;
        db.insert(Todo::new("urgent", Priority::High, test_clock().now()))
            .await
            .unwrap();
    }

    let db = Arc::new(open(&path).await);
    let view_model = TodoViewModel::open(
        TodoRepository::new(db),
        Arc::new(SteppingClock::default()),
        ViewModelConfig::default(),
    )
    .await
    .unwrap();

    let mut receiver = view_model.high_priority_todos();
    let high = wait_until(&mut receiver, |t| t.len() == 1).await;
    assert_eq!(contents(&high), vec!["urgent"]);
}

#[tokio::test]
async fn corrupt_snapshot_refuses_to_open() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("todo_database.bin");
    let header = (SCHEMA_VERSION + 1).to_le_bytes();
    std::fs::write(&path, header).unwrap();

    let err = TodoDatabase::open(DatabaseConfig::default().with_path(&path))
        .await
        .unwrap_err();
    assert!(
        matches!(err, DaoError::Schema { .. } | DaoError::Serialization(_)),
        "unexpected error: {err:?}"
    );
}

#[tokio::test]
async fn in_memory_config_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let db = TodoDatabase::open(DatabaseConfig::in_memory())
        .await
        .unwrap();
    db.insert(Todo::new("ephemeral", Priority::Low, test_clock().now()))
        .await
        .unwrap();

    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}
