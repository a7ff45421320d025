//! Integration tests for the view model
//!
//! Drives the full stack (view model → repository → database) through the
//! published values, the way a presentation layer would.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Tests can unwrap and panic

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use todo_store_core::dao::{DaoError, DaoFuture, LiveQuery, TodoDao};
use todo_store_core::environment::Clock;
use todo_store_core::query::SortOrder;
use todo_store_core::{Priority, Todo, TodoId};
use todo_store_runtime::{
    TodoDatabase, TodoRepository, TodoViewModel, ViewModelConfig, ViewModelError,
};
use todo_store_testing::helpers::{contents, wait_until};
use todo_store_testing::{FailingDao, SteppingClock, test_clock};

// ============================================================================
// Test Fixtures
// ============================================================================

async fn open_view_model() -> (Arc<TodoDatabase>, TodoViewModel) {
    let db = Arc::new(TodoDatabase::in_memory());
    let view_model = TodoViewModel::open(
        TodoRepository::new(db.clone()),
        Arc::new(SteppingClock::default()),
        ViewModelConfig::default(),
    )
    .await
    .unwrap();
    (db, view_model)
}

async fn add(view_model: &TodoViewModel, content: &str, priority: Priority) {
    view_model.add_todo(content, priority).wait().await;
}

fn find<'a>(todos: &'a [Todo], content: &str) -> &'a Todo {
    todos
        .iter()
        .find(|t| t.content == content)
        .unwrap_or_else(|| panic!("no todo named {content:?} in {todos:?}"))
}

// ============================================================================
// Published values
// ============================================================================

#[tokio::test]
async fn published_values_start_empty() {
    let (_db, view_model) = open_view_model().await;

    assert!(view_model.all_todos().borrow().is_empty());
    assert!(view_model.high_priority_todos().borrow().is_empty());
    assert!(view_model.incomplete_todos().borrow().is_empty());
}

#[tokio::test]
async fn end_to_end_scenario() {
    let (_db, view_model) = open_view_model().await;
    let mut all = view_model.all_todos();
    let mut high = view_model.high_priority_todos();

    add(&view_model, "Buy milk", Priority::Medium).await;
    wait_until(&mut all, |t| t.len() == 1).await;
    assert!(high.borrow().is_empty());

    add(&view_model, "Ship release", Priority::High).await;
    let todos = wait_until(&mut all, |t| t.len() == 2).await;
    let high_todos = wait_until(&mut high, |t| t.len() == 1).await;
    assert_eq!(contents(&high_todos), vec!["Ship release"]);
    assert_eq!(contents(&todos), vec!["Ship release", "Buy milk"]);

    let milk = find(&todos, "Buy milk").clone();
    view_model.toggle_complete(&milk).wait().await;
    let milk_done = |t: &[Todo]| find(t, "Buy milk").completed;
    let todos = wait_until(&mut all, milk_done).await;
    assert_eq!(todos.len(), 2);
    assert_eq!(contents(&todos), vec!["Ship release", "Buy milk"]);
    assert_eq!(find(&todos, "Buy milk").created_at, milk.created_at);

    let release = find(&todos, "Ship release").clone();
    view_model.delete_todo(&release).wait().await;
    wait_until(&mut high, <[Todo]>::is_empty).await;
    let todos = wait_until(&mut all, |t| t.len() == 1).await;
    assert_eq!(contents(&todos), vec!["Buy milk"]);
}

#[tokio::test]
async fn blank_content_is_ignored() {
    let (db, view_model) = open_view_model().await;
    let mut all = view_model.all_todos();

    add(&view_model, "", Priority::High).await;
    add(&view_model, "   ", Priority::Low).await;
    add(&view_model, "real", Priority::Low).await;

    let todos = wait_until(&mut all, |t| !t.is_empty()).await;
    assert_eq!(contents(&todos), vec!["real"]);
    assert_eq!(db.len().await, 1);
}

#[tokio::test]
async fn added_todos_get_distinct_ids() {
    let (_db, view_model) = open_view_model().await;
    let mut all = view_model.all_todos();

    let handles: Vec<_> = (0..20)
        .map(|i| {
            let content = format!("todo {i}");
            view_model.add_todo(&content, Priority::ALL[i % 3])
        })
        .collect();
    for handle in handles {
        handle.wait().await;
    }

    let todos = wait_until(&mut all, |t| t.len() == 20).await;
    let ids: HashSet<TodoId> = todos.iter().map(|t| t.id).collect();
    assert_eq!(ids.len(), 20);
}

#[tokio::test]
async fn all_todos_are_newest_first_and_high_is_filtered() {
    let (_db, view_model) = open_view_model().await;
    let mut all = view_model.all_todos();
    let mut high = view_model.high_priority_todos();

    for (i, priority) in [Priority::High, Priority::Low, Priority::High, Priority::Medium]
        .into_iter()
        .enumerate()
    {
        add(&view_model, &format!("todo {i}"), priority).await;
    }

    let todos = wait_until(&mut all, |t| t.len() == 4).await;
    assert!(todos.windows(2).all(|w| w[0].created_at > w[1].created_at));

    let high_todos = wait_until(&mut high, |t| t.len() == 2).await;
    assert!(high_todos.iter().all(|t| t.priority == Priority::High));
    assert_eq!(contents(&high_todos), vec!["todo 2", "todo 0"]);
}

#[tokio::test]
async fn toggle_twice_restores_completed() {
    let (_db, view_model) = open_view_model().await;
    let mut all = view_model.all_todos();

    add(&view_model, "flip", Priority::Low).await;
    let todo = wait_until(&mut all, |t| t.len() == 1).await.remove(0);

    view_model.toggle_complete(&todo).wait().await;
    view_model.toggle_complete(&todo).wait().await;

    let stored = view_model.get_todo_by_id(todo.id).await.unwrap();
    assert_eq!(stored.completed, todo.completed);
}

#[tokio::test]
async fn delete_removes_exactly_one() {
    let (_db, view_model) = open_view_model().await;
    let mut all = view_model.all_todos();

    for i in 0..5 {
        add(&view_model, &format!("todo {i}"), Priority::Medium).await;
    }
    let todos = wait_until(&mut all, |t| t.len() == 5).await;
    let victim = todos[2].clone();

    view_model.delete_todo(&victim).wait().await;
    let remaining = wait_until(&mut all, |t| t.len() == 4).await;

    assert!(remaining.iter().all(|t| t.id != victim.id));
    assert!(view_model.get_todo_by_id(victim.id).await.is_none());
}

#[tokio::test]
async fn update_changes_fields_but_not_created_at() {
    let (_db, view_model) = open_view_model().await;
    let mut all = view_model.all_todos();
    let mut high = view_model.high_priority_todos();

    add(&view_model, "draft", Priority::Low).await;
    let original = wait_until(&mut all, |t| t.len() == 1).await.remove(0);

    let mut edited = original.clone();
    edited.content = "final".to_string();
    edited.priority = Priority::High;
    edited.created_at = original.created_at + chrono::Duration::days(3);
    view_model.update_todo(edited).wait().await;

    let high_todos = wait_until(&mut high, |t| t.len() == 1).await;
    assert_eq!(high_todos[0].content, "final");
    assert_eq!(high_todos[0].created_at, original.created_at);
}

#[tokio::test]
async fn commands_on_missing_todo_are_noops() {
    let (db, view_model) = open_view_model().await;
    let ghost = Todo::new("ghost", Priority::High, chrono::Utc::now()).with_id(TodoId::new(404));

    view_model.update_todo(ghost.clone()).wait().await;
    view_model.toggle_complete(&ghost).wait().await;
    view_model.delete_todo(&ghost).wait().await;

    assert!(db.is_empty().await);
    assert!(view_model.get_todo_by_id(ghost.id).await.is_none());
}

#[tokio::test]
async fn incomplete_todos_track_completion() {
    let (_db, view_model) = open_view_model().await;
    let mut all = view_model.all_todos();
    let mut incomplete = view_model.incomplete_todos();

    add(&view_model, "one", Priority::Low).await;
    add(&view_model, "two", Priority::Low).await;
    let todos = wait_until(&mut all, |t| t.len() == 2).await;

    view_model.toggle_complete(find(&todos, "one")).wait().await;
    let open = wait_until(&mut incomplete, |t| t.len() == 1).await;
    assert_eq!(contents(&open), vec!["two"]);
}

#[tokio::test]
async fn sorted_todos_orders_current_snapshot() {
    let (_db, view_model) = open_view_model().await;
    let mut all = view_model.all_todos();

    add(&view_model, "low", Priority::Low).await;
    add(&view_model, "high", Priority::High).await;
    add(&view_model, "medium", Priority::Medium).await;
    wait_until(&mut all, |t| t.len() == 3).await;

    assert_eq!(
        contents(&view_model.sorted_todos(SortOrder::Newest)),
        vec!["medium", "high", "low"]
    );
    assert_eq!(
        contents(&view_model.sorted_todos(SortOrder::Oldest)),
        vec!["low", "high", "medium"]
    );
    assert_eq!(
        contents(&view_model.sorted_todos(SortOrder::Priority)),
        vec!["high", "medium", "low"]
    );
}

#[tokio::test]
async fn two_view_models_share_one_database() {
    let (db, first) = open_view_model().await;
    let second = TodoViewModel::open(
        TodoRepository::new(db.clone()),
        Arc::new(SteppingClock::default()),
        ViewModelConfig::default(),
    )
    .await
    .unwrap();

    add(&first, "shared", Priority::High).await;
    let mut high = second.high_priority_todos();
    let seen = wait_until(&mut high, |t| t.len() == 1).await;
    assert_eq!(contents(&seen), vec!["shared"]);
}

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test]
async fn commands_after_close_are_ignored() {
    let (db, view_model) = open_view_model().await;
    add(&view_model, "before", Priority::Low).await;

    view_model.close().await.unwrap();
    assert!(view_model.is_closed());

    let handle = view_model.add_todo("after", Priority::Low);
    assert!(!handle.is_pending());
    handle.wait().await;

    assert_eq!(db.len().await, 1);
}

#[tokio::test]
async fn close_releases_live_queries() {
    let (db, view_model) = open_view_model().await;
    assert_eq!(db.live_query_count().await, 2);

    view_model.close().await.unwrap();
    // Give the aborted tasks a moment to drop their receivers.
    tokio::time::sleep(Duration::from_millis(20)).await;

    // The next write prunes the idle registrations.
    let repository = TodoRepository::new(db.clone());
    repository
        .insert(Todo::new("x", Priority::Low, chrono::Utc::now()))
        .await
        .unwrap();
    assert_eq!(db.live_query_count().await, 0);
}

#[tokio::test]
async fn completed_write_handle_resolves_immediately() {
    let handle = todo_store_runtime::WriteHandle::completed();
    handle
        .wait_with_timeout(Duration::from_millis(10))
        .await
        .unwrap();
}

// ============================================================================
// Failure paths
// ============================================================================

#[tokio::test]
async fn storage_failures_are_not_surfaced() {
    let now = test_clock().now();
    let seeded = Todo::new("seeded", Priority::High, now).with_id(TodoId::new(1));
    let dao = Arc::new(FailingDao::with_rows(
        vec![seeded.clone()],
        DaoError::Storage("disk full".to_string()),
    ));
    let view_model = TodoViewModel::open(
        TodoRepository::new(dao.clone()),
        Arc::new(SteppingClock::default()),
        ViewModelConfig::default(),
    )
    .await
    .unwrap();

    let mut all = view_model.all_todos();
    let todos = wait_until(&mut all, |t| t.len() == 1).await;
    assert_eq!(todos[0], seeded);

    view_model.add_todo("lost", Priority::Low).wait().await;
    view_model.toggle_complete(&seeded).wait().await;
    view_model.delete_todo(&seeded).wait().await;

    assert_eq!(dao.attempted_writes(), 3);
    assert_eq!(view_model.all_todos().borrow().len(), 1);
    assert_eq!(view_model.get_todo_by_id(seeded.id).await, Some(seeded));
}

#[tokio::test]
async fn open_fails_when_store_refuses_subscribers() {
    struct ClosedDao;

    impl TodoDao for ClosedDao {
        fn observe_all(&self) -> DaoFuture<'_, LiveQuery> {
            Box::pin(async { Err(DaoError::Closed) })
        }
        fn observe_by_priority(&self, _priority: Priority) -> DaoFuture<'_, LiveQuery> {
            Box::pin(async { Err(DaoError::Closed) })
        }
        fn get_by_id(&self, _id: TodoId) -> DaoFuture<'_, Option<Todo>> {
            Box::pin(async { Ok(None) })
        }
        fn insert(&self, _todo: Todo) -> DaoFuture<'_, TodoId> {
            Box::pin(async { Err(DaoError::Closed) })
        }
        fn update(&self, _todo: Todo) -> DaoFuture<'_, ()> {
            Box::pin(async { Err(DaoError::Closed) })
        }
        fn delete_by_id(&self, _id: TodoId) -> DaoFuture<'_, ()> {
            Box::pin(async { Err(DaoError::Closed) })
        }
        fn set_completed(&self, _id: TodoId, _completed: bool) -> DaoFuture<'_, ()> {
            Box::pin(async { Err(DaoError::Closed) })
        }
        fn toggle_completed(&self, _id: TodoId) -> DaoFuture<'_, bool> {
            Box::pin(async { Err(DaoError::Closed) })
        }
    }

    let result = TodoViewModel::open(
        TodoRepository::new(Arc::new(ClosedDao)),
        Arc::new(SteppingClock::default()),
        ViewModelConfig::default(),
    )
    .await;

    assert!(matches!(
        result,
        Err(ViewModelError::Subscribe(DaoError::Closed))
    ));
}
