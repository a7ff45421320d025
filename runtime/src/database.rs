//! The todo database: record store, live-query registry and snapshot file
//! behind a single lock.
//!
//! # Write path
//!
//! ```text
//! lock ─► mutate table ─► persist snapshot ─► notify registry ─► unlock
//!                              │
//!                              └── on failure: revert mutation, return error
//! ```
//!
//! Every write runs the full path while holding the lock. Writes are
//! therefore serialized, and a subscriber is notified of a write before the
//! next write can start.

use crate::config::DatabaseConfig;
use crate::persistence::SnapshotFile;
use crate::registry::QueryRegistry;
use crate::table::{Change, TodoTable};
use todo_store_core::dao::{DaoError, DaoFuture, LiveQuery, TodoDao};
use todo_store_core::query::QueryFilter;
use todo_store_core::{Priority, Todo, TodoId};
use tokio::sync::Mutex;

struct Inner {
    table: TodoTable,
    registry: QueryRegistry,
}

/// Owner of the todo table.
///
/// Construct one per process at the composition root and share it as
/// `Arc<TodoDatabase>` (or `Arc<dyn TodoDao>`).
///
/// # Example
///
/// ```ignore
/// let db = Arc::new(TodoDatabase::open(DatabaseConfig::default().with_path("todos.bin")).await?);
/// let mut live = db.observe_all().await?;
/// db.insert(Todo::new("Buy milk", Priority::Medium, Utc::now())).await?;
/// ```
pub struct TodoDatabase {
    inner: Mutex<Inner>,
    snapshot: Option<SnapshotFile>,
}

impl TodoDatabase {
    /// An empty database that is never written to disk
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_table(TodoTable::new(), None)
    }

    /// Opens a database as described by `config`.
    ///
    /// With a path set, an existing snapshot is loaded and every later write
    /// is persisted to it.
    ///
    /// # Errors
    ///
    /// Returns the snapshot's load error if the file exists but cannot be used.
    pub async fn open(config: DatabaseConfig) -> Result<Self, DaoError> {
        let Some(path) = config.path else {
            return Ok(Self::in_memory());
        };

        let snapshot = SnapshotFile::new(path);
        let table = snapshot.load().await?.unwrap_or_default();
        tracing::info!(
            path = %snapshot.path().display(),
            rows = table.len(),
            "Opened todo database"
        );
        metrics::gauge!("todo_store.rows").set(table.len() as f64);

        Ok(Self::from_table(table, Some(snapshot)))
    }

    fn from_table(table: TodoTable, snapshot: Option<SnapshotFile>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                table,
                registry: QueryRegistry::new(),
            }),
            snapshot,
        }
    }

    /// Number of stored rows
    pub async fn len(&self) -> usize {
        self.inner.lock().await.table.len()
    }

    /// Whether the table is empty
    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.table.is_empty()
    }

    /// Number of live queries currently registered
    pub async fn live_query_count(&self) -> usize {
        self.inner.lock().await.registry.len()
    }

    async fn subscribe(&self, filter: QueryFilter) -> LiveQuery {
        let mut inner = self.inner.lock().await;
        let Inner { table, registry } = &mut *inner;
        registry.subscribe(filter, table)
    }

    /// Applies one mutation and runs the rest of the write path.
    ///
    /// `mutation` returns its result together with the row image, or `None`
    /// when nothing was touched.
    #[tracing::instrument(skip(self, mutation), name = "todo_write")]
    async fn commit<T, F>(&self, op: &'static str, mutation: F) -> Result<T, DaoError>
    where
        F: FnOnce(&mut TodoTable) -> Result<(T, Option<Change>), DaoError> + Send,
        T: Send,
    {
        let mut inner = self.inner.lock().await;
        let Inner { table, registry } = &mut *inner;
        let start = std::time::Instant::now();

        let (output, change) = match mutation(table) {
            Ok(applied) => applied,
            Err(error) => {
                tracing::debug!(%error, "Write rejected");
                return Err(error);
            }
        };

        let Some(change) = change.filter(|change| !change.is_noop()) else {
            tracing::debug!("Write left the table unchanged");
            return Ok(output);
        };

        if let Some(snapshot) = &self.snapshot {
            if let Err(error) = snapshot.save(table).await {
                table.revert(&change);
                tracing::error!(%error, "Failed to persist write, rolled back");
                metrics::counter!("todo_store.write_failures", "op" => op)
                    .increment(1);
                return Err(error);
            }
        }

        registry.notify(&change, table);
        metrics::counter!("todo_store.writes", "op" => op)
            .increment(1);
        metrics::gauge!("todo_store.rows").set(table.len() as f64);
        metrics::histogram!("todo_store.write_duration_seconds", "op" => op)
            .record(start.elapsed().as_secs_f64());
        tracing::debug!(rows = table.len(), "Write committed");

        Ok(output)
    }
}

impl std::fmt::Debug for TodoDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TodoDatabase")
            .field("snapshot", &self.snapshot)
            .finish_non_exhaustive()
    }
}

impl TodoDao for TodoDatabase {
    fn observe_all(&self) -> DaoFuture<'_, LiveQuery> {
        Box::pin(async move { Ok(self.subscribe(QueryFilter::All).await) })
    }

    fn observe_by_priority(&self, priority: Priority) -> DaoFuture<'_, LiveQuery> {
        Box::pin(async move { Ok(self.subscribe(QueryFilter::Priority(priority)).await) })
    }

    fn get_by_id(&self, id: TodoId) -> DaoFuture<'_, Option<Todo>> {
        Box::pin(async move { Ok(self.inner.lock().await.table.get(id).cloned()) })
    }

    fn insert(&self, todo: Todo) -> DaoFuture<'_, TodoId> {
        Box::pin(self.commit("insert", move |table| {
            let (id, change) = table.insert(todo)?;
            Ok((id, Some(change)))
        }))
    }

    fn update(&self, todo: Todo) -> DaoFuture<'_, ()> {
        Box::pin(self.commit("update", move |table| {
            table.update(todo).map(|change| ((), Some(change)))
        }))
    }

    fn delete_by_id(&self, id: TodoId) -> DaoFuture<'_, ()> {
        Box::pin(self.commit("delete", move |table| Ok(((), table.delete(id)))))
    }

    fn set_completed(&self, id: TodoId, completed: bool) -> DaoFuture<'_, ()> {
        Box::pin(self.commit("set_completed", move |table| {
            table
                .set_completed(id, completed)
                .map(|change| ((), Some(change)))
        }))
    }

    fn toggle_completed(&self, id: TodoId) -> DaoFuture<'_, bool> {
        Box::pin(self.commit("toggle_completed", move |table| {
            table
                .toggle_completed(id)
                .map(|(completed, change)| (completed, Some(change)))
        }))
    }
}
