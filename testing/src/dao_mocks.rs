//! Query-layer test doubles
//!
//! - [`FailingDao`]: serves a fixed set of rows and rejects every write

use std::sync::atomic::{AtomicUsize, Ordering};
use todo_store_core::dao::{DaoError, DaoFuture, LiveQuery, TodoDao};
use todo_store_core::query::{QueryFilter, newest_first};
use todo_store_core::{Priority, Todo, TodoId};
use tokio::sync::watch;

/// Query layer whose storage is broken.
///
/// Reads succeed against the seeded rows; every write fails with the
/// configured error and is counted.
///
/// # Example
///
/// ```
/// use todo_store_testing::FailingDao;
/// use todo_store_core::dao::{DaoError, TodoDao};
/// use todo_store_core::TodoId;
///
/// # async fn example() {
/// let dao = FailingDao::new(DaoError::Storage("disk full".into()));
/// assert!(dao.delete_by_id(TodoId::new(1)).await.is_err());
/// assert_eq!(dao.attempted_writes(), 1);
/// # }
/// ```
#[derive(Debug)]
pub struct FailingDao {
    rows: Vec<Todo>,
    error: DaoError,
    attempted_writes: AtomicUsize,
    queries: Vec<(QueryFilter, watch::Sender<Vec<Todo>>)>,
}

impl FailingDao {
    /// No rows; writes fail with `error`
    #[must_use]
    pub fn new(error: DaoError) -> Self {
        Self::with_rows(Vec::new(), error)
    }

    /// Serves `rows`; writes fail with `error`
    #[must_use]
    pub fn with_rows(mut rows: Vec<Todo>, error: DaoError) -> Self {
        rows.sort_by(newest_first);
        let queries = std::iter::once(QueryFilter::All)
            .chain(Priority::ALL.map(QueryFilter::Priority))
            .map(|filter| {
                let selected = rows.iter().filter(|t| filter.matches(t)).cloned().collect();
                (filter, watch::channel(selected).0)
            })
            .collect();

        Self {
            rows,
            error,
            attempted_writes: AtomicUsize::new(0),
            queries,
        }
    }

    /// How many writes have been attempted
    #[must_use]
    pub fn attempted_writes(&self) -> usize {
        self.attempted_writes.load(Ordering::SeqCst)
    }

    fn observe(&self, filter: QueryFilter) -> DaoFuture<'_, LiveQuery> {
        let live = self
            .queries
            .iter()
            .find(|(f, _)| *f == filter)
            .map(|(_, sender)| LiveQuery::new(sender.subscribe()))
            .ok_or(DaoError::Closed);
        Box::pin(async move { live })
    }

    fn reject<T: Send + 'static>(&self) -> DaoFuture<'_, T> {
        self.attempted_writes.fetch_add(1, Ordering::SeqCst);
        let error = self.error.clone();
        Box::pin(async move { Err(error) })
    }
}

impl TodoDao for FailingDao {
    fn observe_all(&self) -> DaoFuture<'_, LiveQuery> {
        self.observe(QueryFilter::All)
    }

    fn observe_by_priority(&self, priority: Priority) -> DaoFuture<'_, LiveQuery> {
        self.observe(QueryFilter::Priority(priority))
    }

    fn get_by_id(&self, id: TodoId) -> DaoFuture<'_, Option<Todo>> {
        let found = self.rows.iter().find(|t| t.id == id).cloned();
        Box::pin(async move { Ok(found) })
    }

    fn insert(&self, _todo: Todo) -> DaoFuture<'_, TodoId> {
        self.reject()
    }

    fn update(&self, _todo: Todo) -> DaoFuture<'_, ()> {
        self.reject()
    }

    fn delete_by_id(&self, _id: TodoId) -> DaoFuture<'_, ()> {
        self.reject()
    }

    fn set_completed(&self, _id: TodoId, _completed: bool) -> DaoFuture<'_, ()> {
        self.reject()
    }

    fn toggle_completed(&self, _id: TodoId) -> DaoFuture<'_, bool> {
        self.reject()
    }
}
