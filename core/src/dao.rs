//! Query layer for the todo table.
//!
//! This module defines [`TodoDao`], the fixed set of operations the rest of
//! the system may perform against the todo table, and [`LiveQuery`], the
//! subscriber side of the two observable queries.
//!
//! # Live vs. point queries
//!
//! - [`TodoDao::observe_all`] and [`TodoDao::observe_by_priority`] are live:
//!   the subscriber receives the current snapshot first, then a new snapshot
//!   after every committed write that can change the result.
//! - [`TodoDao::get_by_id`] is a point lookup: resolved once, never re-pushed.
//!
//! # Implementations
//!
//! - `TodoDatabase` (in `todo-store-runtime`): in-memory table with an optional
//!   snapshot file
//! - `FailingDao` (in `todo-store-testing`): rejects every write, for
//!   exercising error paths

use crate::todo::{Priority, Todo, TodoId};
use futures::Stream;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;
use tokio::sync::watch;

/// Errors that can occur during query-layer operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DaoError {
    /// No row with this id exists.
    #[error("Todo not found: {0}")]
    NotFound(TodoId),

    /// The backing storage could not be read or written.
    #[error("Storage error: {0}")]
    Storage(String),

    /// A snapshot could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The snapshot file was written by an incompatible schema.
    #[error("Unsupported schema version {found} (expected {expected})")]
    Schema {
        /// Version found in the file
        found: u32,
        /// Version this build reads and writes
        expected: u32,
    },

    /// The id leaves the allocator no successor to hand out next.
    #[error("Todo id {0} is out of range")]
    IdOutOfRange(TodoId),

    /// The store has been dropped and no longer accepts operations.
    #[error("Store closed")]
    Closed,
}

impl DaoError {
    /// Whether this error only means the addressed row does not exist
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Boxed future returned by every [`TodoDao`] operation.
pub type DaoFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, DaoError>> + Send + 'a>>;

/// Subscriber handle of a live query.
///
/// Wraps a `watch` receiver shared by every subscriber of the same query.
/// Intermediate snapshots may be skipped when the subscriber is slower than
/// the writers, but the latest one is never missed.
///
/// # Example
///
/// ```ignore
/// let mut live = dao.observe_all().await?;
/// while let Some(todos) = live.next().await {
///     render(&todos);
/// }
/// ```
#[derive(Debug)]
pub struct LiveQuery {
    receiver: watch::Receiver<Vec<Todo>>,
    primed: bool,
}

impl LiveQuery {
    /// Wraps a receiver; the first [`next`](Self::next) yields its current value.
    #[must_use]
    pub const fn new(receiver: watch::Receiver<Vec<Todo>>) -> Self {
        Self {
            receiver,
            primed: false,
        }
    }

    /// The latest published snapshot, without waiting.
    #[must_use]
    pub fn current(&self) -> Vec<Todo> {
        self.receiver.borrow().clone()
    }

    /// Waits for the next snapshot.
    ///
    /// The first call returns immediately with the current snapshot. Later
    /// calls wait for a change. Returns `None` once the store is gone.
    pub async fn next(&mut self) -> Option<Vec<Todo>> {
        if !self.primed {
            self.primed = true;
            return Some(self.receiver.borrow_and_update().clone());
        }

        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }

    /// Converts the handle into a `Stream` of snapshots.
    pub fn into_stream(mut self) -> impl Stream<Item = Vec<Todo>> + Send + 'static {
        async_stream::stream! {
            while let Some(snapshot) = self.next().await {
                yield snapshot;
            }
        }
    }
}

/// Query layer over the todo table.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; a single instance is shared by the
/// repository and every view model built on it.
///
/// # Dyn Compatibility
///
/// This trait uses explicit `Pin<Box<dyn Future>>` returns instead of `async fn`
/// to enable trait object usage (`Arc<dyn TodoDao>`).
pub trait TodoDao: Send + Sync {
    /// Subscribe to every row, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`DaoError::Closed`] if the store no longer accepts subscribers.
    fn observe_all(&self) -> DaoFuture<'_, LiveQuery>;

    /// Subscribe to the rows with `priority`, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`DaoError::Closed`] if the store no longer accepts subscribers.
    fn observe_by_priority(&self, priority: Priority) -> DaoFuture<'_, LiveQuery>;

    /// Point lookup by id.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the row cannot be read. A missing row is
    /// `Ok(None)`, never an error.
    fn get_by_id(&self, id: TodoId) -> DaoFuture<'_, Option<Todo>>;

    /// Insert a row, returning its id.
    ///
    /// An unassigned id gets a fresh one; an assigned id replaces any row
    /// already stored under it.
    ///
    /// # Errors
    ///
    /// - [`DaoError::IdOutOfRange`]: the id leaves no room for later ids
    /// - [`DaoError::Storage`]: the write cannot be made durable
    fn insert(&self, todo: Todo) -> DaoFuture<'_, TodoId>;

    /// Replace the row with `todo.id`, keeping its stored `created_at`.
    ///
    /// # Errors
    ///
    /// - [`DaoError::NotFound`]: no row has this id
    /// - [`DaoError::Storage`]: the write cannot be made durable
    fn update(&self, todo: Todo) -> DaoFuture<'_, ()>;

    /// Delete the row with `id`. Deleting a missing row is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`DaoError::Storage`] if the write cannot be made durable.
    fn delete_by_id(&self, id: TodoId) -> DaoFuture<'_, ()>;

    /// Set the completed flag of one row.
    ///
    /// # Errors
    ///
    /// - [`DaoError::NotFound`]: no row has this id
    /// - [`DaoError::Storage`]: the write cannot be made durable
    fn set_completed(&self, id: TodoId, completed: bool) -> DaoFuture<'_, ()>;

    /// Flip the stored completed flag of one row, returning the new value.
    ///
    /// The read and the write happen under the same lock, so two concurrent
    /// toggles always cancel out.
    ///
    /// # Errors
    ///
    /// - [`DaoError::NotFound`]: no row has this id
    /// - [`DaoError::Storage`]: the write cannot be made durable
    fn toggle_completed(&self, id: TodoId) -> DaoFuture<'_, bool>;
}
