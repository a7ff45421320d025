//! Repository: the single entry point to the query layer.

use std::sync::Arc;
use todo_store_core::dao::{DaoError, LiveQuery, TodoDao};
use todo_store_core::{Priority, Todo, TodoId};

/// Facade over a [`TodoDao`].
///
/// Every operation passes straight through, except [`toggle_complete`]
/// which derives the new flag inside the store.
///
/// [`toggle_complete`]: TodoRepository::toggle_complete
#[derive(Clone)]
pub struct TodoRepository {
    dao: Arc<dyn TodoDao>,
}

impl TodoRepository {
    /// Creates a repository over `dao`
    #[must_use]
    pub fn new(dao: Arc<dyn TodoDao>) -> Self {
        Self { dao }
    }

    /// Live view of every todo, newest first.
    ///
    /// # Errors
    ///
    /// Propagates the query layer's subscription error.
    pub async fn observe_all(&self) -> Result<LiveQuery, DaoError> {
        self.dao.observe_all().await
    }

    /// Live view of the todos with `priority`, newest first.
    ///
    /// # Errors
    ///
    /// Propagates the query layer's subscription error.
    pub async fn observe_by_priority(&self, priority: Priority) -> Result<LiveQuery, DaoError> {
        self.dao.observe_by_priority(priority).await
    }

    /// Point lookup.
    ///
    /// # Errors
    ///
    /// Propagates storage errors; a missing row is `Ok(None)`.
    pub async fn get_by_id(&self, id: TodoId) -> Result<Option<Todo>, DaoError> {
        self.dao.get_by_id(id).await
    }

    /// Inserts a todo, returning its id.
    ///
    /// # Errors
    ///
    /// Propagates storage errors.
    pub async fn insert(&self, todo: Todo) -> Result<TodoId, DaoError> {
        self.dao.insert(todo).await
    }

    /// Replaces a stored todo.
    ///
    /// # Errors
    ///
    /// [`DaoError::NotFound`] if `todo.id` is not stored, otherwise storage errors.
    pub async fn update(&self, todo: Todo) -> Result<(), DaoError> {
        self.dao.update(todo).await
    }

    /// Deletes the row carrying `todo.id`.
    ///
    /// # Errors
    ///
    /// Propagates storage errors.
    pub async fn delete(&self, todo: &Todo) -> Result<(), DaoError> {
        self.dao.delete_by_id(todo.id).await
    }

    /// Sets the completed flag of one row.
    ///
    /// # Errors
    ///
    /// [`DaoError::NotFound`] if `id` is not stored, otherwise storage errors.
    pub async fn set_completed(&self, id: TodoId, completed: bool) -> Result<(), DaoError> {
        self.dao.set_completed(id, completed).await
    }

    /// Flips the completed flag of `todo` and returns the new value.
    ///
    /// The flip is computed from the stored row, not from `todo.completed`,
    /// so a stale copy in the caller's hands cannot undo a concurrent toggle.
    ///
    /// # Errors
    ///
    /// [`DaoError::NotFound`] if `todo.id` is not stored, otherwise storage errors.
    pub async fn toggle_complete(&self, todo: &Todo) -> Result<bool, DaoError> {
        self.dao.toggle_completed(todo.id).await
    }
}

impl std::fmt::Debug for TodoRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TodoRepository").finish_non_exhaustive()
    }
}
