//! The record store: an ordered, keyed table of todo rows.
//!
//! [`TodoTable`] is plain synchronous data. Concurrency, notification and
//! durability are layered on top of it by `TodoDatabase`.

use std::collections::BTreeMap;
use todo_store_core::dao::DaoError;
use todo_store_core::query::{QueryFilter, newest_first};
use todo_store_core::{Todo, TodoId};

/// Row image of a single committed mutation.
///
/// `before` is `None` for an insert of a new id, `after` is `None` for a
/// delete.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Change {
    /// The row before the mutation
    pub before: Option<Todo>,
    /// The row after the mutation
    pub after: Option<Todo>,
}

impl Change {
    /// Whether the mutation left the row exactly as it was
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.before == self.after
    }

    /// Whether a query selecting with `filter` can see a different result
    #[must_use]
    pub fn affects(&self, filter: &QueryFilter) -> bool {
        if self.is_noop() {
            return false;
        }
        self.before
            .iter()
            .chain(self.after.iter())
            .any(|row| filter.matches(row))
    }
}

/// Keyed todo rows plus the id allocator.
#[derive(Clone, Debug)]
pub struct TodoTable {
    rows: BTreeMap<TodoId, Todo>,
    next_id: i64,
}

impl TodoTable {
    /// Creates an empty table; the first generated id is 1
    #[must_use]
    pub const fn new() -> Self {
        Self {
            rows: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Rebuilds a table from persisted parts.
    ///
    /// `next_id` is raised past the largest stored id so a stale counter can
    /// never hand out an id that is already taken.
    ///
    /// # Errors
    ///
    /// Returns [`DaoError::IdOutOfRange`] if a stored id has no successor.
    pub fn from_parts(rows: Vec<Todo>, next_id: i64) -> Result<Self, DaoError> {
        let max_id = rows
            .iter()
            .map(|t| t.id)
            .max()
            .unwrap_or(TodoId::UNASSIGNED);
        let after_max = successor(max_id)?;
        Ok(Self {
            rows: rows.into_iter().map(|t| (t.id, t)).collect(),
            next_id: next_id.max(after_max),
        })
    }

    /// The id the next insert without an explicit id receives
    #[must_use]
    pub const fn next_id(&self) -> i64 {
        self.next_id
    }

    /// Number of rows
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All rows in id order
    pub fn rows(&self) -> impl Iterator<Item = &Todo> {
        self.rows.values()
    }

    /// Point lookup
    #[must_use]
    pub fn get(&self, id: TodoId) -> Option<&Todo> {
        self.rows.get(&id)
    }

    /// Rows matching `filter`, newest first
    #[must_use]
    pub fn select(&self, filter: &QueryFilter) -> Vec<Todo> {
        let mut rows: Vec<Todo> = self
            .rows
            .values()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect();
        rows.sort_by(newest_first);
        rows
    }

    /// Inserts `todo`, assigning an id when it has none.
    ///
    /// An explicit id replaces whatever row is stored under it.
    ///
    /// # Errors
    ///
    /// Returns [`DaoError::IdOutOfRange`] if the id would leave the counter
    /// without a successor. The table is unchanged in that case.
    pub fn insert(&mut self, mut todo: Todo) -> Result<(TodoId, Change), DaoError> {
        if todo.id.is_assigned() {
            self.next_id = self.next_id.max(successor(todo.id)?);
        } else {
            let id = TodoId::new(self.next_id);
            self.next_id = successor(id)?;
            todo.id = id;
        }

        let id = todo.id;
        let before = self.rows.insert(id, todo.clone());
        Ok((
            id,
            Change {
                before,
                after: Some(todo),
            },
        ))
    }

    /// Replaces the row with `todo.id`; its `created_at` is kept.
    ///
    /// # Errors
    ///
    /// Returns [`DaoError::NotFound`] if no row has this id.
    pub fn update(&mut self, mut todo: Todo) -> Result<Change, DaoError> {
        let row = self
            .rows
            .get_mut(&todo.id)
            .ok_or(DaoError::NotFound(todo.id))?;

        todo.created_at = row.created_at;
        let before = std::mem::replace(row, todo.clone());
        Ok(Change {
            before: Some(before),
            after: Some(todo),
        })
    }

    /// Deletes the row with `id`, returning `None` if there was none
    pub fn delete(&mut self, id: TodoId) -> Option<Change> {
        self.rows.remove(&id).map(|before| Change {
            before: Some(before),
            after: None,
        })
    }

    /// Sets the completed flag of one row.
    ///
    /// # Errors
    ///
    /// Returns [`DaoError::NotFound`] if no row has this id.
    pub fn set_completed(&mut self, id: TodoId, completed: bool) -> Result<Change, DaoError> {
        let row = self.rows.get_mut(&id).ok_or(DaoError::NotFound(id))?;

        let before = row.clone();
        row.completed = completed;
        Ok(Change {
            before: Some(before),
            after: Some(row.clone()),
        })
    }

    /// Flips the completed flag of one row, returning the new value.
    ///
    /// # Errors
    ///
    /// Returns [`DaoError::NotFound`] if no row has this id.
    pub fn toggle_completed(&mut self, id: TodoId) -> Result<(bool, Change), DaoError> {
        let completed = !self.get(id).ok_or(DaoError::NotFound(id))?.completed;
        let change = self.set_completed(id, completed)?;
        Ok((completed, change))
    }

    /// Undoes `change`, restoring the `before` image.
    ///
    /// The id allocator is not rolled back: an id handed out once is burned.
    pub fn revert(&mut self, change: &Change) {
        match (&change.before, &change.after) {
            (Some(before), _) => {
                self.rows.insert(before.id, before.clone());
            }
            (None, Some(after)) => {
                self.rows.remove(&after.id);
            }
            (None, None) => {}
        }
    }
}

fn successor(id: TodoId) -> Result<i64, DaoError> {
    id.get().checked_add(1).ok_or(DaoError::IdOutOfRange(id))
}

impl Default for TodoTable {
    fn default() -> Self {
        Self::new()
    }
}
