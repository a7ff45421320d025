//! Query filters and sort orders.
//!
//! Every live query in the store selects rows with a [`QueryFilter`] and
//! returns them newest first (see [`newest_first`]). Callers that want a
//! different presentation re-sort a snapshot with [`sort_todos`].

use crate::todo::{Priority, Todo};
use std::cmp::{Ordering, Reverse};

/// Row predicate of a live query
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum QueryFilter {
    /// Every row
    All,
    /// Rows with exactly this priority
    Priority(Priority),
}

impl QueryFilter {
    /// Whether `todo` belongs in this query's result
    #[must_use]
    pub fn matches(&self, todo: &Todo) -> bool {
        match self {
            Self::All => true,
            Self::Priority(priority) => todo.priority == *priority,
        }
    }
}

impl std::fmt::Display for QueryFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Priority(priority) => write!(f, "priority={priority}"),
        }
    }
}

/// Canonical store ordering: `created_at` descending, then id descending.
///
/// The id tiebreak keeps rows created within the same millisecond in
/// reverse insertion order.
#[must_use]
pub fn newest_first(a: &Todo, b: &Todo) -> Ordering {
    (b.created_at, b.id).cmp(&(a.created_at, a.id))
}

/// Presentation orders for a list of todos
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Most recently created first
    #[default]
    Newest,
    /// Oldest first
    Oldest,
    /// Most urgent first, newest first within a priority
    Priority,
}

/// Sorts `todos` in place
///
/// `Priority` is a stable sort, so an input that is already newest first
/// stays newest first within each priority.
pub fn sort_todos(todos: &mut [Todo], order: SortOrder) {
    match order {
        SortOrder::Newest => todos.sort_by(newest_first),
        SortOrder::Oldest => todos.sort_by(|a, b| newest_first(b, a)),
        SortOrder::Priority => todos.sort_by_key(|t| Reverse(t.priority.weight())),
    }
}
