//! Domain types for the todo store.
//!
//! A todo list is a single table of [`Todo`] rows. Rows are created with an
//! unassigned id, receive their permanent id from the store on insert, and
//! keep their creation timestamp for their whole life.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for a todo row
///
/// Ids are assigned by the store, start at 1 and are never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TodoId(i64);

impl TodoId {
    /// Marker for a todo that has not been inserted yet.
    pub const UNASSIGNED: Self = Self(0);

    /// Creates a `TodoId` from its raw value
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw value
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }

    /// Whether the store has assigned this id
    #[must_use]
    pub const fn is_assigned(self) -> bool {
        self.0 != 0
    }
}

impl Default for TodoId {
    fn default() -> Self {
        Self::UNASSIGNED
    }
}

impl std::fmt::Display for TodoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

/// Priority of a todo
///
/// The snapshot file stores it by ordinal: `High` = 0, `Medium` = 1, `Low` = 2.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    /// Most urgent
    High,
    /// Default urgency
    Medium,
    /// Least urgent
    Low,
}

impl Priority {
    /// All priorities, most urgent first.
    pub const ALL: [Self; 3] = [Self::High, Self::Medium, Self::Low];

    /// Sort weight, higher is more urgent.
    #[must_use]
    pub const fn weight(self) -> u8 {
        match self {
            Self::High => 3,
            Self::Medium => 2,
            Self::Low => 1,
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
        };
        f.pad(label)
    }
}

/// A single todo row
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    /// Store-assigned identifier ([`TodoId::UNASSIGNED`] before insert)
    pub id: TodoId,
    /// What needs doing
    pub content: String,
    /// How urgent it is
    pub priority: Priority,
    /// Whether the todo is done
    pub completed: bool,
    /// When the todo was created, millisecond precision
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl Todo {
    /// Creates a new, not yet inserted, todo
    ///
    /// `created_at` is truncated to whole milliseconds so that the value
    /// survives a round trip through the snapshot file unchanged.
    #[must_use]
    pub fn new(content: impl Into<String>, priority: Priority, created_at: DateTime<Utc>) -> Self {
        let created_at = DateTime::from_timestamp_millis(created_at.timestamp_millis())
            .unwrap_or(created_at);

        Self {
            id: TodoId::UNASSIGNED,
            content: content.into(),
            priority,
            completed: false,
            created_at,
        }
    }

    /// Returns the same todo carrying `id`
    #[must_use]
    pub fn with_id(mut self, id: TodoId) -> Self {
        self.id = id;
        self
    }

    /// Creation time in milliseconds since the Unix epoch
    #[must_use]
    pub fn created_at_millis(&self) -> i64 {
        self.created_at.timestamp_millis()
    }
}
