//! # Todo Store Core
//!
//! Core types and traits for the todo store.
//!
//! This crate holds everything that is shared between the storage runtime and
//! its callers, without committing to any particular storage backend:
//!
//! - **Todo**: the single domain entity and its identifier/priority types
//! - **`TodoDao`**: the query layer, a fixed set of reads and writes, two of
//!   which are live queries
//! - **`LiveQuery`**: a subscriber handle that receives a fresh snapshot every
//!   time the rows it selects change
//! - **Environment**: injected dependencies (the [`environment::Clock`])
//!
//! ## Data Flow
//!
//! ```text
//! ┌──────────────┐  commands   ┌────────────┐   writes   ┌──────────────┐
//! │  View model  │ ──────────► │ Repository │ ─────────► │   TodoDao    │
//! └──────▲───────┘             └────────────┘            └──────┬───────┘
//!        │                                                      │
//!        │              snapshots (LiveQuery)                   │
//!        └──────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use todo_store_core::{Priority, Todo, dao::TodoDao};
//!
//! async fn example(dao: &dyn TodoDao) -> Result<(), todo_store_core::dao::DaoError> {
//!     let mut live = dao.observe_all().await?;
//!     let id = dao.insert(Todo::new("Buy milk", Priority::Medium, chrono::Utc::now())).await?;
//!
//!     let snapshot = live.next().await;
//!     assert!(snapshot.is_some());
//!     Ok(())
//! }
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};

/// The Todo entity, its identifier and its priority.
pub mod todo;

/// Query layer trait, live queries and storage errors.
pub mod dao;

/// Query filters and client-side sort orders.
pub mod query;

/// Human readable formatting of todo timestamps.
pub mod format;

pub use todo::{Priority, Todo, TodoId};

/// Environment module - Dependency injection traits
///
/// All external dependencies are abstracted behind traits and injected
/// into the components that need them.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```ignore
    /// // Production - uses system clock
    /// let clock = SystemClock;
    ///
    /// // Test - fixed time for deterministic tests
    /// struct FixedClock { time: DateTime<Utc> }
    /// impl Clock for FixedClock {
    ///     fn now(&self) -> DateTime<Utc> {
    ///         self.time
    ///     }
    /// }
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Wall-clock time from the operating system.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
