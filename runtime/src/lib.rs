//! # Todo Store Runtime
//!
//! Runtime implementation of the todo store.
//!
//! ## Core Components
//!
//! - **`TodoTable`**: the record store, keyed rows plus the id allocator
//! - **`QueryRegistry`**: active live queries, republished after each write
//! - **`TodoDatabase`**: table, registry and optional snapshot file behind one
//!   lock; implements [`TodoDao`](todo_store_core::dao::TodoDao)
//! - **`TodoRepository`**: facade over the query layer
//! - **`TodoViewModel`**: published views and fire-and-forget commands
//!
//! ## Example
//!
//! ```ignore
//! use todo_store_core::{Priority, environment::SystemClock};
//! use todo_store_runtime::{TodoDatabase, TodoRepository, TodoViewModel, ViewModelConfig};
//! use std::sync::Arc;
//!
//! let db = Arc::new(TodoDatabase::in_memory());
//! let view_model = TodoViewModel::open(
//!     TodoRepository::new(db),
//!     Arc::new(SystemClock),
//!     ViewModelConfig::default(),
//! ).await?;
//!
//! view_model.add_todo("Buy milk", Priority::Medium);
//! let mut all = view_model.all_todos();
//! all.wait_for(|todos| todos.len() == 1).await?;
//! ```

/// Configuration types
pub mod config;

/// The todo database (record store + live queries + durability)
pub mod database;

/// Metric descriptions and the Prometheus recorder
pub mod metrics;

/// Snapshot file persistence
pub mod persistence;

/// Live-query registry
pub mod registry;

/// Repository facade
pub mod repository;

/// Record store table
pub mod table;

/// View-state controller
pub mod view_model;

/// Error types for the runtime
pub mod error {
    use thiserror::Error;
    use todo_store_core::dao::DaoError;

    /// Errors that can occur in view model operations
    #[derive(Error, Debug)]
    pub enum ViewModelError {
        /// A live query could not be opened
        #[error("Failed to subscribe: {0}")]
        Subscribe(#[from] DaoError),

        /// Close timed out waiting for writes to finish
        ///
        /// Some writes were still running when the timeout elapsed.
        #[error("Close timed out with {0} writes still running")]
        ShutdownTimeout(usize),

        /// A write did not finish within the caller's timeout
        #[error("Timeout waiting for write")]
        WriteTimeout,
    }
}

pub use config::{DatabaseConfig, ViewModelConfig};
pub use database::TodoDatabase;
pub use error::ViewModelError;
pub use repository::TodoRepository;
pub use view_model::{TodoViewModel, WriteHandle};
