//! Configuration for databases and view models.

use std::path::PathBuf;
use std::time::Duration;

/// Configuration for [`TodoDatabase`](crate::TodoDatabase) instances
///
/// # Example
///
/// ```ignore
/// let config = DatabaseConfig::default().with_path("todo_database.bin");
/// let db = TodoDatabase::open(config).await?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct DatabaseConfig {
    /// Snapshot file; `None` keeps the table in memory only
    pub path: Option<PathBuf>,
}

impl DatabaseConfig {
    /// In-memory configuration
    #[must_use]
    pub const fn in_memory() -> Self {
        Self { path: None }
    }

    /// Persist the table to `path`
    #[must_use]
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }
}

/// Configuration for [`TodoViewModel`](crate::TodoViewModel) instances
#[derive(Debug, Clone)]
pub struct ViewModelConfig {
    /// How long `close` waits for in-flight writes
    pub shutdown_timeout: Duration,
}

impl ViewModelConfig {
    /// Create a new configuration with custom values
    #[must_use]
    pub const fn new(shutdown_timeout: Duration) -> Self {
        Self { shutdown_timeout }
    }

    /// Set the shutdown timeout
    #[must_use]
    pub const fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

impl Default for ViewModelConfig {
    fn default() -> Self {
        Self {
            shutdown_timeout: Duration::from_secs(5),
        }
    }
}
