//! Snapshot file for durable tables.
//!
//! The whole table is written as one `bincode` document after every committed
//! mutation. Writes go to a sibling temporary file that is then renamed over
//! the previous snapshot, so a crash mid-write leaves the old file intact.

use crate::table::TodoTable;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use todo_store_core::Todo;
use todo_store_core::dao::DaoError;

/// Schema version written by this build.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct Snapshot {
    schema_version: u32,
    next_id: i64,
    rows: Vec<Todo>,
}

/// Location of a table's snapshot file.
#[derive(Debug, Clone)]
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    /// Snapshot stored at `path`
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Where the snapshot lives
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// Loads the table, or `None` if no snapshot has been written yet.
    ///
    /// # Errors
    ///
    /// - [`DaoError::Storage`]: the file exists but cannot be read
    /// - [`DaoError::Serialization`]: the file is not a valid snapshot
    /// - [`DaoError::Schema`]: the snapshot was written by another schema version
    /// - [`DaoError::IdOutOfRange`]: a stored id leaves no room for new ids
    pub async fn load(&self) -> Result<Option<TodoTable>, DaoError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(DaoError::Storage(format!("{}: {e}", self.path.display()))),
        };

        let snapshot: Snapshot = bincode::deserialize(&bytes)
            .map_err(|e| DaoError::Serialization(e.to_string()))?;
        if snapshot.schema_version != SCHEMA_VERSION {
            return Err(DaoError::Schema {
                found: snapshot.schema_version,
                expected: SCHEMA_VERSION,
            });
        }

        tracing::debug!(
            path = %self.path.display(),
            rows = snapshot.rows.len(),
            next_id = snapshot.next_id,
            "Loaded snapshot"
        );
        TodoTable::from_parts(snapshot.rows, snapshot.next_id)
            .map(Some)
    }

    /// Atomically replaces the snapshot with the contents of `table`.
    ///
    /// # Errors
    ///
    /// - [`DaoError::Serialization`]: the table cannot be encoded
    /// - [`DaoError::Storage`]: the file cannot be written or renamed
    pub async fn save(&self, table: &TodoTable) -> Result<(), DaoError> {
        let snapshot = Snapshot {
            schema_version: SCHEMA_VERSION,
            next_id: table.next_id(),
            rows: table.rows().cloned().collect(),
        };
        let bytes = bincode::serialize(&snapshot)
            .map_err(|e| DaoError::Serialization(e.to_string()))?;

        let temp = self.temp_path();
        tokio::fs::write(&temp, &bytes)
            .await
            .map_err(|e| DaoError::Storage(format!("{}: {e}", temp.display())))?;
        tokio::fs::rename(&temp, &self.path)
            .await
            .map_err(|e| DaoError::Storage(format!("{}: {e}", self.path.display())))?;

        tracing::trace!(bytes = bytes.len(), "Wrote snapshot");
        Ok(())
    }
}
