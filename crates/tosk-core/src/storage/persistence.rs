//! Snapshot persistence
//!
//! Handles saving and loading the local snapshot (todo list plus pending
//! action queue) to/from the filesystem. Uses atomic writes (write to temp
//! file, then rename) so a crash mid-save never leaves a torn snapshot: a
//! subsequent `load` sees either the old contents or the new, never a mix.
//!
//! Storage location: `~/.local/share/tosk/` (configurable via `Config`)
//!
//! Files:
//! - `snapshot.json` - the full todo list and action queue

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::{StorageError, StorageResult};
use crate::config::Config;
use crate::models::{LocalTodo, QueuedAction};

/// On-disk shape of the snapshot file
#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    todos: Vec<LocalTodo>,
    actions: Vec<QueuedAction>,
}

/// Durable store for the local todo snapshot and action queue
///
/// Every save replaces the full prior contents. The engine writes through on
/// each mutation, so a process restart never loses confirmed-or-queued state.
pub struct LocalStore {
    config: Config,
}

impl LocalStore {
    /// Create a new store with the given configuration
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Check if a snapshot exists on disk
    pub fn exists(&self) -> bool {
        self.config.snapshot_path().exists()
    }

    /// Load the snapshot from disk
    ///
    /// Returns empty sequences if no snapshot has been saved yet.
    pub fn load(&self) -> StorageResult<(Vec<LocalTodo>, Vec<QueuedAction>)> {
        let path = self.config.snapshot_path();

        if !path.exists() {
            return Ok((Vec::new(), Vec::new()));
        }

        let bytes = fs::read(&path).map_err(|e| StorageError::ReadError {
            path: path.clone(),
            source: e,
        })?;

        let snapshot: Snapshot = serde_json::from_slice(&bytes)
            .map_err(|e| StorageError::InvalidFormat { path, source: e })?;

        Ok((snapshot.todos, snapshot.actions))
    }

    /// Save the full snapshot, replacing prior contents
    pub fn save(&self, todos: &[LocalTodo], actions: &[QueuedAction]) -> StorageResult<()> {
        let snapshot = Snapshot {
            todos: todos.to_vec(),
            actions: actions.to_vec(),
        };

        let bytes = serde_json::to_vec_pretty(&snapshot).map_err(StorageError::Serialize)?;
        atomic_write(&self.config.snapshot_path(), &bytes)
    }

    /// Delete all stored data
    ///
    /// Use with caution!
    pub fn delete_all(&self) -> StorageResult<()> {
        let path = self.config.snapshot_path();
        if path.exists() {
            fs::remove_file(&path).map_err(|e| StorageError::from_io(e, path))?;
        }
        Ok(())
    }

    /// Storage statistics for status reporting
    pub fn stats(&self) -> StorageStats {
        let path = self.config.snapshot_path();
        let snapshot_size = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        StorageStats {
            snapshot_exists: path.exists(),
            snapshot_size,
        }
    }
}

/// Size information about the on-disk snapshot
#[derive(Debug, Clone, Copy)]
pub struct StorageStats {
    /// Whether the snapshot file exists
    pub snapshot_exists: bool,
    /// Snapshot file size in bytes
    pub snapshot_size: u64,
}

impl StorageStats {
    /// Human-readable size string
    pub fn size_human(&self) -> String {
        let size = self.snapshot_size;
        if size < 1024 {
            format!("{} B", size)
        } else if size < 1024 * 1024 {
            format!("{:.1} KB", size as f64 / 1024.0)
        } else {
            format!("{:.1} MB", size as f64 / (1024.0 * 1024.0))
        }
    }
}

/// Write data to a file atomically
///
/// 1. Write to a temporary file in the same directory
/// 2. Sync the file to disk
/// 3. Rename the temp file to the target path
///
/// This ensures the target file is never left in a partially-written state.
fn atomic_write(path: &Path, data: &[u8]) -> StorageResult<()> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| StorageError::CreateDirectory {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    // Create temp file in the same directory (for atomic rename)
    let temp_path = path.with_extension("tmp");

    let mut file = File::create(&temp_path)
        .map_err(|e| StorageError::from_io(e, temp_path.clone()))?;

    file.write_all(data)
        .map_err(|e| StorageError::from_io(e, temp_path.clone()))?;

    // Sync to disk before rename
    file.sync_all()
        .map_err(|e| StorageError::from_io(e, temp_path.clone()))?;

    // Atomic rename
    fs::rename(&temp_path, path).map_err(|e| StorageError::AtomicWriteFailed {
        from: temp_path,
        to: path.to_path_buf(),
        source: e,
    })?;

    Ok(())
}
