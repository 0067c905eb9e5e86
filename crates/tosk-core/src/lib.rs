//! Tosk Core Library
//!
//! This crate provides the core functionality for Tosk, an offline-first
//! todo manager that syncs against a remote REST API.
//!
//! # Architecture
//!
//! - **Local snapshot**: Source of truth for the UI, persisted as JSON
//! - **Action queue**: Durable FIFO of pending mutations, drained when online
//! - **Reconciler**: Idempotent merge of the remote snapshot into local state
//!
//! Every mutation applies locally first and queues an action; the sync
//! orchestrator confirms queued actions against the server one at a time.
//!
//! # Quick Start
//!
//! ```text
//! let mut engine = SyncEngine::open()?;
//!
//! // Add a todo (works offline)
//! let local_id = engine.add_todo("Buy milk", None, None)?;
//!
//! // Read the merged list
//! let todos = engine.merged_todos();
//! ```
//!
//! # Modules
//!
//! - `engine`: Local mutations and dispatch bookkeeping (main entry point)
//! - `models`: Data structures for todos and queued actions
//! - `queue`: Pending action queue
//! - `reconcile`: Remote/local merge
//! - `remote`: Remote API trait and HTTP implementation
//! - `storage`: JSON snapshot persistence
//! - `sync`: Background sync task and one-shot sync
//! - `config`: Application configuration

pub mod config;
pub mod engine;
pub mod models;
pub mod queue;
pub mod reconcile;
pub mod remote;
pub mod storage;
pub mod sync;

pub use config::Config;
pub use engine::{RetryOutcome, SyncEngine};
pub use models::{ActionKind, ActionPayload, ImageRef, LocalTodo, QueuedAction, ServerTodo, SyncStatus};
pub use queue::ActionQueue;
pub use remote::{DeleteOutcome, HttpTodoApi, SyncFailure, TodoApi, TodoPatch};
pub use storage::{LocalStore, StorageError, StorageStats};
pub use sync::{
    spawn_sync_task, sync_once, SyncClient, SyncEvent, SyncHandle, SyncOptions, SyncPhase,
    SyncReport,
};
