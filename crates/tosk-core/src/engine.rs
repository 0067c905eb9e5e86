//! Sync engine
//!
//! The `SyncEngine` owns the in-memory todo list, the pending action queue,
//! and the durable snapshot store, and exposes the interface the UI layer
//! consumes:
//!
//! - mutations are applied optimistically and queued for sync
//! - every mutation writes through to the snapshot file
//! - the orchestrator drives the queue against the remote API through the
//!   engine's dispatch bookkeeping methods
//!
//! One engine is constructed per application instance and shared behind an
//! `Arc<tokio::sync::Mutex<_>>`; there is no hidden global state.
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = SyncEngine::open()?;
//!
//! // Optimistic mutation, queued for sync
//! let id = engine.add_todo("Buy milk", None, None)?;
//!
//! // Merged view for the UI
//! let todos = engine.merged_todos();
//! ```

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio::sync::Notify;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::models::{ActionKind, ActionPayload, LocalTodo, QueuedAction, ServerTodo, SyncStatus};
use crate::queue::ActionQueue;
use crate::reconcile;
use crate::storage::{LocalStore, StorageStats};

/// What became of an action after a transient failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryOutcome {
    /// Still queued; will be attempted again
    WillRetry(u32),
    /// Retry ceiling reached; action dropped and todo flagged
    Dropped,
}

/// Offline-first todo state with a durable pending-action queue
pub struct SyncEngine {
    /// Merged todo list (remote items first, then unsynced local items)
    todos: Vec<LocalTodo>,
    /// Not-yet-confirmed mutations, FIFO
    queue: ActionQueue,
    /// Durable snapshot persistence
    store: LocalStore,
    /// Configuration
    config: Config,
    /// Pinged on every user mutation so an idle sync task wakes up
    wake: Arc<Notify>,
}

impl SyncEngine {
    /// Open the engine, loading any persisted snapshot
    pub fn open() -> Result<Self> {
        let config = Config::load().context("Failed to load configuration")?;
        Self::open_with_config(config)
    }

    /// Open the engine with a specific configuration
    pub fn open_with_config(config: Config) -> Result<Self> {
        let store = LocalStore::new(config.clone());
        let (todos, actions) = store.load().context("Failed to load local snapshot")?;

        if !actions.is_empty() {
            info!(
                "Loaded {} todos with {} pending actions",
                todos.len(),
                actions.len()
            );
        }

        let mut engine = Self {
            todos,
            queue: ActionQueue::from_actions(actions),
            store,
            config,
            wake: Arc::new(Notify::new()),
        };

        // Actions persisted at or over the ceiling (possible after the retry
        // limit was lowered) would never be dispatched again; drop them now
        // and flag their todos instead of stranding them in the queue.
        let stranded = engine.queue.drain_over_limit(engine.config.retry_limit);
        if !stranded.is_empty() {
            warn!("Dropping {} action(s) over the retry ceiling", stranded.len());
            for action in &stranded {
                engine.flag_todo(
                    action.target_local_id,
                    format!("Sync failed after {} attempts", action.retry_count),
                );
            }
            engine.persist()?;
        }

        Ok(engine)
    }

    /// Signal the sync task waits on while idle
    ///
    /// Every mutation that enqueues or re-queues an action notifies it, so a
    /// new action is dispatched promptly instead of waiting for the next
    /// periodic refresh.
    pub fn wake_signal(&self) -> Arc<Notify> {
        self.wake.clone()
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Snapshot file statistics for status reporting
    pub fn storage_stats(&self) -> StorageStats {
        self.store.stats()
    }

    // ==================== Upward interface ====================

    /// The merged todo list, remote items first, then unsynced local items
    pub fn merged_todos(&self) -> &[LocalTodo] {
        &self.todos
    }

    /// Number of actions still waiting for confirmation
    pub fn pending_count(&self) -> usize {
        self.queue.len()
    }

    /// Look up a todo by its local id
    pub fn get_todo(&self, local_id: Uuid) -> Option<&LocalTodo> {
        self.todos.iter().find(|t| t.local_id == local_id)
    }

    /// Add a todo optimistically and queue its create
    ///
    /// Returns the new todo's local id.
    pub fn add_todo(
        &mut self,
        title: impl Into<String>,
        description: Option<String>,
        image: Option<PathBuf>,
    ) -> Result<Uuid> {
        let mut todo = LocalTodo::new(title, description);
        if let Some(path) = image {
            todo = todo.with_image(path);
        }
        let local_id = todo.local_id;

        self.queue.enqueue(QueuedAction::create(&todo));
        self.todos.push(todo);
        self.persist()?;
        self.wake.notify_one();

        debug!("Added todo {} (pending)", local_id);
        Ok(local_id)
    }

    /// Flip a todo's completed flag optimistically and queue the update
    pub fn toggle_todo(&mut self, local_id: Uuid) -> Result<()> {
        let todo = self
            .todos
            .iter_mut()
            .find(|t| t.local_id == local_id)
            .with_context(|| format!("No todo with local id {}", local_id))?;

        todo.completed = !todo.completed;
        let completed = todo.completed;

        self.queue
            .enqueue(QueuedAction::update(local_id, None, None, Some(completed)));
        self.persist()?;
        self.wake.notify_one();

        debug!("Toggled todo {} -> completed={}", local_id, completed);
        Ok(())
    }

    /// Remove a todo locally and, if the server knows it, queue the delete
    ///
    /// A never-synced todo short-circuits: it is removed immediately and any
    /// actions still queued for it (its create, later updates) are purged,
    /// since there is nothing to reconcile server-side.
    pub fn delete_todo(&mut self, local_id: Uuid) -> Result<()> {
        let pos = self
            .todos
            .iter()
            .position(|t| t.local_id == local_id)
            .with_context(|| format!("No todo with local id {}", local_id))?;

        let todo = self.todos.remove(pos);
        match todo.server_id {
            Some(server_id) => {
                self.queue.enqueue(QueuedAction::delete(local_id, server_id));
                debug!("Deleted todo {} (server id {} queued)", local_id, server_id);
            }
            None => {
                let purged = self.queue.purge_target(local_id);
                debug!("Deleted unsynced todo {} ({} actions purged)", local_id, purged);
            }
        }
        self.persist()?;
        self.wake.notify_one();
        Ok(())
    }

    /// Re-queue a failed todo with a fresh retry budget
    ///
    /// Only meaningful for todos flagged `Error`; the dropped create is
    /// rebuilt from the todo's current fields.
    pub fn retry_todo(&mut self, local_id: Uuid) -> Result<()> {
        let todo = self
            .todos
            .iter_mut()
            .find(|t| t.local_id == local_id)
            .with_context(|| format!("No todo with local id {}", local_id))?;

        if todo.sync_status != SyncStatus::Error {
            bail!("Todo {} is not in an error state", local_id);
        }

        todo.sync_status = SyncStatus::Pending;
        todo.error_message = None;
        let action = QueuedAction::create(todo);
        self.queue.enqueue(action);
        self.persist()?;
        self.wake.notify_one();

        info!("Re-queued failed todo {}", local_id);
        Ok(())
    }

    // ==================== Dispatch bookkeeping ====================

    /// The oldest dispatchable action, skipping deferred ids
    pub fn next_eligible(&self, skip: &HashSet<Uuid>) -> Option<QueuedAction> {
        self.queue
            .next_eligible(self.config.retry_limit, skip)
            .cloned()
    }

    /// The target todo's server identity, if assigned yet
    pub fn target_server_id(&self, action: &QueuedAction) -> Option<i64> {
        self.get_todo(action.target_local_id)
            .and_then(|t| t.server_id)
    }

    /// Mark the action's target as in flight
    ///
    /// Only a create changes the visible status: its target has no server
    /// identity yet, so `Syncing` is the state that tells the UI the item is
    /// being born server-side.
    pub fn begin_dispatch(&mut self, action: &QueuedAction) -> Result<()> {
        if action.kind() == ActionKind::Create {
            if let Some(todo) = self
                .todos
                .iter_mut()
                .find(|t| t.local_id == action.target_local_id)
            {
                todo.sync_status = SyncStatus::Syncing;
            }
            self.persist()?;
        }
        Ok(())
    }

    /// Apply a confirmed outcome: merge the server representation into the
    /// target todo and drop the action from the queue
    pub fn apply_success(
        &mut self,
        action_id: Uuid,
        result: Option<&ServerTodo>,
    ) -> Result<()> {
        let Some(action) = self.queue.remove(action_id) else {
            return Ok(());
        };

        if let Some(remote) = result {
            if let Some(todo) = self
                .todos
                .iter_mut()
                .find(|t| t.local_id == action.target_local_id)
            {
                todo.apply_remote(remote);
            }
        }

        debug!("Action {} ({:?}) confirmed", action_id, action.kind());
        self.persist()
    }

    /// Record a transient failure
    ///
    /// Bumps the retry counter; at the ceiling the action is dropped and the
    /// target todo flagged `Error`. Below the ceiling an in-flight create
    /// falls back to `Pending`.
    pub fn apply_network_failure(&mut self, action_id: Uuid, message: &str) -> Result<RetryOutcome> {
        let Some(count) = self.queue.bump_retry(action_id) else {
            return Ok(RetryOutcome::Dropped);
        };

        if count >= self.config.retry_limit {
            let action = self.queue.remove(action_id);
            if let Some(action) = action {
                self.flag_todo(
                    action.target_local_id,
                    format!("Sync failed after {} attempts: {}", count, message),
                );
            }
            self.persist()?;
            return Ok(RetryOutcome::Dropped);
        }

        // Create back to Pending while it waits for the next attempt
        if let Some(action) = self.queue.get(action_id) {
            if action.kind() == ActionKind::Create {
                if let Some(todo) = self
                    .todos
                    .iter_mut()
                    .find(|t| t.local_id == action.target_local_id)
                {
                    todo.sync_status = SyncStatus::Pending;
                }
            }
        }
        self.persist()?;
        Ok(RetryOutcome::WillRetry(count))
    }

    /// Record a permanent rejection: the action is dropped immediately and
    /// the todo carries the server's message
    pub fn apply_rejection(&mut self, action_id: Uuid, message: &str) -> Result<()> {
        if let Some(action) = self.queue.remove(action_id) {
            self.flag_todo(action.target_local_id, message.to_string());
        }
        self.persist()
    }

    /// Revert an in-flight create whose dispatch was deferred
    pub fn defer_action(&mut self, action: &QueuedAction) -> Result<()> {
        if action.kind() == ActionKind::Create {
            if let Some(todo) = self
                .todos
                .iter_mut()
                .find(|t| t.local_id == action.target_local_id)
            {
                if todo.sync_status == SyncStatus::Syncing {
                    todo.sync_status = SyncStatus::Pending;
                }
            }
            self.persist()?;
        }
        Ok(())
    }

    /// Merge an authoritative remote snapshot into the local list
    pub fn apply_snapshot(&mut self, remote: &[ServerTodo]) -> Result<()> {
        self.todos = reconcile::merge(remote, &self.todos);
        self.persist()
    }

    fn flag_todo(&mut self, local_id: Uuid, message: String) {
        if let Some(todo) = self.todos.iter_mut().find(|t| t.local_id == local_id) {
            // A synced todo keeps its identity invariant; only an unconfirmed
            // item transitions to the Error state.
            if todo.server_id.is_none() {
                todo.sync_status = SyncStatus::Error;
            }
            todo.error_message = Some(message);
        }
    }

    /// Write-through save of the full snapshot
    fn persist(&self) -> Result<()> {
        self.store
            .save(&self.todos, self.queue.actions())
            .context("Failed to save local snapshot")
    }
}
