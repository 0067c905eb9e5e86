//! Sync orchestrator
//!
//! Drives the overall sync cycle as a long-lived tokio task: connectivity
//! tracking, serialized one-at-a-time dispatch of queued actions, retry with
//! a fixed inter-attempt delay, and periodic remote snapshot refresh.
//!
//! Phases per process lifetime:
//!
//! - **Offline**: no dispatch; waits for the connectivity signal
//! - **Idle**: online, nothing dispatchable; waits for a trigger
//! - **Dispatching**: exactly one action in flight
//!
//! Triggers out of Idle: a mutation enqueuing a new action, connectivity
//! restored, a force-sync command, or the periodic refresh timer. An action
//! interrupted by process exit is simply
//! re-dispatched on the next run (at-least-once).

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch, Mutex};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::client::SyncClient;
use crate::config::Config;
use crate::engine::{RetryOutcome, SyncEngine};
use crate::models::QueuedAction;
use crate::remote::{SyncFailure, TodoApi};

/// Commands sent to the sync task
#[derive(Debug, Clone)]
pub enum SyncCommand {
    /// Refresh the remote snapshot and drain the queue now
    SyncNow,
    /// Shutdown the sync task
    Shutdown,
}

/// Events emitted by the sync task
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// Phase changed
    PhaseChanged(SyncPhase),
    /// The merged todo list changed (confirmed action or snapshot refresh)
    TodosUpdated,
    /// An action was dropped and its todo flagged for the user
    ActionFailed { local_id: Uuid, message: String },
    /// Non-fatal error (refresh failed, snapshot save failed)
    Error(String),
}

/// Orchestrator phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    /// Connectivity absent, no dispatch
    Offline,
    /// Online, queue empty or everything deferred
    Idle,
    /// One action in flight
    Dispatching,
}

/// Handle to control and monitor the sync task
pub struct SyncHandle {
    /// Send commands to the sync task
    pub command_tx: mpsc::Sender<SyncCommand>,
    /// Receive events from the sync task
    pub event_rx: mpsc::UnboundedReceiver<SyncEvent>,
    /// Watch the current phase
    pub phase_rx: watch::Receiver<SyncPhase>,
}

impl SyncHandle {
    /// Ask the task to sync immediately
    pub async fn force_sync_now(&self) {
        let _ = self.command_tx.send(SyncCommand::SyncNow).await;
    }

    /// Ask the task to shut down
    pub async fn shutdown(&self) {
        let _ = self.command_tx.send(SyncCommand::Shutdown).await;
    }
}

/// Timing knobs for the sync task, taken from the configuration
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Fixed delay between attempts after a transient failure or deferral
    pub retry_delay: Duration,
    /// Periodic remote snapshot refresh interval
    pub refresh_interval: Duration,
}

impl From<&Config> for SyncOptions {
    fn from(config: &Config) -> Self {
        Self {
            retry_delay: config.retry_delay(),
            refresh_interval: config.refresh_interval(),
        }
    }
}

/// Spawn the sync task
///
/// The task subscribes to the connectivity signal and runs until a
/// `Shutdown` command or until all handles to the command channel drop.
pub fn spawn_sync_task(
    engine: Arc<Mutex<SyncEngine>>,
    api: Arc<dyn TodoApi>,
    connectivity_rx: watch::Receiver<bool>,
    options: SyncOptions,
) -> SyncHandle {
    let (command_tx, command_rx) = mpsc::channel(16);
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (phase_tx, phase_rx) = watch::channel(SyncPhase::Offline);

    tokio::spawn(sync_task_loop(
        engine,
        api,
        connectivity_rx,
        options,
        command_rx,
        event_tx,
        phase_tx,
    ));

    SyncHandle {
        command_tx,
        event_rx,
        phase_rx,
    }
}

/// Outcome of a single dispatch
enum DispatchOutcome {
    /// Applied and removed from the queue
    Confirmed,
    /// Transient failure, still queued
    Retrying,
    /// Dropped (ceiling reached or rejected)
    Dropped,
    /// Dependency unresolved, left in place untouched
    Deferred,
}

/// Main sync task loop
async fn sync_task_loop(
    engine: Arc<Mutex<SyncEngine>>,
    api: Arc<dyn TodoApi>,
    mut connectivity_rx: watch::Receiver<bool>,
    options: SyncOptions,
    mut command_rx: mpsc::Receiver<SyncCommand>,
    event_tx: mpsc::UnboundedSender<SyncEvent>,
    phase_tx: watch::Sender<SyncPhase>,
) {
    let client = SyncClient::new(api.clone());
    let wake = { engine.lock().await.wake_signal() };

    // Actions deferred this round because their dependency has not resolved.
    // Cleared whenever something confirms or the snapshot refreshes, both of
    // which can resolve the dependency.
    let mut deferred: HashSet<Uuid> = HashSet::new();

    let mut refresh = tokio::time::interval(options.refresh_interval);
    refresh.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        if !*connectivity_rx.borrow() {
            set_phase(&phase_tx, &event_tx, SyncPhase::Offline);

            tokio::select! {
                changed = connectivity_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    if *connectivity_rx.borrow() {
                        info!("Connectivity restored");
                        deferred.clear();
                        refresh_snapshot(&engine, &api, &event_tx).await;
                    }
                }
                cmd = command_rx.recv() => {
                    match cmd {
                        Some(SyncCommand::Shutdown) | None => break,
                        // Nothing to do offline; the queue drains on restore
                        Some(SyncCommand::SyncNow) => {}
                    }
                }
            }
            continue;
        }

        // One action at a time: dependent actions for the same todo must hit
        // the server in queue order.
        let next = { engine.lock().await.next_eligible(&deferred) };
        if let Some(action) = next {
            set_phase(&phase_tx, &event_tx, SyncPhase::Dispatching);

            let outcome = dispatch_one(&client, &engine, &action, &event_tx).await;
            match outcome {
                DispatchOutcome::Confirmed => {
                    // A fresh server id may unblock deferred actions
                    deferred.clear();
                    continue;
                }
                DispatchOutcome::Dropped => continue,
                DispatchOutcome::Deferred => {
                    deferred.insert(action.action_id);
                }
                DispatchOutcome::Retrying => {}
            }

            // Wait at least one tick before the next attempt; never busy-loop
            tokio::select! {
                _ = tokio::time::sleep(options.retry_delay) => {}
                cmd = command_rx.recv() => {
                    match cmd {
                        Some(SyncCommand::Shutdown) | None => break,
                        Some(SyncCommand::SyncNow) => {}
                    }
                }
            }
            continue;
        }

        set_phase(&phase_tx, &event_tx, SyncPhase::Idle);

        tokio::select! {
            // A mutation enqueued an action; loop back around to dispatch it
            _ = wake.notified() => {}
            changed = connectivity_rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            cmd = command_rx.recv() => {
                match cmd {
                    Some(SyncCommand::SyncNow) => {
                        deferred.clear();
                        refresh_snapshot(&engine, &api, &event_tx).await;
                    }
                    Some(SyncCommand::Shutdown) | None => break,
                }
            }
            _ = refresh.tick() => {
                deferred.clear();
                refresh_snapshot(&engine, &api, &event_tx).await;
            }
        }
    }

    set_phase(&phase_tx, &event_tx, SyncPhase::Offline);
    debug!("Sync task stopped");
}

/// Dispatch one action and apply its outcome to the engine
async fn dispatch_one(
    client: &SyncClient,
    engine: &Arc<Mutex<SyncEngine>>,
    action: &QueuedAction,
    event_tx: &mpsc::UnboundedSender<SyncEvent>,
) -> DispatchOutcome {
    // Resolve the dependency and mark in-flight, then release the lock
    // before the network call so the rest of the app stays responsive.
    let target_server_id = {
        let mut engine = engine.lock().await;
        if let Err(e) = engine.begin_dispatch(action) {
            let _ = event_tx.send(SyncEvent::Error(e.to_string()));
        }
        engine.target_server_id(action)
    };

    match client.execute(action, target_server_id).await {
        Ok(result) => {
            let applied = engine
                .lock()
                .await
                .apply_success(action.action_id, result.as_ref());
            if let Err(e) = applied {
                let _ = event_tx.send(SyncEvent::Error(e.to_string()));
            }
            let _ = event_tx.send(SyncEvent::TodosUpdated);
            DispatchOutcome::Confirmed
        }

        Err(SyncFailure::Network(message)) => {
            warn!("Action {} failed: {}", action.action_id, message);
            let outcome = engine
                .lock()
                .await
                .apply_network_failure(action.action_id, &message);
            match outcome {
                Ok(RetryOutcome::WillRetry(count)) => {
                    debug!("Action {} retry {} queued", action.action_id, count);
                    DispatchOutcome::Retrying
                }
                Ok(RetryOutcome::Dropped) => {
                    let _ = event_tx.send(SyncEvent::ActionFailed {
                        local_id: action.target_local_id,
                        message,
                    });
                    let _ = event_tx.send(SyncEvent::TodosUpdated);
                    DispatchOutcome::Dropped
                }
                Err(e) => {
                    let _ = event_tx.send(SyncEvent::Error(e.to_string()));
                    DispatchOutcome::Retrying
                }
            }
        }

        Err(SyncFailure::Rejected { message }) => {
            warn!("Action {} rejected: {}", action.action_id, message);
            if let Err(e) = engine
                .lock()
                .await
                .apply_rejection(action.action_id, &message)
            {
                let _ = event_tx.send(SyncEvent::Error(e.to_string()));
            }
            let _ = event_tx.send(SyncEvent::ActionFailed {
                local_id: action.target_local_id,
                message,
            });
            let _ = event_tx.send(SyncEvent::TodosUpdated);
            DispatchOutcome::Dropped
        }

        Err(SyncFailure::DependencyNotReady) => {
            debug!(
                "Action {} deferred: create for {} unresolved",
                action.action_id, action.target_local_id
            );
            if let Err(e) = engine.lock().await.defer_action(action) {
                let _ = event_tx.send(SyncEvent::Error(e.to_string()));
            }
            DispatchOutcome::Deferred
        }
    }
}

/// Fetch the authoritative snapshot and merge it into local state
async fn refresh_snapshot(
    engine: &Arc<Mutex<SyncEngine>>,
    api: &Arc<dyn TodoApi>,
    event_tx: &mpsc::UnboundedSender<SyncEvent>,
) {
    match api.list_todos().await {
        Ok(snapshot) => {
            if let Err(e) = engine.lock().await.apply_snapshot(&snapshot) {
                let _ = event_tx.send(SyncEvent::Error(e.to_string()));
                return;
            }
            debug!("Snapshot refreshed ({} items)", snapshot.len());
            let _ = event_tx.send(SyncEvent::TodosUpdated);
        }
        Err(e) => {
            // The queue is untouched; refresh failures carry no retry penalty
            warn!("Snapshot refresh failed: {}", e);
            let _ = event_tx.send(SyncEvent::Error(e.to_string()));
        }
    }
}

fn set_phase(
    phase_tx: &watch::Sender<SyncPhase>,
    event_tx: &mpsc::UnboundedSender<SyncEvent>,
    phase: SyncPhase,
) {
    let changed = phase_tx.send_if_modified(|current| {
        if *current == phase {
            false
        } else {
            *current = phase;
            true
        }
    });
    if changed {
        let _ = event_tx.send(SyncEvent::PhaseChanged(phase));
    }
}

/// Report from a one-shot sync
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncReport {
    /// Actions confirmed by the server
    pub confirmed: usize,
    /// Actions dropped (rejected or out of retries)
    pub failed: usize,
    /// Actions left queued because their dependency never resolved
    pub deferred: usize,
}

/// Sync once: drain the queue, then refresh the remote snapshot
///
/// Blocking equivalent of the background task's cycle, used by the CLI.
/// Transient failures are retried in place with the configured delay until
/// each action confirms or drops.
pub async fn sync_once(
    engine: &Arc<Mutex<SyncEngine>>,
    api: Arc<dyn TodoApi>,
    options: &SyncOptions,
) -> anyhow::Result<SyncReport> {
    let client = SyncClient::new(api.clone());
    let (event_tx, _event_rx) = mpsc::unbounded_channel();

    let mut report = SyncReport::default();
    let mut deferred: HashSet<Uuid> = HashSet::new();

    loop {
        let next = { engine.lock().await.next_eligible(&deferred) };
        let Some(action) = next else {
            break;
        };

        match dispatch_one(&client, engine, &action, &event_tx).await {
            DispatchOutcome::Confirmed => {
                deferred.clear();
                report.confirmed += 1;
            }
            DispatchOutcome::Dropped => report.failed += 1,
            DispatchOutcome::Deferred => {
                deferred.insert(action.action_id);
                report.deferred += 1;
            }
            DispatchOutcome::Retrying => {
                tokio::time::sleep(options.retry_delay).await;
            }
        }
    }

    let snapshot = api
        .list_todos()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to fetch remote snapshot: {}", e))?;
    engine.lock().await.apply_snapshot(&snapshot)?;

    Ok(report)
}
