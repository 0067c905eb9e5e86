//! Background synchronization
//!
//! [`client`] executes a single queued action against the remote API;
//! [`orchestrator`] runs the long-lived task that drains the queue,
//! tracks connectivity and periodically refreshes the remote snapshot.

pub mod client;
pub mod orchestrator;

pub use client::SyncClient;
pub use orchestrator::{
    spawn_sync_task, sync_once, SyncCommand, SyncEvent, SyncHandle, SyncOptions, SyncPhase,
    SyncReport,
};
