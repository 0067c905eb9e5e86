//! Storage layer
//!
//! Durable persistence for the local todo snapshot and pending action queue.
//!
//! ## Architecture
//!
//! - **Snapshot file**: full JSON snapshot (todos + actions), replaced
//!   atomically on every save
//!
//! The engine writes through on each mutation, so queued offline work
//! survives process restarts.

pub mod error;
pub mod persistence;

pub use error::{StorageError, StorageResult};
pub use persistence::{LocalStore, StorageStats};
