//! Remote todo API
//!
//! The engine only ever talks to the server through the [`TodoApi`] trait,
//! so tests script outcomes with an in-memory fake and the CLI plugs in the
//! HTTP implementation.
//!
//! Failures map into a small taxonomy the orchestrator drives its retry
//! decisions from:
//!
//! - `Network`: transient, retried with a delay up to the retry ceiling
//! - `Rejected`: permanent, the action is dropped and the todo flagged
//! - `DependencyNotReady`: ordering issue, deferred without a retry penalty

mod http;

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::ServerTodo;

pub use http::HttpTodoApi;

/// Why a remote call could not be applied
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SyncFailure {
    /// Transient transport failure (timeout, connection refused, 5xx)
    #[error("Network error: {0}")]
    Network(String),

    /// The server refused the request and always will (validation error)
    #[error("Rejected by server: {message}")]
    Rejected { message: String },

    /// The action depends on a create that has not resolved yet
    #[error("Dependency not ready: the target todo has no server identity yet")]
    DependencyNotReady,
}

/// Outcome of a remote delete
///
/// `NotFound` means the item was already gone server-side, which callers
/// treat the same as a successful delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
}

/// Changed fields for a remote update
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TodoPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl TodoPatch {
    /// Whether the patch changes nothing
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.completed.is_none()
    }
}

/// The remote todo API the sync engine consumes
///
/// Implementations must be safe to retry: the orchestrator re-dispatches
/// actions interrupted mid-flight (at-least-once delivery).
#[async_trait]
pub trait TodoApi: Send + Sync {
    /// Create a todo, returning the server representation
    async fn create_todo(
        &self,
        title: &str,
        description: Option<&str>,
    ) -> Result<ServerTodo, SyncFailure>;

    /// Attach an image to an existing todo
    async fn attach_image(
        &self,
        server_id: i64,
        image: Vec<u8>,
        content_type: &str,
    ) -> Result<ServerTodo, SyncFailure>;

    /// Apply changed fields to an existing todo
    async fn update_todo(
        &self,
        server_id: i64,
        patch: &TodoPatch,
    ) -> Result<ServerTodo, SyncFailure>;

    /// Delete a todo; already-gone items report `NotFound`, not an error
    async fn delete_todo(&self, server_id: i64) -> Result<DeleteOutcome, SyncFailure>;

    /// Fetch the authoritative snapshot, server-ordered (newest first)
    async fn list_todos(&self) -> Result<Vec<ServerTodo>, SyncFailure>;
}

/// Guess a content type from an image file extension
pub(crate) fn content_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "image/jpeg",
    }
}
