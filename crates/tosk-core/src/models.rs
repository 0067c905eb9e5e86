//! Data models for tosk
//!
//! Defines the core data structures: LocalTodo, ServerTodo, and QueuedAction.
//! These models are designed to round-trip through the snapshot file and the
//! remote HTTP API.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sync state of a local todo
///
/// A todo is `Synced` exactly when it carries a server identity. The other
/// three states all mean "the server does not know this item yet":
/// `Pending` (queued), `Syncing` (create in flight), `Error` (gave up,
/// waiting for the user).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SyncStatus {
    /// Confirmed by the server
    Synced,
    /// Waiting to be dispatched
    Pending,
    /// Create currently in flight
    Syncing,
    /// Sync gave up; `error_message` explains why
    Error,
}

/// Reference to a todo's image attachment
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ImageRef {
    /// Not yet uploaded; path to the local file
    LocalPath(PathBuf),
    /// Server-hosted image
    RemoteUrl(String),
}

/// A todo as the client sees it
///
/// `local_id` is client-generated and stable for the item's local lifetime.
/// `server_id` is assigned once the server confirms the create.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LocalTodo {
    /// Client-generated identifier, unique and stable
    pub local_id: Uuid,
    /// Server identity, present once confirmed
    pub server_id: Option<i64>,
    /// Display title
    pub title: String,
    /// Optional description
    pub description: Option<String>,
    /// Completion flag
    pub completed: bool,
    /// Image attachment, local or remote
    pub image: Option<ImageRef>,
    /// Current sync state
    pub sync_status: SyncStatus,
    /// Human-readable error when `sync_status` is `Error`
    pub error_message: Option<String>,
    /// Local creation time; used for sort order and tie-breaking
    pub created_at: DateTime<Utc>,
}

impl LocalTodo {
    /// Create a new pending todo (optimistic local state)
    pub fn new(title: impl Into<String>, description: Option<String>) -> Self {
        Self {
            local_id: Uuid::new_v4(),
            server_id: None,
            title: title.into(),
            description,
            completed: false,
            image: None,
            sync_status: SyncStatus::Pending,
            error_message: None,
            created_at: Utc::now(),
        }
    }

    /// Attach a local image file
    pub fn with_image(mut self, path: impl Into<PathBuf>) -> Self {
        self.image = Some(ImageRef::LocalPath(path.into()));
        self
    }

    /// Materialize a synced todo from its server representation
    ///
    /// Used by the reconciler when a remote item has no local counterpart.
    pub fn from_remote(remote: &ServerTodo) -> Self {
        let mut todo = Self {
            local_id: Uuid::new_v4(),
            server_id: Some(remote.id),
            title: remote.title.clone(),
            description: remote.description.clone(),
            completed: remote.completed,
            image: None,
            sync_status: SyncStatus::Synced,
            error_message: None,
            created_at: Utc::now(),
        };
        todo.apply_remote(remote);
        todo
    }

    /// Overwrite this todo's fields with the server representation
    ///
    /// Assigns the server identity and transitions to `Synced`. The
    /// `local_id` and `created_at` stay untouched so the item remains stable
    /// for the UI across refreshes.
    pub fn apply_remote(&mut self, remote: &ServerTodo) {
        self.server_id = Some(remote.id);
        self.title = remote.title.clone();
        self.description = remote.description.clone();
        self.completed = remote.completed;
        self.image = remote.image_url.clone().map(ImageRef::RemoteUrl);
        self.sync_status = SyncStatus::Synced;
        self.error_message = None;
    }

    /// Whether the server knows this item
    pub fn is_synced(&self) -> bool {
        self.sync_status == SyncStatus::Synced
    }

    /// Check the identity invariant: a todo is Synced iff it has a server id
    pub fn invariant_holds(&self) -> bool {
        self.server_id.is_some() == (self.sync_status == SyncStatus::Synced)
    }
}

/// A todo as the server reports it
///
/// Elements of the remote snapshot; the single source of truth for
/// confirmed state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerTodo {
    /// Durable server identity
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// What kind of mutation an action performs
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ActionKind {
    Create,
    Update,
    Delete,
}

/// Kind-specific payload of a queued action
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ActionPayload {
    /// Full fields for a new todo
    Create {
        title: String,
        description: Option<String>,
        image: Option<PathBuf>,
    },
    /// Changed fields only; the server id is resolved from the target todo
    /// at dispatch time (it may not exist yet while the create is queued)
    Update {
        title: Option<String>,
        description: Option<String>,
        completed: Option<bool>,
    },
    /// Deletes always carry the server id; a never-synced todo is removed
    /// locally without queuing anything
    Delete { server_id: i64 },
}

/// A not-yet-confirmed mutation waiting in the action queue
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueuedAction {
    /// Unique, client-generated
    pub action_id: Uuid,
    /// The local todo this action targets
    pub target_local_id: Uuid,
    /// Kind-specific payload
    pub payload: ActionPayload,
    /// How many dispatch attempts have failed with a transient error
    pub retry_count: u32,
    /// When the last attempt was made
    pub last_attempt_at: Option<DateTime<Utc>>,
}

impl QueuedAction {
    fn new(target_local_id: Uuid, payload: ActionPayload) -> Self {
        Self {
            action_id: Uuid::new_v4(),
            target_local_id,
            payload,
            retry_count: 0,
            last_attempt_at: None,
        }
    }

    /// Queue a create for an optimistic local todo
    pub fn create(todo: &LocalTodo) -> Self {
        let image = match &todo.image {
            Some(ImageRef::LocalPath(path)) => Some(path.clone()),
            _ => None,
        };
        Self::new(
            todo.local_id,
            ActionPayload::Create {
                title: todo.title.clone(),
                description: todo.description.clone(),
                image,
            },
        )
    }

    /// Queue an update carrying only the changed fields
    pub fn update(
        target_local_id: Uuid,
        title: Option<String>,
        description: Option<String>,
        completed: Option<bool>,
    ) -> Self {
        Self::new(
            target_local_id,
            ActionPayload::Update {
                title,
                description,
                completed,
            },
        )
    }

    /// Queue a delete for a previously-synced todo
    pub fn delete(target_local_id: Uuid, server_id: i64) -> Self {
        Self::new(target_local_id, ActionPayload::Delete { server_id })
    }

    /// The action's kind, derived from its payload
    pub fn kind(&self) -> ActionKind {
        match self.payload {
            ActionPayload::Create { .. } => ActionKind::Create,
            ActionPayload::Update { .. } => ActionKind::Update,
            ActionPayload::Delete { .. } => ActionKind::Delete,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_todo_is_pending() {
        let todo = LocalTodo::new("Buy milk", None);
        assert_eq!(todo.sync_status, SyncStatus::Pending);
        assert!(todo.server_id.is_none());
        assert!(!todo.completed);
        assert!(todo.invariant_holds());
    }

    #[test]
    fn test_with_image() {
        let todo = LocalTodo::new("Buy milk", None).with_image("/tmp/receipt.png");
        assert_eq!(
            todo.image,
            Some(ImageRef::LocalPath(PathBuf::from("/tmp/receipt.png")))
        );
    }

    #[test]
    fn test_apply_remote_transitions_to_synced() {
        let mut todo = LocalTodo::new("Buy milk", None);
        let local_id = todo.local_id;
        let created_at = todo.created_at;

        todo.apply_remote(&ServerTodo {
            id: 42,
            title: "Buy milk".to_string(),
            description: None,
            completed: false,
            image_url: Some("https://cdn.example.com/42.png".to_string()),
        });

        assert_eq!(todo.server_id, Some(42));
        assert_eq!(todo.sync_status, SyncStatus::Synced);
        assert_eq!(
            todo.image,
            Some(ImageRef::RemoteUrl(
                "https://cdn.example.com/42.png".to_string()
            ))
        );
        // Local identity survives the overwrite
        assert_eq!(todo.local_id, local_id);
        assert_eq!(todo.created_at, created_at);
        assert!(todo.invariant_holds());
    }

    #[test]
    fn test_from_remote() {
        let remote = ServerTodo {
            id: 7,
            title: "From server".to_string(),
            description: Some("desc".to_string()),
            completed: true,
            image_url: None,
        };
        let todo = LocalTodo::from_remote(&remote);
        assert_eq!(todo.server_id, Some(7));
        assert!(todo.is_synced());
        assert!(todo.completed);
        assert!(todo.invariant_holds());
    }

    #[test]
    fn test_invariant_violation_detected() {
        let mut todo = LocalTodo::new("Buy milk", None);
        todo.server_id = Some(1);
        // Pending with a server id is the forbidden combination
        assert!(!todo.invariant_holds());
    }

    #[test]
    fn test_action_kinds() {
        let todo = LocalTodo::new("Buy milk", None);

        let create = QueuedAction::create(&todo);
        assert_eq!(create.kind(), ActionKind::Create);
        assert_eq!(create.target_local_id, todo.local_id);
        assert_eq!(create.retry_count, 0);
        assert!(create.last_attempt_at.is_none());

        let update = QueuedAction::update(todo.local_id, None, None, Some(true));
        assert_eq!(update.kind(), ActionKind::Update);

        let delete = QueuedAction::delete(todo.local_id, 42);
        assert_eq!(delete.kind(), ActionKind::Delete);
        assert_eq!(delete.payload, ActionPayload::Delete { server_id: 42 });
    }

    #[test]
    fn test_create_payload_carries_full_fields() {
        let todo =
            LocalTodo::new("Buy milk", Some("2%".to_string())).with_image("/tmp/receipt.png");
        let action = QueuedAction::create(&todo);
        match action.payload {
            ActionPayload::Create {
                title,
                description,
                image,
            } => {
                assert_eq!(title, "Buy milk");
                assert_eq!(description.as_deref(), Some("2%"));
                assert_eq!(image, Some(PathBuf::from("/tmp/receipt.png")));
            }
            other => panic!("Expected Create payload, got {:?}", other),
        }
    }

    #[test]
    fn test_server_todo_deserializes_with_defaults() {
        let json = r#"{"id": 3, "title": "Sparse"}"#;
        let remote: ServerTodo = serde_json::from_str(json).unwrap();
        assert_eq!(remote.id, 3);
        assert!(!remote.completed);
        assert!(remote.description.is_none());
        assert!(remote.image_url.is_none());
    }

    #[test]
    fn test_todo_serialization_round_trip() {
        let todo = LocalTodo::new("Buy milk", Some("2%".to_string()));
        let json = serde_json::to_string(&todo).unwrap();
        let deserialized: LocalTodo = serde_json::from_str(&json).unwrap();
        assert_eq!(todo, deserialized);
    }

    #[test]
    fn test_action_serialization_round_trip() {
        let action = QueuedAction::update(Uuid::new_v4(), Some("New".to_string()), None, None);
        let json = serde_json::to_string(&action).unwrap();
        let deserialized: QueuedAction = serde_json::from_str(&json).unwrap();
        assert_eq!(action, deserialized);
    }
}
