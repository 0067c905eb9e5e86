//! Action dispatch
//!
//! Translates queued actions into remote API calls and interprets the
//! outcomes into the failure taxonomy the orchestrator acts on.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::models::{ActionPayload, QueuedAction, ServerTodo};
use crate::remote::{content_type_for, DeleteOutcome, SyncFailure, TodoApi, TodoPatch};

/// Executes a single queued action against the remote API
pub struct SyncClient {
    api: Arc<dyn TodoApi>,
}

impl SyncClient {
    /// Create a client over the given remote API
    pub fn new(api: Arc<dyn TodoApi>) -> Self {
        Self { api }
    }

    /// Execute one action
    ///
    /// `target_server_id` is the target todo's server identity as known right
    /// now; updates need it and defer (`DependencyNotReady`) when the create
    /// that assigns it has not resolved yet.
    ///
    /// Returns the merged server representation, or `None` for deletes.
    pub async fn execute(
        &self,
        action: &QueuedAction,
        target_server_id: Option<i64>,
    ) -> Result<Option<ServerTodo>, SyncFailure> {
        match &action.payload {
            ActionPayload::Create {
                title,
                description,
                image,
            } => {
                let created = self
                    .api
                    .create_todo(title, description.as_deref())
                    .await?;
                debug!("Created todo server id {}", created.id);

                let Some(path) = image else {
                    return Ok(Some(created));
                };

                // The image lives on the local filesystem until the create
                // confirms. If the file vanished in the meantime the todo
                // still syncs, just without its attachment.
                let bytes = match tokio::fs::read(path).await {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        warn!("Skipping image attach, cannot read {:?}: {}", path, e);
                        return Ok(Some(created));
                    }
                };

                let attached = self
                    .api
                    .attach_image(created.id, bytes, content_type_for(path))
                    .await?;
                Ok(Some(attached))
            }

            ActionPayload::Update {
                title,
                description,
                completed,
            } => {
                let Some(server_id) = target_server_id else {
                    return Err(SyncFailure::DependencyNotReady);
                };
                let patch = TodoPatch {
                    title: title.clone(),
                    description: description.clone(),
                    completed: *completed,
                };
                let updated = self.api.update_todo(server_id, &patch).await?;
                Ok(Some(updated))
            }

            ActionPayload::Delete { server_id } => {
                match self.api.delete_todo(*server_id).await? {
                    DeleteOutcome::Deleted => {}
                    // Already gone server-side; same result
                    DeleteOutcome::NotFound => {
                        debug!("Todo {} already gone server-side", server_id)
                    }
                }
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LocalTodo;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use uuid::Uuid;

    /// Minimal API fake: creates succeed with a fixed id, deletes report
    /// whatever `delete_found` says, updates echo the patch back.
    struct FakeApi {
        create_calls: AtomicUsize,
        attach_calls: AtomicUsize,
        delete_found: bool,
    }

    impl FakeApi {
        fn new(delete_found: bool) -> Arc<Self> {
            Arc::new(Self {
                create_calls: AtomicUsize::new(0),
                attach_calls: AtomicUsize::new(0),
                delete_found,
            })
        }
    }

    #[async_trait]
    impl TodoApi for FakeApi {
        async fn create_todo(
            &self,
            title: &str,
            description: Option<&str>,
        ) -> Result<ServerTodo, SyncFailure> {
            self.create_calls.fetch_add(1, Ordering::SeqCst);
            Ok(ServerTodo {
                id: 42,
                title: title.to_string(),
                description: description.map(String::from),
                completed: false,
                image_url: None,
            })
        }

        async fn attach_image(
            &self,
            server_id: i64,
            _image: Vec<u8>,
            _content_type: &str,
        ) -> Result<ServerTodo, SyncFailure> {
            self.attach_calls.fetch_add(1, Ordering::SeqCst);
            Ok(ServerTodo {
                id: server_id,
                title: "with image".to_string(),
                description: None,
                completed: false,
                image_url: Some(format!("https://cdn.example.com/{}.png", server_id)),
            })
        }

        async fn update_todo(
            &self,
            server_id: i64,
            patch: &TodoPatch,
        ) -> Result<ServerTodo, SyncFailure> {
            Ok(ServerTodo {
                id: server_id,
                title: patch.title.clone().unwrap_or_else(|| "unchanged".into()),
                description: patch.description.clone(),
                completed: patch.completed.unwrap_or(false),
                image_url: None,
            })
        }

        async fn delete_todo(&self, _server_id: i64) -> Result<DeleteOutcome, SyncFailure> {
            Ok(if self.delete_found {
                DeleteOutcome::Deleted
            } else {
                DeleteOutcome::NotFound
            })
        }

        async fn list_todos(&self) -> Result<Vec<ServerTodo>, SyncFailure> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_create_returns_server_todo() {
        let api = FakeApi::new(true);
        let client = SyncClient::new(api.clone());
        let todo = LocalTodo::new("Buy milk", None);
        let action = QueuedAction::create(&todo);

        let result = client.execute(&action, None).await.unwrap().unwrap();
        assert_eq!(result.id, 42);
        assert_eq!(api.create_calls.load(Ordering::SeqCst), 1);
        assert_eq!(api.attach_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_create_with_image_attaches_after_create() {
        let dir = tempfile::tempdir().unwrap();
        let image_path = dir.path().join("receipt.png");
        std::fs::write(&image_path, b"fake png bytes").unwrap();

        let api = FakeApi::new(true);
        let client = SyncClient::new(api.clone());
        let todo = LocalTodo::new("Buy milk", None).with_image(&image_path);
        let action = QueuedAction::create(&todo);

        let result = client.execute(&action, None).await.unwrap().unwrap();
        assert_eq!(api.attach_calls.load(Ordering::SeqCst), 1);
        assert!(result.image_url.is_some());
    }

    #[tokio::test]
    async fn test_create_with_missing_image_still_syncs() {
        let api = FakeApi::new(true);
        let client = SyncClient::new(api.clone());
        let todo = LocalTodo::new("Buy milk", None).with_image("/nonexistent/receipt.png");
        let action = QueuedAction::create(&todo);

        let result = client.execute(&action, None).await.unwrap().unwrap();
        assert_eq!(result.id, 42);
        assert_eq!(api.attach_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_update_without_server_id_defers() {
        let client = SyncClient::new(FakeApi::new(true));
        let action = QueuedAction::update(Uuid::new_v4(), None, None, Some(true));

        let err = client.execute(&action, None).await.unwrap_err();
        assert_eq!(err, SyncFailure::DependencyNotReady);
    }

    #[tokio::test]
    async fn test_update_with_server_id() {
        let client = SyncClient::new(FakeApi::new(true));
        let action = QueuedAction::update(Uuid::new_v4(), None, None, Some(true));

        let result = client.execute(&action, Some(7)).await.unwrap().unwrap();
        assert_eq!(result.id, 7);
        assert!(result.completed);
    }

    #[tokio::test]
    async fn test_delete_not_found_is_success() {
        let client = SyncClient::new(FakeApi::new(false));
        let action = QueuedAction::delete(Uuid::new_v4(), 9);

        let result = client.execute(&action, Some(9)).await.unwrap();
        assert!(result.is_none());
    }
}
