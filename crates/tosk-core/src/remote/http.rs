//! HTTP implementation of the remote todo API
//!
//! Talks JSON to a REST backend:
//!
//! - `POST   {base}/todos`            create
//! - `POST   {base}/todos/{id}/image` attach image (multipart)
//! - `PATCH  {base}/todos/{id}`       update changed fields
//! - `DELETE {base}/todos/{id}`       delete (404 means already gone)
//! - `GET    {base}/todos`            authoritative snapshot
//!
//! Every request carries the configured timeout; timeouts and connection
//! errors surface as `SyncFailure::Network` so the orchestrator retries them.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::{DeleteOutcome, SyncFailure, TodoApi, TodoPatch};
use crate::models::ServerTodo;

/// Error body shape the backend uses for rejections
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Remote todo API over HTTP
pub struct HttpTodoApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTodoApi {
    /// Create a client for the given API base URL
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Map a non-success response into the failure taxonomy
    ///
    /// 4xx is a rejection the server will always repeat; everything else is
    /// treated as transient.
    async fn classify_error(response: Response) -> SyncFailure {
        let status = response.status();
        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.message,
            Err(_) => status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string(),
        };

        if status.is_client_error() {
            SyncFailure::Rejected { message }
        } else {
            SyncFailure::Network(format!("{}: {}", status, message))
        }
    }

    async fn parse_todo(response: Response) -> Result<ServerTodo, SyncFailure> {
        if !response.status().is_success() {
            return Err(Self::classify_error(response).await);
        }
        response
            .json::<ServerTodo>()
            .await
            .map_err(|e| SyncFailure::Network(format!("Invalid response body: {}", e)))
    }
}

/// Transport-level errors (timeout, refused connection) are all transient
impl From<reqwest::Error> for SyncFailure {
    fn from(error: reqwest::Error) -> Self {
        SyncFailure::Network(error.to_string())
    }
}

#[async_trait]
impl TodoApi for HttpTodoApi {
    async fn create_todo(
        &self,
        title: &str,
        description: Option<&str>,
    ) -> Result<ServerTodo, SyncFailure> {
        debug!("POST /todos title={:?}", title);
        let response = self
            .client
            .post(self.url("/todos"))
            .json(&json!({ "title": title, "description": description }))
            .send()
            .await?;
        Self::parse_todo(response).await
    }

    async fn attach_image(
        &self,
        server_id: i64,
        image: Vec<u8>,
        content_type: &str,
    ) -> Result<ServerTodo, SyncFailure> {
        debug!("POST /todos/{}/image ({} bytes)", server_id, image.len());
        let part = reqwest::multipart::Part::bytes(image)
            .file_name("image")
            .mime_str(content_type)
            .map_err(|e| SyncFailure::Rejected {
                message: format!("Unsupported content type: {}", e),
            })?;
        let form = reqwest::multipart::Form::new().part("image", part);

        let response = self
            .client
            .post(self.url(&format!("/todos/{}/image", server_id)))
            .multipart(form)
            .send()
            .await?;
        Self::parse_todo(response).await
    }

    async fn update_todo(
        &self,
        server_id: i64,
        patch: &TodoPatch,
    ) -> Result<ServerTodo, SyncFailure> {
        debug!("PATCH /todos/{}", server_id);
        let response = self
            .client
            .patch(self.url(&format!("/todos/{}", server_id)))
            .json(patch)
            .send()
            .await?;
        Self::parse_todo(response).await
    }

    async fn delete_todo(&self, server_id: i64) -> Result<DeleteOutcome, SyncFailure> {
        debug!("DELETE /todos/{}", server_id);
        let response = self
            .client
            .delete(self.url(&format!("/todos/{}", server_id)))
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(DeleteOutcome::NotFound),
            status if status.is_success() => Ok(DeleteOutcome::Deleted),
            _ => Err(Self::classify_error(response).await),
        }
    }

    async fn list_todos(&self) -> Result<Vec<ServerTodo>, SyncFailure> {
        debug!("GET /todos");
        let response = self.client.get(self.url("/todos")).send().await?;

        if !response.status().is_success() {
            return Err(Self::classify_error(response).await);
        }
        response
            .json::<Vec<ServerTodo>>()
            .await
            .map_err(|e| SyncFailure::Network(format!("Invalid response body: {}", e)))
    }
}
