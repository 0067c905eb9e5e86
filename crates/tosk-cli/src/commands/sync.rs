//! Sync command handler

use std::sync::Arc;

use anyhow::{bail, Result};
use tokio::sync::Mutex;

use tosk_core::sync::{sync_once, SyncOptions};
use tosk_core::{HttpTodoApi, SyncEngine};

use crate::output::Output;

/// Sync with the remote server: push queued actions, then pull the snapshot
pub async fn sync(engine: SyncEngine, output: &Output) -> Result<()> {
    let config = engine.config().clone();

    let Some(ref api_url) = config.api_url else {
        bail!(
            "API URL not configured. Set it with:\n  \
             tosk config set api_url https://your-server/api"
        );
    };

    let api = Arc::new(HttpTodoApi::new(api_url, config.request_timeout())?);
    let options = SyncOptions::from(&config);

    let pending = engine.pending_count();
    if pending > 0 {
        output.message(&format!("Pushing {} pending action(s)...", pending));
    }

    let engine = Arc::new(Mutex::new(engine));
    let report = sync_once(&engine, api, &options).await?;

    let engine = engine.lock().await;
    match output.format {
        crate::output::OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "confirmed": report.confirmed,
                    "failed": report.failed,
                    "deferred": report.deferred,
                    "todos": engine.merged_todos().len(),
                    "pending": engine.pending_count()
                })
            );
        }
        _ => {
            if report.failed > 0 {
                output.message(&format!(
                    "{} action(s) could not be synced; run `tosk list` to see flagged todos",
                    report.failed
                ));
            }
            if report.deferred > 0 {
                output.message(&format!(
                    "{} action(s) deferred until their todo syncs",
                    report.deferred
                ));
            }
            output.success(&format!(
                "Sync complete - {} confirmed, {} todo(s) total",
                report.confirmed,
                engine.merged_todos().len()
            ));
        }
    }

    Ok(())
}
