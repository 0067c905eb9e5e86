//! Status command handler

use anyhow::Result;

use tosk_core::{SyncEngine, SyncStatus};

use crate::output::{Output, OutputFormat};

/// Show status information
pub fn show(engine: &SyncEngine, output: &Output) -> Result<()> {
    let stats = engine.storage_stats();
    let config = engine.config();

    let todos = engine.merged_todos();
    let synced = todos.iter().filter(|t| t.is_synced()).count();
    let errored = todos
        .iter()
        .filter(|t| t.sync_status == SyncStatus::Error)
        .count();

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "api_url": config.api_url,
                    "pending_actions": engine.pending_count(),
                    "storage": {
                        "snapshot_exists": stats.snapshot_exists,
                        "snapshot_size": stats.snapshot_size
                    },
                    "counts": {
                        "todos": todos.len(),
                        "synced": synced,
                        "errored": errored
                    }
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", engine.pending_count());
        }
        OutputFormat::Human => {
            println!("Tosk Status");
            println!("===========");
            println!();
            println!("Sync:");
            println!(
                "  Server:  {}",
                config.api_url.as_deref().unwrap_or("(not set)")
            );
            println!("  Pending: {} action(s)", engine.pending_count());
            println!();
            println!("Storage:");
            println!("  Location: {}", config.data_dir.display());
            println!("  Size:     {}", stats.size_human());
            println!();
            println!("Contents:");
            println!("  Todos:  {}", todos.len());
            println!("  Synced: {}", synced);
            if errored > 0 {
                println!("  Failed: {} (see `tosk list`, retry with `tosk retry <id>`)", errored);
            }
        }
    }

    Ok(())
}
