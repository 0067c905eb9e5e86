//! Todo command handlers

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use uuid::Uuid;

use tosk_core::SyncEngine;

use crate::output::Output;

/// Add a new todo
///
/// Works offline: the todo appears immediately and its create is queued.
pub fn add(
    engine: &mut SyncEngine,
    title: String,
    description: Option<String>,
    image: Option<PathBuf>,
    output: &Output,
) -> Result<()> {
    if let Some(ref path) = image {
        if !path.exists() {
            bail!("Image file not found: {}", path.display());
        }
    }

    let local_id = engine
        .add_todo(title, description, image)
        .context("Failed to add todo")?;

    output.success(&format!("Added todo: {}", local_id));
    if let Some(todo) = engine.get_todo(local_id) {
        output.print_todo(todo);
    }

    Ok(())
}

/// List all todos
pub fn list(engine: &SyncEngine, output: &Output) -> Result<()> {
    output.print_todos(engine.merged_todos());
    Ok(())
}

/// Show a single todo
pub fn show(engine: &SyncEngine, id: String, output: &Output) -> Result<()> {
    let local_id = parse_todo_id(&id, engine)?;

    let todo = engine
        .get_todo(local_id)
        .ok_or_else(|| anyhow::anyhow!("Todo not found: {}", id))?;

    output.print_todo(todo);
    Ok(())
}

/// Toggle a todo's completion state
pub fn toggle(engine: &mut SyncEngine, id: String, output: &Output) -> Result<()> {
    let local_id = parse_todo_id(&id, engine)?;

    engine.toggle_todo(local_id).context("Failed to toggle")?;

    let todo = engine
        .get_todo(local_id)
        .ok_or_else(|| anyhow::anyhow!("Todo not found: {}", id))?;
    let state = if todo.completed { "done" } else { "not done" };
    output.success(&format!("Marked {} as {}", &id, state));

    Ok(())
}

/// Delete a todo
pub fn delete(engine: &mut SyncEngine, id: String, output: &Output) -> Result<()> {
    let local_id = parse_todo_id(&id, engine)?;

    engine.delete_todo(local_id).context("Failed to delete")?;

    output.success(&format!("Deleted todo: {}", local_id));
    Ok(())
}

/// Re-queue a todo whose sync previously failed
pub fn retry(engine: &mut SyncEngine, id: String, output: &Output) -> Result<()> {
    let local_id = parse_todo_id(&id, engine)?;

    engine.retry_todo(local_id)?;

    output.success(&format!(
        "Queued {} for retry. Run `tosk sync` to push it.",
        local_id
    ));
    Ok(())
}

/// Parse a todo ID (supports full UUID or prefix)
fn parse_todo_id(id: &str, engine: &SyncEngine) -> Result<Uuid> {
    // Try full UUID first
    if let Ok(uuid) = Uuid::parse_str(id) {
        return Ok(uuid);
    }

    // Try prefix match
    let matches: Vec<_> = engine
        .merged_todos()
        .iter()
        .filter(|t| t.local_id.to_string().starts_with(id))
        .collect();

    match matches.len() {
        0 => bail!("No todo found matching: {}", id),
        1 => Ok(matches[0].local_id),
        _ => {
            eprintln!("Multiple todos match '{}':", id);
            for todo in &matches {
                eprintln!("  {} - {}", todo.local_id, todo.title);
            }
            bail!("Ambiguous ID. Please provide more characters.");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;
    use tosk_core::Config;
    use tempfile::TempDir;

    fn test_engine(temp_dir: &TempDir) -> SyncEngine {
        let config = Config {
            data_dir: temp_dir.path().to_path_buf(),
            ..Config::default()
        };
        SyncEngine::open_with_config(config).unwrap()
    }

    #[test]
    fn test_add_and_list() {
        let temp_dir = TempDir::new().unwrap();
        let mut engine = test_engine(&temp_dir);
        let output = Output::new(OutputFormat::Quiet);

        add(&mut engine, "Buy milk".to_string(), None, None, &output).unwrap();
        assert_eq!(engine.merged_todos().len(), 1);
        assert_eq!(engine.pending_count(), 1);
    }

    #[test]
    fn test_add_with_missing_image_fails() {
        let temp_dir = TempDir::new().unwrap();
        let mut engine = test_engine(&temp_dir);
        let output = Output::new(OutputFormat::Quiet);

        let result = add(
            &mut engine,
            "Photo".to_string(),
            None,
            Some(PathBuf::from("/nonexistent/photo.jpg")),
            &output,
        );
        assert!(result.is_err());
        assert!(engine.merged_todos().is_empty());
    }

    #[test]
    fn test_prefix_resolution() {
        let temp_dir = TempDir::new().unwrap();
        let mut engine = test_engine(&temp_dir);

        let local_id = engine.add_todo("Only one", None, None).unwrap();
        let prefix = &local_id.to_string()[..8];

        assert_eq!(parse_todo_id(prefix, &engine).unwrap(), local_id);
        assert!(parse_todo_id("zzzzzzzz", &engine).is_err());
    }

    #[test]
    fn test_toggle_by_prefix() {
        let temp_dir = TempDir::new().unwrap();
        let mut engine = test_engine(&temp_dir);
        let output = Output::new(OutputFormat::Quiet);

        let local_id = engine.add_todo("Flip me", None, None).unwrap();
        let prefix = local_id.to_string()[..8].to_string();

        toggle(&mut engine, prefix, &output).unwrap();
        assert!(engine.get_todo(local_id).unwrap().completed);
    }
}
