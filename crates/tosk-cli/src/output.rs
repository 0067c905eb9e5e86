//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use tosk_core::{ImageRef, LocalTodo, SyncStatus};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Check if output is in quiet mode
    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    /// Print a single todo with full detail
    pub fn print_todo(&self, todo: &LocalTodo) {
        match self.format {
            OutputFormat::Human => {
                println!("ID:        {}", todo.local_id);
                println!(
                    "Server ID: {}",
                    todo.server_id
                        .map(|id| id.to_string())
                        .unwrap_or_else(|| "(not synced)".to_string())
                );
                println!("Title:     {}", todo.title);
                if let Some(ref desc) = todo.description {
                    println!("Details:   {}", desc);
                }
                println!("Done:      {}", if todo.completed { "yes" } else { "no" });
                match todo.image {
                    Some(ImageRef::LocalPath(ref path)) => {
                        println!("Image:     {} (local)", path.display());
                    }
                    Some(ImageRef::RemoteUrl(ref url)) => {
                        println!("Image:     {}", url);
                    }
                    None => {}
                }
                println!("Status:    {}", status_label(todo.sync_status));
                if let Some(ref message) = todo.error_message {
                    println!("Error:     {}", message);
                }
                println!("Created:   {}", todo.created_at.format("%Y-%m-%d %H:%M"));
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(todo).unwrap());
            }
            OutputFormat::Quiet => {
                println!("{}", todo.local_id);
            }
        }
    }

    /// Print the merged todo list
    pub fn print_todos(&self, todos: &[LocalTodo]) {
        match self.format {
            OutputFormat::Human => {
                if todos.is_empty() {
                    println!("No todos found.");
                    return;
                }
                for todo in todos {
                    let marker = if todo.completed { "[x]" } else { "[ ]" };
                    let flag = if todo.error_message.is_some() {
                        " ⚠"
                    } else {
                        ""
                    };
                    println!(
                        "{} | {} {} | {}{}",
                        &todo.local_id.to_string()[..8],
                        marker,
                        truncate(&todo.title, 40),
                        status_label(todo.sync_status),
                        flag
                    );
                }
                println!("\n{} todo(s)", todos.len());
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(todos).unwrap());
            }
            OutputFormat::Quiet => {
                for todo in todos {
                    println!("{}", todo.local_id);
                }
            }
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

/// Human label for a sync status
pub fn status_label(status: SyncStatus) -> &'static str {
    match status {
        SyncStatus::Synced => "synced",
        SyncStatus::Pending => "pending",
        SyncStatus::Syncing => "syncing",
        SyncStatus::Error => "error",
    }
}

/// Truncate a string to at most `max_len` bytes, adding "..." if truncated
///
/// Cuts at a character boundary so multi-byte titles never split mid-char.
fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let budget = max_len.saturating_sub(3);
    let cut = s
        .char_indices()
        .take_while(|(i, _)| *i <= budget)
        .last()
        .map(|(i, _)| i)
        .unwrap_or(0);
    format!("{}...", &s[..cut])
}
