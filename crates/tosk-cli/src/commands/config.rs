//! Config command handlers

use anyhow::{bail, Context, Result};

use tosk_core::Config;

use crate::output::{Output, OutputFormat};

/// Show current configuration
pub fn show(output: &Output) -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "data_dir": config.data_dir,
                    "api_url": config.api_url,
                    "retry_limit": config.retry_limit,
                    "retry_delay_ms": config.retry_delay_ms,
                    "refresh_interval_secs": config.refresh_interval_secs,
                    "request_timeout_secs": config.request_timeout_secs
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.data_dir.display());
        }
        OutputFormat::Human => {
            println!("Configuration:");
            println!("  data_dir:              {}", config.data_dir.display());
            println!(
                "  api_url:               {}",
                config.api_url.as_deref().unwrap_or("(not set)")
            );
            println!("  retry_limit:           {}", config.retry_limit);
            println!("  retry_delay_ms:        {}", config.retry_delay_ms);
            println!("  refresh_interval_secs: {}", config.refresh_interval_secs);
            println!("  request_timeout_secs:  {}", config.request_timeout_secs);
            println!();
            println!("Config file: {}", Config::config_file_path().display());
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(key: String, value: String, output: &Output) -> Result<()> {
    let mut config = Config::load().context("Failed to load configuration")?;

    match key.as_str() {
        "data_dir" => {
            config.data_dir = value.clone().into();
        }
        "api_url" => {
            config.api_url = if value.is_empty() || value == "none" {
                None
            } else {
                Some(value.clone())
            };
        }
        "retry_limit" => {
            config.retry_limit = value
                .parse()
                .context("Invalid value for retry_limit. Use a whole number.")?;
        }
        "retry_delay_ms" => {
            config.retry_delay_ms = value
                .parse()
                .context("Invalid value for retry_delay_ms. Use a whole number.")?;
        }
        "refresh_interval_secs" => {
            config.refresh_interval_secs = value
                .parse()
                .context("Invalid value for refresh_interval_secs. Use a whole number.")?;
        }
        "request_timeout_secs" => {
            config.request_timeout_secs = value
                .parse()
                .context("Invalid value for request_timeout_secs. Use a whole number.")?;
        }
        _ => {
            bail!(
                "Unknown configuration key: '{}'\n\
                 Valid keys: data_dir, api_url, retry_limit, retry_delay_ms, \
                 refresh_interval_secs, request_timeout_secs",
                key
            );
        }
    }

    config.save().context("Failed to save configuration")?;

    output.success(&format!("Set {} = {}", key, value));

    Ok(())
}
