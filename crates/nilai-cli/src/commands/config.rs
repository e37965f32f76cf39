//! Config command handlers

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use nilai_core::{Config, DetailMode};

use crate::output::{Output, OutputFormat};

/// Show current configuration
pub fn show(config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "data_dir": config.data_dir,
                    "user_id": config.user_id,
                    "log_file": config.log_file,
                    "import": {
                        "details": config.import.details.to_string()
                    }
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.data_dir.display());
        }
        OutputFormat::Human => {
            let effective_path = config_path
                .cloned()
                .unwrap_or_else(Config::config_file_path);
            println!("Configuration:");
            println!("  data_dir:       {}", config.data_dir.display());
            println!(
                "  user_id:        {}",
                config
                    .user_id
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| "(not set)".to_string())
            );
            println!(
                "  log_file:       {}",
                config
                    .log_file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(not set)".to_string())
            );
            println!("  import.details: {}", config.import.details);
            println!();
            println!("Config file: {}", effective_path.display());
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(
    key: String,
    value: String,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    let mut config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    apply(&mut config, &key, &value)?;

    // Save to the CLI-specified path or default
    let save_path = config_path
        .cloned()
        .unwrap_or_else(Config::config_file_path);
    config
        .save_to_path(&save_path)
        .context("Failed to save configuration")?;

    output.success(&format!("Set {} = {}", key, value));

    Ok(())
}

fn apply(config: &mut Config, key: &str, value: &str) -> Result<()> {
    let unset = value.is_empty() || value == "none";
    match key {
        "data_dir" => {
            config.data_dir = value.into();
        }
        "user_id" => {
            config.user_id = if unset {
                None
            } else {
                Some(
                    value
                        .parse()
                        .context("Invalid value for user_id. Use a numeric user ID.")?,
                )
            };
        }
        "log_file" => {
            config.log_file = if unset { None } else { Some(value.into()) };
        }
        "import.details" => {
            config.import.details = value.parse::<DetailMode>()?;
        }
        _ => {
            bail!(
                "Unknown configuration key: '{}'\n\
                 Valid keys: data_dir, user_id, log_file, import.details",
                key
            );
        }
    }
    Ok(())
}
