//! Nilai CLI
//!
//! Command-line interface for Nilai - mark storage and export imports.

use std::fs::OpenOptions;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use nilai_core::{Config, DetailMode, ImportSettings, Store};

mod commands;
mod output;

use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "nilai")]
#[command(about = "Nilai - Mark storage and export imports")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Use this config file instead of the default
    #[arg(long = "config", global = true, value_name = "FILE")]
    config_file: Option<PathBuf>,

    /// User that owns imported and listed marks
    #[arg(short, long, global = true)]
    user: Option<i64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import marks from an export file
    Import {
        /// Export file to read
        file: PathBuf,
        /// Per-record details in the report (none, errors, all)
        #[arg(long)]
        details: Option<DetailMode>,
    },
    /// List marks
    #[command(alias = "ls")]
    Marks {
        /// Filter by label name
        #[arg(short, long)]
        label: Option<String>,
        /// Filter by tag
        #[arg(short, long)]
        tag: Option<String>,
    },
    /// Manage labels and smart label rules
    Labels {
        #[command(subcommand)]
        command: Option<LabelCommands>,
    },
    /// List all tags
    Tags,
    /// Show database location and counts
    Status,
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
enum LabelCommands {
    /// List labels
    #[command(alias = "ls")]
    List,
    /// Create a label
    Add {
        /// Label name
        name: String,
        /// Create a system label shared by all users
        #[arg(long)]
        system: bool,
    },
    /// Apply a label to every mark imported from a domain
    Smart {
        /// Domain, e.g. youtube.com
        domain: String,
        /// Name of an existing label
        label: String,
        /// Create a system rule shared by all users
        #[arg(long)]
        system: bool,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, user_id, log_file, import.details)
        key: String,
        /// Configuration value
        value: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    // Config commands work even when the config file is broken
    if let Commands::Config { command } = &cli.command {
        return handle_config_command(command.clone(), cli.config_file.as_ref(), &output);
    }

    let config = Config::load_with_cli_override(cli.config_file.as_ref())
        .context("Failed to load configuration")?;
    init_logging(&config, cli.verbose);

    let mut store = match Store::open_with_config(&config) {
        Ok(store) => store,
        Err(e) => {
            if let Some(hint) = e.recovery_suggestion() {
                eprintln!("Hint: {}", hint);
            }
            return Err(anyhow::Error::new(e).context("Failed to open database"));
        }
    };
    debug!("Opened database at {:?}", store.path());
    let user_id = cli.user.or(config.user_id);

    match cli.command {
        Commands::Import { file, details } => {
            let settings = ImportSettings {
                details: details.unwrap_or(config.import.details),
            };
            commands::import::run(&mut store, &file, require_user(user_id)?, settings, &output)
        }
        Commands::Marks { label, tag } => {
            commands::mark::list(&store, require_user(user_id)?, label, tag, &output)
        }
        Commands::Labels { command } => handle_label_command(command, &store, user_id, &output),
        Commands::Tags => commands::tag::list(&store, require_user(user_id)?, &output),
        Commands::Status => commands::status::show(&store, &config, user_id, &output),
        Commands::Config { .. } => unreachable!(), // Handled above
    }
}

fn handle_label_command(
    command: Option<LabelCommands>,
    store: &Store,
    user_id: Option<i64>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(LabelCommands::List) | None => {
            commands::label::list(store, require_user(user_id)?, output)
        }
        Some(LabelCommands::Add { name, system }) => {
            let owner = owner(system, user_id)?;
            commands::label::add(store, owner, name, output)
        }
        Some(LabelCommands::Smart {
            domain,
            label,
            system,
        }) => {
            let owner = owner(system, user_id)?;
            commands::label::smart(store, owner, domain, label, output)
        }
    }
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(key, value, config_path, output)
        }
    }
}

fn require_user(user_id: Option<i64>) -> Result<i64> {
    match user_id {
        Some(id) => Ok(id),
        None => bail!("No user given. Pass --user or run `nilai config set user_id <ID>`."),
    }
}

/// Owner of a new label or rule: the user, or the system scope
fn owner(system: bool, user_id: Option<i64>) -> Result<Option<i64>> {
    if system {
        Ok(None)
    } else {
        require_user(user_id).map(Some)
    }
}

/// Initialize logging
///
/// The level comes from `-v` flags, falling back to `RUST_LOG`, then `warn`.
/// Logs go to `config.log_file` when set, otherwise to stderr.
fn init_logging(config: &Config, verbose: u8) {
    let env_filter = match verbose {
        0 => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("nilai_core=warn,nilai_cli=warn")),
        1 => EnvFilter::new("nilai_core=debug,nilai_cli=debug"),
        _ => EnvFilter::new("nilai_core=trace,nilai_cli=trace"),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false);

    let Some(log_path) = &config.log_file else {
        let _ = builder.with_writer(std::io::stderr).try_init();
        return;
    };

    match OpenOptions::new().create(true).append(true).open(log_path) {
        Ok(file) => {
            let _ = builder.with_ansi(false).with_writer(file).try_init();
        }
        Err(e) => {
            eprintln!("Warning: Could not open log file {:?}: {}", log_path, e);
            let _ = builder.with_writer(std::io::stderr).try_init();
        }
    }
}
