use anyhow::{anyhow, Result};
use callconf::{ConfigStore, PersistStatus, SettingsLoader, UpdateRequest};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, EnvFilter};

/// Inspect and edit the per-call configuration shared with voice agents
#[derive(Parser, Debug)]
#[command(name = "callconf")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Canonical configuration file
    ///
    /// Overrides the settings file and $CALLCONF_PATH.
    #[arg(short, long)]
    path: Option<PathBuf>,

    /// Settings file, checked before ./.callconf.toml and the user settings
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Log to file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the current configuration as JSON
    Show,

    /// Print one field
    Get {
        key: String,

        /// Printed when the field is not set
        #[arg(short, long)]
        default: Option<String>,
    },

    /// Merge KEY=VALUE pairs into the configuration
    Set {
        #[arg(required = true, value_name = "KEY=VALUE")]
        assignments: Vec<String>,
    },

    /// Restore built-in defaults
    Reset,

    /// Print the canonical file location
    Path,
}

fn setup_logging(log_level: &str, log_file: Option<PathBuf>) -> Result<()> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    let subscriber = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    if let Some(log_path) = log_file {
        let file = std::fs::File::create(log_path)?;
        subscriber.with_writer(file).init();
    } else {
        subscriber.with_writer(std::io::stderr).init();
    }

    Ok(())
}

fn print_value(value: &Value) {
    match value {
        Value::String(s) => println!("{}", s),
        other => println!("{}", other),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    setup_logging(&args.log_level, args.log_file)?;

    let mut loader = SettingsLoader::new();
    if let Some(settings_file) = args.settings {
        loader = loader.prefer(settings_file);
    }
    let mut settings = loader.load()?;
    if let Some(path) = args.path {
        settings.path = path;
    }

    info!("Using configuration at {}", settings.path.display());

    let store = ConfigStore::open(settings).to_async();

    match args.command {
        Command::Show => {
            let snapshot = store.load().await;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
        Command::Get { key, default } => {
            let value = match default {
                Some(default) => store.get(&key, Value::String(default)).await,
                None => store
                    .snapshot()
                    .await
                    .get(&key)
                    .ok_or_else(|| anyhow!("Key '{}' is not set", key))?,
            };
            print_value(&value);
        }
        Command::Set { assignments } => {
            let request = UpdateRequest::from_assignments(&assignments)?;
            let outcome = store.update(request).await?;
            if let PersistStatus::Degraded { reason } = &outcome.persistence {
                warn!("Update kept in memory only: {}", reason);
            }
            println!("{}", serde_json::to_string_pretty(&outcome.snapshot)?);
        }
        Command::Reset => {
            let outcome = store.reset().await?;
            println!("{}", serde_json::to_string_pretty(&outcome.snapshot)?);
        }
        Command::Path => {
            println!("{}", store.blocking().path().display());
        }
    }

    Ok(())
}
