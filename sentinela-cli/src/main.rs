#![forbid(unsafe_code)]

//! Sentinela operator command-line interface.

use clap::{Parser, Subcommand};
use sentinela_lib::collection::SysinfoProcessSource;
use sentinela_lib::config::ConfigLoader;
use sentinela_lib::models::AlertId;
use sentinela_lib::monitor::ProcessMonitor;
use sentinela_lib::rules::{RuleEngine, SignatureEngine};
use sentinela_lib::scanner::Scanner;
use sentinela_lib::storage::{AlertStore, StorageError};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Parse and validate the monitor interval argument.
///
/// The interval is whole seconds, minimum 1, maximum 3600.
fn parse_interval(s: &str) -> Result<u64, String> {
    let interval: u64 = s
        .parse()
        .map_err(|_parse_err| format!("Invalid interval '{s}': must be a number"))?;

    if interval < 1 {
        Err("Interval too small: minimum allowed is 1 second".to_owned())
    } else if interval > 3600 {
        Err(format!(
            "Interval too large: {interval} seconds. Maximum allowed is 3600 seconds (1 hour)"
        ))
    } else {
        Ok(interval)
    }
}

#[derive(Parser)]
#[command(name = "sentinela")]
#[command(about = "Sentinela host detection and alerting")]
#[command(version)]
struct Cli {
    /// Path to a YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Alert database path (overrides the configuration file)
    #[arg(short, long)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a file or directory with a rule file and record alerts
    Scan {
        /// File or directory to scan
        path: PathBuf,
        /// Rule file to compile
        rules: PathBuf,
    },
    /// Run the process monitor until interrupted
    Monitor {
        /// Polling interval in seconds (minimum: 1, maximum: 3600)
        #[arg(short, long, value_parser = parse_interval)]
        interval: Option<u64>,
    },
    /// Show the most recent alerts
    Alerts {
        /// Maximum number of alerts to show
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
    /// Show a single alert by id
    Show {
        /// Alert identifier
        id: u64,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let loader = match &cli.config {
        Some(path) => ConfigLoader::with_file(path),
        None => ConfigLoader::new(),
    };
    let mut config = loader.load()?;
    if let Some(database) = cli.database {
        config.database.path = database;
    }

    let filter = EnvFilter::try_new(&config.logging.level)
        .unwrap_or_else(|_invalid| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Scan { path, rules } => {
            let store = Arc::new(AlertStore::open(&config.database.path)?);
            let engine = SignatureEngine::new();
            // A compile failure aborts before any file is examined.
            let compiled = engine.compile(&rules)?;
            let scanner = Scanner::new(engine, store);

            println!("Scanning {} with rules {} ...", path.display(), rules.display());
            let created = scanner.scan(&path, &compiled)?;
            println!("Scan complete. Alerts created: {created}");
        }
        Commands::Monitor { interval } => {
            if let Some(secs) = interval {
                config.monitor.interval_secs = secs;
            }
            let store = Arc::new(AlertStore::open(&config.database.path)?);
            let monitor = ProcessMonitor::new(
                SysinfoProcessSource::new(),
                store,
                Duration::from_secs(config.monitor.interval_secs),
            );

            let (shutdown_tx, shutdown_rx) = watch::channel(false);
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("shutdown requested, stopping after the current tick");
                    let _ = shutdown_tx.send(true);
                }
            });

            monitor.run(shutdown_rx).await;
        }
        Commands::Alerts { limit } => {
            let store = AlertStore::open(&config.database.path)?;
            let alerts = store.list(Some(limit))?;
            if alerts.is_empty() {
                println!("No alerts recorded.");
            }
            for alert in alerts {
                println!(
                    "[{}] {} [{}] {}: {}",
                    alert.id,
                    alert.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
                    alert.severity,
                    alert.kind,
                    alert.message
                );
            }
        }
        Commands::Show { id } => {
            let store = AlertStore::open(&config.database.path)?;
            match store.get(AlertId::new(id)) {
                Ok(alert) => {
                    println!("Alert #{}", alert.id);
                    println!("Kind:      {}", alert.kind);
                    println!("Severity:  {}", alert.severity);
                    println!("Timestamp: {}", alert.timestamp.format("%Y-%m-%d %H:%M:%S UTC"));
                    println!("Message:   {}", alert.message);
                }
                Err(StorageError::RecordNotFound { .. }) => {
                    eprintln!("Alert {id} not found.");
                    std::process::exit(1);
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_interval_bounds() {
        assert_eq!(parse_interval("1").unwrap(), 1);
        assert_eq!(parse_interval("3600").unwrap(), 3600);
        assert!(parse_interval("0").is_err());
        assert!(parse_interval("3601").is_err());
        assert!(parse_interval("abc").is_err());
    }

    #[test]
    fn test_cli_parses_subcommands() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
