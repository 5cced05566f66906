//! probewatch - Endpoint Monitoring
//!
//! Probes HTTP(S) URLs and TCP ports, logs every outcome to SQLite, mails an
//! alert for each failure and a daily digest on request.

mod config;
mod db;
mod monitor;
mod notify;
mod probe;

use config::{load_config, RuntimePaths};
use db::Store;
use monitor::Monitor;
use notify::{Notifier, SmtpMailer};

use clap::{Parser, ValueEnum};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Which pass to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum RunType {
    /// Probe every endpoint once and alert on failures
    Regular,
    /// Mail a digest of the last 24 hours
    Resume,
}

#[derive(Parser)]
#[command(name = "probewatch")]
#[command(about = "Endpoint monitoring with mail alerts")]
#[command(version)]
struct Args {
    #[arg(long = "type", value_enum)]
    run_type: RunType,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("probewatch=info".parse()?))
        .init();

    // Load configuration
    let paths = RuntimePaths::load();
    tracing::info!("Using config at {}", paths.config_path.display());
    let config = load_config(&paths.config_path)?;
    tracing::debug!("Loaded {:?}", config);

    // Log in to the mail server before anything is probed
    let mailer = SmtpMailer::connect(&config.main).await?;

    // Initialize database
    tracing::info!("Using database at {}", paths.db_path.display());
    let store = Store::new(&paths.db_path)?;

    let monitor = Monitor::new(
        store.clone(),
        Notifier::new(Arc::new(mailer)),
        config.endpoints(),
        config.probe_settings(),
        config.main.smtp_from.clone(),
        config.main.smtp_to.clone(),
    );

    let result = match args.run_type {
        RunType::Regular => monitor.run_regular().await.map(|_| ()),
        RunType::Resume => monitor.run_resume().await.map(|_| ()),
    };

    if let Err(e) = &result {
        tracing::error!("{:?} run failed: {}", args.run_type, e);
    }
    result?;

    match store.count_all() {
        Ok(count) => tracing::debug!("Event log holds {} events", count),
        Err(e) => tracing::warn!("Could not count logged events: {}", e),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_flag_is_required() {
        assert!(Args::try_parse_from(["probewatch"]).is_err());
    }

    #[test]
    fn test_type_flag_values() {
        let args = Args::try_parse_from(["probewatch", "--type", "regular"]).unwrap();
        assert_eq!(args.run_type, RunType::Regular);

        let args = Args::try_parse_from(["probewatch", "--type", "resume"]).unwrap();
        assert_eq!(args.run_type, RunType::Resume);

        assert!(Args::try_parse_from(["probewatch", "--type", "weekly"]).is_err());
        assert!(Args::try_parse_from(["probewatch", "--type", "regular", "--config", "x"]).is_err());
    }
}
