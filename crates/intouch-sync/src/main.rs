//! `roster-sync`: runs the inmate roster sync once or on a schedule.
//!
//! # Usage
//!
//! ```text
//! roster-sync run
//! roster-sync --config ./intouch.toml --deadline-secs 1800 schedule
//! roster-sync inmates --query "doe"
//! ```

mod schedule;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use intouch_core::AppConfig;
use intouch_db::{inmates, sync_runs, Database};
use intouch_roster::{run_roster_sync, SyncSummary};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "roster-sync", version, about = "Synchronize the inmate roster")]
struct Args {
    /// Path to a TOML config file (defaults to the platform config dir).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Database URL, overriding config and environment.
    #[arg(long, value_name = "URL")]
    database_url: Option<String>,

    /// Cancel a sync that is still running after this many seconds.
    #[arg(long, value_name = "SECS")]
    deadline_secs: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one sync and print its summary.
    Run,
    /// Run a sync every `sync.interval_hours` until interrupted.
    Schedule,
    /// List the persisted roster.
    Inmates {
        /// Case-insensitive substring of "first last".
        #[arg(short, long)]
        query: Option<String>,
    },
}

fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,intouch=debug"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .init();
}

fn load_config(args: &Args) -> Result<AppConfig> {
    let config = match &args.config {
        Some(path) => AppConfig::load_from(path)
            .with_context(|| format!("loading config file {}", path.display()))?,
        None => AppConfig::load().context("loading config")?,
    };
    let mut config = config
        .with_env_overrides()
        .context("applying environment overrides")?;
    if let Some(url) = &args.database_url {
        config.database.url.clone_from(url);
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing();

    info!("Starting roster-sync v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&args)?;
    let db = Database::connect(&config.database.url)
        .await
        .with_context(|| format!("opening database {}", config.database.url))?;
    db.run_migrations().await.context("running migrations")?;

    let shutdown = CancellationToken::new();
    let ctrl_c = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping");
            ctrl_c.cancel();
        }
    });

    let deadline = args.deadline_secs.map(Duration::from_secs);
    let result = match args.command {
        Command::Run => sync_once(&config, &db, &shutdown, deadline)
            .await
            .and_then(|summary| print_summary(&summary)),
        Command::Schedule => run_schedule(&config, &db, &shutdown, deadline).await,
        Command::Inmates { query } => print_inmates(&db, query.as_deref()).await,
    };

    db.close().await;
    result
}

/// Run one sync, cancelled by `shutdown` or once `deadline` elapses.
async fn sync_once(
    config: &AppConfig,
    db: &Database,
    shutdown: &CancellationToken,
    deadline: Option<Duration>,
) -> Result<SyncSummary> {
    let cancel = shutdown.child_token();
    let timer = deadline.map(|limit| {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(limit).await;
            warn!("Sync deadline of {:?} reached, cancelling", limit);
            cancel.cancel();
        })
    });

    let result = run_roster_sync(config, db, &cancel).await;
    if let Some(timer) = timer {
        timer.abort();
    }
    result.context("roster sync failed")
}

async fn run_schedule(
    config: &AppConfig,
    db: &Database,
    shutdown: &CancellationToken,
    deadline: Option<Duration>,
) -> Result<()> {
    let interval = config.sync.interval_hours;
    let latest = sync_runs::latest_sync_run(db.pool())
        .await
        .context("loading latest sync run")?;
    let mut next_run_at = schedule::first_run_at(latest.as_ref(), interval, Utc::now());

    loop {
        let delay = schedule::delay_until(next_run_at, Utc::now());
        if !delay.is_zero() {
            info!("Next roster sync at {}", next_run_at.to_rfc3339());
        }
        tokio::select! {
            () = shutdown.cancelled() => return Ok(()),
            () = tokio::time::sleep(delay) => {}
        }

        let started = Utc::now();
        match sync_once(config, db, shutdown, deadline).await {
            Ok(summary) => print_summary(&summary)?,
            Err(e) if shutdown.is_cancelled() => {
                info!("Scheduled sync interrupted: {:#}", e);
                return Ok(());
            }
            // Logged; the schedule continues
            Err(e) => error!("{:#}", e),
        }
        next_run_at = schedule::next_run_after(started, interval);
    }
}

fn print_summary(summary: &SyncSummary) -> Result<()> {
    let json = serde_json::to_string_pretty(summary).context("serializing sync summary")?;
    println!("{json}");
    Ok(())
}

async fn print_inmates(db: &Database, query: Option<&str>) -> Result<()> {
    let roster = inmates::list_inmates(db.pool(), query)
        .await
        .context("listing inmates")?;
    for inmate in &roster {
        println!(
            "{}\t{}\t{}\t{}\t{}\t{}",
            inmate.state,
            inmate.inmate_number,
            inmate.full_name(),
            inmate.date_of_birth,
            inmate.facility,
            if inmate.active { "active" } else { "inactive" },
        );
    }
    info!("{} inmates", roster.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use intouch_roster::SyncError;
    use std::ffi::OsStr;

    #[test]
    fn test_parse_run_with_global_flags() {
        let args = Args::try_parse_from([
            "roster-sync",
            "--database-url",
            "sqlite://test.db",
            "--deadline-secs",
            "60",
            "run",
        ])
        .expect("parse args");
        assert_eq!(args.database_url.as_deref(), Some("sqlite://test.db"));
        assert_eq!(args.deadline_secs, Some(60));
        assert!(matches!(args.command, Command::Run));
    }

    #[test]
    fn test_parse_inmates_query() {
        let args = Args::try_parse_from(["roster-sync", "inmates", "--query", "doe"])
            .expect("parse args");
        match args.command {
            Command::Inmates { query } => assert_eq!(query.as_deref(), Some("doe")),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_subcommand_required() {
        assert!(Args::try_parse_from(["roster-sync"]).is_err());
    }

    #[test]
    fn test_load_config_applies_database_url_flag() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[database]\nurl = \"sqlite://file.db\"\n\n[sync]\ninterval_hours = 6\n",
        )
        .expect("write config");

        let args = Args::try_parse_from([
            OsStr::new("roster-sync"),
            OsStr::new("--config"),
            path.as_os_str(),
            OsStr::new("--database-url"),
            OsStr::new("sqlite://flag.db"),
            OsStr::new("run"),
        ])
        .expect("parse args");

        let config = load_config(&args).expect("load config");
        assert_eq!(config.database.url, "sqlite://flag.db");
        assert_eq!(config.sync.interval_hours, 6);
    }

    #[test]
    fn test_load_config_missing_file() {
        let args =
            Args::try_parse_from(["roster-sync", "--config", "/nonexistent/intouch.toml", "run"])
                .expect("parse args");
        assert!(load_config(&args).is_err());
    }

    #[tokio::test]
    async fn test_cancelled_sync_is_reported() {
        let db = Database::open_in_memory().await.expect("create database");
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        let err = sync_once(&AppConfig::default(), &db, &shutdown, None)
            .await
            .expect_err("cancelled before launch");
        assert!(matches!(
            err.downcast_ref::<SyncError>(),
            Some(SyncError::Cancelled)
        ));

        let run = sync_runs::latest_sync_run(db.pool())
            .await
            .expect("load run")
            .expect("run recorded");
        assert_eq!(run.status, sync_runs::SyncRunStatus::Cancelled);
    }
}
