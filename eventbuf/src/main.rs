//! eventbuf - buffered telemetry event delivery from the command line
//!
//! This tool provides commands for:
//! - Tracking events (singly, or as a stream on stdin)
//! - Flushing events persisted by earlier runs
//! - Checking configuration and the persisted backlog
//!
//! Uses XDG Base Directory specification for file locations:
//! - Store: $XDG_DATA_HOME/eventbuf/store.db (~/.local/share/eventbuf/store.db)
//! - Config: $XDG_CONFIG_HOME/eventbuf/config.toml (~/.config/eventbuf/config.toml)

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use eventbuf_core::store::SAVED_EVENTS_KEY;
use eventbuf_core::{Config, Database, EventService, SnapshotStore};
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser)]
#[command(name = "eventbuf")]
#[command(about = "Buffered, durable telemetry event delivery")]
#[command(version)]
struct Args {
    /// Verbose output (writes the log file)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Collector endpoint, overrides collector.endpoint from config
    #[arg(long, global = true)]
    endpoint: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show configuration and the persisted backlog
    Status,

    /// Track one event
    Track {
        /// Event type
        event_type: String,

        /// Event payload
        data: String,

        /// Seconds to wait for delivery before persisting
        #[arg(short, long, default_value_t = 5)]
        wait: u64,
    },

    /// Deliver events persisted by earlier runs
    Flush {
        /// Seconds to keep trying before persisting the remainder
        #[arg(short, long, default_value_t = 30)]
        timeout: u64,
    },

    /// Track `type<TAB>data` lines from stdin until EOF or Ctrl-C
    Run,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::load().context("failed to load configuration")?;
    if let Some(endpoint) = args.endpoint {
        config.collector.endpoint = Some(endpoint);
    }

    // `run` is long-lived, so its retry warnings are always kept
    let _log_guard = if args.verbose || matches!(args.command, Command::Run) {
        Some(eventbuf_core::logging::init(&config.logging).context("failed to initialize logging")?)
    } else {
        None
    };

    // Single-threaded: the dispatch loop shares the thread with the producer
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to create runtime")?;

    match args.command {
        Command::Status => cmd_status(&config),
        Command::Track {
            event_type,
            data,
            wait,
        } => runtime.block_on(cmd_track(&config, event_type, data, wait)),
        Command::Flush { timeout } => runtime.block_on(cmd_flush(&config, timeout)),
        Command::Run => runtime.block_on(cmd_run(&config)),
    }
}

fn open_store(config: &Config) -> Result<Arc<Database>> {
    let path = config.store_path();
    let db = Database::open(&path)
        .with_context(|| format!("failed to open store at {}", path.display()))?;
    db.migrate().context("failed to run store migrations")?;
    Ok(Arc::new(db))
}

async fn start_service(config: &Config) -> Result<EventService> {
    config
        .collector
        .validate()
        .context("collector endpoint is not configured correctly")?;

    let store = open_store(config)?;
    EventService::start(&config.collector, store)
        .await
        .context("failed to start event service")
}

fn cmd_status(config: &Config) -> Result<()> {
    println!("eventbuf Configuration");
    println!("======================");
    println!();

    let collector = &config.collector;
    println!(
        "Endpoint:        {}",
        collector.endpoint.as_deref().unwrap_or("<not set>")
    );
    println!("Cooldown:        {}s", collector.cooldown_secs);
    match collector.timeout_secs {
        Some(secs) => println!("Timeout:         {}s", secs),
        None => println!("Timeout:         <transport default>"),
    }
    println!("Shutdown Grace:  {}s", collector.shutdown_grace_secs);
    println!("Store:           {}", config.store_path().display());
    println!("Logs:            {}", Config::state_dir().display());

    let db = open_store(config)?;
    let pending = SnapshotStore::new(db.clone())
        .load_snapshot()
        .context("failed to read persisted events")?;

    println!();
    println!("Pending events:  {}", pending.len());
    if let Some(saved_at) = db.updated_at(SAVED_EVENTS_KEY)? {
        println!(
            "Last saved:      {}",
            saved_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }

    println!();
    if !collector.is_ready() {
        println!("Status: Not ready (set collector.endpoint or pass --endpoint)");
    } else {
        match collector.validate() {
            Ok(()) => println!("Status: Ready to deliver"),
            Err(e) => println!("Status: Not ready ({})", e),
        }
    }

    Ok(())
}

async fn cmd_track(config: &Config, event_type: String, data: String, wait: u64) -> Result<()> {
    let service = start_service(config).await?;

    service.track_event(event_type, data);
    wait_for_delivery(&service, Duration::from_secs(wait)).await;

    finish(&service).await
}

async fn cmd_flush(config: &Config, timeout: u64) -> Result<()> {
    let service = start_service(config).await?;

    let pending = service.pending();
    if pending == 0 {
        println!("No pending events to flush.");
        return Ok(());
    }

    println!("Flushing {} pending event(s)...", pending);
    wait_for_delivery(&service, Duration::from_secs(timeout)).await;

    finish(&service).await
}

async fn cmd_run(config: &Config) -> Result<()> {
    let service = start_service(config).await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut tracked = 0usize;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line.context("failed to read stdin")? {
                    Some(line) => {
                        if let Some((event_type, data)) = parse_line(&line) {
                            service.track_event(event_type, data);
                            tracked += 1;
                        }
                    }
                    None => break,
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, shutting down");
                break;
            }
        }
    }

    println!("Tracked {} event(s)", tracked);
    finish(&service).await
}

/// Wait for the queue to drain, giving up at `limit` or on Ctrl-C
async fn wait_for_delivery(service: &EventService, limit: Duration) {
    tokio::select! {
        result = tokio::time::timeout(limit, service.wait_idle()) => {
            if result.is_err() {
                tracing::debug!(limit_secs = limit.as_secs(), "Gave up waiting for delivery");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted, shutting down");
        }
    }
}

/// Stop delivery, persist the backlog and report
async fn finish(service: &EventService) -> Result<()> {
    let stats = service.stats();
    let persisted = service
        .shutdown()
        .await
        .context("failed to persist pending events")?;

    println!("Delivered {} event(s)", stats.events_delivered);
    if persisted > 0 {
        println!("{} event(s) queued for later delivery", persisted);
    }
    if stats.send_failures > 0 {
        println!("Failed attempts: {}", stats.send_failures);
    }

    Ok(())
}

/// Split a `type<TAB>data` line. Blank lines are skipped; a line without a
/// tab is an event with empty data.
fn parse_line(line: &str) -> Option<(&str, &str)> {
    let line = line.trim_end_matches('\r');
    if line.trim().is_empty() {
        return None;
    }

    match line.split_once('\t') {
        Some((event_type, data)) => Some((event_type, data)),
        None => Some((line, "")),
    }
}
