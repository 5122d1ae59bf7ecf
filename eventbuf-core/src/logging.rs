//! Logging infrastructure for eventbuf
//!
//! Logs go to `$XDG_STATE_HOME/eventbuf/` (~/.local/state/eventbuf/), one
//! file per day named `eventbuf.log.YYYY-MM-DD`.

use crate::config::{Config, LoggingConfig};
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log file name before the daily date suffix
pub const LOG_FILE_PREFIX: &str = "eventbuf.log";

/// Guard that keeps the background log writer alive
///
/// When dropped, flushes any pending log writes.
pub struct LoggingGuard {
    _guard: tracing_appender::non_blocking::WorkerGuard,
    log_dir: PathBuf,
}

impl LoggingGuard {
    /// Directory the daily log files are written to
    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }
}

/// Install the global subscriber, writing to the XDG state directory.
///
/// `RUST_LOG` wins over `logging.level` when set. Fails if a subscriber is
/// already installed.
pub fn init(config: &LoggingConfig) -> Result<LoggingGuard> {
    init_in(config, &Config::state_dir())
}

/// Install the global subscriber, writing daily files under `log_dir`
pub fn init_in(config: &LoggingConfig, log_dir: &Path) -> Result<LoggingGuard> {
    std::fs::create_dir_all(log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_line_number(true),
        )
        .try_init()
        .map_err(|e| Error::Config(format!("failed to install logger: {}", e)))?;

    tracing::info!(
        log_dir = %log_dir.display(),
        level = %config.level,
        "Logging initialized"
    );

    Ok(LoggingGuard {
        _guard: guard,
        log_dir: log_dir.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    // The only test in this crate that installs the global subscriber
    #[test]
    fn test_init_writes_dated_log_file() {
        let dir = TempDir::new().unwrap();
        let log_dir = dir.path().join("logs");

        let guard = init_in(&LoggingConfig::default(), &log_dir).unwrap();
        assert_eq!(guard.log_dir(), log_dir);

        tracing::warn!("Failed to deliver events, will retry");
        drop(guard);

        let names: Vec<String> = std::fs::read_dir(&log_dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 1);
        assert!(names[0].starts_with("eventbuf.log."), "{:?}", names);

        let content = std::fs::read_to_string(log_dir.join(&names[0])).unwrap();
        assert!(content.contains("Failed to deliver events"));

        // A second install is refused
        assert!(init_in(&LoggingConfig::default(), &log_dir).is_err());
    }
}
