//! Console and rolling file logging.
//!
//! File output goes through a `tracing-appender` rolling writer, so log files
//! rotate on their own and old ones are pruned at startup.

use clap::ValueEnum;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::Layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

pub const DEFAULT_LOG_PREFIX: &str = "smarthome-dash";

/// Used when `RUST_LOG` is not set: the engine and the vendor clients at info,
/// per-request HTTP traces only when something goes wrong.
pub const DEFAULT_FILTER: &str = "smarthome_dash=info,smarthome_client_rs=info,tower_http=warn";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum RotationPeriod {
    #[value(alias = "minute")]
    Minutely,
    #[value(alias = "hour")]
    Hourly,
    #[default]
    #[value(alias = "day")]
    Daily,
    #[value(alias = "none")]
    Never,
}

impl From<RotationPeriod> for Rotation {
    fn from(period: RotationPeriod) -> Self {
        match period {
            RotationPeriod::Minutely => Rotation::MINUTELY,
            RotationPeriod::Hourly => Rotation::HOURLY,
            RotationPeriod::Daily => Rotation::DAILY,
            RotationPeriod::Never => Rotation::NEVER,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub log_dir: String,
    pub log_prefix: String,
    pub rotation: RotationPeriod,
    /// Files kept on disk, 0 keeps everything.
    pub max_log_files: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_dir: ".".to_string(),
            log_prefix: DEFAULT_LOG_PREFIX.to_string(),
            rotation: RotationPeriod::Daily,
            max_log_files: 7,
        }
    }
}

/// Where the dashboard writes its log lines.
#[derive(Debug, Clone)]
pub enum LogTarget {
    Console,
    Files(LogConfig),
    FilesAndConsole(LogConfig),
}

impl LogTarget {
    /// Console when no directory is given, otherwise files, optionally mirrored to stdout.
    pub fn new(
        log_dir: Option<String>,
        rotation: RotationPeriod,
        max_log_files: usize,
        console: bool,
    ) -> Self {
        let Some(log_dir) = log_dir else {
            return LogTarget::Console;
        };
        let config = LogConfig {
            log_dir,
            log_prefix: DEFAULT_LOG_PREFIX.to_string(),
            rotation,
            max_log_files,
        };
        if console {
            LogTarget::FilesAndConsole(config)
        } else {
            LogTarget::Files(config)
        }
    }

    fn file_config(&self) -> Option<&LogConfig> {
        match self {
            LogTarget::Console => None,
            LogTarget::Files(config) | LogTarget::FilesAndConsole(config) => Some(config),
        }
    }

    fn console(&self) -> bool {
        !matches!(self, LogTarget::Files(_))
    }
}

/// Keeps the background writer alive. Dropping it flushes pending lines.
pub struct LogGuard {
    _guard: Option<WorkerGuard>,
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber for `target`.
pub fn init_logging(target: LogTarget) -> std::io::Result<LogGuard> {
    let (file_layer, guard) = match target.file_config() {
        Some(config) => {
            let (writer, guard) = tracing_appender::non_blocking(rolling_appender(config)?);
            let layer = Layer::default()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_file(true)
                .with_line_number(true);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };
    let console_layer = target.console().then(|| {
        Layer::default()
            .with_writer(std::io::stdout)
            .with_ansi(true)
            .with_target(true)
    });

    tracing_subscriber::registry()
        .with(env_filter())
        .with(file_layer)
        .with(console_layer)
        .init();

    Ok(LogGuard { _guard: guard })
}

fn rolling_appender(config: &LogConfig) -> std::io::Result<RollingFileAppender> {
    let log_dir = Path::new(&config.log_dir);
    if config.max_log_files > 0 {
        cleanup_old_logs(log_dir, &config.log_prefix, config.max_log_files)?;
    }

    RollingFileAppender::builder()
        .rotation(config.rotation.into())
        .filename_prefix(&config.log_prefix)
        .filename_suffix("log")
        .max_log_files(config.max_log_files)
        .build(log_dir)
        .map_err(std::io::Error::other)
}

/// Delete the oldest `{prefix}*.log` files beyond `max_files`.
fn cleanup_old_logs(log_dir: &Path, prefix: &str, max_files: usize) -> std::io::Result<()> {
    if !log_dir.exists() {
        return Ok(());
    }

    let mut log_files: Vec<_> = std::fs::read_dir(log_dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.starts_with(prefix) && name.ends_with(".log"))
        })
        .filter_map(|entry| {
            let mtime = entry.metadata().ok()?.modified().ok()?;
            Some((entry.path(), mtime))
        })
        .collect();

    // newest first
    log_files.sort_by(|a, b| b.1.cmp(&a.1));

    for (path, _) in log_files.into_iter().skip(max_files) {
        if let Err(e) = std::fs::remove_file(&path) {
            eprintln!("Warning: failed to remove old log file {path:?}: {e}");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn rotation_period_from_cli_value() {
        let parse = |s: &str| RotationPeriod::from_str(s, true);
        assert_eq!(parse("daily"), Ok(RotationPeriod::Daily));
        assert_eq!(parse("Hour"), Ok(RotationPeriod::Hourly));
        assert_eq!(parse("MINUTELY"), Ok(RotationPeriod::Minutely));
        assert_eq!(parse("none"), Ok(RotationPeriod::Never));
        assert!(parse("weekly").is_err());
    }

    #[test]
    fn log_target_from_flags() {
        assert!(matches!(
            LogTarget::new(None, RotationPeriod::Daily, 7, true),
            LogTarget::Console
        ));
        let files = LogTarget::new(Some("/var/log".into()), RotationPeriod::Hourly, 3, false);
        assert!(!files.console());
        let config = files.file_config().unwrap();
        assert_eq!(config.log_dir, "/var/log");
        assert_eq!(config.log_prefix, DEFAULT_LOG_PREFIX);
        assert_eq!(config.rotation, RotationPeriod::Hourly);
        assert_eq!(config.max_log_files, 3);
        let both = LogTarget::new(Some("logs".into()), RotationPeriod::Daily, 0, true);
        assert!(both.console());
        assert!(both.file_config().is_some());
    }

    #[test]
    fn cleanup_keeps_newest_matching_files() {
        let temp_dir = TempDir::new().unwrap();
        let log_dir = temp_dir.path();

        for i in 0..4 {
            std::fs::write(log_dir.join(format!("smarthome-dash.{i}.log")), "x").unwrap();
            std::thread::sleep(std::time::Duration::from_millis(10));
        }
        std::fs::write(log_dir.join("other.log"), "x").unwrap();
        std::fs::write(log_dir.join("smarthome-dash.txt"), "x").unwrap();

        cleanup_old_logs(log_dir, DEFAULT_LOG_PREFIX, 2).unwrap();

        let mut remaining: Vec<_> = std::fs::read_dir(log_dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter_map(|e| e.file_name().to_str().map(str::to_string))
            .collect();
        remaining.sort();
        assert_eq!(
            remaining,
            vec![
                "other.log",
                "smarthome-dash.2.log",
                "smarthome-dash.3.log",
                "smarthome-dash.txt"
            ]
        );
    }

    #[test]
    fn cleanup_ignores_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope");
        assert!(cleanup_old_logs(&missing, DEFAULT_LOG_PREFIX, 1).is_ok());
    }

    #[test]
    fn log_config_default() {
        let config = LogConfig::default();
        assert_eq!(config.log_dir, ".");
        assert_eq!(config.log_prefix, "smarthome-dash");
        assert_eq!(config.rotation, RotationPeriod::Daily);
        assert_eq!(config.max_log_files, 7);
    }
}
