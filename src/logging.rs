//! Logging initialisation
//!
//! Logs always go to stderr. Unless disabled, a daily-rotated file under the
//! Icinga log directory receives the same events.

use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Rotated files kept next to the live one.
const RETAINED_LOG_FILES: usize = 2;

#[derive(Debug, Clone)]
pub struct LogOptions {
    pub debug: bool,
    pub disable_log_file: bool,
    pub log_file: PathBuf,
}

impl LogOptions {
    pub fn level(&self) -> Level {
        if self.debug {
            Level::DEBUG
        } else {
            Level::INFO
        }
    }
}

/// Install the global subscriber. `RUST_LOG` in the environment always takes
/// precedence; the `debug` setting falls back to DEBUG, otherwise INFO.
pub fn init_logging(options: &LogOptions) {
    let filter = level_filter(options.level(), std::env::var(EnvFilter::DEFAULT_ENV).ok());
    let stderr_layer = fmt::layer().with_writer(std::io::stderr);

    let file_layer = if options.disable_log_file {
        None
    } else {
        match build_file_appender(&options.log_file) {
            Ok(appender) => Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_line_number(options.debug)
                    .with_writer(appender),
            ),
            Err(e) => {
                eprintln!("warning: log file {} disabled: {e}", options.log_file.display());
                None
            }
        }
    };

    let _ = tracing_subscriber::registry().with(filter).with(stderr_layer).with(file_layer).try_init();
}

/// Run `f` with a temporary stderr subscriber at WARN, for work done before
/// the settings that configure logging are known.
pub fn with_bootstrap_logging<T>(f: impl FnOnce() -> T) -> T {
    let subscriber = tracing_subscriber::registry()
        .with(level_filter(Level::WARN, std::env::var(EnvFilter::DEFAULT_ENV).ok()))
        .with(fmt::layer().with_writer(std::io::stderr));
    tracing::subscriber::with_default(subscriber, f)
}

/// `RUST_LOG` directives when given, otherwise everything at `level`.
fn level_filter(level: Level, rust_log: Option<String>) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(level.into())
        .parse_lossy(rust_log.unwrap_or_default())
}

fn build_file_appender(log_file: &Path) -> anyhow::Result<RollingFileAppender> {
    let directory = log_file.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    let prefix = log_file
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow::anyhow!("log file path has no file name"))?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(prefix)
        .max_log_files(RETAINED_LOG_FILES)
        .build(directory)?;
    Ok(appender)
}
