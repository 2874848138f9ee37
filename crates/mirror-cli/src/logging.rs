//! Console and rolling file logging
//!
//! Installs a `tracing` registry with two `fmt` layers: one for the console
//! and one writing to a daily rolling file through a non-blocking writer.
//! `RUST_LOG` takes precedence over the `--debug` switch.

use std::path::Path;

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

use crate::error::{CliError, Result};

/// Keeps the background log writer alive; buffered lines are flushed on drop.
pub struct LogGuard {
    _guard: tracing_appender::non_blocking::WorkerGuard,
}

/// Initialize logging to the console and to `log_file`.
///
/// The file name is split around its extension so the rotation date lands in
/// the middle: `mirror.log` becomes `mirror.2024-06-01.log`.
pub fn init(log_file: &Path, debug: bool) -> Result<LogGuard> {
    let directory = log_file
        .parent()
        .ok_or_else(|| CliError::logging(format!("no directory in {}", log_file.display())))?;
    let (prefix, suffix) = split_file_name(log_file)
        .ok_or_else(|| CliError::logging(format!("no file name in {}", log_file.display())))?;

    let mut builder = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(prefix);
    if let Some(suffix) = suffix {
        builder = builder.filename_suffix(suffix);
    }
    let appender = builder.build(directory).map_err(CliError::logging)?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(debug)));

    let console_layer = tracing_subscriber::fmt::layer().with_target(false);
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(CliError::logging)?;

    Ok(LogGuard { _guard: guard })
}

fn default_directive(debug: bool) -> &'static str {
    if debug { "debug" } else { "info" }
}

/// `mirror.log` -> (`mirror`, `log`); `mirror` -> (`mirror`, none).
fn split_file_name(path: &Path) -> Option<(String, Option<String>)> {
    let stem = path.file_stem()?.to_string_lossy().into_owned();
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().into_owned());
    Some((stem, extension))
}
