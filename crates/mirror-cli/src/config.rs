//! Validation of command-line values into [`SyncOptions`]

use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use crate::cli::Cli;
use crate::error::{CliError, Result};

/// Fully validated settings for a mirror run.
///
/// Every path is absolute. The source exists and is a directory, the replica
/// is neither the source nor nested with it, and the log directory exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    pub source: PathBuf,
    pub replica: PathBuf,
    pub interval: Duration,
    pub log_file: PathBuf,
    pub debug: bool,
    pub once: bool,
}

impl SyncOptions {
    /// Validate parsed arguments.
    ///
    /// Creates the log file's parent directory as a side effect.
    pub fn from_args(cli: &Cli) -> Result<Self> {
        if cli.interval.is_zero() {
            return Err(CliError::invalid("Interval must be greater than zero"));
        }

        let source = resolve(&cli.source, "source")?;
        if !source.is_dir() {
            return Err(CliError::invalid(format!(
                "Source directory does not exist: {}",
                source.display()
            )));
        }

        let replica = resolve(&cli.replica, "replica")?;
        if replica.exists() && !replica.is_dir() {
            return Err(CliError::invalid(format!(
                "Replica path is not a directory: {}",
                replica.display()
            )));
        }
        if source.starts_with(&replica) || replica.starts_with(&source) {
            return Err(CliError::invalid(format!(
                "Source and replica must not overlap: {} and {}",
                source.display(),
                replica.display()
            )));
        }

        let log_file = resolve(&cli.log, "log")?;
        if log_file.is_dir() {
            return Err(CliError::invalid(format!(
                "Log path is a directory: {}",
                log_file.display()
            )));
        }
        if log_file.starts_with(&replica) {
            return Err(CliError::invalid(format!(
                "Log file must not be inside the replica: {}",
                log_file.display()
            )));
        }
        if let Some(parent) = log_file.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                CliError::invalid(format!(
                    "Cannot create log directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        Ok(Self {
            source,
            replica,
            interval: cli.interval,
            log_file,
            debug: cli.debug,
            once: cli.once,
        })
    }
}

/// Error from parsing an interval value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntervalError {
    #[error("interval is empty")]
    Empty,

    #[error("'{0}' is not a number of seconds or a [d.]HH:MM:SS duration")]
    Malformed(String),

    #[error("interval must be greater than zero")]
    NotPositive,
}

/// Parse an interval given as whole seconds (`90`) or as a clock-style
/// duration (`00:01:30`, `1.00:00:00` for one day).
pub fn parse_interval(value: &str) -> std::result::Result<Duration, IntervalError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(IntervalError::Empty);
    }
    let malformed = || IntervalError::Malformed(value.to_string());

    let seconds = if value.bytes().all(|b| b.is_ascii_digit()) {
        value.parse::<u64>().map_err(|_| malformed())?
    } else {
        parse_clock(value).ok_or_else(malformed)?
    };

    if seconds == 0 {
        return Err(IntervalError::NotPositive);
    }
    Ok(Duration::from_secs(seconds))
}

/// `[d.]HH:MM[:SS]` to seconds.
fn parse_clock(value: &str) -> Option<u64> {
    let (days, clock) = match value.split_once('.') {
        Some((days, clock)) => (number(days)?, clock),
        None => (0, value),
    };

    let mut parts = clock.split(':');
    let hours = number(parts.next()?)?;
    let minutes = number(parts.next()?)?;
    let seconds = match parts.next() {
        Some(s) => number(s)?,
        None => 0,
    };
    if parts.next().is_some() || hours > 23 || minutes > 59 || seconds > 59 {
        return None;
    }

    days.checked_mul(86_400)?
        .checked_add(hours * 3_600 + minutes * 60 + seconds)
}

fn number(digits: &str) -> Option<u64> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Make `path` absolute and resolve symlinks in the part that already exists.
fn resolve(path: &Path, what: &str) -> Result<PathBuf> {
    if path.as_os_str().is_empty() {
        return Err(CliError::invalid(format!("The {what} path must not be empty")));
    }
    let absolute = std::path::absolute(path)
        .map_err(|e| CliError::invalid(format!("Invalid {what} path {}: {e}", path.display())))?;

    // Walk up to the deepest ancestor that exists, canonicalize it and
    // re-append the rest lexically
    let mut existing = absolute.as_path();
    let mut tail = Vec::new();
    while !existing.exists() {
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                tail.push(name.to_os_string());
                existing = parent;
            }
            _ => break,
        }
    }

    let mut resolved = dunce::canonicalize(existing).unwrap_or_else(|_| existing.to_path_buf());
    for name in tail.into_iter().rev() {
        resolved.push(name);
    }
    Ok(normalize_lexically(&resolved))
}

fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}
