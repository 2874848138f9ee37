//! CLI argument parsing using clap derive

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::config::parse_interval;

/// Folder Mirror - keep a replica directory identical to a source directory
#[derive(Parser, Debug)]
#[command(name = "mirror")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory to mirror from
    #[arg(long, value_name = "DIR")]
    pub source: PathBuf,

    /// Directory kept identical to the source (created if missing)
    #[arg(long, value_name = "DIR")]
    pub replica: PathBuf,

    /// Time between sync cycles, in seconds or as [d.]HH:MM:SS
    #[arg(long, value_name = "SECONDS|HH:MM:SS", value_parser = parse_interval)]
    pub interval: Duration,

    /// Log file; a date is added to the name and a new file is started daily
    #[arg(long, value_name = "FILE")]
    pub log: PathBuf,

    /// Enable debug output on the console and in the log file
    #[arg(long)]
    pub debug: bool,

    /// Run a single sync cycle and exit
    #[arg(long)]
    pub once: bool,
}
