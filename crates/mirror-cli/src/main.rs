//! Folder Mirror CLI
//!
//! Keeps a replica directory identical to a source directory, re-syncing on a
//! fixed interval until interrupted with Ctrl-C.

mod cli;
mod config;
mod error;
mod logging;

use std::process::ExitCode;
use std::sync::Arc;

use clap::{CommandFactory, Parser};
use colored::Colorize;
use mirror_core::{SyncLoop, SyncRunner};
use mirror_fs::OsFileSystem;
use tokio_util::sync::CancellationToken;

use cli::Cli;
use config::SyncOptions;
use error::{CliError, Result};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let options = match SyncOptions::from_args(&cli) {
        Ok(options) => options,
        Err(e) => {
            report(&e);
            eprintln!("{}", Cli::command().render_usage());
            return ExitCode::from(e.exit_code());
        }
    };

    let _log_guard = match logging::init(&options.log_file, options.debug) {
        Ok(guard) => guard,
        Err(e) => {
            report(&e);
            return ExitCode::from(e.exit_code());
        }
    };

    match execute(options) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Folder mirror failed");
            report(&e);
            ExitCode::from(e.exit_code())
        }
    }
}

fn report(e: &CliError) {
    eprintln!("{}: {}", "error".red().bold(), e);
}

fn execute(options: SyncOptions) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run(options))
}

async fn run(options: SyncOptions) -> Result<()> {
    tracing::info!(
        source = %options.source.display(),
        replica = %options.replica.display(),
        interval = ?options.interval,
        log = %options.log_file.display(),
        debug = options.debug,
        once = options.once,
        "Folder mirror starting"
    );

    let cancel = CancellationToken::new();
    watch_ctrl_c(cancel.clone());

    let runner = SyncRunner::new(Arc::new(OsFileSystem::new()));

    if options.once {
        return match runner
            .run_once(&options.source, &options.replica, &cancel)
            .await
        {
            Ok(_) | Err(mirror_core::Error::Cancelled) => Ok(()),
            Err(e) => Err(e.into()),
        };
    }

    let cycles = SyncLoop::new(runner, options.source, options.replica, options.interval)?
        .run(&cancel)
        .await?;
    tracing::info!(cycles, "Folder mirror stopped");
    Ok(())
}

/// Cancel `cancel` on the first Ctrl-C; the current unit of work finishes
/// before the engine stops.
fn watch_ctrl_c(cancel: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Interrupt received, stopping after the current operation");
                cancel.cancel();
            }
            Err(e) => tracing::warn!(error = %e, "Unable to listen for Ctrl-C"),
        }
    });
}
