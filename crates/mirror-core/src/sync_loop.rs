//! Periodic sync driver

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::{Error, Result, SyncRunner};

/// Where the mirror is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for the next tick
    Idle,
    Scanning,
    Diffing,
    Copying,
    Deleting,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Scanning => "scanning",
            Self::Diffing => "diffing",
            Self::Copying => "copying",
            Self::Deleting => "deleting",
        }
    }

    pub(crate) fn enter(self) {
        tracing::debug!(phase = %self, "Phase transition");
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Repeats [`SyncRunner::run_once`] on a fixed interval until cancelled.
pub struct SyncLoop {
    runner: SyncRunner,
    source: PathBuf,
    replica: PathBuf,
    interval: Duration,
}

impl SyncLoop {
    /// # Errors
    ///
    /// [`Error::ZeroInterval`] if `interval` is zero.
    pub fn new(
        runner: SyncRunner,
        source: impl Into<PathBuf>,
        replica: impl Into<PathBuf>,
        interval: Duration,
    ) -> Result<Self> {
        if interval.is_zero() {
            return Err(Error::ZeroInterval);
        }
        Ok(Self {
            runner,
            source: source.into(),
            replica: replica.into(),
            interval,
        })
    }

    /// Run a cycle immediately and then once per interval.
    ///
    /// A cycle that overruns the interval delays the next one instead of
    /// triggering a burst of catch-up cycles. Returns the number of completed
    /// cycles once `cancel` fires.
    ///
    /// # Errors
    ///
    /// Any cycle error other than [`Error::Cancelled`] ends the loop.
    pub async fn run(&self, cancel: &CancellationToken) -> Result<u64> {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut completed = 0;

        tracing::info!(
            source = %self.source.display(),
            replica = %self.replica.display(),
            interval = ?self.interval,
            "Sync loop started"
        );

        loop {
            // The first tick completes immediately
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            match self.runner.run_once(&self.source, &self.replica, cancel).await {
                Ok(_) => completed += 1,
                Err(Error::Cancelled) => break,
                Err(e) => {
                    tracing::error!(error = %e, "Sync cycle failed");
                    return Err(e);
                }
            }
            Phase::Idle.enter();
        }

        tracing::info!(cycles = completed, "Sync loop stopped");
        Ok(completed)
    }
}
