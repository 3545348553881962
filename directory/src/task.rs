//! Running the sync job off the request path.

use std::{sync::Arc, time::Duration};

use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tracing::{Instrument, debug, info, info_span, warn};

use crate::{
    error::{SyncError, SyncResult},
    job::{RosterSyncJob, SyncReport},
};

/// A run executing on the tokio runtime.
///
/// Dropping the handle detaches the run; it still completes and releases the
/// job's run-in-progress flag.
#[derive(Debug)]
pub struct SyncHandle {
    inner: JoinHandle<SyncResult<SyncReport>>,
}

impl SyncHandle {
    /// Abandon the run. Pages fetched so far are discarded; an upsert that
    /// has not committed is rolled back.
    pub fn abort(&self) {
        self.inner.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.inner.is_finished()
    }

    /// Wait for the run. An aborted run yields [`SyncError::Cancelled`].
    pub async fn join(self) -> SyncResult<SyncReport> {
        match self.inner.await {
            Ok(result) => result,
            Err(err) if err.is_cancelled() => Err(SyncError::Cancelled),
            Err(err) => std::panic::resume_unwind(err.into_panic()),
        }
    }
}

/// Start a run in the background.
pub fn spawn(job: Arc<RosterSyncJob>) -> SyncHandle {
    SyncHandle {
        inner: tokio::spawn(async move { job.run().await }),
    }
}

/// Start a run whose outcome is only logged.
///
/// Used by the startup hook: a failed sync must never hold up the kiosk,
/// which keeps serving the previously synced directory.
pub fn spawn_logged(job: Arc<RosterSyncJob>, trigger: &'static str) -> JoinHandle<()> {
    let span = info_span!("roster_sync.background", trigger);
    tokio::spawn(
        async move {
            log_outcome(job.run().await);
        }
        .instrument(span),
    )
}

/// Run the job every `every`, starting after the first interval.
///
/// A tick that lands while another run is in flight is skipped.
pub fn schedule(job: Arc<RosterSyncJob>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(
        async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + every, every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                match job.run().await {
                    Err(SyncError::AlreadyRunning) => {
                        debug!("previous roster sync still running; skipping tick");
                    }
                    outcome => log_outcome(outcome),
                }
            }
        }
        .instrument(info_span!("roster_sync.schedule", every_secs = every.as_secs())),
    )
}

fn log_outcome(outcome: SyncResult<SyncReport>) {
    match outcome {
        Ok(report) => info!(
            employees = report.employees_count,
            pages = report.pages,
            "background roster sync finished"
        ),
        Err(err) => warn!(
            kind = err.kind(),
            retryable = err.is_retryable(),
            error = %err,
            "background roster sync failed; directory may be stale"
        ),
    }
}
