//! The roster sync job.
//!
//! A run pages the provider to completion, filters and normalizes the
//! entries, then reconciles them with one bulk upsert. Nothing touches the
//! store until every page has been fetched, so a failure anywhere before the
//! upsert leaves the local directory as it was.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, Instant},
};

use tracing::{debug, info, instrument};

use crate::{
    config::SyncSettings,
    error::{SyncError, SyncResult},
    normalize::{Normalized, normalize},
    provider::{DirectoryEntry, RosterProvider},
    store::EmployeeStore,
};

/// Outcome of a successful run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncReport {
    /// Records handed to the upsert.
    pub employees_count: usize,
    pub pages: usize,
    pub fetched: usize,
    pub skipped: usize,
    pub elapsed: Duration,
}

/// Holds the run-in-progress flag until dropped, including on cancellation.
struct RunGuard<'a>(&'a AtomicBool);

impl<'a> RunGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> SyncResult<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| SyncError::AlreadyRunning)?;
        Ok(Self(flag))
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct RosterSyncJob {
    provider: Arc<dyn RosterProvider>,
    store: Arc<dyn EmployeeStore>,
    settings: SyncSettings,
    running: AtomicBool,
}

impl RosterSyncJob {
    pub fn new(
        provider: Arc<dyn RosterProvider>,
        store: Arc<dyn EmployeeStore>,
        settings: SyncSettings,
    ) -> Self {
        Self {
            provider,
            store,
            settings,
            running: AtomicBool::new(false),
        }
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Run one full reconciliation.
    ///
    /// Returns [`SyncError::AlreadyRunning`] without side effects when another
    /// run is in flight on this job.
    #[instrument(name = "roster_sync.run", skip_all, fields(provider = self.provider.name()))]
    pub async fn run(&self) -> SyncResult<SyncReport> {
        let _guard = RunGuard::acquire(&self.running)?;
        let started = Instant::now();
        self.provider.ensure_ready()?;

        let (entries, pages) =
            match tokio::time::timeout(self.settings.run_timeout, self.collect_pages()).await {
                Ok(collected) => collected?,
                Err(_) => {
                    return Err(SyncError::Upstream(format!(
                        "roster pagination exceeded the {:?} run deadline",
                        self.settings.run_timeout
                    )));
                }
            };

        let fetched = entries.len();
        let Normalized {
            candidates,
            skipped,
        } = normalize(entries);
        debug!(fetched, eligible = candidates.len(), "roster normalized");

        let employees_count = self.store.upsert_employees(&candidates).await?;
        let report = SyncReport {
            employees_count,
            pages,
            fetched,
            skipped,
            elapsed: started.elapsed(),
        };
        info!(
            employees = report.employees_count,
            pages = report.pages,
            fetched = report.fetched,
            skipped = report.skipped,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "roster sync complete"
        );
        Ok(report)
    }

    async fn collect_pages(&self) -> SyncResult<(Vec<DirectoryEntry>, usize)> {
        let mut entries = Vec::new();
        let mut cursor: Option<String> = None;
        let mut pages = 0usize;

        loop {
            if pages >= self.settings.max_pages {
                return Err(SyncError::Upstream(format!(
                    "roster still paginating after {} pages",
                    self.settings.max_pages
                )));
            }
            let page = self.provider.fetch_page(cursor.as_deref()).await?;
            pages += 1;
            let next = page.continuation().map(str::to_string);
            entries.extend(page.entries);
            match next {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        Ok((entries, pages))
    }
}
