//! In-memory doubles for job and task tests.

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use sea_orm::DbErr;

use crate::{
    error::{SyncError, SyncResult},
    normalize::EmployeeCandidate,
    provider::{DirectoryEntry, RosterPage, RosterProvider},
    store::EmployeeStore,
};

pub(crate) fn active(id: &str, name: &str) -> DirectoryEntry {
    DirectoryEntry {
        id: id.to_string(),
        display_name: Some(name.to_string()),
        ..DirectoryEntry::default()
    }
}

/// Pages keyed by the cursor that requests them. The last page carries an
/// empty cursor.
pub(crate) fn chained_pages(sizes: &[usize]) -> Vec<(Option<String>, RosterPage)> {
    sizes
        .iter()
        .enumerate()
        .map(|(page, &size)| {
            let cursor = (page > 0).then(|| format!("c{page}"));
            let entries = (0..size)
                .map(|n| active(&format!("U{page}-{n}"), &format!("Employee {page}-{n}")))
                .collect();
            let next_cursor = if page + 1 < sizes.len() {
                Some(format!("c{}", page + 1))
            } else {
                Some(String::new())
            };
            (cursor, RosterPage { entries, next_cursor })
        })
        .collect()
}

pub(crate) struct ScriptedProvider {
    pages: HashMap<Option<String>, RosterPage>,
    fail_at: Option<usize>,
    delay: Option<Duration>,
    ready: bool,
    endless: bool,
    calls: Arc<AtomicUsize>,
}

impl ScriptedProvider {
    pub(crate) fn new(pages: Vec<(Option<String>, RosterPage)>) -> Self {
        Self {
            pages: pages.into_iter().collect(),
            fail_at: None,
            delay: None,
            ready: true,
            endless: false,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Every page points at another one.
    pub(crate) fn endless() -> Self {
        Self {
            endless: true,
            ..Self::new(Vec::new())
        }
    }

    /// Fail the request with this zero-based index.
    pub(crate) fn fail_on(mut self, request: usize) -> Self {
        self.fail_at = Some(request);
        self
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn unconfigured(mut self) -> Self {
        self.ready = false;
        self
    }

    pub(crate) fn calls_handle(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

#[async_trait]
impl RosterProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn ensure_ready(&self) -> SyncResult<()> {
        if self.ready {
            Ok(())
        } else {
            Err(SyncError::Configuration("no token".into()))
        }
    }

    async fn fetch_page(&self, cursor: Option<&str>) -> SyncResult<RosterPage> {
        let request = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_at == Some(request) {
            return Err(SyncError::Upstream("scripted failure".into()));
        }
        if self.endless {
            return Ok(RosterPage {
                entries: vec![active(&format!("E{request}"), "Loop")],
                next_cursor: Some(format!("e{}", request + 1)),
            });
        }
        self.pages
            .get(&cursor.map(str::to_string))
            .cloned()
            .ok_or_else(|| SyncError::Upstream(format!("unknown cursor {cursor:?}")))
    }
}

#[derive(Default)]
pub(crate) struct FakeStore {
    rows: Mutex<Vec<EmployeeCandidate>>,
    calls: AtomicUsize,
    fail: bool,
}

impl FakeStore {
    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub(crate) fn rows(&self) -> Vec<EmployeeCandidate> {
        self.rows.lock().unwrap().clone()
    }

    pub(crate) fn upsert_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmployeeStore for FakeStore {
    async fn upsert_employees(&self, candidates: &[EmployeeCandidate]) -> Result<usize, DbErr> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(DbErr::Custom("disk full".into()));
        }
        let mut rows = self.rows.lock().unwrap();
        for candidate in candidates {
            match rows
                .iter_mut()
                .find(|row| row.external_id == candidate.external_id)
            {
                Some(row) => *row = candidate.clone(),
                None => rows.push(candidate.clone()),
            }
        }
        Ok(candidates.len())
    }
}
