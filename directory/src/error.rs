//! Error taxonomy for directory syncs.

use sea_orm::DbErr;
use thiserror::Error;

/// Errors that abort a roster sync run.
///
/// Every variant aborts the whole run; nothing is written unless the run
/// reaches the final upsert and that upsert commits.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Missing or invalid provider settings. Needs an operator fix.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The roster provider failed, answered `ok: false`, returned a payload we
    /// could not decode, or the run exceeded its page or time budget.
    #[error("upstream error: {0}")]
    Upstream(String),

    /// The local upsert failed and was rolled back.
    #[error("persistence error: {0}")]
    Persistence(#[from] DbErr),

    /// Another run holds the run-in-progress flag.
    #[error("a roster sync is already running")]
    AlreadyRunning,

    /// The background task was aborted before it finished.
    #[error("roster sync was cancelled")]
    Cancelled,
}

impl SyncError {
    /// Stable label for logs and API payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            SyncError::Configuration(_) => "configuration",
            SyncError::Upstream(_) => "upstream",
            SyncError::Persistence(_) => "persistence",
            SyncError::AlreadyRunning => "already_running",
            SyncError::Cancelled => "cancelled",
        }
    }

    /// Whether re-invoking the job later can succeed without operator action.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, SyncError::Configuration(_))
    }

    pub(crate) fn upstream_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SyncError::Upstream(format!("roster request timed out: {err}"))
        } else if err.is_decode() {
            SyncError::Upstream(format!("malformed roster payload: {err}"))
        } else {
            SyncError::Upstream(format!("roster request failed: {err}"))
        }
    }
}

pub type SyncResult<T> = Result<T, SyncError>;
