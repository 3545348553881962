//! The seam between the sync job and an external roster provider.

use async_trait::async_trait;

use crate::error::SyncResult;

/// One member as reported by the roster provider.
///
/// Transient: rebuilt from the provider on every run and never stored as-is.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub id: String,
    pub display_name: Option<String>,
    pub title: Option<String>,
    pub deactivated: bool,
    pub bot: bool,
}

/// A single page of roster entries.
#[derive(Clone, Debug, Default)]
pub struct RosterPage {
    pub entries: Vec<DirectoryEntry>,
    /// Opaque continuation token; `None` or empty means this was the last page.
    pub next_cursor: Option<String>,
}

impl RosterPage {
    pub fn continuation(&self) -> Option<&str> {
        self.next_cursor
            .as_deref()
            .filter(|cursor| !cursor.trim().is_empty())
    }
}

#[async_trait]
pub trait RosterProvider: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Fail fast before any request is issued when credentials are missing.
    fn ensure_ready(&self) -> SyncResult<()> {
        Ok(())
    }

    /// Fetch the page addressed by `cursor` (`None` for the first page).
    async fn fetch_page(&self, cursor: Option<&str>) -> SyncResult<RosterPage>;
}
