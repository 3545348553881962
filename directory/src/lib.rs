//! Employee-directory synchronization.
//!
//! [`RosterSyncJob`] reconciles the local `employees` table against an
//! external roster provider: it pages the provider to completion, keeps only
//! active human members, and upserts them keyed on the provider's id. Rows are
//! never deleted, and locally owned columns (`department`, `is_manager`) are
//! never overwritten.

pub mod config;
pub mod error;
pub mod job;
pub mod normalize;
pub mod provider;
pub mod slack;
pub mod store;
pub mod task;

#[cfg(test)]
mod testing;

pub use config::{DEFAULT_ROSTER_URL, ProviderConfig, SyncSettings};
pub use error::{SyncError, SyncResult};
pub use job::{RosterSyncJob, SyncReport};
pub use normalize::EmployeeCandidate;
pub use provider::{DirectoryEntry, RosterPage, RosterProvider};
pub use slack::SlackRosterClient;
pub use store::{DEFAULT_SEARCH_LIMIT, EmployeeRepository, EmployeeStore};
pub use task::{SyncHandle, schedule, spawn, spawn_logged};
