//! Observable sync status and the results of sync operations.

use serde::{Deserialize, Serialize};

/// Process-wide sync status. Only the sync engine writes it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStatus {
    /// A pass is running. At most one at a time.
    pub is_syncing: bool,
    /// End of the last pass that read the pending set (Unix ms).
    pub last_sync_time: Option<i64>,
    /// Reservations still waiting for the remote authority.
    pub pending_count: u64,
    /// Reservations whose last push failed.
    pub failed_count: u64,
    /// Messages from the most recent pass, one per failed record.
    pub sync_errors: Vec<String>,
}

/// Why a trigger did not start a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    /// Another pass holds the guard.
    AlreadySyncing,
    /// The connectivity monitor reports offline.
    Offline,
}

/// Per-pass tally.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassReport {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

/// Result of a sync trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The entry guard turned the trigger away. Nothing was touched.
    NotStarted(SkipReason),
    /// The pass ran to completion.
    Completed(PassReport),
    /// The pending set could not be read; no record was touched.
    Aborted(String),
}

impl SyncOutcome {
    /// True iff a pass ran and every push succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, SyncOutcome::Completed(report) if report.failed == 0)
    }

    pub fn was_started(&self) -> bool {
        !matches!(self, SyncOutcome::NotStarted(_))
    }

    pub fn report(&self) -> Option<&PassReport> {
        match self {
            SyncOutcome::Completed(report) => Some(report),
            _ => None,
        }
    }
}

/// Result of pushing one named reservation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForceSyncOutcome {
    Offline,
    /// Nothing to do: the record is already `synced`.
    AlreadySynced,
    Synced,
    Failed(String),
}

impl ForceSyncOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ForceSyncOutcome::Synced | ForceSyncOutcome::AlreadySynced)
    }
}
