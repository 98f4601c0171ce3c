//! Replica sync status model

use serde::{Deserialize, Serialize};

use super::Category;

/// Download progress for one category, as last written by the sync engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub category: Category,
    /// Records reported by the remote source for this cycle
    pub total_records: u64,
    /// Records fetched so far in this cycle
    pub downloaded_records: u64,
    /// 0-100
    pub progress_percent: u8,
    pub is_syncing: bool,
    /// Last successful replace (Unix ms)
    pub last_sync_at: Option<i64>,
    /// Fatal error from the most recent failed cycle
    pub last_error: Option<String>,
}

impl SyncStatus {
    /// Status for a category that has never been synced.
    pub const fn never_synced(category: Category) -> Self {
        Self {
            category,
            total_records: 0,
            downloaded_records: 0,
            progress_percent: 0,
            is_syncing: false,
            last_sync_at: None,
            last_error: None,
        }
    }
}
