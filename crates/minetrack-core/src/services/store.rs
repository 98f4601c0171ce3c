//! Local store shared by the sync engine, query service, and draft queue.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};

use crate::db::{
    Database, DirectoryFilter, DraftRepository, FilterField, LibSqlDraftRepository,
    LibSqlReplicaRepository, LibSqlSyncStatusRepository, Paging, QueryResult, ReplaceOutcome,
    ReplicaRepository, SyncStatusRepository,
};
use crate::models::{Category, Draft, DraftId, PerCategory, SyncStatus};
use crate::retry::{retry_async, Attempt, RetryPolicy};
use crate::{Error, Result};

/// Thread-safe handle to the on-device database.
///
/// Every operation holds the connection mutex for its whole duration, so a
/// bulk replace and a query never interleave. Storage-level failures are
/// retried once after re-provisioning the schema.
#[derive(Clone)]
pub struct LocalStore {
    db: Arc<Mutex<Database>>,
    db_path: Option<PathBuf>,
}

impl LocalStore {
    /// Open the store at the given filesystem path.
    pub async fn open_path(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = match Database::open(&db_path).await {
            Ok(db) => db,
            Err(error) if Self::is_corrupted_db_error(&error) => {
                tracing::warn!(
                    "Local database at {} is unreadable: {}. Moving it aside and starting fresh.",
                    db_path.display(),
                    error
                );
                Self::quarantine_corrupted_db_files(&db_path)?;
                Database::open(&db_path).await?
            }
            Err(error) => return Err(error),
        };

        tracing::info!("Opened local store at {}", db_path.display());
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            db_path: Some(db_path),
        })
    }

    /// Open an in-memory store (primarily for tests).
    pub async fn open_in_memory() -> Result<Self> {
        let db = Database::open_in_memory().await?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            db_path: None,
        })
    }

    /// Path of the backing file, if any.
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    fn is_corrupted_db_error(error: &Error) -> bool {
        error
            .to_string()
            .to_ascii_lowercase()
            .contains("file is not a database")
    }

    fn quarantine_corrupted_db_files(db_path: &Path) -> Result<()> {
        let Some(base_name) = db_path.file_name().and_then(|name| name.to_str()) else {
            return Ok(());
        };

        if db_path.exists() {
            let timestamp = chrono::Utc::now().timestamp_millis();
            let backup_path = db_path.with_file_name(format!("{base_name}.corrupt-{timestamp}"));
            std::fs::rename(db_path, &backup_path)?;
            tracing::warn!(
                "Moved corrupted local DB file from {} to {}",
                db_path.display(),
                backup_path.display()
            );
        }

        let Some(parent) = db_path.parent() else {
            return Ok(());
        };
        let sidecar_prefix = format!("{base_name}-");
        for entry in std::fs::read_dir(parent)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if entry.file_name().to_string_lossy().starts_with(&sidecar_prefix) {
                let path = entry.path();
                std::fs::remove_file(&path)?;
                tracing::warn!("Removed stale database file {}", path.display());
            }
        }

        Ok(())
    }

    /// Lock the connection, re-provisioning the schema on a retry.
    async fn lock_for(&self, attempt: Attempt) -> Result<MutexGuard<'_, Database>> {
        let db = self.db.lock().await;
        if attempt.is_retry() {
            db.reprovision_schema().await?;
        }
        Ok(db)
    }

    async fn with_recovery<T, Op, Fut>(&self, operation: Op) -> Result<T>
    where
        Op: FnMut(Attempt) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        retry_async(
            RetryPolicy::SCHEMA_RECOVERY,
            Error::is_storage_failure,
            operation,
        )
        .await
    }

    // Directory replica

    /// Atomically swap a category's rows for a freshly downloaded set.
    pub async fn replace_category(
        &self,
        category: Category,
        records: &[serde_json::Value],
    ) -> Result<ReplaceOutcome> {
        self.with_recovery(move |attempt| async move {
            let db = self.lock_for(attempt).await?;
            LibSqlReplicaRepository::new(db.connection())
                .replace(category, records)
                .await
        })
        .await
    }

    /// Filter and page one category.
    pub async fn query_category(
        &self,
        category: Category,
        filter: &DirectoryFilter,
        paging: Paging,
    ) -> Result<QueryResult> {
        self.with_recovery(move |attempt| async move {
            let db = self.lock_for(attempt).await?;
            LibSqlReplicaRepository::new(db.connection())
                .query(category, filter, paging)
                .await
        })
        .await
    }

    /// Rows currently stored for a category.
    pub async fn category_count(&self, category: Category) -> Result<usize> {
        self.with_recovery(move |attempt| async move {
            let db = self.lock_for(attempt).await?;
            LibSqlReplicaRepository::new(db.connection())
                .count(category)
                .await
        })
        .await
    }

    /// Actual row counts for every category.
    pub async fn local_stats(&self) -> Result<PerCategory<usize>> {
        Ok(PerCategory {
            national: self.category_count(Category::National).await?,
            local: self.category_count(Category::Local).await?,
            hotspots: self.category_count(Category::Hotspots).await?,
        })
    }

    /// Distinct values of a filter field within a category.
    pub async fn distinct_values(
        &self,
        category: Category,
        field: FilterField,
    ) -> Result<Vec<String>> {
        self.with_recovery(move |attempt| async move {
            let db = self.lock_for(attempt).await?;
            LibSqlReplicaRepository::new(db.connection())
                .distinct_values(category, field)
                .await
        })
        .await
    }

    // Drafts

    /// Insert or overwrite a draft.
    pub async fn upsert_draft(&self, draft: &Draft) -> Result<DraftId> {
        self.with_recovery(move |attempt| async move {
            let db = self.lock_for(attempt).await?;
            LibSqlDraftRepository::new(db.connection())
                .upsert(draft)
                .await
        })
        .await
    }

    pub async fn get_draft(&self, id: &DraftId) -> Result<Option<Draft>> {
        self.with_recovery(move |attempt| async move {
            let db = self.lock_for(attempt).await?;
            LibSqlDraftRepository::new(db.connection()).get(id).await
        })
        .await
    }

    /// A reporter's drafts, most recently updated first.
    pub async fn get_drafts(&self, reporter_id: &str) -> Result<Vec<Draft>> {
        self.with_recovery(move |attempt| async move {
            let db = self.lock_for(attempt).await?;
            LibSqlDraftRepository::new(db.connection())
                .list_for_reporter(reporter_id)
                .await
        })
        .await
    }

    /// Delete a draft. Fails with `NotFound` if it does not exist.
    pub async fn delete_draft(&self, id: &DraftId) -> Result<()> {
        self.with_recovery(move |attempt| async move {
            let db = self.lock_for(attempt).await?;
            LibSqlDraftRepository::new(db.connection()).delete(id).await
        })
        .await
    }

    /// A reporter's drafts with unsubmitted changes.
    pub async fn get_dirty_drafts(&self, reporter_id: &str) -> Result<Vec<Draft>> {
        self.with_recovery(move |attempt| async move {
            let db = self.lock_for(attempt).await?;
            LibSqlDraftRepository::new(db.connection())
                .list_dirty(reporter_id)
                .await
        })
        .await
    }

    pub async fn mark_draft_synced(&self, id: &DraftId) -> Result<()> {
        self.with_recovery(move |attempt| async move {
            let db = self.lock_for(attempt).await?;
            LibSqlDraftRepository::new(db.connection())
                .mark_synced(id)
                .await
        })
        .await
    }

    /// Draft IDs beginning with `prefix`, for resolving abbreviated IDs.
    pub async fn find_draft_ids_by_prefix(
        &self,
        prefix: &str,
        limit: usize,
    ) -> Result<Vec<String>> {
        self.with_recovery(move |attempt| async move {
            let db = self.lock_for(attempt).await?;
            LibSqlDraftRepository::new(db.connection())
                .list_ids_by_prefix(prefix, limit)
                .await
        })
        .await
    }

    // Sync status

    pub async fn sync_status(&self, category: Category) -> Result<SyncStatus> {
        self.with_recovery(move |attempt| async move {
            let db = self.lock_for(attempt).await?;
            LibSqlSyncStatusRepository::new(db.connection())
                .get(category)
                .await
        })
        .await
    }

    pub async fn all_sync_status(&self) -> Result<Vec<SyncStatus>> {
        self.with_recovery(move |attempt| async move {
            let db = self.lock_for(attempt).await?;
            LibSqlSyncStatusRepository::new(db.connection()).all().await
        })
        .await
    }

    pub async fn begin_category_sync(&self, category: Category) -> Result<()> {
        self.with_recovery(move |attempt| async move {
            let db = self.lock_for(attempt).await?;
            LibSqlSyncStatusRepository::new(db.connection())
                .begin(category)
                .await
        })
        .await
    }

    pub async fn record_category_progress(
        &self,
        category: Category,
        downloaded: u64,
        total: u64,
        percent: u8,
    ) -> Result<()> {
        self.with_recovery(move |attempt| async move {
            let db = self.lock_for(attempt).await?;
            LibSqlSyncStatusRepository::new(db.connection())
                .progress(category, downloaded, total, percent)
                .await
        })
        .await
    }

    pub async fn complete_category_sync(
        &self,
        category: Category,
        stored: u64,
        synced_at: i64,
    ) -> Result<()> {
        self.with_recovery(move |attempt| async move {
            let db = self.lock_for(attempt).await?;
            LibSqlSyncStatusRepository::new(db.connection())
                .complete(category, stored, synced_at)
                .await
        })
        .await
    }

    pub async fn fail_category_sync(&self, category: Category, error: &str) -> Result<()> {
        self.with_recovery(move |attempt| async move {
            let db = self.lock_for(attempt).await?;
            LibSqlSyncStatusRepository::new(db.connection())
                .fail(category, error)
                .await
        })
        .await
    }
}
