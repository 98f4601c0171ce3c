//! Sync status repository

use libsql::params::Params;
use libsql::{Connection, Row, Value};

use super::values::{column_flag, column_i64, column_opt_i64, column_opt_text, column_u64, text};
use crate::error::Result;
use crate::models::{Category, SyncStatus};

/// Trait for per-category sync status storage (async)
#[allow(async_fn_in_trait)]
pub trait SyncStatusRepository {
    /// Status for one category (zeros if never synced)
    async fn get(&self, category: Category) -> Result<SyncStatus>;

    /// Status for every category, in sync order
    async fn all(&self) -> Result<Vec<SyncStatus>>;

    /// Reset counters and mark the category as syncing
    async fn begin(&self, category: Category) -> Result<()>;

    /// Record download progress within the current cycle
    async fn progress(
        &self,
        category: Category,
        downloaded: u64,
        total: u64,
        percent: u8,
    ) -> Result<()>;

    /// Mark the cycle finished after a successful replace
    async fn complete(&self, category: Category, stored: u64, synced_at: i64) -> Result<()>;

    /// Mark the cycle aborted by a fatal error; counters keep their last values
    async fn fail(&self, category: Category, error: &str) -> Result<()>;
}

/// libSQL implementation of `SyncStatusRepository`
pub struct LibSqlSyncStatusRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlSyncStatusRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_status(category: Category, row: &Row) -> Result<SyncStatus> {
        Ok(SyncStatus {
            category,
            total_records: column_u64(row, 0)?,
            downloaded_records: column_u64(row, 1)?,
            progress_percent: u8::try_from(column_i64(row, 2)?.clamp(0, 100)).unwrap_or(100),
            is_syncing: column_flag(row, 3)?,
            last_sync_at: column_opt_i64(row, 4)?,
            last_error: column_opt_text(row, 5)?,
        })
    }
}

#[allow(clippy::cast_possible_wrap)]
const fn counter(value: u64) -> Value {
    Value::Integer(value as i64)
}

impl SyncStatusRepository for LibSqlSyncStatusRepository<'_> {
    async fn get(&self, category: Category) -> Result<SyncStatus> {
        let mut rows = self
            .conn
            .query(
                "SELECT total_records, downloaded_records, progress_percent, is_syncing,
                        last_sync_at, last_error
                 FROM sync_status WHERE category = ?",
                [category.as_str()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Self::parse_status(category, &row),
            None => Ok(SyncStatus::never_synced(category)),
        }
    }

    async fn all(&self) -> Result<Vec<SyncStatus>> {
        let mut statuses = Vec::with_capacity(Category::ALL.len());
        for category in Category::ALL {
            statuses.push(self.get(category).await?);
        }
        Ok(statuses)
    }

    async fn begin(&self, category: Category) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO sync_status (category, total_records, downloaded_records,
                                          progress_percent, is_syncing)
                 VALUES (?, 0, 0, 0, 1)
                 ON CONFLICT(category) DO UPDATE SET
                    total_records = 0,
                    downloaded_records = 0,
                    progress_percent = 0,
                    is_syncing = 1",
                [category.as_str()],
            )
            .await?;
        Ok(())
    }

    async fn progress(
        &self,
        category: Category,
        downloaded: u64,
        total: u64,
        percent: u8,
    ) -> Result<()> {
        self.conn
            .execute(
                "UPDATE sync_status
                 SET downloaded_records = ?, total_records = MAX(total_records, ?),
                     progress_percent = MAX(progress_percent, ?)
                 WHERE category = ?",
                Params::Positional(vec![
                    counter(downloaded),
                    counter(total),
                    Value::Integer(i64::from(percent)),
                    text(category.as_str()),
                ]),
            )
            .await?;
        Ok(())
    }

    async fn complete(&self, category: Category, stored: u64, synced_at: i64) -> Result<()> {
        self.conn
            .execute(
                "UPDATE sync_status
                 SET total_records = MAX(total_records, ?), progress_percent = 100,
                     is_syncing = 0, last_sync_at = ?, last_error = NULL
                 WHERE category = ?",
                Params::Positional(vec![
                    counter(stored),
                    Value::Integer(synced_at),
                    text(category.as_str()),
                ]),
            )
            .await?;
        Ok(())
    }

    async fn fail(&self, category: Category, error: &str) -> Result<()> {
        self.conn
            .execute(
                "UPDATE sync_status SET is_syncing = 0, last_error = ? WHERE category = ?",
                [error, category.as_str()],
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use pretty_assertions::assert_eq;

    async fn setup() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_never_synced_defaults() {
        let db = setup().await;
        let repo = LibSqlSyncStatusRepository::new(db.connection());

        let all = repo.all().await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0], SyncStatus::never_synced(Category::National));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_cycle_lifecycle() {
        let db = setup().await;
        let repo = LibSqlSyncStatusRepository::new(db.connection());

        repo.begin(Category::Local).await.unwrap();
        repo.progress(Category::Local, 20, 45, 31).await.unwrap();
        let mid = repo.get(Category::Local).await.unwrap();
        assert!(mid.is_syncing);
        assert_eq!(mid.downloaded_records, 20);
        assert_eq!(mid.progress_percent, 31);

        repo.complete(Category::Local, 45, 1_700_000_000_000)
            .await
            .unwrap();
        let done = repo.get(Category::Local).await.unwrap();
        assert!(!done.is_syncing);
        assert_eq!(done.progress_percent, 100);
        assert_eq!(done.last_sync_at, Some(1_700_000_000_000));

        // The next cycle starts from zero but keeps the last sync time
        repo.begin(Category::Local).await.unwrap();
        let restarted = repo.get(Category::Local).await.unwrap();
        assert_eq!(restarted.progress_percent, 0);
        assert_eq!(restarted.last_sync_at, Some(1_700_000_000_000));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_progress_never_decreases_within_cycle() {
        let db = setup().await;
        let repo = LibSqlSyncStatusRepository::new(db.connection());

        repo.begin(Category::Hotspots).await.unwrap();
        repo.progress(Category::Hotspots, 10, 30, 40).await.unwrap();
        repo.progress(Category::Hotspots, 20, 60, 30).await.unwrap();

        assert_eq!(repo.get(Category::Hotspots).await.unwrap().progress_percent, 40);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_total_records_never_shrink_within_cycle() {
        let db = setup().await;
        let repo = LibSqlSyncStatusRepository::new(db.connection());

        repo.begin(Category::Local).await.unwrap();
        repo.progress(Category::Local, 50, 120, 40).await.unwrap();
        repo.progress(Category::Local, 100, 110, 80).await.unwrap();

        let status = repo.get(Category::Local).await.unwrap();
        assert_eq!(status.total_records, 120);
        assert_eq!(status.downloaded_records, 100);

        repo.begin(Category::Local).await.unwrap();
        repo.progress(Category::Local, 10, 40, 25).await.unwrap();
        assert_eq!(repo.get(Category::Local).await.unwrap().total_records, 40);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_fail_records_error() {
        let db = setup().await;
        let repo = LibSqlSyncStatusRepository::new(db.connection());

        repo.begin(Category::National).await.unwrap();
        repo.fail(Category::National, "HTTP 503").await.unwrap();

        let status = repo.get(Category::National).await.unwrap();
        assert!(!status.is_syncing);
        assert_eq!(status.last_error.as_deref(), Some("HTTP 503"));
    }
}
