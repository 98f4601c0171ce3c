//! Directory replica sync.
//!
//! Downloads each category page by page, then swaps it into the local store
//! in one transaction. Categories are synced sequentially in a fixed order;
//! a fatal error in one category does not stop the others.

mod progress;

pub use progress::{CategoryDownload, SyncProgress, SyncRunReport};

use std::sync::atomic::{AtomicBool, Ordering};

use progress::ProgressTracker;

use crate::config::DEFAULT_PAGE_SIZE;
use crate::models::{Category, PerCategory};
use crate::remote::{DirectorySource, PageRequest};
use crate::services::LocalStore;
use crate::util::unix_millis_now;
use crate::{Error, Result};

/// Per-category percentage reserved for the final replace step.
const FETCH_PROGRESS_CAP: u8 = 95;

/// Pulls the remote directory into the local replica.
pub struct ReplicaSyncEngine<S> {
    store: LocalStore,
    source: S,
    page_size: usize,
    in_flight: AtomicBool,
}

/// Clears the in-flight flag when a run ends, including on early return.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<S: DirectorySource> ReplicaSyncEngine<S> {
    pub fn new(store: LocalStore, source: S) -> Self {
        Self {
            store,
            source,
            page_size: DEFAULT_PAGE_SIZE,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Override the download page size (minimum 1).
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn is_running(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Sync every category, reporting progress after each page and each
    /// completed replace.
    ///
    /// Fails with `SyncInProgress` if another run is active, or with a
    /// storage error if the final local counts cannot be read. Per-category
    /// failures are reported in the returned `SyncRunReport`.
    pub async fn run(&self, mut on_progress: impl FnMut(SyncProgress)) -> Result<SyncRunReport> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(Error::SyncInProgress);
        }
        let _guard = InFlightGuard(&self.in_flight);

        tracing::info!(page_size = self.page_size, "Starting directory sync");
        let mut tracker = ProgressTracker::default();
        let mut downloads = PerCategory::<CategoryDownload>::default();
        let mut duplicates = PerCategory::<usize>::default();
        let mut first_error = None;

        for category in Category::ALL {
            let download = downloads.get_mut(category);
            match self
                .sync_category(category, download, &mut tracker, &mut on_progress)
                .await
            {
                Ok(duplicate_count) => *duplicates.get_mut(category) = duplicate_count,
                Err(error) => {
                    let message = error.to_string();
                    tracing::warn!(%category, "Directory sync failed: {message}");
                    if let Err(status_error) =
                        self.store.fail_category_sync(category, &message).await
                    {
                        tracing::warn!(%category, "Failed to record sync failure: {status_error}");
                    }
                    download.error = Some(message.clone());
                    first_error.get_or_insert(message);
                }
            }
        }

        let report = SyncRunReport {
            success: first_error.is_none(),
            download_details: downloads,
            duplicate_details: duplicates,
            stats: self.store.local_stats().await?,
            first_error,
        };
        tracing::info!(
            success = report.success,
            saved = report.saved_total(),
            received = report.received_total(),
            "Directory sync finished"
        );
        Ok(report)
    }

    /// Download and replace one category. Returns the duplicate source ID count.
    async fn sync_category(
        &self,
        category: Category,
        download: &mut CategoryDownload,
        tracker: &mut ProgressTracker,
        on_progress: &mut impl FnMut(SyncProgress),
    ) -> Result<usize> {
        self.store.begin_category_sync(category).await?;

        let mut records = Vec::new();
        let mut page = 1;
        loop {
            let request = PageRequest::new(page, self.page_size);
            let batch = self.source.fetch_page(category, &request).await?;
            let has_next = batch.has_next();
            let total_pages = batch.total_pages();
            let page_was_empty = batch.data.is_empty();
            let total_records = batch.total_records();
            records.extend(batch.data);

            download.pages = page;
            download.received = records.len();
            tracing::debug!(%category, page, total_pages, received = records.len(), "Fetched page");

            let percent = fetch_percent(page, total_pages);
            self.store
                .record_category_progress(
                    category,
                    as_counter(records.len()),
                    as_counter(total_records.max(records.len())),
                    percent,
                )
                .await?;
            on_progress(tracker.update(category, percent));

            if !has_next {
                break;
            }
            if page_was_empty {
                tracing::warn!(%category, page, "Source reported more pages after an empty page; stopping");
                break;
            }
            page += 1;
        }

        let outcome = self.store.replace_category(category, &records).await?;
        download.saved = outcome.inserted_count;
        download.skipped = outcome.skipped_count;
        if outcome.skipped_count > 0 {
            tracing::warn!(
                %category,
                skipped = outcome.skipped_count,
                first_error = outcome.first_error.as_deref().unwrap_or_default(),
                "Some records could not be saved"
            );
        }

        self.store
            .complete_category_sync(category, as_counter(outcome.inserted_count), unix_millis_now())
            .await?;
        on_progress(tracker.update(category, 100));
        tracing::info!(%category, saved = outcome.inserted_count, received = records.len(), "Category synced");

        Ok(outcome.duplicate_source_id_count)
    }
}

/// Share of pages fetched, capped below 100 until the replace completes.
fn fetch_percent(pages_fetched: usize, total_pages: usize) -> u8 {
    let percent = pages_fetched.saturating_mul(100) / total_pages.max(1);
    u8::try_from(percent.min(usize::from(FETCH_PROGRESS_CAP))).unwrap_or(FETCH_PROGRESS_CAP)
}

fn as_counter(value: usize) -> u64 {
    u64::try_from(value).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{DirectoryFilter, Paging};
    use crate::test_support::FakeDirectory;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn national(id: usize) -> serde_json::Value {
        json!({
            "sourceId": format!("N-{id}"),
            "contractor": format!("Contractor {id}"),
            "province": if id % 3 == 0 { "Cavite" } else { "Benguet" },
            "status": "Approved"
        })
    }

    fn local(id: usize) -> serde_json::Value {
        json!({ "sourceId": format!("L-{id}"), "permittee": "Coop", "province": "Cavite" })
    }

    fn hotspot(id: usize) -> serde_json::Value {
        json!({ "sourceId": format!("H-{id}"), "type": "Illegal Mining", "province": "Rizal" })
    }

    fn assert_monotonic(progress: &[SyncProgress]) {
        for pair in progress.windows(2) {
            assert!(pair[1].national >= pair[0].national);
            assert!(pair[1].local >= pair[0].local);
            assert!(pair[1].hotspots >= pair[0].hotspots);
            assert!(pair[1].overall >= pair[0].overall);
        }
    }

    #[test]
    fn fetch_percent_is_capped_until_replace() {
        assert_eq!(fetch_percent(1, 3), 33);
        assert_eq!(fetch_percent(3, 3), FETCH_PROGRESS_CAP);
        assert_eq!(fetch_percent(1, 0), FETCH_PROGRESS_CAP);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn full_sync_pages_through_every_category() {
        let store = LocalStore::open_in_memory().await.unwrap();
        let source = FakeDirectory::new()
            .with_records(Category::National, (0..45).map(national).collect())
            .with_records(Category::Local, (0..7).map(local).collect())
            .with_records(Category::Hotspots, (0..3).map(hotspot).collect());
        let engine = ReplicaSyncEngine::new(store.clone(), source).with_page_size(20);

        let mut progress = Vec::new();
        let report = engine.run(|update| progress.push(update)).await.unwrap();

        assert!(report.success);
        assert_eq!(report.first_error, None);
        assert_eq!(report.download_details.national.pages, 3);
        assert_eq!(report.download_details.national.received, 45);
        assert_eq!(report.download_details.national.saved, 45);
        assert_eq!(
            report.stats,
            PerCategory {
                national: 45,
                local: 7,
                hotspots: 3,
            }
        );
        assert_eq!(
            engine.source.requests(),
            vec![
                (Category::National, 1),
                (Category::National, 2),
                (Category::National, 3),
                (Category::Local, 1),
                (Category::Hotspots, 1),
            ]
        );

        assert_monotonic(&progress);
        let last = progress.last().copied().unwrap();
        assert_eq!(last, SyncProgress::complete());

        let cavite = store
            .query_category(
                Category::National,
                &DirectoryFilter {
                    province: Some("Cavite".to_string()),
                    ..DirectoryFilter::default()
                },
                Paging::default(),
            )
            .await
            .unwrap();
        assert_eq!(cavite.total_count, 15);

        let status = store.sync_status(Category::National).await.unwrap();
        assert_eq!(status.progress_percent, 100);
        assert_eq!(status.total_records, 45);
        assert!(!status.is_syncing);
        assert!(status.last_sync_at.is_some());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn failed_category_does_not_stop_the_others() {
        let store = LocalStore::open_in_memory().await.unwrap();
        store
            .replace_category(Category::Local, &[local(99)])
            .await
            .unwrap();
        let source = FakeDirectory::new()
            .with_records(Category::National, (0..5).map(national).collect())
            .with_records(Category::Local, (0..30).map(local).collect())
            .with_records(Category::Hotspots, (0..2).map(hotspot).collect())
            .failing_on(Category::Local, 2);
        let engine = ReplicaSyncEngine::new(store.clone(), source).with_page_size(20);

        let report = engine.run(|_| {}).await.unwrap();

        assert!(!report.success);
        assert!(report
            .first_error
            .as_deref()
            .is_some_and(|error| error.contains("Service Unavailable")));
        assert_eq!(report.download_details.local.received, 20);
        assert!(report.download_details.local.error.is_some());
        // The previous replica survives a failed download
        assert_eq!(
            report.stats,
            PerCategory {
                national: 5,
                local: 1,
                hotspots: 2,
            }
        );

        let status = store.sync_status(Category::Local).await.unwrap();
        assert!(!status.is_syncing);
        assert!(status.last_error.is_some());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn empty_page_stops_a_source_that_never_ends() {
        let store = LocalStore::open_in_memory().await.unwrap();
        let source = FakeDirectory::new()
            .with_records(Category::Hotspots, (0..3).map(hotspot).collect())
            .never_ending();
        let engine = ReplicaSyncEngine::new(store, source).with_page_size(2);

        let report = engine.run(|_| {}).await.unwrap();

        assert!(report.success);
        assert_eq!(report.download_details.hotspots.pages, 3);
        assert_eq!(report.stats.hotspots, 3);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn duplicates_are_reported_per_category() {
        let store = LocalStore::open_in_memory().await.unwrap();
        let mut records = (0..4).map(national).collect::<Vec<_>>();
        records.push(national(0));
        let source = FakeDirectory::new().with_records(Category::National, records);
        let engine = ReplicaSyncEngine::new(store, source);

        let report = engine.run(|_| {}).await.unwrap();

        assert_eq!(report.duplicate_details.national, 1);
        assert_eq!(report.stats.national, 5);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn concurrent_run_is_rejected() {
        let store = LocalStore::open_in_memory().await.unwrap();
        let source = FakeDirectory::new()
            .with_records(Category::National, (0..3).map(national).collect());
        let gate = source.gated();
        let engine = ReplicaSyncEngine::new(store, source);

        let (first, second) = tokio::join!(engine.run(|_| {}), async {
            let second = engine.run(|_| {}).await;
            gate.notify_one();
            second
        });

        assert!(matches!(second, Err(Error::SyncInProgress)));
        assert!(first.unwrap().success);
        assert!(!engine.is_running());
    }
}
