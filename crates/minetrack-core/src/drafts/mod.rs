//! Offline-first queue of report drafts.
//!
//! Drafts are always written locally first. `sync_all` submits the dirty
//! ones when the device is online and removes each draft the server accepts.

use serde::{Deserialize, Serialize};

use crate::models::{Draft, DraftId, DraftPatch, NewDraft};
use crate::network::NetworkStatus;
use crate::remote::{ReportSink, ReportSubmission};
use crate::services::LocalStore;
use crate::{Error, Result};

/// A draft the server did not accept during `sync_all`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftSyncFailure {
    pub draft_id: DraftId,
    pub error: String,
}

/// Outcome of one `sync_all` pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftSyncSummary {
    pub synced_count: usize,
    pub failed_count: usize,
    pub failures: Vec<DraftSyncFailure>,
    /// The device was offline, so nothing was attempted
    pub skipped_offline: bool,
}

pub struct DraftQueue<K> {
    store: LocalStore,
    sink: K,
    network: NetworkStatus,
}

impl<K> DraftQueue<K> {
    pub const fn new(store: LocalStore, sink: K, network: NetworkStatus) -> Self {
        Self {
            store,
            sink,
            network,
        }
    }

    /// Store a new draft locally. Works offline.
    pub async fn save(&self, input: NewDraft) -> Result<Draft> {
        if input.reporter_id.trim().is_empty() {
            return Err(Error::InvalidInput(
                "reporter id must not be empty".to_string(),
            ));
        }

        let draft = Draft::new(input);
        self.store.upsert_draft(&draft).await?;
        tracing::info!(draft_id = %draft.id, report_type = %draft.report_type, "Saved draft");
        Ok(draft)
    }

    /// Merge a patch into a stored draft and mark it dirty.
    pub async fn update(&self, id: &DraftId, patch: DraftPatch) -> Result<Draft> {
        let mut draft = self
            .store
            .get_draft(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("draft {id}")))?;

        draft.apply(patch);
        self.store.upsert_draft(&draft).await?;
        tracing::debug!(draft_id = %id, "Updated draft");
        Ok(draft)
    }

    pub async fn delete(&self, id: &DraftId) -> Result<()> {
        self.store.delete_draft(id).await?;
        tracing::info!(draft_id = %id, "Deleted draft");
        Ok(())
    }

    /// A reporter's drafts, most recently updated first.
    pub async fn list(&self, reporter_id: &str) -> Result<Vec<Draft>> {
        self.store.get_drafts(reporter_id).await
    }

    pub async fn get(&self, id: &DraftId) -> Result<Option<Draft>> {
        self.store.get_draft(id).await
    }
}

impl<K: ReportSink> DraftQueue<K> {
    /// Submit every dirty draft of a reporter.
    ///
    /// Returns immediately when offline. A failed submission leaves the
    /// draft dirty and does not stop the remaining ones.
    pub async fn sync_all(&self, reporter_id: &str) -> Result<DraftSyncSummary> {
        if !self.network.is_online() {
            tracing::info!("Offline; draft submission deferred");
            return Ok(DraftSyncSummary {
                skipped_offline: true,
                ..DraftSyncSummary::default()
            });
        }

        let dirty = self.store.get_dirty_drafts(reporter_id).await?;
        let mut summary = DraftSyncSummary::default();
        for draft in dirty {
            match self.sink.submit_report(&ReportSubmission::from(&draft)).await {
                Ok(response) => {
                    tracing::info!(
                        draft_id = %draft.id,
                        report_id = response.report_id.as_deref().unwrap_or("unknown"),
                        "Submitted draft"
                    );
                    self.settle_submitted(&draft.id).await;
                    summary.synced_count += 1;
                }
                Err(error) => {
                    tracing::warn!(draft_id = %draft.id, "Draft submission failed: {error}");
                    summary.failed_count += 1;
                    summary.failures.push(DraftSyncFailure {
                        draft_id: draft.id,
                        error: error.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            synced = summary.synced_count,
            failed = summary.failed_count,
            "Draft sync finished"
        );
        Ok(summary)
    }

    /// Remove an accepted draft, or at least stop it from being resubmitted.
    async fn settle_submitted(&self, id: &DraftId) {
        let Err(error) = self.store.delete_draft(id).await else {
            return;
        };
        tracing::warn!(draft_id = %id, "Failed to delete submitted draft: {error}");
        if let Err(error) = self.store.mark_draft_synced(id).await {
            tracing::warn!(draft_id = %id, "Failed to mark submitted draft as synced: {error}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FormData, ReportType};
    use crate::network::NetworkMonitor;
    use crate::test_support::FakeReportSink;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const REPORTER: &str = "inspector-7";

    async fn queue(sink: FakeReportSink, online: bool) -> DraftQueue<FakeReportSink> {
        queue_with_monitor(sink, online).await.0
    }

    async fn queue_with_monitor(
        sink: FakeReportSink,
        online: bool,
    ) -> (DraftQueue<FakeReportSink>, NetworkMonitor) {
        let store = LocalStore::open_in_memory().await.unwrap();
        let monitor = NetworkMonitor::new(online);
        (DraftQueue::new(store, sink, monitor.status()), monitor)
    }

    fn input(report_type: ReportType, payload: serde_json::Value) -> NewDraft {
        NewDraft {
            reporter_id: REPORTER.to_string(),
            report_type,
            gps_location: None,
            form_data: FormData::new(payload),
            attachments: vec![],
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn save_rejects_blank_reporter() {
        let queue = queue(FakeReportSink::new(), true).await;
        let mut blank = input(ReportType::Mining, json!({}));
        blank.reporter_id = "  ".to_string();

        assert!(matches!(
            queue.save(blank).await,
            Err(Error::InvalidInput(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn offline_sync_is_a_no_op() {
        let queue = queue(FakeReportSink::new(), false).await;
        let draft = queue
            .save(input(ReportType::Mining, json!({ "siteName": "Pit 4" })))
            .await
            .unwrap();

        let summary = queue.sync_all(REPORTER).await.unwrap();

        assert!(summary.skipped_offline);
        assert_eq!(summary.synced_count, 0);
        assert!(queue.sink.accepted().is_empty());
        let stored = queue.get(&draft.id).await.unwrap().unwrap();
        assert!(stored.needs_sync);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn drafts_saved_offline_are_submitted_once_online() {
        let (queue, monitor) = queue_with_monitor(FakeReportSink::new(), false).await;
        queue
            .save(input(ReportType::Mining, json!({ "siteName": "Pit 4" })))
            .await
            .unwrap();
        queue
            .save(input(ReportType::Exploration, json!({ "drillHoles": 3 })))
            .await
            .unwrap();

        monitor.set_online(true);
        let summary = queue.sync_all(REPORTER).await.unwrap();

        assert_eq!(
            summary,
            DraftSyncSummary {
                synced_count: 2,
                ..DraftSyncSummary::default()
            }
        );
        assert!(queue.list(REPORTER).await.unwrap().is_empty());

        let mut bodies = queue
            .sink
            .accepted()
            .iter()
            .map(|submission| serde_json::to_value(submission).unwrap())
            .collect::<Vec<_>>();
        bodies.sort_by_key(|body| body["reportType"].as_str().unwrap_or_default().to_string());
        assert_eq!(bodies[0]["explorationData"], json!({ "drillHoles": 3 }));
        assert_eq!(bodies[1]["miningData"], json!({ "siteName": "Pit 4" }));
        assert!(bodies.iter().all(|body| body.get("id").is_none()));
        assert!(bodies.iter().all(|body| body.get("needsSync").is_none()));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn failed_submission_keeps_draft_dirty() {
        let queue = queue(FakeReportSink::new().rejecting(ReportType::Transport), true).await;
        queue
            .save(input(ReportType::Mining, json!({})))
            .await
            .unwrap();
        let rejected = queue
            .save(input(ReportType::Transport, json!({ "plateNumber": "ABC 123" })))
            .await
            .unwrap();

        let summary = queue.sync_all(REPORTER).await.unwrap();

        assert_eq!(summary.synced_count, 1);
        assert_eq!(summary.failed_count, 1);
        assert_eq!(summary.failures[0].draft_id, rejected.id);
        assert!(summary.failures[0].error.contains("HTTP 422"));

        let remaining = queue.list(REPORTER).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, rejected.id);
        assert!(remaining[0].needs_sync);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn update_merges_and_marks_dirty() {
        let queue = queue(FakeReportSink::new(), true).await;
        let draft = queue
            .save(input(ReportType::Trading, json!({ "buyer": "A" })))
            .await
            .unwrap();

        let updated = queue
            .update(
                &draft.id,
                DraftPatch {
                    form_data: Some(FormData::new(json!({ "buyer": "B" }))),
                    ..DraftPatch::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.report_type, ReportType::Trading);
        assert_eq!(updated.form_data.payload, json!({ "buyer": "B" }));
        assert!(updated.updated_at > draft.updated_at);
        assert!(updated.needs_sync);
        assert_eq!(queue.get(&draft.id).await.unwrap(), Some(updated));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn update_and_delete_missing_draft_are_not_found() {
        let queue = queue(FakeReportSink::new(), true).await;
        let missing = DraftId::new();

        assert!(matches!(
            queue.update(&missing, DraftPatch::default()).await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            queue.delete(&missing).await,
            Err(Error::NotFound(_))
        ));
    }
}
