//! In-memory fakes for the remote traits.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

use crate::models::{Category, ReportType};
use crate::remote::{
    DirectoryPage, DirectorySource, PageRequest, Pagination, RemoteError, ReportSink,
    ReportSubmission, SubmitResponse,
};

/// Directory source serving fixed record sets, paged by the request's limit.
#[derive(Default)]
pub struct FakeDirectory {
    records: HashMap<Category, Vec<serde_json::Value>>,
    fail_on_page: HashMap<Category, usize>,
    never_ends: bool,
    gate: Mutex<Option<Arc<Notify>>>,
    requests: Mutex<Vec<(Category, usize)>>,
}

impl FakeDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_records(mut self, category: Category, records: Vec<serde_json::Value>) -> Self {
        self.records.insert(category, records);
        self
    }

    /// Fail with HTTP 503 when the given page of a category is requested.
    #[must_use]
    pub fn failing_on(mut self, category: Category, page: usize) -> Self {
        self.fail_on_page.insert(category, page);
        self
    }

    /// Always report `hasNext`, even past the last record.
    #[must_use]
    pub const fn never_ending(mut self) -> Self {
        self.never_ends = true;
        self
    }

    /// Make the first fetch wait until the returned handle is notified.
    pub fn gated(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        if let Ok(mut gate) = self.gate.lock() {
            *gate = Some(Arc::clone(&notify));
        }
        notify
    }

    pub fn requests(&self) -> Vec<(Category, usize)> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl DirectorySource for FakeDirectory {
    async fn fetch_page(
        &self,
        category: Category,
        request: &PageRequest,
    ) -> Result<DirectoryPage, RemoteError> {
        let gate = self.gate.lock().ok().and_then(|mut gate| gate.take());
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if let Ok(mut requests) = self.requests.lock() {
            requests.push((category, request.page));
        }
        if self.fail_on_page.get(&category) == Some(&request.page) {
            return Err(RemoteError::Api {
                status: 503,
                message: "Service Unavailable".to_string(),
            });
        }

        let records = self.records.get(&category).map_or(&[][..], Vec::as_slice);
        let limit = request.limit.max(1);
        let total_pages = records.len().div_ceil(limit).max(1);
        let start = (request.page.saturating_sub(1) * limit).min(records.len());
        let end = (start + limit).min(records.len());

        Ok(DirectoryPage {
            success: true,
            data: records[start..end].to_vec(),
            pagination: Some(Pagination {
                current_page: request.page,
                total_pages,
                total_records: records.len(),
                has_next: self.never_ends || request.page < total_pages,
                has_prev: request.page > 1,
            }),
            message: None,
        })
    }
}

/// Report sink recording accepted submissions.
#[derive(Default)]
pub struct FakeReportSink {
    rejected_types: Vec<ReportType>,
    accepted: Mutex<Vec<ReportSubmission>>,
}

impl FakeReportSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer submissions of this type with HTTP 422.
    #[must_use]
    pub fn rejecting(mut self, report_type: ReportType) -> Self {
        self.rejected_types.push(report_type);
        self
    }

    pub fn accepted(&self) -> Vec<ReportSubmission> {
        self.accepted.lock().map(|a| a.clone()).unwrap_or_default()
    }
}

impl ReportSink for FakeReportSink {
    async fn submit_report(
        &self,
        submission: &ReportSubmission,
    ) -> Result<SubmitResponse, RemoteError> {
        if self.rejected_types.contains(&submission.report_type) {
            return Err(RemoteError::Api {
                status: 422,
                message: format!("{} reports are closed", submission.report_type),
            });
        }
        let mut accepted = self
            .accepted
            .lock()
            .map_err(|_| RemoteError::InvalidPayload("sink poisoned".to_string()))?;
        accepted.push(submission.clone());
        Ok(SubmitResponse {
            success: true,
            report_id: Some(format!("R-{}", accepted.len())),
            message: None,
        })
    }
}
