//! Remote directory source and report sink.
//!
//! The sync engine and draft queue only see the `DirectorySource` and
//! `ReportSink` traits; `HttpRemoteClient` implements both over HTTP.

mod error;
mod http;
mod wire;

pub use error::{parse_api_error, RemoteError};
pub use http::HttpRemoteClient;
pub use wire::{DirectoryPage, PageRequest, Pagination, ReportSubmission, SubmitResponse};

use crate::models::Category;

/// Paged read access to the remote directory.
#[allow(async_fn_in_trait)]
pub trait DirectorySource {
    async fn fetch_page(
        &self,
        category: Category,
        request: &PageRequest,
    ) -> Result<DirectoryPage, RemoteError>;
}

/// Submission endpoint for finished reports.
#[allow(async_fn_in_trait)]
pub trait ReportSink {
    async fn submit_report(
        &self,
        submission: &ReportSubmission,
    ) -> Result<SubmitResponse, RemoteError>;
}
