//! Request and response bodies of the remote API.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::models::{AttachmentRef, Draft, DraftStatus, GpsLocation, ReportType};

/// Paging block returned by every list endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    #[serde(default)]
    pub current_page: usize,
    #[serde(default)]
    pub total_pages: usize,
    #[serde(default)]
    pub total_records: usize,
    #[serde(default)]
    pub has_next: bool,
    #[serde(default)]
    pub has_prev: bool,
}

/// One page of `GET /directory/{category}`.
///
/// Records stay as raw JSON; the store decodes and validates them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectoryPage {
    #[serde(default = "default_success")]
    pub success: bool,
    #[serde(default)]
    pub data: Vec<serde_json::Value>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

const fn default_success() -> bool {
    true
}

impl DirectoryPage {
    /// Whether the source reports another page after this one.
    pub fn has_next(&self) -> bool {
        self.pagination.is_some_and(|pagination| pagination.has_next)
    }

    /// Total pages reported by the source, at least 1.
    pub fn total_pages(&self) -> usize {
        self.pagination
            .map_or(1, |pagination| pagination.total_pages)
            .max(1)
    }

    /// Total records reported by the source, falling back to this page's size.
    pub fn total_records(&self) -> usize {
        self.pagination
            .map_or(self.data.len(), |pagination| pagination.total_records)
    }
}

/// Query parameters for a directory page request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageRequest {
    pub page: usize,
    pub limit: usize,
    pub search: Option<String>,
    pub province: Option<String>,
    pub status: Option<String>,
    pub classification: Option<String>,
    pub record_type: Option<String>,
}

impl PageRequest {
    pub fn new(page: usize, limit: usize) -> Self {
        Self {
            page,
            limit,
            ..Self::default()
        }
    }

    /// Non-empty query parameters in a stable order.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("page", self.page.to_string()),
            ("limit", self.limit.to_string()),
        ];
        let filters = [
            ("search", &self.search),
            ("province", &self.province),
            ("status", &self.status),
            ("classification", &self.classification),
            ("type", &self.record_type),
        ];
        for (key, value) in filters {
            if let Some(value) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
                pairs.push((key, value.to_string()));
            }
        }
        pairs
    }
}

/// Body of `POST /reports`, built from a draft with local-only fields removed.
///
/// The form payload is sent under the report type's key, e.g. `miningData`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportSubmission {
    pub reporter_id: String,
    pub report_type: ReportType,
    pub status: DraftStatus,
    pub gps_location: Option<GpsLocation>,
    pub attachments: Vec<AttachmentRef>,
    pub form_payload: serde_json::Value,
}

impl From<&Draft> for ReportSubmission {
    fn from(draft: &Draft) -> Self {
        Self {
            reporter_id: draft.reporter_id.clone(),
            report_type: draft.report_type,
            status: draft.status,
            gps_location: draft.gps_location,
            attachments: draft.attachments.clone(),
            form_payload: draft.form_data.payload.clone(),
        }
    }
}

impl Serialize for ReportSubmission {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("reporterId", &self.reporter_id)?;
        map.serialize_entry("reportType", &self.report_type)?;
        map.serialize_entry("status", &self.status)?;
        if let Some(location) = &self.gps_location {
            map.serialize_entry("gpsLocation", location)?;
        }
        map.serialize_entry("attachments", &self.attachments)?;
        map.serialize_entry(self.report_type.payload_key(), &self.form_payload)?;
        map.end()
    }
}

/// Response of `POST /reports`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub success: bool,
    #[serde(default, alias = "id")]
    pub report_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}
