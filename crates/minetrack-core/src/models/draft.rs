//! Report draft model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::Error;
use crate::util::unix_millis_now;

/// A unique identifier for a draft, using UUID v7 (time-sortable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DraftId(Uuid);

impl DraftId {
    /// Create a new unique draft ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for DraftId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DraftId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DraftId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Violation category of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportType {
    Mining,
    Transport,
    Processing,
    Trading,
    Exploration,
    SmallScale,
}

impl ReportType {
    pub const ALL: [Self; 6] = [
        Self::Mining,
        Self::Transport,
        Self::Processing,
        Self::Trading,
        Self::Exploration,
        Self::SmallScale,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mining => "mining",
            Self::Transport => "transport",
            Self::Processing => "processing",
            Self::Trading => "trading",
            Self::Exploration => "exploration",
            Self::SmallScale => "small_scale",
        }
    }

    /// Key carrying the category payload in a remote submission.
    pub const fn payload_key(self) -> &'static str {
        match self {
            Self::Mining => "miningData",
            Self::Transport => "transportData",
            Self::Processing => "processingData",
            Self::Trading => "tradingData",
            Self::Exploration => "explorationData",
            Self::SmallScale => "smallScaleData",
        }
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = match s.trim().to_ascii_lowercase().replace(['-', ' '], "_") {
            value if value == "smallscale" => "small_scale".to_string(),
            value => value,
        };
        Self::ALL
            .into_iter()
            .find(|report_type| report_type.as_str() == normalized)
            .ok_or_else(|| Error::InvalidInput(format!("unknown report type: {}", s.trim())))
    }
}

/// Lifecycle status of a local draft. Drafts never leave the `draft` state
/// locally; a submitted draft is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DraftStatus {
    #[default]
    Draft,
}

impl DraftStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
        }
    }
}

/// Coordinates captured by the (external) GPS layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GpsLocation {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
}

/// Opaque, category-specific form payload.
///
/// The store persists it verbatim; only the submission mapper reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormData {
    pub schema_version: u32,
    pub payload: serde_json::Value,
}

impl FormData {
    pub const CURRENT_SCHEMA_VERSION: u32 = 1;

    pub const fn new(payload: serde_json::Value) -> Self {
        Self {
            schema_version: Self::CURRENT_SCHEMA_VERSION,
            payload,
        }
    }
}

impl Default for FormData {
    fn default() -> Self {
        Self::new(serde_json::Value::Object(serde_json::Map::new()))
    }
}

/// Reference to an asset already uploaded to the remote asset host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentRef {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl AttachmentRef {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            public_id: None,
            mime_type: None,
        }
    }
}

/// A locally originated, not yet submitted report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Draft {
    pub id: DraftId,
    pub reporter_id: String,
    #[serde(rename = "type")]
    pub report_type: ReportType,
    pub status: DraftStatus,
    pub gps_location: Option<GpsLocation>,
    pub form_data: FormData,
    pub attachments: Vec<AttachmentRef>,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Last local mutation (Unix ms)
    pub updated_at: i64,
    /// Local changes not yet acknowledged by the server
    pub needs_sync: bool,
    pub is_synced: bool,
}

/// Caller-supplied fields for a new draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDraft {
    pub reporter_id: String,
    #[serde(rename = "type")]
    pub report_type: ReportType,
    #[serde(default)]
    pub gps_location: Option<GpsLocation>,
    #[serde(default)]
    pub form_data: FormData,
    #[serde(default)]
    pub attachments: Vec<AttachmentRef>,
}

/// Partial update for a draft. Present fields replace the stored ones.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftPatch {
    #[serde(default, rename = "type")]
    pub report_type: Option<ReportType>,
    #[serde(default)]
    pub gps_location: Option<GpsLocation>,
    #[serde(default)]
    pub form_data: Option<FormData>,
    #[serde(default)]
    pub attachments: Option<Vec<AttachmentRef>>,
}

impl DraftPatch {
    pub const fn is_empty(&self) -> bool {
        self.report_type.is_none()
            && self.gps_location.is_none()
            && self.form_data.is_none()
            && self.attachments.is_none()
    }
}

impl Draft {
    /// Build a fresh, dirty draft from caller input.
    #[must_use]
    pub fn new(input: NewDraft) -> Self {
        let now = unix_millis_now();
        Self {
            id: DraftId::new(),
            reporter_id: input.reporter_id,
            report_type: input.report_type,
            status: DraftStatus::Draft,
            gps_location: input.gps_location,
            form_data: input.form_data,
            attachments: input.attachments,
            created_at: now,
            updated_at: now,
            needs_sync: true,
            is_synced: false,
        }
    }

    /// Merge a patch into this draft, marking it dirty.
    pub fn apply(&mut self, patch: DraftPatch) {
        if let Some(report_type) = patch.report_type {
            self.report_type = report_type;
        }
        if let Some(location) = patch.gps_location {
            self.gps_location = Some(location);
        }
        if let Some(form_data) = patch.form_data {
            self.form_data = form_data;
        }
        if let Some(attachments) = patch.attachments {
            self.attachments = attachments;
        }
        // Clock can go backwards on devices; updated_at must not.
        self.updated_at = unix_millis_now().max(self.updated_at + 1);
        self.needs_sync = true;
        self.is_synced = false;
    }
}
