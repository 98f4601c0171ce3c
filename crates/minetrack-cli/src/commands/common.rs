use std::env;
use std::path::PathBuf;

use chrono::Utc;
use minetrack_core::config::{RemoteConfig, ACCESS_TOKEN_ENV};
use minetrack_core::drafts::DraftQueue;
use minetrack_core::models::{
    AttachmentRef, Draft, DraftId, FormData, GpsLocation, StoredRecord, SyncStatus,
};
use minetrack_core::network::{NetworkMonitor, NetworkStatus};
use minetrack_core::services::LocalStore;
use minetrack_core::sync::SyncProgress;

use crate::config_profiles::{is_http_url, normalize_text_option, CliProfile, CliProfilesConfig};
use crate::error::CliError;

pub const DB_PATH_ENV: &str = "MINETRACK_DB_PATH";
pub const REPORTER_ID_ENV: &str = "MINETRACK_REPORTER_ID";

/// Draft queue used for purely local operations; it never submits.
pub type LocalDrafts = DraftQueue<()>;

/// Global flags and the resolved profile, shared by every command.
pub struct CliContext {
    pub db_path: PathBuf,
    pub profile_name: String,
    pub profile: CliProfile,
    pub offline: bool,
}

impl CliContext {
    pub fn resolve(
        db_path: Option<PathBuf>,
        profile: Option<&str>,
        offline: bool,
    ) -> Result<Self, CliError> {
        let config = CliProfilesConfig::load().map_err(CliError::Config)?;
        let profile_name = config.resolve_profile_name(profile);
        let profile = config.profile(&profile_name).cloned().unwrap_or_default();
        Ok(Self {
            db_path: resolve_db_path(db_path)?,
            profile_name,
            profile,
            offline,
        })
    }

    pub async fn open_store(&self) -> Result<LocalStore, CliError> {
        Ok(LocalStore::open_path(&self.db_path).await?)
    }

    pub fn network(&self) -> NetworkStatus {
        NetworkMonitor::new(!self.offline).status()
    }

    pub fn local_drafts(&self, store: LocalStore) -> LocalDrafts {
        DraftQueue::new(store, (), self.network())
    }

    /// Profile settings first, then `MINETRACK_*` environment variables.
    pub fn remote_config(&self, page_size: Option<usize>) -> Result<RemoteConfig, CliError> {
        let config = match self.profile.api_base_url() {
            Some(url) => RemoteConfig::new(&url)?
                .with_access_token(env::var(ACCESS_TOKEN_ENV).ok()),
            None => RemoteConfig::from_env()?.ok_or(CliError::RemoteNotConfigured)?,
        };

        match page_size.or_else(|| self.profile.page_size()) {
            Some(page_size) => Ok(config.with_page_size(page_size)?),
            None => Ok(config),
        }
    }

    /// Explicit flag, then the profile, then `MINETRACK_REPORTER_ID`.
    pub fn reporter_id(&self, explicit: Option<String>) -> Result<String, CliError> {
        normalize_text_option(explicit)
            .or_else(|| self.profile.reporter_id())
            .or_else(|| normalize_text_option(env::var(REPORTER_ID_ENV).ok()))
            .ok_or(CliError::ReporterNotConfigured)
    }
}

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> Result<PathBuf, CliError> {
    if let Some(path) = cli_db_path.or_else(|| env::var_os(DB_PATH_ENV).map(PathBuf::from)) {
        return Ok(path);
    }
    default_db_path()
}

pub fn default_db_path() -> Result<PathBuf, CliError> {
    dirs::data_dir()
        .map(|dir| dir.join("minetrack").join("minetrack.db"))
        .ok_or_else(|| CliError::Config("Failed to resolve CLI data directory".to_string()))
}

pub async fn resolve_draft(draft_query: &str, store: &LocalStore) -> Result<Draft, CliError> {
    let draft_query = normalize_draft_identifier(draft_query)?;
    if let Ok(draft_id) = draft_query.parse::<DraftId>() {
        if let Some(draft) = store.get_draft(&draft_id).await? {
            return Ok(draft);
        }
    }

    let matching_ids = store.find_draft_ids_by_prefix(&draft_query, 3).await?;

    match matching_ids.len() {
        0 => Err(CliError::DraftNotFound(draft_query)),
        1 => {
            let resolved_id = matching_ids[0]
                .parse::<DraftId>()
                .map_err(|_| CliError::DraftNotFound(draft_query.clone()))?;
            store
                .get_draft(&resolved_id)
                .await?
                .ok_or(CliError::DraftNotFound(draft_query))
        }
        _ => {
            let options = matching_ids
                .iter()
                .map(|id| short_id(id))
                .collect::<Vec<_>>()
                .join(", ");

            Err(CliError::AmbiguousDraftId(format!(
                "ID prefix '{draft_query}' is ambiguous; matches: {options}"
            )))
        }
    }
}

pub fn normalize_draft_identifier(id: &str) -> Result<String, CliError> {
    let id = id.trim();
    if id.is_empty() {
        return Err(CliError::EmptyDraftId);
    }
    Ok(id.to_string())
}

pub fn short_id(id: &str) -> String {
    id.chars().take(13).collect()
}

/// Parse `--data` as a JSON object.
pub fn parse_form_data(raw: Option<&str>) -> Result<Option<FormData>, CliError> {
    let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return Ok(None);
    };
    let payload = serde_json::from_str::<serde_json::Value>(raw)
        .map_err(|error| CliError::InvalidArgument(format!("--data is not valid JSON: {error}")))?;
    if !payload.is_object() {
        return Err(CliError::InvalidArgument(
            "--data must be a JSON object".to_string(),
        ));
    }
    Ok(Some(FormData::new(payload)))
}

/// Build a location from `--lat`/`--lon`/`--accuracy`. Latitude and
/// longitude must be given together.
pub fn parse_gps(
    latitude: Option<f64>,
    longitude: Option<f64>,
    accuracy: Option<f64>,
) -> Result<Option<GpsLocation>, CliError> {
    let (latitude, longitude) = match (latitude, longitude) {
        (Some(latitude), Some(longitude)) => (latitude, longitude),
        (None, None) if accuracy.is_none() => return Ok(None),
        _ => {
            return Err(CliError::InvalidArgument(
                "--lat and --lon must be given together".to_string(),
            ))
        }
    };

    if !(-90.0..=90.0).contains(&latitude) {
        return Err(CliError::InvalidArgument(format!(
            "latitude {latitude} is out of range"
        )));
    }
    if !(-180.0..=180.0).contains(&longitude) {
        return Err(CliError::InvalidArgument(format!(
            "longitude {longitude} is out of range"
        )));
    }
    if accuracy.is_some_and(|accuracy| !accuracy.is_finite() || accuracy < 0.0) {
        return Err(CliError::InvalidArgument(
            "accuracy must be a non-negative number of meters".to_string(),
        ));
    }

    Ok(Some(GpsLocation {
        latitude,
        longitude,
        accuracy,
    }))
}

pub fn parse_attachments(urls: &[String]) -> Result<Vec<AttachmentRef>, CliError> {
    urls.iter()
        .map(|url| {
            let url = url.trim();
            if is_http_url(url) {
                Ok(AttachmentRef::new(url))
            } else {
                Err(CliError::InvalidArgument(format!(
                    "attachment must be an http(s) URL: {url}"
                )))
            }
        })
        .collect()
}

pub fn format_record_lines(records: &[StoredRecord]) -> Vec<String> {
    records
        .iter()
        .map(|stored| {
            let record = &stored.record;
            format!(
                "{:<10}  {:<18}  {:<32}  {:<16}  {}",
                record.source_id(),
                record.reference_number().unwrap_or("-"),
                truncate(record.holder_name().unwrap_or("-"), 32),
                record.province().unwrap_or("-"),
                record.status().unwrap_or("-"),
            )
        })
        .collect()
}

pub fn format_status_lines(statuses: &[SyncStatus], now_ms: i64) -> Vec<String> {
    statuses
        .iter()
        .map(|status| {
            let state = if status.is_syncing {
                "syncing".to_string()
            } else if let Some(error) = &status.last_error {
                format!("failed: {error}")
            } else if let Some(last_sync_at) = status.last_sync_at {
                format!(
                    "synced {} ({})",
                    format_relative_time(last_sync_at, now_ms),
                    format_sync_timestamp(last_sync_at)
                )
            } else {
                "never synced".to_string()
            };
            format!(
                "{:<9} {:>3}%  {}/{}  {}",
                status.category.as_str(),
                status.progress_percent,
                status.downloaded_records,
                status.total_records,
                state
            )
        })
        .collect()
}

pub fn format_draft_lines(drafts: &[Draft], now_ms: i64) -> Vec<String> {
    drafts
        .iter()
        .map(|draft| {
            let state = if draft.needs_sync { "pending" } else { "sent" };
            let location = draft.gps_location.map_or_else(
                || "no location".to_string(),
                |gps| format!("{:.5},{:.5}", gps.latitude, gps.longitude),
            );
            format!(
                "{}  {:<11}  {:<7}  {}  {} attachment(s)  {}",
                short_id(&draft.id.as_str()),
                draft.report_type.as_str(),
                state,
                location,
                draft.attachments.len(),
                format_relative_time(draft.updated_at, now_ms)
            )
        })
        .collect()
}

pub fn format_progress(progress: SyncProgress) -> String {
    format!(
        "national {:>3}% | local {:>3}% | hotspots {:>3}% | overall {:>3}%",
        progress.national, progress.local, progress.hotspots, progress.overall
    )
}

pub fn format_sync_timestamp(timestamp_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |date_time| date_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}

pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

pub fn print_json<T: serde::Serialize>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn truncate(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    let mut truncated = value
        .chars()
        .take(max_chars.saturating_sub(3))
        .collect::<String>();
    truncated.push_str("...");
    truncated
}
