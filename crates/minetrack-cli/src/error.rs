use std::io;

use minetrack_core::remote::RemoteError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] minetrack_core::Error),
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Draft ID cannot be empty")]
    EmptyDraftId,
    #[error("Draft not found for id/prefix: {0}")]
    DraftNotFound(String),
    #[error("{0}")]
    AmbiguousDraftId(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error(
        "Remote API is not configured. Run `minetrack config init --api-base-url <url>` or set MINETRACK_API_BASE_URL."
    )]
    RemoteNotConfigured,
    #[error(
        "No reporter id. Pass --reporter or run `minetrack config init --reporter-id <id>`."
    )]
    ReporterNotConfigured,
    #[error("Offline mode: directory sync needs network access")]
    Offline,
    #[error("Directory sync incomplete: {0}")]
    SyncIncomplete(String),
}
