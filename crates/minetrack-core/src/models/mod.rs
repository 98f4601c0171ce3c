//! Data models for Minetrack

mod category;
mod directory;
mod draft;
mod sync_status;

pub use category::{Category, PerCategory};
pub use directory::{DirectoryRecord, HotspotIncident, LocalPermit, NationalPermit, StoredRecord};
pub use draft::{
    AttachmentRef, Draft, DraftId, DraftPatch, DraftStatus, FormData, GpsLocation, NewDraft,
    ReportType,
};
pub use sync_status::SyncStatus;
