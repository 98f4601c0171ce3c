//! Database layer for Minetrack

mod connection;
mod draft_repository;
mod migrations;
mod replica_repository;
mod sync_status_repository;
mod values;

pub use connection::Database;
pub use draft_repository::{DraftRepository, LibSqlDraftRepository};
pub use replica_repository::{
    DirectoryFilter, FilterField, LibSqlReplicaRepository, Paging, QueryResult, ReplaceOutcome,
    ReplicaRepository,
};
pub use sync_status_repository::{LibSqlSyncStatusRepository, SyncStatusRepository};
