//! Report draft repository

use libsql::params::Params;
use libsql::{Connection, Row, Value};

use super::values::{column_flag, column_i64, column_opt_text, column_text, count, flag, text};
use crate::error::{Error, Result};
use crate::models::{Draft, DraftId, DraftStatus};

const DRAFT_COLUMNS: &str = "id, reporter_id, report_type, status, gps_location, form_data, \
     attachments, created_at, updated_at, needs_sync, is_synced";

/// Trait for draft storage operations (async)
#[allow(async_fn_in_trait)]
pub trait DraftRepository {
    /// Insert a draft or overwrite the stored row with the same id
    async fn upsert(&self, draft: &Draft) -> Result<DraftId>;

    /// Get a draft by ID
    async fn get(&self, id: &DraftId) -> Result<Option<Draft>>;

    /// List a reporter's drafts, most recently updated first
    async fn list_for_reporter(&self, reporter_id: &str) -> Result<Vec<Draft>>;

    /// List a reporter's drafts that still need to be submitted
    async fn list_dirty(&self, reporter_id: &str) -> Result<Vec<Draft>>;

    /// Delete a draft
    async fn delete(&self, id: &DraftId) -> Result<()>;

    /// Clear the dirty flag after the server acknowledged the draft
    async fn mark_synced(&self, id: &DraftId) -> Result<()>;

    /// Draft IDs starting with the given prefix
    async fn list_ids_by_prefix(&self, prefix: &str, limit: usize) -> Result<Vec<String>>;
}

/// libSQL implementation of `DraftRepository`
pub struct LibSqlDraftRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlDraftRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    async fn list_where(&self, condition: &str, reporter_id: &str) -> Result<Vec<Draft>> {
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT {DRAFT_COLUMNS} FROM report_drafts
                     WHERE reporter_id = ?{condition}
                     ORDER BY updated_at DESC, id DESC"
                ),
                [reporter_id],
            )
            .await?;

        let mut drafts = Vec::new();
        while let Some(row) = rows.next().await? {
            drafts.push(Self::parse_draft(&row)?);
        }
        Ok(drafts)
    }

    /// Parse a draft from a database row
    fn parse_draft(row: &Row) -> Result<Draft> {
        let id = column_text(row, 0)?;
        let id = id
            .parse()
            .map_err(|_| Error::Database(format!("invalid draft id in storage: {id}")))?;
        let report_type = column_text(row, 2)?.parse()?;
        let status = match column_text(row, 3)?.as_str() {
            "draft" => DraftStatus::Draft,
            other => {
                return Err(Error::Database(format!("unknown draft status: {other}")));
            }
        };
        let gps_location = column_opt_text(row, 4)?
            .map(|raw| serde_json::from_str(&raw))
            .transpose()?;

        Ok(Draft {
            id,
            reporter_id: column_text(row, 1)?,
            report_type,
            status,
            gps_location,
            form_data: serde_json::from_str(&column_text(row, 5)?)?,
            attachments: serde_json::from_str(&column_text(row, 6)?)?,
            created_at: column_i64(row, 7)?,
            updated_at: column_i64(row, 8)?,
            needs_sync: column_flag(row, 9)?,
            is_synced: column_flag(row, 10)?,
        })
    }
}

impl DraftRepository for LibSqlDraftRepository<'_> {
    async fn upsert(&self, draft: &Draft) -> Result<DraftId> {
        let gps_location = match &draft.gps_location {
            Some(location) => Value::Text(serde_json::to_string(location)?),
            None => Value::Null,
        };
        let params = vec![
            text(&draft.id.as_str()),
            text(&draft.reporter_id),
            text(draft.report_type.as_str()),
            text(draft.status.as_str()),
            gps_location,
            Value::Text(serde_json::to_string(&draft.form_data)?),
            Value::Text(serde_json::to_string(&draft.attachments)?),
            Value::Integer(draft.created_at),
            Value::Integer(draft.updated_at),
            flag(draft.needs_sync),
            flag(draft.is_synced),
        ];

        self.conn
            .execute(
                &format!(
                    "INSERT INTO report_drafts ({DRAFT_COLUMNS})
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                     ON CONFLICT(id) DO UPDATE SET
                        reporter_id = excluded.reporter_id,
                        report_type = excluded.report_type,
                        status = excluded.status,
                        gps_location = excluded.gps_location,
                        form_data = excluded.form_data,
                        attachments = excluded.attachments,
                        updated_at = excluded.updated_at,
                        needs_sync = excluded.needs_sync,
                        is_synced = excluded.is_synced"
                ),
                Params::Positional(params),
            )
            .await?;

        Ok(draft.id)
    }

    async fn get(&self, id: &DraftId) -> Result<Option<Draft>> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {DRAFT_COLUMNS} FROM report_drafts WHERE id = ?"),
                [id.as_str()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_draft(&row)?)),
            None => Ok(None),
        }
    }

    async fn list_for_reporter(&self, reporter_id: &str) -> Result<Vec<Draft>> {
        self.list_where("", reporter_id).await
    }

    async fn list_dirty(&self, reporter_id: &str) -> Result<Vec<Draft>> {
        self.list_where(" AND needs_sync = 1", reporter_id).await
    }

    async fn delete(&self, id: &DraftId) -> Result<()> {
        let rows = self
            .conn
            .execute("DELETE FROM report_drafts WHERE id = ?", [id.as_str()])
            .await?;

        if rows == 0 {
            return Err(Error::NotFound(format!("draft {id}")));
        }
        Ok(())
    }

    async fn mark_synced(&self, id: &DraftId) -> Result<()> {
        let rows = self
            .conn
            .execute(
                "UPDATE report_drafts SET needs_sync = 0, is_synced = 1 WHERE id = ?",
                [id.as_str()],
            )
            .await?;

        if rows == 0 {
            return Err(Error::NotFound(format!("draft {id}")));
        }
        Ok(())
    }

    async fn list_ids_by_prefix(&self, prefix: &str, limit: usize) -> Result<Vec<String>> {
        let pattern = format!("{}%", prefix.trim().replace(['%', '_'], ""));
        let mut rows = self
            .conn
            .query(
                "SELECT id FROM report_drafts WHERE id LIKE ? ORDER BY id ASC LIMIT ?",
                Params::Positional(vec![Value::Text(pattern), count(limit)]),
            )
            .await?;

        let mut ids = Vec::new();
        while let Some(row) = rows.next().await? {
            ids.push(column_text(&row, 0)?);
        }
        Ok(ids)
    }
}
