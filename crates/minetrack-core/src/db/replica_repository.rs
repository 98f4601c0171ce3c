//! Directory replica repository

use std::collections::HashSet;

use libsql::params::Params;
use libsql::{Connection, Row, Value};
use serde::{Deserialize, Serialize};

use super::values::{
    column_i64, column_opt_real, column_opt_text, column_text, count, opt_real, opt_text, text,
};
use crate::error::{Error, Result};
use crate::models::{
    Category, DirectoryRecord, HotspotIncident, LocalPermit, NationalPermit, StoredRecord,
};
use crate::retry::{retry_async, RetryPolicy};
use crate::util::unix_millis_now;

/// Filterable fields shared by every category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterField {
    Province,
    Status,
    Classification,
    Type,
}

impl FilterField {
    pub const ALL: [Self; 4] = [
        Self::Province,
        Self::Status,
        Self::Classification,
        Self::Type,
    ];

    /// Column holding this field in the category's table.
    pub const fn column(self, category: Category) -> &'static str {
        match (self, category) {
            (Self::Province, _) => "province",
            (Self::Status, _) => "status",
            (Self::Classification, _) => "classification",
            (Self::Type, Category::National) => "contract_type",
            (Self::Type, Category::Local) => "permit_type",
            (Self::Type, Category::Hotspots) => "incident_type",
        }
    }
}

/// Conjunction of optional predicates over one category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryFilter {
    /// Case-insensitive substring over the category's text fields
    pub search: Option<String>,
    pub province: Option<String>,
    pub status: Option<String>,
    pub classification: Option<String>,
    pub record_type: Option<String>,
}

impl DirectoryFilter {
    fn exact_matches(&self) -> [(FilterField, Option<&str>); 4] {
        [
            (FilterField::Province, self.province.as_deref()),
            (FilterField::Status, self.status.as_deref()),
            (FilterField::Classification, self.classification.as_deref()),
            (FilterField::Type, self.record_type.as_deref()),
        ]
    }
}

/// Offset/limit paging. `limit: None` returns every matching row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Paging {
    pub offset: usize,
    pub limit: Option<usize>,
}

/// Rows matching a query plus paging hints.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    pub records: Vec<StoredRecord>,
    pub total_count: usize,
    pub has_next: bool,
    pub has_prev: bool,
}

/// Aggregate result of a bulk replace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceOutcome {
    pub inserted_count: usize,
    pub skipped_count: usize,
    /// Records whose `source_id` was already seen earlier in the same batch
    pub duplicate_source_id_count: usize,
    /// First record-level error, for operator visibility
    pub first_error: Option<String>,
}

impl ReplaceOutcome {
    pub const fn received_count(&self) -> usize {
        self.inserted_count + self.skipped_count
    }
}

/// Trait for directory replica storage operations (async)
#[allow(async_fn_in_trait)]
pub trait ReplicaRepository {
    /// Atomically delete every row of a category and insert the given remote
    /// records. Record-level failures are counted, not raised.
    async fn replace(
        &self,
        category: Category,
        records: &[serde_json::Value],
    ) -> Result<ReplaceOutcome>;

    /// Filter and page one category, newest sync batch first.
    async fn query(
        &self,
        category: Category,
        filter: &DirectoryFilter,
        paging: Paging,
    ) -> Result<QueryResult>;

    /// Number of rows stored for a category
    async fn count(&self, category: Category) -> Result<usize>;

    /// Distinct non-empty values of a filter field, sorted
    async fn distinct_values(&self, category: Category, field: FilterField)
        -> Result<Vec<String>>;
}

/// libSQL implementation of `ReplicaRepository`
pub struct LibSqlReplicaRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlReplicaRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    async fn insert(&self, record: &DirectoryRecord, synced_at: i64) -> Result<()> {
        let category = record.category();
        let columns = data_columns(category);
        let placeholders = vec!["?"; columns.len() + 1].join(", ");
        let sql = format!(
            "INSERT INTO {} ({}, synced_at) VALUES ({placeholders})",
            category.table_name(),
            columns.join(", "),
        );

        let mut params = record_values(record);
        params.push(Value::Integer(synced_at));
        self.conn.execute(&sql, Params::Positional(params)).await?;
        Ok(())
    }

    async fn replace_rows(
        &self,
        category: Category,
        records: &[DirectoryRecord],
        outcome: &mut ReplaceOutcome,
    ) -> Result<()> {
        let synced_at = unix_millis_now();
        self.conn
            .execute(&format!("DELETE FROM {}", category.table_name()), ())
            .await?;

        for record in records {
            let inserted = retry_async(
                RetryPolicy::RECORD_WRITE,
                Error::is_storage_failure,
                move |_| self.insert(record, synced_at),
            )
            .await;

            match inserted {
                Ok(()) => outcome.inserted_count += 1,
                Err(error) if !error.is_record_rejection() => {
                    tracing::error!(
                        %category,
                        source_id = record.source_id(),
                        "Aborting replace after storage failure: {error}"
                    );
                    return Err(error);
                }
                Err(error) => {
                    tracing::warn!(
                        %category,
                        source_id = record.source_id(),
                        "Skipping record after failed inserts: {error}"
                    );
                    outcome.skipped_count += 1;
                    outcome.first_error.get_or_insert_with(|| error.to_string());
                }
            }
        }

        Ok(())
    }
}

impl ReplicaRepository for LibSqlReplicaRepository<'_> {
    async fn replace(
        &self,
        category: Category,
        records: &[serde_json::Value],
    ) -> Result<ReplaceOutcome> {
        let mut outcome = ReplaceOutcome::default();
        let mut decoded = Vec::with_capacity(records.len());

        for value in records {
            match DirectoryRecord::from_wire(category, value) {
                Ok(record) => decoded.push(record),
                Err(error) => {
                    tracing::warn!(%category, "Skipping malformed record: {error}");
                    outcome.skipped_count += 1;
                    outcome.first_error.get_or_insert_with(|| error.to_string());
                }
            }
        }

        let distinct = decoded
            .iter()
            .map(DirectoryRecord::source_id)
            .collect::<HashSet<_>>()
            .len();
        outcome.duplicate_source_id_count = decoded.len() - distinct;

        self.conn.execute("BEGIN IMMEDIATE", ()).await?;
        let written = match self.replace_rows(category, &decoded, &mut outcome).await {
            Ok(()) => self.conn.execute("COMMIT", ()).await.map_err(Error::from),
            Err(error) => Err(error),
        };
        if let Err(error) = written {
            self.conn.execute("ROLLBACK", ()).await.ok();
            return Err(error);
        }

        tracing::info!(
            %category,
            inserted = outcome.inserted_count,
            skipped = outcome.skipped_count,
            duplicates = outcome.duplicate_source_id_count,
            "Replaced directory replica"
        );
        Ok(outcome)
    }

    async fn query(
        &self,
        category: Category,
        filter: &DirectoryFilter,
        paging: Paging,
    ) -> Result<QueryResult> {
        let (where_clause, mut params) = build_where(category, filter);
        let table = category.table_name();

        let mut rows = self
            .conn
            .query(
                &format!("SELECT COUNT(*) FROM {table}{where_clause}"),
                Params::Positional(params.clone()),
            )
            .await?;
        let total_count = match rows.next().await? {
            Some(row) => usize::try_from(column_i64(&row, 0)?).unwrap_or_default(),
            None => 0,
        };

        let sql = format!(
            "SELECT row_id, synced_at, {} FROM {table}{where_clause}
             ORDER BY synced_at DESC, row_id ASC
             LIMIT ? OFFSET ?",
            data_columns(category).join(", "),
        );
        params.push(paging.limit.map_or(Value::Integer(-1), count));
        params.push(count(paging.offset));

        let mut rows = self.conn.query(&sql, Params::Positional(params)).await?;
        let mut records = Vec::new();
        while let Some(row) = rows.next().await? {
            records.push(parse_row(category, &row)?);
        }

        Ok(QueryResult {
            has_next: paging.offset.saturating_add(records.len()) < total_count,
            has_prev: paging.offset > 0,
            total_count,
            records,
        })
    }

    async fn count(&self, category: Category) -> Result<usize> {
        let mut rows = self
            .conn
            .query(&format!("SELECT COUNT(*) FROM {}", category.table_name()), ())
            .await?;
        match rows.next().await? {
            Some(row) => Ok(usize::try_from(column_i64(&row, 0)?).unwrap_or_default()),
            None => Ok(0),
        }
    }

    async fn distinct_values(
        &self,
        category: Category,
        field: FilterField,
    ) -> Result<Vec<String>> {
        let column = field.column(category);
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT DISTINCT {column} FROM {} WHERE TRIM(COALESCE({column}, '')) <> ''
                     ORDER BY {column} COLLATE NOCASE ASC",
                    category.table_name()
                ),
                (),
            )
            .await?;

        let mut values = Vec::new();
        while let Some(row) = rows.next().await? {
            values.push(column_text(&row, 0)?);
        }
        Ok(values)
    }
}

/// Stored columns per category, excluding `row_id` and `synced_at`.
const fn data_columns(category: Category) -> &'static [&'static str] {
    match category {
        Category::National => &[
            "source_id",
            "contract_number",
            "contractor",
            "commodity",
            "area_hectares",
            "municipality",
            "province",
            "region",
            "status",
            "classification",
            "contract_type",
        ],
        Category::Local => &[
            "source_id",
            "permit_number",
            "permittee",
            "commodity",
            "area_hectares",
            "barangay",
            "municipality",
            "province",
            "status",
            "classification",
            "permit_type",
            "date_issued",
        ],
        Category::Hotspots => &[
            "source_id",
            "complaint_number",
            "subject_name",
            "commodity",
            "barangay",
            "municipality",
            "province",
            "status",
            "classification",
            "incident_type",
            "description",
            "date_reported",
            "latitude",
            "longitude",
        ],
    }
}

/// Text columns covered by free-text search.
const fn search_columns(category: Category) -> &'static [&'static str] {
    match category {
        Category::National => &[
            "contract_number",
            "contractor",
            "commodity",
            "municipality",
            "province",
        ],
        Category::Local => &[
            "permit_number",
            "permittee",
            "commodity",
            "barangay",
            "municipality",
            "province",
        ],
        Category::Hotspots => &[
            "complaint_number",
            "subject_name",
            "commodity",
            "barangay",
            "municipality",
            "province",
            "description",
        ],
    }
}

fn record_values(record: &DirectoryRecord) -> Vec<Value> {
    match record {
        DirectoryRecord::National(permit) => vec![
            text(&permit.source_id),
            opt_text(permit.contract_number.as_deref()),
            opt_text(permit.contractor.as_deref()),
            opt_text(permit.commodity.as_deref()),
            opt_real(permit.area_hectares),
            opt_text(permit.municipality.as_deref()),
            opt_text(permit.province.as_deref()),
            opt_text(permit.region.as_deref()),
            opt_text(permit.status.as_deref()),
            opt_text(permit.classification.as_deref()),
            opt_text(permit.contract_type.as_deref()),
        ],
        DirectoryRecord::Local(permit) => vec![
            text(&permit.source_id),
            opt_text(permit.permit_number.as_deref()),
            opt_text(permit.permittee.as_deref()),
            opt_text(permit.commodity.as_deref()),
            opt_real(permit.area_hectares),
            opt_text(permit.barangay.as_deref()),
            opt_text(permit.municipality.as_deref()),
            opt_text(permit.province.as_deref()),
            opt_text(permit.status.as_deref()),
            opt_text(permit.classification.as_deref()),
            opt_text(permit.permit_type.as_deref()),
            opt_text(permit.date_issued.as_deref()),
        ],
        DirectoryRecord::Hotspot(incident) => vec![
            text(&incident.source_id),
            opt_text(incident.complaint_number.as_deref()),
            opt_text(incident.subject_name.as_deref()),
            opt_text(incident.commodity.as_deref()),
            opt_text(incident.barangay.as_deref()),
            opt_text(incident.municipality.as_deref()),
            opt_text(incident.province.as_deref()),
            opt_text(incident.status.as_deref()),
            opt_text(incident.classification.as_deref()),
            opt_text(incident.incident_type.as_deref()),
            opt_text(incident.description.as_deref()),
            opt_text(incident.date_reported.as_deref()),
            opt_real(incident.latitude),
            opt_real(incident.longitude),
        ],
    }
}

/// Parse a stored row selected as `row_id, synced_at, <data columns>`
fn parse_row(category: Category, row: &Row) -> Result<StoredRecord> {
    let record = match category {
        Category::National => DirectoryRecord::National(NationalPermit {
            source_id: column_text(row, 2)?,
            contract_number: column_opt_text(row, 3)?,
            contractor: column_opt_text(row, 4)?,
            commodity: column_opt_text(row, 5)?,
            area_hectares: column_opt_real(row, 6)?,
            municipality: column_opt_text(row, 7)?,
            province: column_opt_text(row, 8)?,
            region: column_opt_text(row, 9)?,
            status: column_opt_text(row, 10)?,
            classification: column_opt_text(row, 11)?,
            contract_type: column_opt_text(row, 12)?,
        }),
        Category::Local => DirectoryRecord::Local(LocalPermit {
            source_id: column_text(row, 2)?,
            permit_number: column_opt_text(row, 3)?,
            permittee: column_opt_text(row, 4)?,
            commodity: column_opt_text(row, 5)?,
            area_hectares: column_opt_real(row, 6)?,
            barangay: column_opt_text(row, 7)?,
            municipality: column_opt_text(row, 8)?,
            province: column_opt_text(row, 9)?,
            status: column_opt_text(row, 10)?,
            classification: column_opt_text(row, 11)?,
            permit_type: column_opt_text(row, 12)?,
            date_issued: column_opt_text(row, 13)?,
        }),
        Category::Hotspots => DirectoryRecord::Hotspot(HotspotIncident {
            source_id: column_text(row, 2)?,
            complaint_number: column_opt_text(row, 3)?,
            subject_name: column_opt_text(row, 4)?,
            commodity: column_opt_text(row, 5)?,
            barangay: column_opt_text(row, 6)?,
            municipality: column_opt_text(row, 7)?,
            province: column_opt_text(row, 8)?,
            status: column_opt_text(row, 9)?,
            classification: column_opt_text(row, 10)?,
            incident_type: column_opt_text(row, 11)?,
            description: column_opt_text(row, 12)?,
            date_reported: column_opt_text(row, 13)?,
            latitude: column_opt_real(row, 14)?,
            longitude: column_opt_real(row, 15)?,
        }),
    };

    Ok(StoredRecord {
        row_id: column_i64(row, 0)?,
        synced_at: column_i64(row, 1)?,
        record,
    })
}

fn build_where(category: Category, filter: &DirectoryFilter) -> (String, Vec<Value>) {
    let mut clauses = Vec::new();
    let mut params = Vec::new();

    if let Some(term) = filter.search.as_deref() {
        let pattern = format!("%{}%", escape_like(term));
        let columns = search_columns(category);
        let any_column = columns
            .iter()
            .map(|column| format!("{column} LIKE ? ESCAPE '\\'"))
            .collect::<Vec<_>>()
            .join(" OR ");
        clauses.push(format!("({any_column})"));
        params.extend(columns.iter().map(|_| Value::Text(pattern.clone())));
    }

    for (field, value) in filter.exact_matches() {
        if let Some(value) = value {
            clauses.push(format!("{} = ?", field.column(category)));
            params.push(text(value));
        }
    }

    if clauses.is_empty() {
        (String::new(), params)
    } else {
        (format!(" WHERE {}", clauses.join(" AND ")), params)
    }
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
