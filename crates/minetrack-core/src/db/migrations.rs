//! Database migrations

use crate::error::Result;
use libsql::Connection;

/// Current schema version
const CURRENT_VERSION: i32 = 2;

const SCHEMA_VERSION_TABLE: &str = "CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY
)";

/// Version 1: directory replicas and their sync status.
///
/// `source_id` is deliberately not unique: the remote source can emit several
/// records with the same identifier and every one of them is kept.
const SCHEMA_V1: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS directory_national (
        row_id INTEGER PRIMARY KEY AUTOINCREMENT,
        source_id TEXT NOT NULL,
        contract_number TEXT,
        contractor TEXT,
        commodity TEXT,
        area_hectares REAL,
        municipality TEXT,
        province TEXT,
        region TEXT,
        status TEXT,
        classification TEXT,
        contract_type TEXT,
        synced_at INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_directory_national_source ON directory_national(source_id)",
    "CREATE INDEX IF NOT EXISTS idx_directory_national_province ON directory_national(province)",
    "CREATE TABLE IF NOT EXISTS directory_local (
        row_id INTEGER PRIMARY KEY AUTOINCREMENT,
        source_id TEXT NOT NULL,
        permit_number TEXT,
        permittee TEXT,
        commodity TEXT,
        area_hectares REAL,
        barangay TEXT,
        municipality TEXT,
        province TEXT,
        status TEXT,
        classification TEXT,
        permit_type TEXT,
        date_issued TEXT,
        synced_at INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_directory_local_source ON directory_local(source_id)",
    "CREATE INDEX IF NOT EXISTS idx_directory_local_province ON directory_local(province)",
    "CREATE TABLE IF NOT EXISTS directory_hotspots (
        row_id INTEGER PRIMARY KEY AUTOINCREMENT,
        source_id TEXT NOT NULL,
        complaint_number TEXT,
        subject_name TEXT,
        commodity TEXT,
        barangay TEXT,
        municipality TEXT,
        province TEXT,
        status TEXT,
        classification TEXT,
        incident_type TEXT,
        description TEXT,
        date_reported TEXT,
        latitude REAL,
        longitude REAL,
        synced_at INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_directory_hotspots_source ON directory_hotspots(source_id)",
    "CREATE INDEX IF NOT EXISTS idx_directory_hotspots_province ON directory_hotspots(province)",
    "CREATE TABLE IF NOT EXISTS sync_status (
        category TEXT PRIMARY KEY,
        total_records INTEGER NOT NULL DEFAULT 0,
        downloaded_records INTEGER NOT NULL DEFAULT 0,
        progress_percent INTEGER NOT NULL DEFAULT 0,
        is_syncing INTEGER NOT NULL DEFAULT 0,
        last_sync_at INTEGER,
        last_error TEXT
    )",
];

/// Version 2: offline report drafts.
const SCHEMA_V2: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS report_drafts (
        id TEXT PRIMARY KEY,
        reporter_id TEXT NOT NULL,
        report_type TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'draft',
        gps_location TEXT,
        form_data TEXT NOT NULL,
        attachments TEXT NOT NULL DEFAULT '[]',
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL,
        needs_sync INTEGER NOT NULL DEFAULT 1,
        is_synced INTEGER NOT NULL DEFAULT 0
    )",
    "CREATE INDEX IF NOT EXISTS idx_report_drafts_reporter ON report_drafts(reporter_id, updated_at DESC)",
    "CREATE INDEX IF NOT EXISTS idx_report_drafts_dirty ON report_drafts(needs_sync)",
];

/// Run all pending migrations
pub async fn run(conn: &Connection) -> Result<()> {
    let version = get_version(conn).await?;

    if version < 1 {
        apply(conn, 1, SCHEMA_V1).await?;
    }
    if version < 2 {
        apply(conn, 2, SCHEMA_V2).await?;
    }

    Ok(())
}

/// Re-run every idempotent DDL statement so that tables dropped or lost
/// after open are recreated. Existing rows are left alone.
pub async fn reprovision(conn: &Connection) -> Result<()> {
    conn.execute(SCHEMA_VERSION_TABLE, ()).await?;
    for stmt in SCHEMA_V1.iter().chain(SCHEMA_V2) {
        conn.execute(stmt, ()).await?;
    }
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?)",
        [i64::from(CURRENT_VERSION)],
    )
    .await?;
    tracing::warn!("Re-provisioned local schema");
    Ok(())
}

/// Get the current schema version
async fn get_version(conn: &Connection) -> Result<i32> {
    // Check if schema_version table exists
    let mut rows = conn
        .query(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
            (),
        )
        .await?;

    let exists: bool = if let Some(row) = rows.next().await? {
        row.get::<i32>(0)? != 0
    } else {
        false
    };

    if !exists {
        return Ok(0);
    }

    let mut rows = conn
        .query("SELECT COALESCE(MAX(version), 0) FROM schema_version", ())
        .await?;

    let version: i32 = if let Some(row) = rows.next().await? {
        row.get(0)?
    } else {
        0
    };

    Ok(version)
}

/// Apply one migration's statements and record its version atomically.
async fn apply(conn: &Connection, version: i32, statements: &[&str]) -> Result<()> {
    conn.execute("BEGIN TRANSACTION", ()).await?;

    let outcome = async {
        conn.execute(SCHEMA_VERSION_TABLE, ()).await?;
        for stmt in statements {
            conn.execute(stmt, ()).await?;
        }
        conn.execute("INSERT INTO schema_version (version) VALUES (?)", [i64::from(version)])
            .await?;
        conn.execute("COMMIT", ()).await?;
        Ok::<_, libsql::Error>(())
    }
    .await;

    if let Err(e) = outcome {
        conn.execute("ROLLBACK", ()).await.ok();
        return Err(e.into());
    }

    tracing::info!("Migrated database to version {version}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use libsql::Builder;

    async fn setup() -> Connection {
        let db = Builder::new_local(":memory:").build().await.unwrap();
        db.connect().unwrap()
    }

    async fn table_exists(conn: &Connection, name: &str) -> bool {
        let mut rows = conn
            .query(
                "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?)",
                [name],
            )
            .await
            .unwrap();
        rows.next()
            .await
            .unwrap()
            .is_some_and(|row| row.get::<i32>(0).unwrap() != 0)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_migrations() {
        let conn = setup().await;
        run(&conn).await.unwrap();

        let version = get_version(&conn).await.unwrap();
        assert_eq!(version, CURRENT_VERSION);
        for table in [
            "directory_national",
            "directory_local",
            "directory_hotspots",
            "sync_status",
            "report_drafts",
        ] {
            assert!(table_exists(&conn, table).await, "missing {table}");
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_migrations_idempotent() {
        let conn = setup().await;
        run(&conn).await.unwrap();
        run(&conn).await.unwrap(); // Should not fail

        let version = get_version(&conn).await.unwrap();
        assert_eq!(version, CURRENT_VERSION);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_reprovision_recreates_dropped_table_and_keeps_rows() {
        let conn = setup().await;
        run(&conn).await.unwrap();
        conn.execute(
            "INSERT INTO sync_status (category, total_records) VALUES ('local', 7)",
            (),
        )
        .await
        .unwrap();
        conn.execute("DROP TABLE report_drafts", ()).await.unwrap();

        reprovision(&conn).await.unwrap();

        assert!(table_exists(&conn, "report_drafts").await);
        let mut rows = conn
            .query("SELECT total_records FROM sync_status WHERE category = 'local'", ())
            .await
            .unwrap();
        let row = rows.next().await.unwrap().unwrap();
        assert_eq!(row.get::<i64>(0).unwrap(), 7);
    }
}
