//! Idempotent schema setup applied at every startup.

use sqlx::SqlitePool;

const CREATE_TABLES: [&str; 3] = [
    "CREATE TABLE IF NOT EXISTS page_views (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        timestamp DATETIME NOT NULL,
        path TEXT NOT NULL,
        user_agent TEXT,
        referrer TEXT,
        ip_address TEXT,
        accept_language TEXT,
        request_method TEXT
    )",
    "CREATE TABLE IF NOT EXISTS contact_form_submissions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        timestamp DATETIME NOT NULL,
        name TEXT NOT NULL,
        email TEXT NOT NULL,
        subject TEXT,
        message TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS error_logs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        timestamp DATETIME NOT NULL,
        message TEXT NOT NULL
    )",
];

/// Columns added to `page_views` after the first schema shipped.
const PAGE_VIEW_COLUMNS: [&str; 3] = [
    "ALTER TABLE page_views ADD COLUMN ip_address TEXT",
    "ALTER TABLE page_views ADD COLUMN accept_language TEXT",
    "ALTER TABLE page_views ADD COLUMN request_method TEXT",
];

const CREATE_INDEXES: [&str; 1] =
    ["CREATE INDEX IF NOT EXISTS idx_page_views_timestamp ON page_views(timestamp)"];

/// Create tables, add late columns and build indexes.
///
/// Safe to run repeatedly. Adding a column that already exists is logged and
/// ignored; every other failure is returned.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for sql in CREATE_TABLES {
        sqlx::query(sql).execute(pool).await?;
    }

    for sql in PAGE_VIEW_COLUMNS {
        match sqlx::query(sql).execute(pool).await {
            Ok(_) => tracing::info!(statement = %sql, "Applied column migration"),
            Err(e) if is_duplicate_column(&e) => {
                tracing::debug!(statement = %sql, error = %e, "Column already exists");
            }
            Err(e) => return Err(e),
        }
    }

    for sql in CREATE_INDEXES {
        sqlx::query(sql).execute(pool).await?;
    }

    Ok(())
}

fn is_duplicate_column(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.message().contains("duplicate column name"),
        _ => false,
    }
}
