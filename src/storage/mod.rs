//! SQLite storage for page views, contact submissions and error logs.

pub mod contact;
pub mod error_log;
pub mod page_views;
pub mod schema;

pub use contact::{ContactError, ContactSubmission};
pub use error_log::{log_error, spawn_error_write};
pub use page_views::{count_page_views, PageView};
pub use schema::run_migrations;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;

/// Initialize the SQLite connection pool and run migrations.
///
/// The parent directory and the database file are created if they don't exist.
/// WAL journal mode lets the stats reader run alongside page-view writers.
pub async fn init_pool(db_path: &str) -> Result<SqlitePool, crate::Error> {
    if let Some(dir) = Path::new(db_path).parent() {
        if !dir.as_os_str().is_empty() {
            tokio::fs::create_dir_all(dir).await?;
        }
    }

    let opts = SqliteConnectOptions::from_str(&format!("sqlite://{}", db_path))?
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(opts)
        .await?;

    // Verify connectivity before touching the schema
    sqlx::query("SELECT 1").execute(&pool).await?;

    run_migrations(&pool).await?;

    tracing::info!(path = %db_path, "Database initialized");
    Ok(pool)
}
