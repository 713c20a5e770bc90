//! Page-view recording and counting.

use sqlx::SqlitePool;

/// A page view ready for database insertion.
///
/// The timestamp is filled in by SQLite at insert time.
#[derive(Debug, Clone, Default)]
pub struct PageView {
    pub path: String,
    pub user_agent: String,
    pub referrer: String,
    pub ip_address: String,
    pub accept_language: String,
    pub request_method: String,
}

impl PageView {
    /// Insert this view into the database. Errors are returned, not retried.
    pub async fn insert(&self, pool: &SqlitePool) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO page_views (
                timestamp, path, user_agent, referrer,
                ip_address, accept_language, request_method
            ) VALUES (datetime('now'), ?, ?, ?, ?, ?, ?)",
        )
        .bind(&self.path)
        .bind(&self.user_agent)
        .bind(&self.referrer)
        .bind(&self.ip_address)
        .bind(&self.accept_language)
        .bind(&self.request_method)
        .execute(pool)
        .await?;
        Ok(())
    }
}

/// Total number of recorded page views.
pub async fn count_page_views(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM page_views")
        .fetch_one(pool)
        .await
}
