//! Best-effort operational error log.
//!
//! Messages go to the `error_logs` table when a pool is available and fall back
//! to `tracing` otherwise. Nothing is retried.

use sqlx::SqlitePool;

/// Record an operational error message.
pub async fn log_error(pool: Option<&SqlitePool>, message: &str) {
    let Some(pool) = pool else {
        tracing::error!(message = %message, "Operational error (no database)");
        return;
    };

    let result = sqlx::query("INSERT INTO error_logs (timestamp, message) VALUES (datetime('now'), ?)")
        .bind(message)
        .execute(pool)
        .await;

    if let Err(e) = result {
        tracing::error!(message = %message, error = %e, "Failed to write error log to database");
    }
}

/// Spawn a fire-and-forget error log write.
///
/// For call sites that cannot await, such as the panic handler.
pub fn spawn_error_write(pool: &SqlitePool, message: String) {
    let pool = pool.clone();
    tokio::spawn(async move {
        log_error(Some(&pool), &message).await;
    });
}

/// Total number of logged errors.
pub async fn count_errors(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM error_logs")
        .fetch_one(pool)
        .await
}
