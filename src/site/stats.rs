//! Page-view stats endpoint.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use super::server::AppState;
use crate::storage;

/// Body of GET /api/stats.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub page_views: i64,
}

/// Handle GET /api/stats -- total page views.
///
/// A failed count is logged and answered with an empty 200; the counter is
/// cosmetic and callers treat a missing body as "no data".
pub async fn stats_handler(State(state): State<AppState>) -> Response {
    match storage::count_page_views(&state.db).await {
        Ok(page_views) => Json(StatsResponse { page_views }).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to count page views");
            storage::log_error(
                Some(&state.db),
                &format!("Error getting page view count: {}", e),
            )
            .await;
            StatusCode::OK.into_response()
        }
    }
}
