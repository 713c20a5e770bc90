//! HTTP request handlers.

use std::net::SocketAddr;

use axum::{
    body::Bytes,
    extract::{
        rejection::{BytesRejection, FailedToBufferBody},
        ConnectInfo, State,
    },
    http::{header, HeaderMap, Method, Uri},
    response::{IntoResponse, Response},
    Json,
};

use super::request::{client_ip, header_str, is_new_session, set_session_cookie};
use super::server::AppState;
use crate::error::Error;
use crate::storage::{self, ContactError, ContactSubmission, PageView};

/// Upper bound on a buffered contact form body.
pub const MAX_CONTACT_BODY_BYTES: usize = 64 * 1024;

/// Path recorded for a page view. The site root is stored as `home`.
fn recorded_path(uri: &Uri) -> String {
    match uri.path() {
        "/" => "home".to_string(),
        path => path.to_string(),
    }
}

/// Shorten a commit identifier for display.
pub fn short_commit(commit: &str) -> String {
    if commit.is_empty() {
        "unknown".to_string()
    } else {
        commit.chars().take(7).collect()
    }
}

/// Handle GET / and every unmatched path - serve the single-page app.
///
/// The first request of a browser session records a page view and sets the
/// session cookie.
pub async fn webapp(
    State(state): State<AppState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let new_session = is_new_session(&headers);

    if new_session {
        let view = PageView {
            path: recorded_path(&uri),
            user_agent: header_str(&headers, header::USER_AGENT.as_str())
                .unwrap_or_default()
                .to_string(),
            referrer: header_str(&headers, header::REFERER.as_str())
                .unwrap_or_default()
                .to_string(),
            ip_address: client_ip(&headers, peer.map(|ConnectInfo(addr)| addr)),
            accept_language: header_str(&headers, header::ACCEPT_LANGUAGE.as_str())
                .unwrap_or_default()
                .to_string(),
            request_method: method.to_string(),
        };

        if let Err(e) = view.insert(&state.db).await {
            tracing::warn!(path = %view.path, error = %e, "Failed to record page view");
            storage::log_error(
                Some(&state.db),
                &format!("Failed to increment page view: {}", e),
            )
            .await;
        }
    }

    let index_html = &state.config.server.index_html;
    let mut response = match tokio::fs::read(index_html).await {
        Ok(html) => ([(header::CONTENT_TYPE, "text/html; charset=utf-8")], html).into_response(),
        Err(e) => {
            tracing::error!(path = %index_html, error = %e, "Failed to read index.html");
            storage::log_error(
                Some(&state.db),
                &format!("Error reading {}: {}", index_html, e),
            )
            .await;
            Error::Internal("Internal Server Error".to_string()).into_response()
        }
    };

    if new_session {
        set_session_cookie(response.headers_mut());
    }

    response
}

/// Handle GET /version.txt
pub async fn version(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        short_commit(&state.config.build.commit),
    )
}

/// Handle GET /api/health
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "message": "OK" }))
}

/// Handle POST /api/contact
///
/// Bodies over `MAX_CONTACT_BODY_BYTES`, malformed JSON, oversized fields and
/// screened content are 400s and store nothing. Other body read failures are 500s.
pub async fn contact(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<serde_json::Value>, Error> {
    let bytes = body.map_err(|rejection| match rejection {
        BytesRejection::FailedToBufferBody(FailedToBufferBody::LengthLimitError(e)) => {
            tracing::info!(error = %e, "Rejected oversized contact body");
            Error::BadRequest(format!(
                "Contact payload exceeds {} bytes",
                MAX_CONTACT_BODY_BYTES
            ))
        }
        other => {
            tracing::error!(error = %other, "Failed to read contact request body");
            Error::Internal("Failed to read request body".to_string())
        }
    })?;

    let submission: ContactSubmission = serde_json::from_slice(&bytes).map_err(|e| {
        tracing::info!(error = %e, "Rejected malformed contact payload");
        Error::BadRequest(format!("Malformed contact payload: {}", e))
    })?;

    submission.validate().map_err(|e| {
        tracing::info!(reason = %e, "Rejected oversized contact submission");
        e
    })?;

    if state.screen.is_malicious(&submission) {
        tracing::info!("Contact submission rejected by content screen");
        return Err(ContactError::Screened.into());
    }

    if let Err(e) = submission.insert(&state.db).await {
        storage::log_error(
            Some(&state.db),
            &format!("Failed to store contact submission: {}", e),
        )
        .await;
        return Err(Error::Database(e));
    }

    tracing::info!(subject = %submission.subject, "Collected contact form submission");

    Ok(Json(serde_json::json!({
        "message": "Collected contact form submission"
    })))
}
