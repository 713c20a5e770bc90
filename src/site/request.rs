//! Request inspection helpers: client address and the session cookie.

use std::net::SocketAddr;

use axum::http::{header, HeaderMap, HeaderValue};
use cookie::{time::Duration, Cookie};

/// Cookie marking a browser session whose view was already counted.
pub const SESSION_COOKIE: &str = "session_view";

/// Lifetime of the session cookie.
pub const SESSION_MAX_AGE_SECS: i64 = 300;

pub const X_FORWARDED_FOR: &str = "x-forwarded-for";
pub const X_REAL_IP: &str = "x-real-ip";

/// Resolve the client address for analytics.
///
/// Order: first `X-Forwarded-For` entry, then `X-Real-IP`, then the peer IP.
/// Proxy headers are trusted unconditionally, which is only correct when the
/// server sits behind a reverse proxy that overwrites them.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    if let Some(forwarded) = header_str(headers, X_FORWARDED_FOR) {
        let first = forwarded.split(',').next().unwrap_or_default().trim();
        if !first.is_empty() {
            return first.to_string();
        }
    }

    if let Some(real_ip) = header_str(headers, X_REAL_IP) {
        let real_ip = real_ip.trim();
        if !real_ip.is_empty() {
            return real_ip.to_string();
        }
    }

    peer.map(|addr| addr.ip().to_string()).unwrap_or_default()
}

/// Value of a request header as a string, if present and valid ASCII.
pub fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Look up a cookie by name across all `Cookie` headers.
///
/// Pairs that fail to parse are skipped.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| Cookie::split_parse(v))
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == name)
        .map(|cookie| cookie.value_trimmed().to_string())
}

/// A request starts a new session when it has no non-empty session cookie.
pub fn is_new_session(headers: &HeaderMap) -> bool {
    cookie_value(headers, SESSION_COOKIE).map_or(true, |value| value.is_empty())
}

/// Cookie marking the session as counted.
pub fn session_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, "1"))
        .path("/")
        .http_only(true)
        .max_age(Duration::seconds(SESSION_MAX_AGE_SECS))
        .build()
}

/// Append the session cookie to a response's headers.
pub fn set_session_cookie(headers: &mut HeaderMap) {
    match HeaderValue::from_str(&session_cookie().to_string()) {
        Ok(value) => {
            headers.append(header::SET_COOKIE, value);
        }
        Err(e) => tracing::warn!(error = %e, "Session cookie is not a valid header value"),
    }
}
