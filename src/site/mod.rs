//! Site HTTP surface.
//!
//! Serves the single-page app, records page views, accepts contact form
//! submissions and reports health and version.

mod handlers;
pub mod request;
mod server;
pub mod stats;

pub use handlers::{short_commit, MAX_CONTACT_BODY_BYTES};
pub use server::{create_router, run_server, AppState};
