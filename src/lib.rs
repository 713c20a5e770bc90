//! folio - personal site backend
//!
//! This library provides the site's HTTP surface, its SQLite-backed
//! analytics and contact storage, and the static blog post builder.

pub mod config;
pub mod error;
pub mod posts;
pub mod screen;
pub mod site;
pub mod storage;

pub use config::Config;
pub use error::{Error, Result};
