//! Content screening for contact submissions.
//!
//! Screening is off by default. [`screen_from_config`] switches to a
//! [`PatternScreen`] when `[contact] blocked_patterns` lists any regexes.

use std::sync::Arc;

use regex::Regex;

use crate::config::{ConfigError, ContactConfig};
use crate::storage::ContactSubmission;

/// Decides whether a contact submission should be refused.
pub trait ContentScreen: Send + Sync {
    fn is_malicious(&self, submission: &ContactSubmission) -> bool;
}

/// Accepts every submission.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAll;

impl ContentScreen for AllowAll {
    fn is_malicious(&self, _submission: &ContactSubmission) -> bool {
        false
    }
}

/// Rejects a submission when any pattern matches any field.
#[derive(Debug, Clone)]
pub struct PatternScreen {
    patterns: Vec<Regex>,
}

impl PatternScreen {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, regex::Error> {
        let patterns = patterns
            .iter()
            .map(|p| Regex::new(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }
}

impl ContentScreen for PatternScreen {
    fn is_malicious(&self, submission: &ContactSubmission) -> bool {
        submission
            .fields()
            .iter()
            .any(|field| self.patterns.iter().any(|re| re.is_match(field)))
    }
}

/// Build the configured screen.
pub fn screen_from_config(config: &ContactConfig) -> Result<Arc<dyn ContentScreen>, ConfigError> {
    if config.blocked_patterns.is_empty() {
        return Ok(Arc::new(AllowAll));
    }

    let screen = PatternScreen::new(&config.blocked_patterns)
        .map_err(|e| ConfigError::Validation(format!("Invalid blocked pattern: {}", e)))?;
    tracing::info!(
        patterns = config.blocked_patterns.len(),
        "Contact content screening enabled"
    );
    Ok(Arc::new(screen))
}
