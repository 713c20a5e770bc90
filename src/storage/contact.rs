//! Contact form submissions: validation and insertion.

use serde::Deserialize;
use sqlx::SqlitePool;

pub const MAX_NAME_CHARS: usize = 100;
pub const MAX_EMAIL_CHARS: usize = 100;
pub const MAX_SUBJECT_CHARS: usize = 200;
pub const MAX_MESSAGE_CHARS: usize = 2000;

/// A contact form payload as posted by the site.
///
/// Missing fields decode as empty strings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ContactSubmission {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
}

/// Reasons a submission is rejected before it reaches the database.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ContactError {
    #[error("Field '{field}' exceeds {max} characters")]
    FieldTooLong { field: &'static str, max: usize },

    #[error("Submission rejected by content screen")]
    Screened,
}

impl ContactSubmission {
    /// Check every field against its length bound.
    ///
    /// Lengths are counted in characters. The first offending field is reported.
    pub fn validate(&self) -> Result<(), ContactError> {
        let checks: [(&'static str, &str, usize); 4] = [
            ("name", &self.name, MAX_NAME_CHARS),
            ("email", &self.email, MAX_EMAIL_CHARS),
            ("subject", &self.subject, MAX_SUBJECT_CHARS),
            ("message", &self.message, MAX_MESSAGE_CHARS),
        ];

        for (field, value, max) in checks {
            if value.chars().count() > max {
                return Err(ContactError::FieldTooLong { field, max });
            }
        }

        Ok(())
    }

    /// All fields, for screening.
    pub fn fields(&self) -> [&str; 4] {
        [&self.name, &self.email, &self.subject, &self.message]
    }

    /// Insert this submission into the database.
    pub async fn insert(&self, pool: &SqlitePool) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO contact_form_submissions (timestamp, name, email, subject, message) \
             VALUES (datetime('now'), ?, ?, ?, ?)",
        )
        .bind(&self.name)
        .bind(&self.email)
        .bind(&self.subject)
        .bind(&self.message)
        .execute(pool)
        .await?;
        Ok(())
    }
}

/// Total number of stored contact submissions.
pub async fn count_submissions(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM contact_form_submissions")
        .fetch_one(pool)
        .await
}
