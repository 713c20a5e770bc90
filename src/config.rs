//! Configuration parsing and validation for folio.

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;

/// Root configuration structure.
///
/// Every section is optional; a missing config file is equivalent to an empty one.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub build: BuildConfig,
    #[serde(default)]
    pub contact: ContactConfig,
    #[serde(default)]
    pub posts: PostsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address to listen on (e.g., "0.0.0.0:8090")
    #[serde(default = "default_listen")]
    pub listen: String,
    /// Single-page app document served for `/` and unmatched paths
    #[serde(default = "default_index_html")]
    pub index_html: String,
    /// Directory mounted at `/assets`
    #[serde(default = "default_assets_dir")]
    pub assets_dir: String,
}

fn default_listen() -> String {
    "0.0.0.0:8090".to_string()
}

fn default_index_html() -> String {
    "./dist/index.html".to_string()
}

fn default_assets_dir() -> String {
    "web/dist/assets".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            index_html: default_index_html(),
            assets_dir: default_assets_dir(),
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "./data/app.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Build metadata reported by `/version.txt`.
#[derive(Debug, Clone, Deserialize)]
pub struct BuildConfig {
    /// Commit identifier. Defaults to `GIT_COMMIT` captured at compile time.
    #[serde(default = "default_commit")]
    pub commit: String,
}

fn default_commit() -> String {
    option_env!("GIT_COMMIT").unwrap_or_default().to_string()
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            commit: default_commit(),
        }
    }
}

/// Contact form configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactConfig {
    /// Regexes that mark a submission as unwanted. Empty disables screening.
    #[serde(default)]
    pub blocked_patterns: Vec<String>,
}

/// Markdown post builder configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PostsConfig {
    #[serde(default = "default_posts_source")]
    pub source_dir: String,
    #[serde(default = "default_posts_output")]
    pub output_dir: String,
}

fn default_posts_source() -> String {
    "src/markdown/blog".to_string()
}

fn default_posts_output() -> String {
    "src/html/blog".to_string()
}

impl Default for PostsConfig {
    fn default() -> Self {
        Self {
            source_dir: default_posts_source(),
            output_dir: default_posts_output(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file, expanding `${VAR}` references
    /// from the process environment.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            source: e,
        })?;

        Self::parse_str(&content)
    }

    /// Load from `path` when given, otherwise fall back to defaults.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::from_file(p),
            None => {
                let config = Config::default();
                config.validate()?;
                Ok(config)
            }
        }
    }

    /// Parse configuration from a TOML string.
    pub fn parse_str(content: &str) -> Result<Self, ConfigError> {
        Self::parse_str_with(content, |name| std::env::var(name).ok())
    }

    /// Parse configuration using a custom variable lookup.
    ///
    /// The closure keeps tests away from global env state.
    pub fn parse_str_with<F>(content: &str, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config: Config = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.expand_with(&lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Expand `${VAR}` references in every path-like and build field.
    fn expand_with<F>(&mut self, lookup: &F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let fields: [(&str, &mut String); 6] = [
            ("build.commit", &mut self.build.commit),
            ("database.path", &mut self.database.path),
            ("server.index_html", &mut self.server.index_html),
            ("server.assets_dir", &mut self.server.assets_dir),
            ("posts.source_dir", &mut self.posts.source_dir),
            ("posts.output_dir", &mut self.posts.output_dir),
        ];

        for (name, value) in fields {
            *value = expand_env_vars_with(value.as_str(), name, lookup)?;
        }

        Ok(())
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.listen.parse::<SocketAddr>().map_err(|e| {
            ConfigError::Validation(format!(
                "Invalid listen address '{}': {}",
                self.server.listen, e
            ))
        })?;

        if self.database.path.trim().is_empty() {
            return Err(ConfigError::Validation(
                "database.path must not be empty".to_string(),
            ));
        }

        for pattern in &self.contact.blocked_patterns {
            regex::Regex::new(pattern).map_err(|e| {
                ConfigError::Validation(format!("Invalid blocked pattern '{}': {}", pattern, e))
            })?;
        }

        if self.build.commit.is_empty() {
            tracing::debug!("No build commit configured - /version.txt will report 'unknown'");
        }

        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Configuration validation error: {0}")]
    Validation(String),

    #[error("Cannot expand '{var}' in config value '{field}': {message}")]
    EnvVar {
        var: String,
        field: String,
        message: String,
    },
}

/// Expand `${VAR}` and `${VAR:-default}` references in one config value.
///
/// `lookup` resolves variable names; an unset variable with no default, an
/// unclosed `${` or an empty name fails with `ConfigError::EnvVar`.
fn expand_env_vars_with<F>(input: &str, field: &str, lookup: &F) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut segments = input.split("${");
    let mut expanded = segments.next().unwrap_or_default().to_string();

    for segment in segments {
        let (reference, tail) = segment.split_once('}').ok_or_else(|| ConfigError::EnvVar {
            var: segment.to_string(),
            field: field.to_string(),
            message: format!("unclosed '${{' in '{}'", input),
        })?;
        expanded.push_str(&resolve_reference(reference, field, lookup)?);
        expanded.push_str(tail);
    }

    Ok(expanded)
}

fn resolve_reference<F>(reference: &str, field: &str, lookup: &F) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let (name, default) = match reference.split_once(":-") {
        Some((name, default)) => (name, Some(default)),
        None => (reference, None),
    };

    if name.is_empty() {
        return Err(ConfigError::EnvVar {
            var: String::new(),
            field: field.to_string(),
            message: "empty variable name".to_string(),
        });
    }

    lookup(name)
        .or_else(|| default.map(str::to_string))
        .ok_or_else(|| ConfigError::EnvVar {
            var: name.to_string(),
            field: field.to_string(),
            message: format!("set {} or give a default with '${{{}:-...}}'", name, name),
        })
}
