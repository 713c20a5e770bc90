//! Static blog post builder.
//!
//! Converts markdown files with YAML front-matter into standalone HTML pages.
//! Each file is read, split, rendered and written independently; a failure on
//! one file is logged and counted without stopping the rest.

pub mod front_matter;
pub mod render;

pub use front_matter::FrontMatter;

use std::fs;
use std::path::{Path, PathBuf};

/// Post builder errors.
#[derive(Debug, thiserror::Error)]
pub enum PostError {
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid front-matter: {0}")]
    FrontMatter(String),
}

impl PostError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        PostError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Outcome of a build run.
#[derive(Debug, Default)]
pub struct BuildReport {
    pub written: Vec<PathBuf>,
    pub failed: usize,
}

fn is_markdown(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("md") | Some("markdown")
    )
}

/// Build every markdown file directly inside `source_dir` into `output_dir`.
///
/// Only a missing source directory or an uncreatable output directory fails
/// the whole run.
pub fn build_posts(source_dir: &Path, output_dir: &Path) -> Result<BuildReport, PostError> {
    let mut sources: Vec<PathBuf> = fs::read_dir(source_dir)
        .map_err(|e| PostError::io(source_dir, e))?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|entry| entry.path())
        .filter(|path| is_markdown(path))
        .collect();
    sources.sort();

    fs::create_dir_all(output_dir).map_err(|e| PostError::io(output_dir, e))?;

    let mut report = BuildReport::default();
    for source in &sources {
        match build_post(source, output_dir) {
            Ok(written) => {
                tracing::info!(
                    source = %source.display(),
                    output = %written.display(),
                    "Built post"
                );
                report.written.push(written);
            }
            Err(e) => {
                tracing::warn!(source = %source.display(), error = %e, "Failed to build post");
                report.failed += 1;
            }
        }
    }

    Ok(report)
}

/// Build a single post and return the path written.
pub fn build_post(source: &Path, output_dir: &Path) -> Result<PathBuf, PostError> {
    let contents = fs::read_to_string(source).map_err(|e| PostError::io(source, e))?;
    let (matter, body) = front_matter::split(&contents)?;

    let html = render::markdown_to_html(body);
    let output = output_dir.join(output_file_name(&matter, source));

    fs::write(&output, render::page(&matter, &html)).map_err(|e| PostError::io(&output, e))?;
    Ok(output)
}

/// Output file name: the title with spaces (and path separators) replaced by
/// `-`, falling back to the source file stem when the title is blank.
pub fn output_file_name(matter: &FrontMatter, source: &Path) -> String {
    let base = if matter.title.trim().is_empty() {
        source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "untitled".to_string())
    } else {
        matter.title.trim().to_string()
    };

    format!("{}.html", base.replace([' ', '/', '\\'], "-"))
}
