//! YAML front-matter split from the markdown body.

use serde::Deserialize;

use super::PostError;

const DELIMITER: &str = "---";

/// Metadata block at the top of a post.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FrontMatter {
    pub title: String,
    pub description: String,
    #[serde(alias = "pubDate")]
    pub pub_date: String,
}

/// Split a document into front-matter and body.
///
/// A document that does not open with a `---` line has no front-matter and is
/// returned whole as the body.
pub fn split(contents: &str) -> Result<(FrontMatter, &str), PostError> {
    let text = contents.strip_prefix('\u{feff}').unwrap_or(contents);

    let Some(first) = text.split_inclusive('\n').next() else {
        return Ok((FrontMatter::default(), text));
    };
    if first.trim_end() != DELIMITER {
        return Ok((FrontMatter::default(), text));
    }

    let rest = &text[first.len()..];
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == DELIMITER {
            let matter = parse_yaml(&rest[..offset])?;
            return Ok((matter, &rest[offset + line.len()..]));
        }
        offset += line.len();
    }

    Err(PostError::FrontMatter(
        "unterminated front-matter block".to_string(),
    ))
}

fn parse_yaml(yaml: &str) -> Result<FrontMatter, PostError> {
    if yaml.trim().is_empty() {
        return Ok(FrontMatter::default());
    }

    serde_yaml::from_str(yaml).map_err(|e| PostError::FrontMatter(format!("Invalid YAML: {e}")))
}
