//! Personality document parser.
//!
//! Turns the raw text of one file into a [`DocumentRecord`]: an id derived
//! from the file stem, the trimmed body, and the fixed metadata set.
//!
//! Documents may start with a YAML frontmatter block:
//!
//! ```text
//! ---
//! createdAt: 2024-05-01
//! updatedAt: 2024-06-12
//! tags: [speech, habits]
//! ---
//! Hiro speaks in short, clipped sentences...
//! ```
//!
//! Recognised keys are `createdAt`, `updatedAt`, and `tags`. Anything else
//! in the header is ignored. A file with no frontmatter is all body and
//! gets empty metadata values.

use std::path::{Path, PathBuf};

use ai_personalities_core::models::{DocumentMetadata, DocumentRecord};
use serde_yaml::Value;

const FRONTMATTER_DELIMITER: &str = "---";

/// A document that cannot be turned into a record.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("cannot derive a document id from path {}", .path.display())]
    InvalidPath { path: PathBuf },

    #[error("malformed frontmatter in {}: {source}", .path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("frontmatter in {} is not a key/value mapping", .path.display())]
    NotAMapping { path: PathBuf },

    #[error("invalid `{key}` in {}: {reason}", .path.display())]
    InvalidField {
        path: PathBuf,
        key: &'static str,
        reason: String,
    },
}

/// Parse one document.
///
/// `raw` is the complete file text, `path` its location (used for the id and
/// `filename`), and `character` the owner stamped into the metadata.
/// `file_size` is the byte length of `raw`.
pub fn parse_document(raw: &str, path: &Path, character: &str) -> Result<DocumentRecord, ParseError> {
    let invalid_path = || ParseError::InvalidPath {
        path: path.to_path_buf(),
    };
    let id = path
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .ok_or_else(invalid_path)?
        .to_string();
    let filename = path
        .file_name()
        .and_then(|s| s.to_str())
        .ok_or_else(invalid_path)?
        .to_string();

    let text = raw.strip_prefix('\u{feff}').unwrap_or(raw);
    let (header, body) = match split_frontmatter(text) {
        Some((header, body)) => (parse_header(header, path)?, body),
        None => (Header::default(), text),
    };

    Ok(DocumentRecord {
        id,
        content: body.trim().to_string(),
        metadata: DocumentMetadata {
            filename,
            created_at: header.created_at,
            updated_at: header.updated_at,
            tags: header.tags,
            file_size: raw.len() as u64,
            character: character.to_string(),
        },
    })
}

#[derive(Debug, Default)]
struct Header {
    created_at: String,
    updated_at: String,
    tags: String,
}

/// Split `text` into `(header, body)` when it opens with a `---` line and a
/// matching closing `---` line exists. Otherwise the text has no header.
fn split_frontmatter(text: &str) -> Option<(&str, &str)> {
    let rest = text.strip_prefix(FRONTMATTER_DELIMITER)?;
    let first_newline = rest.find('\n')?;
    if !rest[..first_newline].trim().is_empty() {
        return None;
    }

    let after_open = &rest[first_newline + 1..];
    let mut offset = 0;
    for line in after_open.split_inclusive('\n') {
        if line.trim_end() == FRONTMATTER_DELIMITER {
            return Some((&after_open[..offset], &after_open[offset + line.len()..]));
        }
        offset += line.len();
    }
    None
}

fn parse_header(header: &str, path: &Path) -> Result<Header, ParseError> {
    if header.trim().is_empty() {
        return Ok(Header::default());
    }

    let value: Value = serde_yaml::from_str(header).map_err(|source| ParseError::Malformed {
        path: path.to_path_buf(),
        source,
    })?;

    match value {
        // A header holding only comments.
        Value::Null => Ok(Header::default()),
        Value::Mapping(_) => Ok(Header {
            created_at: scalar_field(&value, "createdAt", path)?,
            updated_at: scalar_field(&value, "updatedAt", path)?,
            tags: tags_field(&value, path)?,
        }),
        _ => Err(ParseError::NotAMapping {
            path: path.to_path_buf(),
        }),
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some(String::new()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Tagged(tagged) => scalar_to_string(&tagged.value),
        Value::Sequence(_) | Value::Mapping(_) => None,
    }
}

fn scalar_field(header: &Value, key: &'static str, path: &Path) -> Result<String, ParseError> {
    match header.get(key) {
        None => Ok(String::new()),
        Some(value) => scalar_to_string(value).ok_or_else(|| ParseError::InvalidField {
            path: path.to_path_buf(),
            key,
            reason: "expected a scalar value".to_string(),
        }),
    }
}

/// `tags` must be a list of scalars; it is stored joined with `", "`.
fn tags_field(header: &Value, path: &Path) -> Result<String, ParseError> {
    let invalid = |reason: &str| ParseError::InvalidField {
        path: path.to_path_buf(),
        key: "tags",
        reason: reason.to_string(),
    };

    match header.get("tags") {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::Sequence(items)) => {
            let tags = items
                .iter()
                .map(|item| match item {
                    Value::Null => None,
                    other => scalar_to_string(other),
                })
                .collect::<Option<Vec<String>>>()
                .ok_or_else(|| invalid("list items must be non-null scalars"))?;
            Ok(tags.join(", "))
        }
        Some(_) => Err(invalid("expected a list")),
    }
}
