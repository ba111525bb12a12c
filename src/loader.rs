//! Corpus loader.
//!
//! Scans one directory (non-recursively) for files with the configured
//! extension and parses each into a [`DocumentRecord`]. A file that cannot
//! be read or parsed is logged and skipped; only a missing or unreadable
//! directory fails the load.
//!
//! Records come back sorted by filename so repeated loads of the same
//! corpus produce the same sequence.

use std::path::{Path, PathBuf};

use ai_personalities_core::models::DocumentRecord;
use globset::{Glob, GlobMatcher};
use walkdir::WalkDir;

use crate::parser::parse_document;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("corpus directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    #[error("corpus path is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("invalid extension filter '{extension}': {source}")]
    Pattern {
        extension: String,
        #[source]
        source: globset::Error,
    },

    #[error("failed to read corpus directory {}: {source}", .path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

/// A file that was found but could not be ingested.
#[derive(Debug, Clone)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Outcome of one corpus load.
#[derive(Debug, Default)]
pub struct LoadedCorpus {
    pub records: Vec<DocumentRecord>,
    pub skipped: Vec<SkippedFile>,
}

/// Load every `*.{extension}` file directly inside `dir`.
pub fn load_corpus(dir: &Path, extension: &str, character: &str) -> Result<LoadedCorpus, LoadError> {
    if !dir.exists() {
        return Err(LoadError::DirectoryNotFound(dir.to_path_buf()));
    }
    if !dir.is_dir() {
        return Err(LoadError::NotADirectory(dir.to_path_buf()));
    }

    let matcher = extension_matcher(extension)?;
    let mut corpus = LoadedCorpus::default();

    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                // Errors on the root itself mean we cannot list the directory at all.
                if e.depth() == 0 {
                    return Err(LoadError::Walk {
                        path: dir.to_path_buf(),
                        source: e,
                    });
                }
                let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| dir.to_path_buf());
                tracing::error!(path = %path.display(), error = %e, "Skipping unreadable entry");
                corpus.skipped.push(SkippedFile {
                    path,
                    reason: e.to_string(),
                });
                continue;
            }
        };

        if !entry.file_type().is_file() || !matcher.is_match(entry.file_name()) {
            continue;
        }

        let path = entry.path();
        match load_file(path, character) {
            Ok(record) => {
                tracing::info!(file = %record.metadata.filename, "Loaded document");
                corpus.records.push(record);
            }
            Err(reason) => {
                tracing::error!(path = %path.display(), error = %reason, "Skipping document");
                corpus.skipped.push(SkippedFile {
                    path: path.to_path_buf(),
                    reason,
                });
            }
        }
    }

    corpus
        .records
        .sort_by(|a, b| a.metadata.filename.cmp(&b.metadata.filename));

    Ok(corpus)
}

fn extension_matcher(extension: &str) -> Result<GlobMatcher, LoadError> {
    let ext = extension.trim_start_matches('.');
    Glob::new(&format!("*.{}", ext))
        .map(|glob| glob.compile_matcher())
        .map_err(|source| LoadError::Pattern {
            extension: extension.to_string(),
            source,
        })
}

fn load_file(path: &Path, character: &str) -> Result<DocumentRecord, String> {
    let raw = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
    parse_document(&raw, path, character).map_err(|e| e.to_string())
}
