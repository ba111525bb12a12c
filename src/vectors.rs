//! Precomputed vector files.
//!
//! `persona vectorize` embeds a corpus once and writes the result as JSON;
//! `persona load-vectors` ingests it later without calling the model again.
//!
//! ```json
//! {
//!   "model": "multilingual-e5-base",
//!   "dims": 768,
//!   "records": [
//!     { "id": "hiro-01", "content": "...", "metadata": { ... }, "embedding": [0.01, ...] }
//!   ]
//! }
//! ```

use std::path::Path;

use ai_personalities_core::models::{DocumentMetadata, DocumentRecord};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorFile {
    pub model: String,
    pub dims: usize,
    pub records: Vec<VectorRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub content: String,
    pub metadata: DocumentMetadata,
    pub embedding: Vec<f32>,
}

impl VectorFile {
    /// Pair `records` with their embeddings. Lengths must match.
    pub fn new(
        model: impl Into<String>,
        dims: usize,
        records: Vec<DocumentRecord>,
        vectors: Vec<Vec<f32>>,
    ) -> Result<Self> {
        if records.len() != vectors.len() {
            bail!(
                "{} records but {} embeddings",
                records.len(),
                vectors.len()
            );
        }
        let records = records
            .into_iter()
            .zip(vectors)
            .map(|(record, embedding)| VectorRecord {
                id: record.id,
                content: record.content,
                metadata: record.metadata,
                embedding,
            })
            .collect();
        Ok(Self {
            model: model.into(),
            dims,
            records,
        })
    }

    /// Split back into records and their embeddings, in file order.
    pub fn into_parts(self) -> (Vec<DocumentRecord>, Vec<Vec<f32>>) {
        self.records
            .into_iter()
            .map(|r| {
                (
                    DocumentRecord {
                        id: r.id,
                        content: r.content,
                        metadata: r.metadata,
                    },
                    r.embedding,
                )
            })
            .unzip()
    }

    fn validate(&self) -> Result<()> {
        if self.dims == 0 {
            bail!("vector file declares zero dimensions");
        }
        for record in &self.records {
            if record.embedding.len() != self.dims {
                bail!(
                    "record '{}' has {} dimensions, expected {}",
                    record.id,
                    record.embedding.len(),
                    self.dims
                );
            }
        }
        Ok(())
    }
}

pub fn write_vector_file(path: &Path, file: &VectorFile) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(file)?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write vector file: {}", path.display()))?;
    Ok(())
}

pub fn read_vector_file(path: &Path) -> Result<VectorFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read vector file: {}", path.display()))?;
    let file: VectorFile = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse vector file: {}", path.display()))?;
    file.validate()
        .with_context(|| format!("Invalid vector file: {}", path.display()))?;
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(id: &str) -> DocumentRecord {
        DocumentRecord {
            id: id.to_string(),
            content: format!("{} content", id),
            metadata: DocumentMetadata {
                filename: format!("{}.md", id),
                created_at: "2024-05-01".to_string(),
                updated_at: String::new(),
                tags: "speech".to_string(),
                file_size: 12,
                character: "Hiro".to_string(),
            },
        }
    }

    #[test]
    fn test_write_then_read() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("out/vectors.json");
        let file = VectorFile::new(
            "feature-hash-2",
            2,
            vec![record("a"), record("b")],
            vec![vec![1.0, 0.0], vec![0.0, 1.0]],
        )
        .unwrap();
        write_vector_file(&path, &file).unwrap();

        let (records, vectors) = read_vector_file(&path).unwrap().into_parts();
        assert_eq!(records, vec![record("a"), record("b")]);
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn test_length_mismatch_rejected() {
        assert!(VectorFile::new("m", 2, vec![record("a")], vec![]).is_err());
    }

    #[test]
    fn test_wrong_dimensions_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("vectors.json");
        let file = VectorFile::new("m", 3, vec![record("a")], vec![vec![1.0, 0.0]]).unwrap();
        write_vector_file(&path, &file).unwrap();

        let err = read_vector_file(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("expected 3"));
    }

    #[test]
    fn test_garbage_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("vectors.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(read_vector_file(&path).is_err());
    }
}
