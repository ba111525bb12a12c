//! Core data models used throughout AI Personalities.
//!
//! These types represent the parsed documents, stored index entries, and
//! ranked matches that flow through the ingestion and retrieval pipeline.

use serde::{Deserialize, Serialize};

/// Fixed metadata attached to every stored document.
///
/// Field order matches the on-disk JSON layout. `tags` is the source tag
/// list joined with `", "` (empty when the document has no tags), and
/// `character` is the owning character, constant for one ingestion run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub filename: String,
    pub created_at: String,
    pub updated_at: String,
    pub tags: String,
    pub file_size: u64,
    pub character: String,
}

/// One unit of ingested knowledge: a parsed personality document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// File base name without extension; stable across re-ingestion.
    pub id: String,
    /// Body text with the frontmatter removed and whitespace trimmed.
    pub content: String,
    pub metadata: DocumentMetadata,
}

/// A document together with its embedding, as written to an index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    pub id: String,
    pub document: String,
    pub metadata: DocumentMetadata,
    pub embedding: Vec<f32>,
}

impl IndexEntry {
    pub fn from_record(record: &DocumentRecord, embedding: Vec<f32>) -> Self {
        Self {
            id: record.id.clone(),
            document: record.content.clone(),
            metadata: record.metadata.clone(),
            embedding,
        }
    }
}

/// A single retrieval result.
///
/// `distance` is returned verbatim from the index (lower is more similar);
/// nothing downstream re-ranks matches.
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    pub id: String,
    pub document: String,
    pub metadata: DocumentMetadata,
    pub distance: f32,
}

/// String-valued metadata fields that can be used in a query filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataField {
    Filename,
    CreatedAt,
    UpdatedAt,
    Tags,
    Character,
}

impl MetadataField {
    /// JSON key of the field in the serialized metadata.
    pub fn key(&self) -> &'static str {
        match self {
            MetadataField::Filename => "filename",
            MetadataField::CreatedAt => "created_at",
            MetadataField::UpdatedAt => "updated_at",
            MetadataField::Tags => "tags",
            MetadataField::Character => "character",
        }
    }

    fn value_of<'a>(&self, metadata: &'a DocumentMetadata) -> &'a str {
        match self {
            MetadataField::Filename => &metadata.filename,
            MetadataField::CreatedAt => &metadata.created_at,
            MetadataField::UpdatedAt => &metadata.updated_at,
            MetadataField::Tags => &metadata.tags,
            MetadataField::Character => &metadata.character,
        }
    }
}

/// Equality filter over one metadata field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataFilter {
    pub field: MetadataField,
    pub value: String,
}

impl MetadataFilter {
    pub fn eq(field: MetadataField, value: impl Into<String>) -> Self {
        Self {
            field,
            value: value.into(),
        }
    }

    /// Filter that keeps only documents owned by `character`.
    pub fn character(character: impl Into<String>) -> Self {
        Self::eq(MetadataField::Character, character)
    }

    pub fn matches(&self, metadata: &DocumentMetadata) -> bool {
        self.field.value_of(metadata) == self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(character: &str) -> DocumentMetadata {
        DocumentMetadata {
            filename: "hiro-01.md".to_string(),
            created_at: "2024-05-01".to_string(),
            updated_at: String::new(),
            tags: "speech, habits".to_string(),
            file_size: 120,
            character: character.to_string(),
        }
    }

    #[test]
    fn test_character_filter_matches_exact_value() {
        let filter = MetadataFilter::character("Hiro");
        assert!(filter.matches(&metadata("Hiro")));
        assert!(!filter.matches(&metadata("Rui")));
        assert!(!filter.matches(&metadata("hiro")));
    }

    #[test]
    fn test_metadata_serializes_with_fixed_keys() {
        let json = serde_json::to_value(metadata("Hiro")).unwrap();
        for field in [
            MetadataField::Filename,
            MetadataField::CreatedAt,
            MetadataField::UpdatedAt,
            MetadataField::Tags,
            MetadataField::Character,
        ] {
            assert!(json.get(field.key()).is_some(), "missing {}", field.key());
        }
        assert_eq!(json["file_size"], 120);
    }
}
