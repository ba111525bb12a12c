//! In-memory [`VectorIndex`] implementation for tests and embedding hosts.
//!
//! Collections are `BTreeMap`s keyed by entry id behind a `std::sync::RwLock`.
//! Search is brute-force cosine distance over every entry in the collection.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;

use crate::embedding::cosine_distance;
use crate::models::{IndexEntry, Match, MetadataFilter};

use super::{rank_matches, VectorIndex};

struct Collection {
    entries: BTreeMap<String, IndexEntry>,
}

/// In-memory vector index.
pub struct InMemoryIndex {
    collections: RwLock<HashMap<String, Collection>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, Collection>>> {
        self.collections
            .read()
            .map_err(|_| anyhow!("in-memory index lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, Collection>>> {
        self.collections
            .write()
            .map_err(|_| anyhow!("in-memory index lock poisoned"))
    }
}

impl Default for InMemoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    async fn create_collection(&self, name: &str, _description: &str) -> Result<()> {
        let mut collections = self.write()?;
        if collections.contains_key(name) {
            bail!("collection already exists: {}", name);
        }
        collections.insert(
            name.to_string(),
            Collection {
                entries: BTreeMap::new(),
            },
        );
        Ok(())
    }

    async fn has_collection(&self, name: &str) -> Result<bool> {
        Ok(self.read()?.contains_key(name))
    }

    async fn delete_collection_if_exists(&self, name: &str) -> Result<bool> {
        Ok(self.write()?.remove(name).is_some())
    }

    async fn upsert(&self, collection: &str, entries: &[IndexEntry]) -> Result<()> {
        let mut collections = self.write()?;
        let target = collections
            .get_mut(collection)
            .ok_or_else(|| anyhow!("collection not found: {}", collection))?;
        for entry in entries {
            target.entries.insert(entry.id.clone(), entry.clone());
        }
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        vector: &[f32],
        filter: Option<&MetadataFilter>,
        k: usize,
    ) -> Result<Vec<Match>> {
        let collections = self.read()?;
        let target = collections
            .get(collection)
            .ok_or_else(|| anyhow!("collection not found: {}", collection))?;

        let candidates: Vec<Match> = target
            .entries
            .values()
            .filter(|entry| filter.map_or(true, |f| f.matches(&entry.metadata)))
            .map(|entry| Match {
                id: entry.id.clone(),
                document: entry.document.clone(),
                metadata: entry.metadata.clone(),
                distance: cosine_distance(vector, &entry.embedding),
            })
            .collect();

        Ok(rank_matches(candidates, k))
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        let collections = self.read()?;
        collections
            .get(collection)
            .map(|c| c.entries.len())
            .ok_or_else(|| anyhow!("collection not found: {}", collection))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DocumentMetadata;

    fn entry(id: &str, character: &str, embedding: Vec<f32>) -> IndexEntry {
        IndexEntry {
            id: id.to_string(),
            document: format!("{} body", id),
            metadata: DocumentMetadata {
                filename: format!("{}.md", id),
                created_at: String::new(),
                updated_at: String::new(),
                tags: String::new(),
                file_size: 10,
                character: character.to_string(),
            },
            embedding,
        }
    }

    #[tokio::test]
    async fn test_create_twice_fails() {
        let index = InMemoryIndex::new();
        index.create_collection("personality", "").await.unwrap();
        assert!(index.create_collection("personality", "").await.is_err());
    }

    #[tokio::test]
    async fn test_delete_missing_is_noop() {
        let index = InMemoryIndex::new();
        assert!(!index.delete_collection_if_exists("nope").await.unwrap());
        index.create_collection("personality", "").await.unwrap();
        assert!(index.delete_collection_if_exists("personality").await.unwrap());
        assert!(!index.has_collection("personality").await.unwrap());
    }

    #[tokio::test]
    async fn test_upsert_replaces_same_id() {
        let index = InMemoryIndex::new();
        index.create_collection("c", "").await.unwrap();
        index
            .upsert("c", &[entry("a", "Hiro", vec![1.0, 0.0])])
            .await
            .unwrap();
        index
            .upsert("c", &[entry("a", "Hiro", vec![0.0, 1.0])])
            .await
            .unwrap();
        assert_eq!(index.count("c").await.unwrap(), 1);

        let hits = index.query("c", &[0.0, 1.0], None, 5).await.unwrap();
        assert!(hits[0].distance.abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_query_filters_and_ranks() {
        let index = InMemoryIndex::new();
        index.create_collection("c", "").await.unwrap();
        index
            .upsert(
                "c",
                &[
                    entry("far", "Hiro", vec![0.0, 1.0]),
                    entry("near", "Hiro", vec![1.0, 0.1]),
                    entry("other", "Rui", vec![1.0, 0.0]),
                ],
            )
            .await
            .unwrap();

        let filter = MetadataFilter::character("Hiro");
        let hits = index
            .query("c", &[1.0, 0.0], Some(&filter), 10)
            .await
            .unwrap();
        let ids: Vec<&str> = hits.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["near", "far"]);
    }

    #[tokio::test]
    async fn test_missing_collection_errors() {
        let index = InMemoryIndex::new();
        assert!(index.count("ghost").await.is_err());
        assert!(index.query("ghost", &[1.0], None, 1).await.is_err());
        assert!(index.upsert("ghost", &[]).await.is_err());
    }
}
