//! Vector index abstraction for AI Personalities.
//!
//! The [`VectorIndex`] trait is the storage capability the knowledge store
//! is built on: named collections of `(id, document, metadata, embedding)`
//! entries with filtered nearest-neighbor search. It keeps the store
//! independent of the storage engine (SQLite, in-memory, or anything else).
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use std::cmp::Ordering;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{IndexEntry, Match, MetadataFilter};

/// Abstract vector index.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`create_collection`](VectorIndex::create_collection) | Create an empty collection; fails if it exists |
/// | [`has_collection`](VectorIndex::has_collection) | Check whether a collection exists |
/// | [`delete_collection_if_exists`](VectorIndex::delete_collection_if_exists) | Idempotent delete |
/// | [`upsert`](VectorIndex::upsert) | Insert or replace entries, all-or-nothing |
/// | [`query`](VectorIndex::query) | Filtered nearest-neighbor search |
/// | [`count`](VectorIndex::count) | Number of entries in a collection |
///
/// Every operation except `create_collection`, `has_collection`, and
/// `delete_collection_if_exists` fails when the collection is missing.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Create an empty collection.
    async fn create_collection(&self, name: &str, description: &str) -> Result<()>;

    async fn has_collection(&self, name: &str) -> Result<bool>;

    /// Delete a collection and all of its entries.
    ///
    /// Returns `false` when there was nothing to delete.
    async fn delete_collection_if_exists(&self, name: &str) -> Result<bool>;

    /// Insert entries, replacing any existing entry with the same id.
    async fn upsert(&self, collection: &str, entries: &[IndexEntry]) -> Result<()>;

    /// Return at most `k` entries ordered by ascending cosine distance to
    /// `vector`, keeping only those accepted by `filter`.
    async fn query(
        &self,
        collection: &str,
        vector: &[f32],
        filter: Option<&MetadataFilter>,
        k: usize,
    ) -> Result<Vec<Match>>;

    async fn count(&self, collection: &str) -> Result<usize>;
}

/// Sort candidates by distance (ascending, ties by id) and keep the top `k`.
///
/// Shared by index implementations that score candidates in Rust.
pub fn rank_matches(mut candidates: Vec<Match>, k: usize) -> Vec<Match> {
    candidates.sort_by(|a, b| {
        a.distance
            .partial_cmp(&b.distance)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
    candidates.truncate(k);
    candidates
}
