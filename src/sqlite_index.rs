//! SQLite-backed [`VectorIndex`] implementation.
//!
//! Collections are rows in `collections`; entries live in `entries` with
//! their metadata serialized as JSON and their embedding stored as a
//! little-endian f32 BLOB. The metadata filter is pushed down to SQL via
//! `json_extract`; distances are computed and ranked in Rust.

use std::path::Path;

use ai_personalities_core::embedding::{blob_to_vec, cosine_distance, vec_to_blob};
use ai_personalities_core::index::{rank_matches, VectorIndex};
use ai_personalities_core::models::{DocumentMetadata, IndexEntry, Match, MetadataFilter};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use crate::{db, migrate};

/// SQLite implementation of the [`VectorIndex`] trait.
pub struct SqliteIndex {
    pool: SqlitePool,
}

impl SqliteIndex {
    /// Wrap an existing pool. The schema must already exist.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to the index under `db_dir`, creating it and its schema if needed.
    pub async fn open(db_dir: &Path) -> Result<Self> {
        let pool = db::connect(db_dir).await?;
        migrate::run_migrations(&pool)
            .await
            .context("Failed to initialize index schema")?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn ensure_collection(&self, name: &str) -> Result<()> {
        if !self.has_collection(name).await? {
            bail!("collection not found: {}", name);
        }
        Ok(())
    }
}

#[async_trait]
impl VectorIndex for SqliteIndex {
    async fn create_collection(&self, name: &str, description: &str) -> Result<()> {
        if self.has_collection(name).await? {
            bail!("collection already exists: {}", name);
        }
        sqlx::query("INSERT INTO collections (name, description, created_at) VALUES (?, ?, ?)")
            .bind(name)
            .bind(description)
            .bind(chrono::Utc::now().timestamp())
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to create collection {}", name))?;
        Ok(())
    }

    async fn has_collection(&self, name: &str) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT COUNT(*) > 0 FROM collections WHERE name = ?")
                .bind(name)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn delete_collection_if_exists(&self, name: &str) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM entries WHERE collection = ?")
            .bind(name)
            .execute(&mut *tx)
            .await?;

        let deleted = sqlx::query("DELETE FROM collections WHERE name = ?")
            .bind(name)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;
        Ok(deleted > 0)
    }

    async fn upsert(&self, collection: &str, entries: &[IndexEntry]) -> Result<()> {
        self.ensure_collection(collection).await?;

        let mut tx = self.pool.begin().await?;

        for entry in entries {
            let metadata_json = serde_json::to_string(&entry.metadata)?;
            sqlx::query(
                r#"
                INSERT INTO entries (collection, id, document, metadata_json, embedding)
                VALUES (?, ?, ?, ?, ?)
                ON CONFLICT(collection, id) DO UPDATE SET
                    document = excluded.document,
                    metadata_json = excluded.metadata_json,
                    embedding = excluded.embedding
                "#,
            )
            .bind(collection)
            .bind(&entry.id)
            .bind(&entry.document)
            .bind(metadata_json)
            .bind(vec_to_blob(&entry.embedding))
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to write entry {}", entry.id))?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        vector: &[f32],
        filter: Option<&MetadataFilter>,
        k: usize,
    ) -> Result<Vec<Match>> {
        self.ensure_collection(collection).await?;

        let rows = match filter {
            Some(f) => {
                sqlx::query(
                    r#"
                    SELECT id, document, metadata_json, embedding
                    FROM entries
                    WHERE collection = ? AND json_extract(metadata_json, ?) = ?
                    "#,
                )
                .bind(collection)
                .bind(format!("$.{}", f.field.key()))
                .bind(&f.value)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    "SELECT id, document, metadata_json, embedding FROM entries WHERE collection = ?",
                )
                .bind(collection)
                .fetch_all(&self.pool)
                .await?
            }
        };

        let mut candidates = Vec::with_capacity(rows.len());
        for row in rows {
            let id: String = row.get("id");
            let metadata_json: String = row.get("metadata_json");
            let metadata: DocumentMetadata = serde_json::from_str(&metadata_json)
                .with_context(|| format!("Corrupt metadata for entry {}", id))?;
            let blob: Vec<u8> = row.get("embedding");

            candidates.push(Match {
                distance: cosine_distance(vector, &blob_to_vec(&blob)),
                document: row.get("document"),
                metadata,
                id,
            });
        }

        Ok(rank_matches(candidates, k))
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        self.ensure_collection(collection).await?;
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM entries WHERE collection = ?")
            .bind(collection)
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }
}
