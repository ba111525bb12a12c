//! Knowledge Store: one collection and its content lifecycle.
//!
//! The store pairs a [`VectorIndex`] with an [`Embedder`]. It owns the
//! collection it was opened on: [`KnowledgeStore::open`] either rebuilds it
//! from scratch (`reset = true`) or attaches to it, creating it if absent.
//! Records written through [`save`](KnowledgeStore::save) are embedded with
//! the configured passage prefix; text queries use the query prefix.
//!
//! Nothing here re-ranks results. [`raw_query`](KnowledgeStore::raw_query)
//! returns exactly what the index returns.

use std::sync::Arc;

use ai_personalities_core::embedding::Embedder;
use ai_personalities_core::index::VectorIndex;
use ai_personalities_core::models::{DocumentRecord, IndexEntry, Match, MetadataFilter};
use anyhow::{anyhow, bail, Context, Result};

use crate::config::{Config, SavePolicy};
use crate::embedding::{create_embedder, embed_batched};
use crate::sqlite_index::SqliteIndex;

/// Description stored with every collection this crate creates.
pub const COLLECTION_DESCRIPTION: &str = "AI personality data";

/// Settings for one opened collection.
#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub collection: String,
    /// Delete and recreate the collection on open.
    pub reset: bool,
    pub save_policy: SavePolicy,
    pub batch_size: usize,
    pub query_prefix: String,
    pub passage_prefix: String,
    /// Human-readable location of the index, used in log lines.
    pub location: String,
}

impl StoreOptions {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            reset: false,
            save_policy: SavePolicy::default(),
            batch_size: 64,
            query_prefix: String::new(),
            passage_prefix: String::new(),
            location: "memory".to_string(),
        }
    }

    pub fn from_config(config: &Config, reset: bool) -> Self {
        Self {
            collection: config.db.collection.clone(),
            reset,
            save_policy: config.corpus.save_policy,
            batch_size: config.embedding.batch_size,
            query_prefix: config.embedding.query_prefix.clone(),
            passage_prefix: config.embedding.passage_prefix.clone(),
            location: config.db.path.display().to_string(),
        }
    }
}

/// What to search with.
#[derive(Debug, Clone, Copy)]
pub enum QueryInput<'a> {
    /// Free text, embedded with the query prefix.
    Text(&'a str),
    /// A precomputed query vector.
    Vector(&'a [f32]),
}

/// Embed record bodies as passages (`passage_prefix` + content).
pub async fn embed_passages(
    embedder: &dyn Embedder,
    records: &[DocumentRecord],
    passage_prefix: &str,
    batch_size: usize,
) -> Result<Vec<Vec<f32>>> {
    let texts: Vec<String> = records
        .iter()
        .map(|r| format!("{}{}", passage_prefix, r.content))
        .collect();
    embed_batched(embedder, &texts, batch_size)
        .await
        .context("Failed to embed documents")
}

pub struct KnowledgeStore {
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn Embedder>,
    options: StoreOptions,
}

impl KnowledgeStore {
    /// Attach to (or rebuild) `options.collection` in `index`.
    pub async fn open(
        index: Arc<dyn VectorIndex>,
        embedder: Arc<dyn Embedder>,
        options: StoreOptions,
    ) -> Result<Self> {
        let name = options.collection.as_str();

        if options.reset {
            if index.delete_collection_if_exists(name).await? {
                tracing::info!(collection = name, "Deleted existing collection");
            }
            index
                .create_collection(name, COLLECTION_DESCRIPTION)
                .await
                .with_context(|| format!("Failed to create collection {}", name))?;
            tracing::info!(collection = name, "Created collection");
        } else if !index.has_collection(name).await? {
            index
                .create_collection(name, COLLECTION_DESCRIPTION)
                .await
                .with_context(|| format!("Failed to create collection {}", name))?;
            tracing::info!(collection = name, "Created collection");
        } else {
            tracing::info!(collection = name, "Using existing collection");
        }

        Ok(Self {
            index,
            embedder,
            options,
        })
    }

    /// Open the SQLite index under `config.db.path` with the configured embedder.
    pub async fn open_sqlite(config: &Config, reset: bool) -> Result<Self> {
        let index = SqliteIndex::open(&config.db.path).await?;
        let embedder = create_embedder(&config.embedding)?;
        tracing::info!(
            db_path = %config.db.path.display(),
            collection = %config.db.collection,
            embedder = embedder.model_name(),
            "Opened knowledge store"
        );
        Self::open(
            Arc::new(index),
            embedder,
            StoreOptions::from_config(config, reset),
        )
        .await
    }

    pub fn collection_name(&self) -> &str {
        &self.options.collection
    }

    pub fn embedder(&self) -> &dyn Embedder {
        self.embedder.as_ref()
    }

    /// Embed and write `records`. Returns the number written.
    ///
    /// An empty slice is a no-op. On failure the save policy decides
    /// whether the error is returned or logged and reported as zero.
    pub async fn save(&self, records: &[DocumentRecord]) -> Result<usize> {
        if records.is_empty() {
            tracing::warn!(collection = self.collection_name(), "No records to save");
            return Ok(0);
        }

        let result = match self.embed_records(records).await {
            Ok(vectors) => self.write(records, vectors).await,
            Err(e) => Err(e),
        };
        self.apply_save_policy(result)
    }

    /// Write `records` with externally computed embeddings, one per record.
    pub async fn save_with_embeddings(
        &self,
        records: &[DocumentRecord],
        vectors: Vec<Vec<f32>>,
    ) -> Result<usize> {
        if records.len() != vectors.len() {
            bail!(
                "{} records but {} embeddings supplied",
                records.len(),
                vectors.len()
            );
        }
        if records.is_empty() {
            tracing::warn!(collection = self.collection_name(), "No records to save");
            return Ok(0);
        }

        let dims = self.embedder.dims();
        if vectors.iter().any(|v| v.len() != dims) {
            tracing::warn!(
                expected = dims,
                embedder = self.embedder.model_name(),
                "Precomputed embeddings do not match the query embedder's dimensions"
            );
        }

        let result = self.write(records, vectors).await;
        self.apply_save_policy(result)
    }

    /// Compute passage embeddings for `records` without writing anything.
    pub async fn embed_records(&self, records: &[DocumentRecord]) -> Result<Vec<Vec<f32>>> {
        embed_passages(
            self.embedder.as_ref(),
            records,
            &self.options.passage_prefix,
            self.options.batch_size,
        )
        .await
    }

    /// Nearest-neighbor search over the collection, returned as the index ranks it.
    pub async fn raw_query(
        &self,
        input: QueryInput<'_>,
        filter: Option<&MetadataFilter>,
        k: usize,
    ) -> Result<Vec<Match>> {
        let vector = match input {
            QueryInput::Vector(v) => v.to_vec(),
            QueryInput::Text(text) => {
                let prefixed = vec![format!("{}{}", self.options.query_prefix, text)];
                self.embedder
                    .embed(&prefixed)
                    .await
                    .context("Failed to embed query")?
                    .into_iter()
                    .next()
                    .ok_or_else(|| anyhow!("Empty embedding response"))?
            }
        };

        self.index
            .query(self.collection_name(), &vector, filter, k)
            .await
    }

    pub async fn count(&self) -> Result<usize> {
        self.index.count(self.collection_name()).await
    }

    async fn write(&self, records: &[DocumentRecord], vectors: Vec<Vec<f32>>) -> Result<usize> {
        let entries: Vec<IndexEntry> = records
            .iter()
            .zip(vectors)
            .map(|(record, vector)| IndexEntry::from_record(record, vector))
            .collect();

        self.index
            .upsert(self.collection_name(), &entries)
            .await
            .with_context(|| format!("Failed to save to collection {}", self.collection_name()))?;

        tracing::info!(
            count = entries.len(),
            collection = self.collection_name(),
            db_path = %self.options.location,
            "Saved records"
        );
        Ok(entries.len())
    }

    fn apply_save_policy(&self, result: Result<usize>) -> Result<usize> {
        match (result, self.options.save_policy) {
            (Ok(n), _) => Ok(n),
            (Err(e), SavePolicy::Atomic) => Err(e),
            (Err(e), SavePolicy::BestEffort) => {
                tracing::error!(
                    collection = self.collection_name(),
                    error = %format!("{:#}", e),
                    "Failed to save records"
                );
                Ok(0)
            }
        }
    }
}
