//! Ingestion commands.
//!
//! - `persona load`: corpus directory → Knowledge Store.
//! - `persona vectorize`: corpus directory → vector file (index untouched).
//! - `persona load-vectors`: vector file → Knowledge Store, no embedding calls.
//!
//! The corpus is loaded before the store is opened, so a missing directory
//! never resets an existing collection.

use std::path::Path;

use anyhow::{anyhow, Result};

use crate::config::Config;
use crate::embedding::create_embedder;
use crate::knowledge::{embed_passages, KnowledgeStore};
use crate::loader::{load_corpus, LoadedCorpus};
use crate::vectors::{read_vector_file, write_vector_file, VectorFile};

/// Counts reported after an ingestion run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IngestSummary {
    pub loaded: usize,
    pub skipped: usize,
    pub saved: usize,
    /// Records in the collection after the run.
    pub total: usize,
}

fn chunks_dir(config: &Config) -> Result<&Path> {
    config.corpus.chunks_dir.as_deref().ok_or_else(|| {
        anyhow!("No corpus directory configured: pass --chunks-dir or set CHUNKS_DIR")
    })
}

fn load_configured_corpus(config: &Config) -> Result<LoadedCorpus> {
    let dir = chunks_dir(config)?;
    tracing::info!(
        dir = %dir.display(),
        character = %config.corpus.character,
        "Loading corpus"
    );
    let corpus = load_corpus(dir, &config.corpus.extension, &config.corpus.character)?;
    tracing::info!(
        loaded = corpus.records.len(),
        skipped = corpus.skipped.len(),
        "Corpus loaded"
    );
    Ok(corpus)
}

/// Load the configured corpus into the Knowledge Store.
///
/// The collection is rebuilt when `corpus.reset_collection` is set and
/// `append` is false.
pub async fn run_load(config: &Config, append: bool) -> Result<IngestSummary> {
    let corpus = load_configured_corpus(config)?;

    let reset = config.corpus.reset_collection && !append;
    let store = KnowledgeStore::open_sqlite(config, reset).await?;
    let saved = store.save(&corpus.records).await?;

    let summary = IngestSummary {
        loaded: corpus.records.len(),
        skipped: corpus.skipped.len(),
        saved,
        total: store.count().await?,
    };

    println!("Ingest {}:", config.corpus.character);
    println!("  loaded:     {}", summary.loaded);
    println!("  skipped:    {}", summary.skipped);
    for skipped in &corpus.skipped {
        println!("    {} ({})", skipped.path.display(), skipped.reason);
    }
    println!("  saved:      {}", summary.saved);
    println!(
        "  collection: {} ({} records)",
        store.collection_name(),
        summary.total
    );

    Ok(summary)
}

/// Embed the configured corpus and write the vectors to `output`.
pub async fn run_vectorize(config: &Config, output: &Path) -> Result<usize> {
    let corpus = load_configured_corpus(config)?;
    let embedder = create_embedder(&config.embedding)?;

    let vectors = embed_passages(
        embedder.as_ref(),
        &corpus.records,
        &config.embedding.passage_prefix,
        config.embedding.batch_size,
    )
    .await?;

    let count = corpus.records.len();
    let file = VectorFile::new(embedder.model_name(), embedder.dims(), corpus.records, vectors)?;
    write_vector_file(output, &file)?;

    println!(
        "Wrote {} vectors ({}, {} dims) to {}",
        count,
        file.model,
        file.dims,
        output.display()
    );
    Ok(count)
}

/// Ingest a vector file written by [`run_vectorize`].
pub async fn run_load_vectors(config: &Config, input: &Path, append: bool) -> Result<IngestSummary> {
    let file = read_vector_file(input)?;
    tracing::info!(
        file = %input.display(),
        model = %file.model,
        dims = file.dims,
        records = file.records.len(),
        "Read vector file"
    );
    let (records, vectors) = file.into_parts();

    let reset = config.corpus.reset_collection && !append;
    let store = KnowledgeStore::open_sqlite(config, reset).await?;
    let saved = store.save_with_embeddings(&records, vectors).await?;

    let summary = IngestSummary {
        loaded: records.len(),
        skipped: 0,
        saved,
        total: store.count().await?,
    };

    println!("Loaded {} precomputed records from {}", summary.loaded, input.display());
    println!("  saved:      {}", summary.saved);
    println!(
        "  collection: {} ({} records)",
        store.collection_name(),
        summary.total
    );

    Ok(summary)
}
