//! End-to-end ingestion and retrieval through the library API, over the
//! SQLite index and the offline hash embedder.

use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use ai_personalities::config::{RetrievalConfig, RESULT_CAP};
use ai_personalities::dispatcher::{
    DispatchError, ToolDispatcher, GET_CHARACTER_DIALOGUE_STYLE, GET_CHARACTER_TRAITS,
    SEARCH_PERSONALITY,
};
use ai_personalities::embedding::HashEmbedder;
use ai_personalities::knowledge::{KnowledgeStore, StoreOptions};
use ai_personalities::loader::load_corpus;
use ai_personalities::retrieval::{RetrievalLimits, MISSING_CHARACTER, MISSING_SEARCH_PARAMS};
use ai_personalities::sqlite_index::SqliteIndex;
use ai_personalities_core::embedding::Embedder;
use ai_personalities_core::index::memory::InMemoryIndex;
use ai_personalities_core::index::VectorIndex;
use ai_personalities_core::models::{IndexEntry, Match, MetadataFilter};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;
use tempfile::TempDir;

fn embedder() -> Arc<dyn Embedder> {
    Arc::new(HashEmbedder::new(256).unwrap())
}

fn write_corpus(dir: &Path) {
    fs::create_dir_all(dir).unwrap();
    fs::write(
        dir.join("hiro-speech.md"),
        "---\ncreatedAt: 2024-05-01\ntags: [dialogue, speech]\n---\nHiro talks in short, clipped sentences and rarely raises his voice.",
    )
    .unwrap();
    fs::write(
        dir.join("hiro-traits.md"),
        "---\ntags:\n  - personality\n  - traits\n---\nHiro is patient, observant, and fiercely loyal to his friends.",
    )
    .unwrap();
    fs::write(
        dir.join("hiro-habits.md"),
        "Hiro drinks green tea every morning before training.",
    )
    .unwrap();
    fs::write(
        dir.join("hiro-broken.md"),
        "---\ntags: [unterminated\n---\nThis one never makes it in.",
    )
    .unwrap();
}

async fn open_sqlite(db: &Path, reset: bool) -> KnowledgeStore {
    let index = SqliteIndex::open(db).await.unwrap();
    let mut options = StoreOptions::new("personality");
    options.reset = reset;
    KnowledgeStore::open(Arc::new(index), embedder(), options)
        .await
        .unwrap()
}

#[tokio::test]
async fn malformed_document_is_skipped_and_the_rest_are_stored() {
    let tmp = TempDir::new().unwrap();
    let chunks = tmp.path().join("chunks");
    write_corpus(&chunks);

    let corpus = load_corpus(&chunks, "md", "Hiro").unwrap();
    assert_eq!(corpus.records.len(), 3);
    assert_eq!(corpus.skipped.len(), 1);

    let store = open_sqlite(&tmp.path().join("db"), true).await;
    assert_eq!(store.save(&corpus.records).await.unwrap(), 3);
    assert_eq!(store.count().await.unwrap(), 3);
}

#[tokio::test]
async fn reset_ingestion_is_idempotent() {
    let tmp = TempDir::new().unwrap();
    let chunks = tmp.path().join("chunks");
    let db = tmp.path().join("db");
    write_corpus(&chunks);

    for _ in 0..2 {
        let corpus = load_corpus(&chunks, "md", "Hiro").unwrap();
        let store = open_sqlite(&db, true).await;
        store.save(&corpus.records).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 3);
    }

    // Append mode re-saving the same ids replaces rather than duplicates.
    let corpus = load_corpus(&chunks, "md", "Hiro").unwrap();
    let store = open_sqlite(&db, false).await;
    store.save(&corpus.records).await.unwrap();
    assert_eq!(store.count().await.unwrap(), 3);
}

#[tokio::test]
async fn character_filter_round_trip() {
    let tmp = TempDir::new().unwrap();
    let chunks = tmp.path().join("chunks");
    write_corpus(&chunks);

    let corpus = load_corpus(&chunks, "md", "Hiro").unwrap();
    let store = Arc::new(open_sqlite(&tmp.path().join("db"), true).await);
    store.save(&corpus.records).await.unwrap();

    let dispatcher = ToolDispatcher::new(store, RetrievalLimits::default());

    let hiro = dispatcher
        .call(
            SEARCH_PERSONALITY,
            json!({ "query": "tea", "character": "Hiro", "n_results": 3 }),
        )
        .await
        .unwrap();
    assert!(hiro.starts_with("**Personality data for Hiro:**\n\n"));
    assert!(hiro.contains("**Source:** hiro-habits.md"));
    assert!(hiro.contains("**Tags:** dialogue, speech"));

    let rui = dispatcher
        .call(SEARCH_PERSONALITY, json!({ "query": "tea", "character": "Rui" }))
        .await
        .unwrap();
    assert_eq!(rui, "No personality data found for Rui with query: tea");

    let style = dispatcher
        .call(GET_CHARACTER_DIALOGUE_STYLE, json!({ "character": "Hiro" }))
        .await
        .unwrap();
    assert_eq!(style.matches("**Source:**").count(), 3);

    let traits = dispatcher
        .call(GET_CHARACTER_TRAITS, json!({ "character": "Hiro" }))
        .await
        .unwrap();
    assert!(traits.contains("fiercely loyal"));
}

/// Index wrapper that records every `k` it is asked for.
struct SpyIndex {
    inner: InMemoryIndex,
    requested_k: Mutex<Vec<usize>>,
}

impl SpyIndex {
    fn new() -> Self {
        Self {
            inner: InMemoryIndex::new(),
            requested_k: Mutex::new(Vec::new()),
        }
    }

    fn requested(&self) -> Vec<usize> {
        self.requested_k.lock().unwrap().clone()
    }
}

#[async_trait]
impl VectorIndex for SpyIndex {
    async fn create_collection(&self, name: &str, description: &str) -> Result<()> {
        self.inner.create_collection(name, description).await
    }

    async fn has_collection(&self, name: &str) -> Result<bool> {
        self.inner.has_collection(name).await
    }

    async fn delete_collection_if_exists(&self, name: &str) -> Result<bool> {
        self.inner.delete_collection_if_exists(name).await
    }

    async fn upsert(&self, collection: &str, entries: &[IndexEntry]) -> Result<()> {
        self.inner.upsert(collection, entries).await
    }

    async fn query(
        &self,
        collection: &str,
        vector: &[f32],
        filter: Option<&MetadataFilter>,
        k: usize,
    ) -> Result<Vec<Match>> {
        self.requested_k.lock().unwrap().push(k);
        self.inner.query(collection, vector, filter, k).await
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        self.inner.count(collection).await
    }
}

async fn spy_dispatcher_with(limits: RetrievalLimits) -> (Arc<SpyIndex>, ToolDispatcher) {
    let spy = Arc::new(SpyIndex::new());
    let store = KnowledgeStore::open(spy.clone(), embedder(), StoreOptions::new("personality"))
        .await
        .unwrap();
    (spy, ToolDispatcher::new(Arc::new(store), limits))
}

async fn spy_dispatcher() -> (Arc<SpyIndex>, ToolDispatcher) {
    spy_dispatcher_with(RetrievalLimits::default()).await
}

#[tokio::test]
async fn result_count_is_capped_at_twenty() {
    let (spy, dispatcher) = spy_dispatcher().await;

    dispatcher
        .call(
            SEARCH_PERSONALITY,
            json!({ "query": "dialogue", "character": "Hiro", "n_results": 100 }),
        )
        .await
        .unwrap();
    dispatcher
        .call(SEARCH_PERSONALITY, json!({ "query": "dialogue", "character": "Hiro" }))
        .await
        .unwrap();
    dispatcher
        .call(GET_CHARACTER_TRAITS, json!({ "character": "Hiro" }))
        .await
        .unwrap();

    assert_eq!(spy.requested(), vec![20, 3, 5]);
}

#[tokio::test]
async fn raised_max_results_still_capped_at_twenty() {
    let config = RetrievalConfig {
        max_results: 100,
        ..RetrievalConfig::default()
    };
    let (spy, dispatcher) = spy_dispatcher_with(RetrievalLimits::from(&config)).await;

    dispatcher
        .call(
            SEARCH_PERSONALITY,
            json!({ "query": "dialogue", "character": "Hiro", "n_results": 100 }),
        )
        .await
        .unwrap();

    assert_eq!(spy.requested(), vec![RESULT_CAP]);
}

#[tokio::test]
async fn missing_character_never_reaches_the_index() {
    let (spy, dispatcher) = spy_dispatcher().await;

    let answer = dispatcher
        .call(SEARCH_PERSONALITY, json!({ "query": "dialogue", "character": "" }))
        .await
        .unwrap();
    assert_eq!(answer, MISSING_SEARCH_PARAMS);

    let answer = dispatcher
        .call(GET_CHARACTER_DIALOGUE_STYLE, json!({}))
        .await
        .unwrap();
    assert_eq!(answer, MISSING_CHARACTER);

    assert!(spy.requested().is_empty());
}

#[tokio::test]
async fn unknown_tool_is_a_distinct_error() {
    let (spy, dispatcher) = spy_dispatcher().await;

    let err = dispatcher
        .call("get_character_secrets", json!({ "character": "Hiro" }))
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::UnknownTool(_)));
    assert!(spy.requested().is_empty());
}
