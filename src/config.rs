//! Configuration loading.
//!
//! Settings come from three layers, later layers winning:
//!
//! 1. Built-in defaults (every field has one).
//! 2. An optional TOML file (`--config`).
//! 3. Environment variables ([`ENV_DB_PATH`] and friends).
//!
//! CLI flags are applied on top by the binary. The result is validated by
//! [`load_config`] and then treated as read-only for the process lifetime.
//!
//! ```toml
//! [db]
//! path = "./personality_db"
//! collection = "personality"
//!
//! [corpus]
//! chunks_dir = "./chunks"
//! character = "Hiro"
//!
//! [embedding]
//! provider = "local"
//! model = "multilingual-e5-base"
//! query_prefix = "query: "
//! passage_prefix = "passage: "
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_DB_PATH: &str = "./personality_db";
pub const DEFAULT_COLLECTION_NAME: &str = "personality";
pub const DEFAULT_CHARACTER_NAME: &str = "unknown";
pub const DEFAULT_SERVER_NAME: &str = "ai-personalities";

/// Upper bound on results per query. `retrieval.max_results` may lower it, never raise it.
pub const RESULT_CAP: usize = 20;

pub const ENV_CHUNKS_DIR: &str = "CHUNKS_DIR";
pub const ENV_DB_PATH: &str = "DB_PATH";
pub const ENV_COLLECTION_NAME: &str = "COLLECTION_NAME";
pub const ENV_CHARACTER_NAME: &str = "CHARACTER_NAME";
pub const ENV_SERVER_NAME: &str = "SERVER_NAME";
pub const ENV_EMBEDDING_PROVIDER: &str = "EMBEDDING_PROVIDER";

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub db: DbConfig,
    pub corpus: CorpusConfig,
    pub retrieval: RetrievalConfig,
    pub embedding: EmbeddingConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DbConfig {
    /// Directory holding the persistent index.
    pub path: PathBuf,
    pub collection: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_DB_PATH),
            collection: DEFAULT_COLLECTION_NAME.to_string(),
        }
    }
}

/// What happens when writing a batch to the index fails.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SavePolicy {
    /// Log the failure and carry on; the save reports zero records written.
    #[default]
    BestEffort,
    /// Propagate the failure to the caller.
    Atomic,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CorpusConfig {
    pub chunks_dir: Option<PathBuf>,
    pub character: String,
    /// File extension (without the dot) of ingestible documents.
    pub extension: String,
    pub reset_collection: bool,
    pub save_policy: SavePolicy,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            chunks_dir: None,
            character: DEFAULT_CHARACTER_NAME.to_string(),
            extension: "md".to_string(),
            reset_collection: true,
            save_policy: SavePolicy::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    pub default_results: usize,
    pub max_results: usize,
    /// Result count for the dialogue-style and traits shortcuts.
    pub profile_results: usize,
    pub query_timeout_secs: u64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_results: 3,
            max_results: RESULT_CAP,
            profile_results: 5,
            query_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// `local`, `openai`, `ollama`, or `hash`.
    pub provider: String,
    pub model: Option<String>,
    pub dims: Option<usize>,
    /// Base URL for the Ollama provider.
    pub url: Option<String>,
    pub batch_size: usize,
    pub max_retries: u32,
    pub timeout_secs: u64,
    /// Prepended to query text before embedding (E5 models expect `"query: "`).
    pub query_prefix: String,
    /// Prepended to document text before embedding (E5 models expect `"passage: "`).
    pub passage_prefix: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "local".to_string(),
            model: None,
            dims: None,
            url: None,
            batch_size: 64,
            max_retries: 5,
            timeout_secs: 30,
            query_prefix: String::new(),
            passage_prefix: String::new(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    /// Server identity reported to MCP clients.
    pub name: String,
    /// Listen address for the streamable HTTP transport.
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_SERVER_NAME.to_string(),
            bind: "127.0.0.1:7341".to_string(),
        }
    }
}

impl Config {
    /// Overlay environment variables read through `lookup`.
    ///
    /// Empty values are treated as unset.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get(ENV_DB_PATH) {
            self.db.path = PathBuf::from(v);
        }
        if let Some(v) = get(ENV_COLLECTION_NAME) {
            self.db.collection = v;
        }
        if let Some(v) = get(ENV_CHUNKS_DIR) {
            self.corpus.chunks_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = get(ENV_CHARACTER_NAME) {
            self.corpus.character = v;
        }
        if let Some(v) = get(ENV_SERVER_NAME) {
            self.server.name = v;
        }
        if let Some(v) = get(ENV_EMBEDDING_PROVIDER) {
            self.embedding.provider = v;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.db.collection.trim().is_empty() {
            bail!("db.collection must not be empty");
        }

        let r = &self.retrieval;
        if !(1..=RESULT_CAP).contains(&r.max_results) {
            bail!("retrieval.max_results must be in [1, {}]", RESULT_CAP);
        }
        if !(1..=r.max_results).contains(&r.default_results) {
            bail!(
                "retrieval.default_results must be in [1, {}]",
                r.max_results
            );
        }
        if !(1..=r.max_results).contains(&r.profile_results) {
            bail!(
                "retrieval.profile_results must be in [1, {}]",
                r.max_results
            );
        }

        let e = &self.embedding;
        if e.batch_size == 0 {
            bail!("embedding.batch_size must be > 0");
        }
        match e.provider.as_str() {
            "local" | "hash" => {}
            "openai" | "ollama" => {
                if e.model.is_none() {
                    bail!(
                        "embedding.model must be specified when provider is '{}'",
                        e.provider
                    );
                }
                if e.dims.is_none() || e.dims == Some(0) {
                    bail!(
                        "embedding.dims must be > 0 when provider is '{}'",
                        e.provider
                    );
                }
            }
            other => bail!(
                "Unknown embedding provider: '{}'. Must be local, openai, ollama, or hash.",
                other
            ),
        }
        if e.provider == "hash" && e.dims == Some(0) {
            bail!("embedding.dims must be > 0 when provider is 'hash'");
        }

        Ok(())
    }
}

/// Load configuration from an optional TOML file plus the process environment.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let mut config = match path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            toml::from_str::<Config>(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        }
        None => Config::default(),
    };

    config.apply_env(|key| std::env::var(key).ok());
    config.validate()?;
    Ok(config)
}
