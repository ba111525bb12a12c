//! Retrieval Service: the character-scoped query contract.
//!
//! Every answer is plain text meant to be shown to a calling agent as-is.
//! Missing parameters, empty results, and query failures all produce a
//! readable message instead of an error, and internal error detail only
//! reaches the log.

use std::sync::Arc;
use std::time::Duration;

use ai_personalities_core::models::{Match, MetadataFilter};

use crate::config::{RetrievalConfig, RESULT_CAP};
use crate::knowledge::{KnowledgeStore, QueryInput};

pub const DIALOGUE_STYLE_QUERY: &str = "dialogue style speech patterns talking";
pub const TRAITS_QUERY: &str = "personality traits character behavior";

pub const MISSING_SEARCH_PARAMS: &str = "Error: Both query and character are required.";
pub const MISSING_CHARACTER: &str = "Error: Character name is required";
pub const SEARCH_FAILED: &str = "Error searching personality data";

/// Result-count and latency bounds for queries.
#[derive(Debug, Clone)]
pub struct RetrievalLimits {
    pub default_results: usize,
    pub max_results: usize,
    pub profile_results: usize,
    pub timeout: Duration,
}

impl Default for RetrievalLimits {
    fn default() -> Self {
        Self::from(&RetrievalConfig::default())
    }
}

impl From<&RetrievalConfig> for RetrievalLimits {
    fn from(config: &RetrievalConfig) -> Self {
        Self {
            default_results: config.default_results,
            max_results: config.max_results,
            profile_results: config.profile_results,
            timeout: Duration::from_secs(config.query_timeout_secs),
        }
    }
}

impl RetrievalLimits {
    /// Resolve a caller-requested result count: default when absent, then
    /// clamped to `1..=max_results`, and never above [`RESULT_CAP`].
    pub fn effective_results(&self, requested: Option<i64>) -> usize {
        let max = self.max_results.clamp(1, RESULT_CAP);
        match requested {
            None => self.default_results.clamp(1, max),
            Some(n) => n.clamp(1, max as i64) as usize,
        }
    }
}

/// Read-only query front end over a [`KnowledgeStore`].
pub struct PersonalityRetriever {
    store: Arc<KnowledgeStore>,
    limits: RetrievalLimits,
}

impl PersonalityRetriever {
    pub fn new(store: Arc<KnowledgeStore>, limits: RetrievalLimits) -> Self {
        Self { store, limits }
    }

    /// Search `character`'s documents for `query`.
    pub async fn search_personality(
        &self,
        query: &str,
        character: &str,
        n_results: Option<i64>,
    ) -> String {
        if query.trim().is_empty() || character.trim().is_empty() {
            return MISSING_SEARCH_PARAMS.to_string();
        }

        let k = self.limits.effective_results(n_results);
        let search_text = format!("{} {}", character, query);
        let filter = MetadataFilter::character(character);

        let outcome = tokio::time::timeout(
            self.limits.timeout,
            self.store
                .raw_query(QueryInput::Text(&search_text), Some(&filter), k),
        )
        .await;

        match outcome {
            Ok(Ok(matches)) if matches.is_empty() => format!(
                "No personality data found for {} with query: {}",
                character, query
            ),
            Ok(Ok(matches)) => format_matches(character, &matches),
            Ok(Err(e)) => {
                tracing::error!(character, error = %format!("{:#}", e), "Error searching personality data");
                SEARCH_FAILED.to_string()
            }
            Err(_) => {
                tracing::error!(
                    character,
                    timeout = ?self.limits.timeout,
                    "Personality search timed out"
                );
                SEARCH_FAILED.to_string()
            }
        }
    }

    /// How `character` talks.
    pub async fn dialogue_style(&self, character: &str) -> String {
        self.profile(character, DIALOGUE_STYLE_QUERY).await
    }

    /// What `character` is like.
    pub async fn traits(&self, character: &str) -> String {
        self.profile(character, TRAITS_QUERY).await
    }

    async fn profile(&self, character: &str, query: &str) -> String {
        if character.trim().is_empty() {
            return MISSING_CHARACTER.to_string();
        }
        let n = self.limits.profile_results as i64;
        self.search_personality(query, character, Some(n)).await
    }
}

/// Render ranked matches as the answer text, keeping the index order.
pub fn format_matches(character: &str, matches: &[Match]) -> String {
    let blocks: Vec<String> = matches
        .iter()
        .map(|m| {
            let filename = if m.metadata.filename.is_empty() {
                "unknown"
            } else {
                m.metadata.filename.as_str()
            };
            format!(
                "\n**Source:** {}\n**Tags:** {}\n**Content:**\n{}\n\n---\n",
                filename, m.metadata.tags, m.document
            )
        })
        .collect();

    format!(
        "**Personality data for {}:**\n\n{}",
        character,
        blocks.join("\n")
    )
}
