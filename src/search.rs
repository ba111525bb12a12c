//! `persona search`: ad-hoc queries from the command line.
//!
//! With `--character` the output is exactly what the `search_personality`
//! tool would answer. Without it, the raw ranked matches across all
//! characters are listed with their distances, which is handy for checking
//! an ingestion run.

use std::sync::Arc;

use ai_personalities_core::models::Match;
use anyhow::Result;

use crate::config::Config;
use crate::knowledge::{KnowledgeStore, QueryInput};
use crate::retrieval::{PersonalityRetriever, RetrievalLimits};

const EXCERPT_CHARS: usize = 200;

pub async fn run_search(
    config: &Config,
    query: &str,
    character: Option<&str>,
    limit: Option<i64>,
) -> Result<()> {
    let store = Arc::new(KnowledgeStore::open_sqlite(config, false).await?);
    let limits = RetrievalLimits::from(&config.retrieval);

    if let Some(character) = character {
        let retriever = PersonalityRetriever::new(store, limits);
        println!(
            "{}",
            retriever.search_personality(query, character, limit).await
        );
        return Ok(());
    }

    if query.trim().is_empty() {
        println!("No results.");
        return Ok(());
    }

    let k = limits.effective_results(limit);
    let matches = store.raw_query(QueryInput::Text(query), None, k).await?;
    if matches.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, m) in matches.iter().enumerate() {
        print_match(i + 1, m);
    }
    Ok(())
}

fn print_match(rank: usize, m: &Match) {
    println!(
        "{}. [{:.4}] {} ({})",
        rank, m.distance, m.metadata.filename, m.metadata.character
    );
    if !m.metadata.tags.is_empty() {
        println!("    tags: {}", m.metadata.tags);
    }
    println!("    {}", excerpt(&m.document));
    println!();
}

/// First line-folded [`EXCERPT_CHARS`] characters of `text`.
fn excerpt(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= EXCERPT_CHARS {
        return flat;
    }
    let cut: String = flat.chars().take(EXCERPT_CHARS).collect();
    format!("{}…", cut.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_excerpt_folds_whitespace() {
        assert_eq!(excerpt("  one\n\ntwo   three "), "one two three");
    }

    #[test]
    fn test_excerpt_truncates_on_char_boundary() {
        let long = "語".repeat(EXCERPT_CHARS + 10);
        let cut = excerpt(&long);
        assert_eq!(cut.chars().count(), EXCERPT_CHARS + 1);
        assert!(cut.ends_with('…'));
    }
}
