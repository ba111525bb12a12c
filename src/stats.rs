//! `persona info`: what is stored where.

use anyhow::Result;

use crate::config::Config;
use crate::db;
use crate::knowledge::KnowledgeStore;

pub async fn run_info(config: &Config) -> Result<()> {
    let store = KnowledgeStore::open_sqlite(config, false).await?;
    let count = store.count().await?;

    let index_path = db::index_file(&config.db.path);
    let size = std::fs::metadata(&index_path).map(|m| m.len()).unwrap_or(0);

    println!("AI Personalities Knowledge Store");
    println!("================================");
    println!();
    println!("  Database:    {}", config.db.path.display());
    println!("  Index file:  {} ({})", index_path.display(), format_bytes(size));
    println!("  Collection:  {}", store.collection_name());
    println!("  Records:     {}", count);
    println!(
        "  Embedder:    {} ({} dims)",
        store.embedder().model_name(),
        store.embedder().dims()
    );

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }
}
