//! SQLite database connection management.
//!
//! The persistent index lives in a single file, [`INDEX_FILE_NAME`], inside
//! the configured `db.path` directory. The directory and file are created
//! on first use.
//!
//! # Write-Ahead Logging (WAL)
//!
//! WAL mode is enabled for all connections so that the MCP server can keep
//! answering queries while a separate `persona load` process writes.

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::{Path, PathBuf};

pub const INDEX_FILE_NAME: &str = "index.sqlite3";

/// Location of the index database inside `db_dir`.
pub fn index_file(db_dir: &Path) -> PathBuf {
    db_dir.join(INDEX_FILE_NAME)
}

/// Open a connection pool to the index rooted at `db_dir`.
pub async fn connect(db_dir: &Path) -> Result<SqlitePool> {
    std::fs::create_dir_all(db_dir)
        .with_context(|| format!("Failed to create database directory: {}", db_dir.display()))?;

    let options = SqliteConnectOptions::new()
        .filename(index_file(db_dir))
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to open index at {}", db_dir.display()))?;

    Ok(pool)
}
