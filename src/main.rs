//! # AI Personalities CLI (`persona`)
//!
//! Builds character knowledge stores from personality documents and serves
//! them to AI tools over MCP.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `persona load` | Parse a corpus directory and store it (rebuilds the collection) |
//! | `persona vectorize --output <file>` | Embed a corpus once and write the vectors to a file |
//! | `persona load-vectors <file>` | Store a vector file without re-embedding |
//! | `persona search "<query>"` | Query the store from the command line |
//! | `persona info` | Show the store location, collection, and record count |
//! | `persona serve` | Start the MCP server (stdio, or `--http`) |
//!
//! ## Examples
//!
//! ```bash
//! # Ingest Hiro's documents
//! persona load --chunks-dir ./chunks/hiro --character Hiro
//!
//! # Add Rui's documents to the same collection
//! persona load --chunks-dir ./chunks/rui --character Rui --append
//!
//! # Ask the way an agent would
//! persona search "how does he greet friends" --character Hiro
//!
//! # Serve over stdio for Claude Desktop or Cursor
//! persona serve
//! ```

use std::path::PathBuf;

use ai_personalities::config::{self, Config};
use ai_personalities::{ingest, logging, search, server, stats};
use anyhow::Result;
use clap::{Parser, Subcommand};

/// AI Personalities: character-scoped semantic retrieval over personality documents.
#[derive(Parser)]
#[command(name = "persona", version)]
struct Cli {
    /// Path to a TOML configuration file.
    ///
    /// Optional: every setting has a default and most can also be set
    /// through environment variables (`DB_PATH`, `COLLECTION_NAME`, ...).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Index directory (overrides `db.path` and `DB_PATH`).
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    /// Collection name (overrides `db.collection` and `COLLECTION_NAME`).
    #[arg(long, global = true)]
    collection: Option<String>,

    /// Log at debug level unless `RUST_LOG` says otherwise.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Corpus selection shared by `load` and `vectorize`.
#[derive(clap::Args)]
struct CorpusArgs {
    /// Directory of personality documents (overrides `CHUNKS_DIR`).
    #[arg(long)]
    chunks_dir: Option<PathBuf>,

    /// Character that owns every document in this run (overrides `CHARACTER_NAME`).
    #[arg(long)]
    character: Option<String>,

    /// File extension to ingest, without the dot.
    #[arg(long)]
    extension: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a corpus directory and store its documents.
    ///
    /// Rebuilds the collection from scratch unless `--append` is given.
    /// Files that fail to parse are reported and skipped.
    Load {
        #[command(flatten)]
        corpus: CorpusArgs,

        /// Keep existing records; documents with the same id are replaced.
        #[arg(long)]
        append: bool,
    },

    /// Embed a corpus and write the vectors to a JSON file.
    ///
    /// Does not touch the index. Load the result with `load-vectors`.
    Vectorize {
        #[command(flatten)]
        corpus: CorpusArgs,

        /// Output file.
        #[arg(long, short)]
        output: PathBuf,
    },

    /// Store a vector file produced by `vectorize`.
    LoadVectors {
        /// Vector file to ingest.
        file: PathBuf,

        /// Keep existing records; documents with the same id are replaced.
        #[arg(long)]
        append: bool,
    },

    /// Search the store.
    ///
    /// With `--character`, prints the same answer the `search_personality`
    /// tool returns. Without it, lists raw matches with distances.
    Search {
        /// The search query.
        query: String,

        /// Restrict to one character.
        #[arg(long)]
        character: Option<String>,

        /// Number of results (capped at `retrieval.max_results`).
        #[arg(long)]
        limit: Option<i64>,
    },

    /// Show the store location, collection, and record count.
    Info,

    /// Start the MCP server.
    ///
    /// Speaks MCP over stdin/stdout by default. With `--http`, serves the
    /// Streamable HTTP transport at `server.bind` instead.
    Serve {
        /// Use the Streamable HTTP transport.
        #[arg(long)]
        http: bool,

        /// Listen address for `--http` (overrides `server.bind`).
        #[arg(long)]
        bind: Option<String>,
    },
}

impl CorpusArgs {
    fn apply(self, cfg: &mut Config) {
        if let Some(dir) = self.chunks_dir {
            cfg.corpus.chunks_dir = Some(dir);
        }
        if let Some(character) = self.character {
            cfg.corpus.character = character;
        }
        if let Some(extension) = self.extension {
            cfg.corpus.extension = extension;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init_logging(if cli.verbose { "debug" } else { "info" })?;

    let mut cfg = config::load_config(cli.config.as_deref())?;
    if let Some(path) = cli.db_path {
        cfg.db.path = path;
    }
    if let Some(collection) = cli.collection {
        cfg.db.collection = collection;
    }

    match cli.command {
        Commands::Load { corpus, append } => {
            corpus.apply(&mut cfg);
            cfg.validate()?;
            ingest::run_load(&cfg, append).await?;
        }
        Commands::Vectorize { corpus, output } => {
            corpus.apply(&mut cfg);
            cfg.validate()?;
            ingest::run_vectorize(&cfg, &output).await?;
        }
        Commands::LoadVectors { file, append } => {
            cfg.validate()?;
            ingest::run_load_vectors(&cfg, &file, append).await?;
        }
        Commands::Search {
            query,
            character,
            limit,
        } => {
            cfg.validate()?;
            search::run_search(&cfg, &query, character.as_deref(), limit).await?;
        }
        Commands::Info => {
            cfg.validate()?;
            stats::run_info(&cfg).await?;
        }
        Commands::Serve { http, bind } => {
            if let Some(bind) = bind {
                cfg.server.bind = bind;
            }
            cfg.validate()?;
            if http {
                server::serve_http(&cfg).await?;
            } else {
                server::serve_stdio(&cfg).await?;
            }
        }
    }

    Ok(())
}
