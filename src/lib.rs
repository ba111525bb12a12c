//! # AI Personalities
//!
//! Character-scoped semantic retrieval over personality documents, served
//! to AI tools through MCP.
//!
//! Personality documents are Markdown files with optional YAML frontmatter.
//! They are parsed, embedded, and stored in a collection where every record
//! carries the character it describes. At query time a calling agent asks
//! for passages about one character, and only that character's documents
//! are searched.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌────────────────┐   ┌─────────────┐
//! │ *.md     │──▶│ Parser + │──▶│ KnowledgeStore │──▶│ SqliteIndex │
//! │ corpus   │   │ Loader   │   │ embed + upsert │   │ (WAL)       │
//! └──────────┘   └──────────┘   └───────▲────────┘   └─────────────┘
//!                                       │ raw_query
//!                               ┌───────┴────────┐   ┌─────────────┐
//!                               │ Retriever +    │◀──│ MCP bridge  │
//!                               │ ToolDispatcher │   │ stdio/HTTP  │
//!                               └────────────────┘   └─────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML + environment configuration |
//! | [`logging`] | Tracing subscriber setup (stderr) |
//! | [`parser`] | Frontmatter document → record |
//! | [`loader`] | Corpus directory scan |
//! | [`embedding`] | Embedding providers |
//! | [`db`] | Database connection |
//! | [`migrate`] | Index schema |
//! | [`sqlite_index`] | SQLite vector index |
//! | [`knowledge`] | Knowledge Store (collection lifecycle, save, query) |
//! | [`retrieval`] | Character-scoped query contract and answer formatting |
//! | [`dispatcher`] | Named tools over the retriever |
//! | [`mcp`] | MCP protocol bridge |
//! | [`server`] | stdio and Streamable HTTP transports |
//! | [`vectors`] | Precomputed vector files |
//! | [`ingest`], [`search`], [`stats`] | CLI commands |

pub mod config;
pub mod db;
pub mod dispatcher;
pub mod embedding;
pub mod ingest;
pub mod knowledge;
pub mod loader;
pub mod logging;
pub mod mcp;
pub mod migrate;
pub mod parser;
pub mod retrieval;
pub mod search;
pub mod server;
pub mod sqlite_index;
pub mod stats;
pub mod vectors;

pub use ai_personalities_core::models::{DocumentMetadata, DocumentRecord, Match, MetadataFilter};
