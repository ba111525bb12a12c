//! # AI Personalities Core
//!
//! Shared, platform-neutral logic for AI Personalities: the document
//! model, the vector index capability, an in-memory index, and the
//! embedding capability.
//!
//! This crate contains no tokio, sqlx, filesystem I/O, or other
//! native-only dependencies. Storage engines and embedding models live in
//! the `ai-personalities` app crate and plug in through [`index::VectorIndex`]
//! and [`embedding::Embedder`].

pub mod embedding;
pub mod index;
pub mod models;
