//! # Manuload - legacy manuscript catalog import pipeline
//!
//! Manuload ingests a decades-old tabular catalog of manuscript metadata
//! (collections, languages, documents, citations, contributor history) and
//! converts it into normalized, cross-referenced records in a target store.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌──────────────┐     ┌───────────┐
//! │ CSV exports │────▶│   Reader    │────▶│   Importer   │────▶│   Store   │
//! │  (remote)   │     │ (aliases +  │     │ (caches +    │     │ (records  │
//! │             │     │  encoding)  │     │  heuristics) │     │  + log)   │
//! └─────────────┘     └─────────────┘     └──────────────┘     └───────────┘
//! ```
//!
//! The hard part is the middle: the input is inconsistent free text authored
//! by many humans over decades, so the document pass leans on heuristic
//! parsers — the edit-history reconstructor and the citation parser — with
//! documented fallback policies rather than simple field mapping.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use manuload::{ImportConfig, Importer};
//! use manuload::store::memory::MemoryStore;
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = MemoryStore::new();
//!     let config = ImportConfig::from_env();
//!     let stats = Importer::new(&store, config).run().await.unwrap();
//!     println!("Imported {} documents", stats.documents);
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`config`] - Table URL and identity configuration
//! - [`models`] - Domain entities
//! - [`reader`] - Remote CSV to field-named records
//! - [`store`] - Persistence contract + in-memory reference backend
//! - [`resolve`] - Entity resolution caches
//! - [`fixtures`] - Seed identities and citation creators
//! - [`importer`] - The pipeline: collections, languages, documents,
//!   edit history, citations, joins, sequence finalizer

// Core modules
pub mod error;
pub mod models;

// Configuration
pub mod config;

// Row source
pub mod reader;

// Persistence contract
pub mod store;

// Caches & seed data
pub mod fixtures;
pub mod resolve;

// Pipeline
pub mod importer;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{ConfigError, CsvError, ImportError, ImportResult, StoreError};

// =============================================================================
// Re-exports - Configuration
// =============================================================================

pub use config::ImportConfig;

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    Collection, Creator, DocRelation, Document, DocumentType, EventKind, Footnote, Fragment,
    LanguageScript, Side, Source, SourceType, TextBlock, User,
};

// =============================================================================
// Re-exports - Reader
// =============================================================================

pub use reader::{fetch_table, parse_table, Row, Table};

// =============================================================================
// Re-exports - Store
// =============================================================================

pub use store::{SourceCriteria, Store};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use importer::{ImportStats, Importer};
