//! Drift Core - Symbol-level diff analysis
//!
//! This library turns a unified git diff into a structured, priority-ranked
//! report of symbol-level changes across Python, TypeScript/JavaScript, and
//! Go, flagging breaking API changes and locating affected callers.

pub mod classifier;
pub mod config;
pub mod diff;
pub mod error;
pub mod git;
pub mod languages;
pub mod matcher;
pub mod parse;
pub mod pipeline;
pub mod refs;
pub mod schema;
pub mod signatures;
pub mod summarizer;
pub mod symbol;

pub use config::Config;
pub use error::DriftError;
pub use git::GitRepo;
pub use languages::Language;
pub use pipeline::{run_pipeline, ContentProvider, PipelineOptions};
pub use refs::{find_references, RefContext, Reference, RepoQuery};
pub use schema::{
    AnalysisOutput, ChangeKind, ChangeType, FileChange, Summary, SymbolChange, TieredSummary,
    SCHEMA_VERSION,
};
pub use signatures::{classify_signature_change, is_breaking_change, ChangeCategory};
pub use summarizer::is_test_file;
pub use symbol::{Symbol, SymbolKind};

/// Result type alias for drift operations
pub type Result<T> = std::result::Result<T, DriftError>;
