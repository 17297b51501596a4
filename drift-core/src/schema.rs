//! Output schema: the versioned contract with presentation layers.
//!
//! Every record here round-trips losslessly through JSON; CLI formatting,
//! hook scripts, and agent consumers all read this structure and nothing else.

use crate::languages::Language;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const SCHEMA_VERSION: &str = "1.1";

/// File-level change type from the diff headers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Added,
    Removed,
    Modified,
}

/// Kind of a symbol-level change
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    FunctionAdded,
    FunctionRemoved,
    FunctionModified,
    ClassAdded,
    ClassRemoved,
    ClassModified,
    SignatureChanged,
    Moved,
}

impl ChangeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FunctionAdded => "function_added",
            Self::FunctionRemoved => "function_removed",
            Self::FunctionModified => "function_modified",
            Self::ClassAdded => "class_added",
            Self::ClassRemoved => "class_removed",
            Self::ClassModified => "class_modified",
            Self::SignatureChanged => "signature_changed",
            Self::Moved => "moved",
        }
    }

    pub fn is_added(self) -> bool {
        matches!(self, Self::FunctionAdded | Self::ClassAdded)
    }

    pub fn is_removed(self) -> bool {
        matches!(self, Self::FunctionRemoved | Self::ClassRemoved)
    }

    pub fn is_modified(self) -> bool {
        matches!(self, Self::FunctionModified | Self::ClassModified)
    }
}

/// A single symbol-level change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolChange {
    pub kind: ChangeKind,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before_signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after_signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(default)]
    pub breaking: bool,
}

/// A changed file with its symbol-level changes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileChange {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<Language>,
    pub change_type: ChangeType,
    #[serde(default)]
    pub generated: bool,
    #[serde(default)]
    pub binary: bool,
    #[serde(default)]
    pub parse_error: bool,
    #[serde(default)]
    pub unsupported_language: bool,
    #[serde(default)]
    pub changes: Vec<SymbolChange>,
}

impl FileChange {
    /// Minimal record for files that never enter symbol extraction
    pub fn skipped(path: impl Into<String>, change_type: ChangeType) -> Self {
        Self {
            path: path.into(),
            language: None,
            change_type,
            generated: false,
            binary: false,
            parse_error: false,
            unsupported_language: false,
            changes: Vec::new(),
        }
    }
}

/// Diff statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffStats {
    pub files: usize,
    pub additions: usize,
    pub deletions: usize,
}

/// Run metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meta {
    pub ref_range: String,
    pub stats: DiffStats,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timing_ms: Option<f64>,
}

/// Aggregate summary of changes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    #[serde(default)]
    pub change_types: BTreeMap<ChangeKind, usize>,
    #[serde(default)]
    pub breaking_changes: Vec<SymbolChange>,
    /// Top-priority change labels for reviewer agents (at most 5)
    #[serde(default)]
    pub focus: Vec<String>,
}

/// Multi-tier human-readable summary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TieredSummary {
    #[serde(default)]
    pub oneliner: String,
    #[serde(default)]
    pub short: String,
    #[serde(default)]
    pub detailed: String,
}

/// Top-level analysis output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisOutput {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    pub meta: Meta,
    #[serde(default)]
    pub files: Vec<FileChange>,
    #[serde(default)]
    pub summary: Summary,
    #[serde(default)]
    pub tiered: TieredSummary,
}

fn default_schema_version() -> String {
    SCHEMA_VERSION.to_string()
}
