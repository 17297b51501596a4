//! Symbol model shared by extraction, matching, and classification

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Kind of an extracted symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Function,
    Method,
    Class,
}

impl SymbolKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Method => "method",
            Self::Class => "class",
        }
    }
}

/// A symbol extracted from source code.
///
/// Immutable once extracted: created during one parse call, compared during
/// matching, and discarded at the end of the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    /// Full reconstructed signature text (includes decorator lines for Python)
    pub signature: String,
    /// 1-indexed line numbers
    pub start_line: usize,
    pub end_line: usize,
    /// Hash of the body text, insensitive to whitespace-only edits
    pub body_hash: String,
    /// Enclosing class name for methods
    pub parent: Option<String>,
}

impl Symbol {
    /// Stable in-file identity key. Two distinct symbols in one file never
    /// share name, kind, parent, and exact line span.
    pub fn identity(&self) -> (String, SymbolKind, Option<String>, usize, usize) {
        (
            self.name.clone(),
            self.kind,
            self.parent.clone(),
            self.start_line,
            self.end_line,
        )
    }
}

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Hash body text with whitespace runs collapsed, so formatting-only edits
/// hash identically while any token-level edit changes the digest.
pub fn compute_body_hash(body: &str) -> String {
    let normalized = WHITESPACE_RUN.replace_all(body.trim(), " ");
    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_hash_ignores_whitespace_runs() {
        let a = compute_body_hash("return  a +\n    b");
        let b = compute_body_hash("return a + b");
        assert_eq!(a, b);
    }

    #[test]
    fn test_body_hash_trims_ends() {
        assert_eq!(compute_body_hash("  x = 1  "), compute_body_hash("x = 1"));
    }

    #[test]
    fn test_body_hash_sensitive_to_tokens() {
        assert_ne!(compute_body_hash("return 1"), compute_body_hash("return 2"));
    }

    #[test]
    fn test_kind_as_str() {
        assert_eq!(SymbolKind::Function.as_str(), "function");
        assert_eq!(SymbolKind::Method.as_str(), "method");
        assert_eq!(SymbolKind::Class.as_str(), "class");
    }
}
