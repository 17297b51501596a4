//! Per-language tree-sitter support and the extension registry

pub mod go;
pub mod python;
pub mod typescript;

use crate::symbol::Symbol;
use serde::{Deserialize, Serialize};

/// A supported source language, detected from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    TypeScript,
    JavaScript,
    Go,
}

impl Language {
    /// Detect language from a path's extension, or None if unsupported.
    pub fn from_path(path: &str) -> Option<Self> {
        let ext = path.rsplit_once('.').map(|(_, e)| e)?;
        match ext {
            "py" => Some(Self::Python),
            "ts" | "tsx" => Some(Self::TypeScript),
            "js" | "jsx" => Some(Self::JavaScript),
            "go" => Some(Self::Go),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::TypeScript => "typescript",
            Self::JavaScript => "javascript",
            Self::Go => "go",
        }
    }

    /// Glob patterns covering every supported extension, for textual
    /// pre-filtering of candidate files.
    pub fn extension_globs() -> &'static [&'static str] {
        &["*.py", "*.ts", "*.js", "*.go", "*.tsx", "*.jsx"]
    }

    pub fn grammar(self) -> tree_sitter::Language {
        match self {
            Self::Python => tree_sitter_python::LANGUAGE.into(),
            Self::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Self::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
            Self::Go => tree_sitter_go::LANGUAGE.into(),
        }
    }

    /// Extract symbols from a parsed tree. The TypeScript extractor serves
    /// JavaScript as well; the grammars share the relevant node kinds.
    pub fn extract_symbols(self, tree: &tree_sitter::Tree, source: &str) -> Vec<Symbol> {
        match self {
            Self::Python => python::extract_symbols(tree, source),
            Self::TypeScript | Self::JavaScript => typescript::extract_symbols(tree, source),
            Self::Go => go::extract_symbols(tree, source),
        }
    }
}

pub(crate) fn node_text(node: &tree_sitter::Node, source: &str) -> String {
    source
        .get(node.start_byte()..node.end_byte())
        .unwrap_or("")
        .to_string()
}

pub(crate) fn start_line(node: &tree_sitter::Node) -> usize {
    node.start_position().row + 1
}

pub(crate) fn end_line(node: &tree_sitter::Node) -> usize {
    node.end_position().row + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_detection() {
        assert_eq!(Language::from_path("src/app.py"), Some(Language::Python));
        assert_eq!(Language::from_path("src/app.ts"), Some(Language::TypeScript));
        assert_eq!(Language::from_path("ui/App.tsx"), Some(Language::TypeScript));
        assert_eq!(Language::from_path("lib/util.js"), Some(Language::JavaScript));
        assert_eq!(Language::from_path("ui/App.jsx"), Some(Language::JavaScript));
        assert_eq!(Language::from_path("cmd/main.go"), Some(Language::Go));
        assert_eq!(Language::from_path("data.csv"), None);
        assert_eq!(Language::from_path("Makefile"), None);
    }

    #[test]
    fn test_grammars_load() {
        for lang in [
            Language::Python,
            Language::TypeScript,
            Language::JavaScript,
            Language::Go,
        ] {
            let mut parser = tree_sitter::Parser::new();
            assert!(parser.set_language(&lang.grammar()).is_ok());
        }
    }
}
