//! Reference scanning: callers and importers of changed symbols outside
//! the diff.
//!
//! Two-phase: a cheap textual pre-filter narrows candidate files before any
//! structural parsing; when the pre-filter is unavailable every tracked file
//! at the ref is scanned instead.

use crate::languages::Language;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

/// How a reference uses the symbol name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefContext {
    Import,
    Call,
}

impl RefContext {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Import => "import",
            Self::Call => "call",
        }
    }
}

/// A reference to a changed symbol found in a non-diff file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub file_path: String,
    /// 1-indexed
    pub line: usize,
    pub symbol_name: String,
    pub context: RefContext,
    /// The trimmed source line containing the reference
    pub source_line: String,
}

/// Repository queries consumed by the scanner. Implementations are free to
/// answer from git, a fixture map, or anything else that can list and read
/// files at a ref.
pub trait RepoQuery {
    /// All tracked file paths at a ref.
    fn ls_files(&self, at_ref: &str) -> Vec<String>;

    /// File content at `ref:path`, or None when absent.
    fn file_at_ref(&self, at_ref: &str, path: &str) -> Option<String>;

    /// Paths whose raw content contains `needle`, restricted to supported
    /// extensions. An empty result may mean "no hits" or "unavailable";
    /// callers treat both the same and fall back to `ls_files`.
    fn grep_files(&self, needle: &str, at_ref: &str) -> Vec<String>;
}

/// Identifier node kinds per language
fn identifier_kinds(language: Language) -> &'static [&'static str] {
    match language {
        Language::Python => &["identifier"],
        Language::TypeScript | Language::JavaScript => &["identifier", "property_identifier"],
        Language::Go => &["identifier", "field_identifier"],
    }
}

/// Node kinds that mark an import context when found among ancestors
const IMPORT_PARENT_KINDS: &[&str] = &[
    "import_statement",
    "import_from_statement",
    "import_clause",
    "import_specifier",
    "import_declaration",
    "import_spec",
];

fn is_import_context(node: &tree_sitter::Node) -> bool {
    let mut current = node.parent();
    while let Some(n) = current {
        if IMPORT_PARENT_KINDS.contains(&n.kind()) {
            return true;
        }
        current = n.parent();
    }
    false
}

/// Find references to changed symbols in files NOT covered by the diff.
///
/// Results are sorted by (file path, line). Files whose language is
/// unsupported or whose content cannot be fetched are silently skipped.
pub fn find_references(
    repo: &dyn RepoQuery,
    changed_symbols: &[String],
    at_ref: &str,
    changed_files: &HashSet<String>,
) -> Vec<Reference> {
    if changed_symbols.is_empty() {
        return Vec::new();
    }

    let symbol_names: HashSet<&str> = changed_symbols.iter().map(String::as_str).collect();

    // Phase 1: textual pre-filter
    let mut candidates: BTreeSet<String> = BTreeSet::new();
    for symbol in &symbol_names {
        for path in repo.grep_files(symbol, at_ref) {
            candidates.insert(path);
        }
    }

    let files_to_scan: Vec<String> = if candidates.is_empty() {
        // Fallback: scan everything tracked at the ref
        repo.ls_files(at_ref)
            .into_iter()
            .filter(|f| !changed_files.contains(f))
            .collect()
    } else {
        candidates
            .into_iter()
            .filter(|f| !changed_files.contains(f))
            .collect()
    };

    let mut references: Vec<Reference> = Vec::new();

    for file_path in files_to_scan {
        let Some(language) = Language::from_path(&file_path) else {
            continue;
        };
        let Some(source) = repo.file_at_ref(at_ref, &file_path) else {
            continue;
        };
        scan_file(&source, language, &symbol_names, &file_path, &mut references);
    }

    references.sort_by(|a, b| (&a.file_path, a.line).cmp(&(&b.file_path, b.line)));
    references
}

/// Phase 2: structural scan of one candidate file.
fn scan_file(
    source: &str,
    language: Language,
    symbol_names: &HashSet<&str>,
    file_path: &str,
    out: &mut Vec<Reference>,
) {
    let mut parser = tree_sitter::Parser::new();
    if parser.set_language(&language.grammar()).is_err() {
        return;
    }
    let Some(tree) = parser.parse(source, None) else {
        return;
    };

    let id_kinds = identifier_kinds(language);
    let source_lines: Vec<&str> = source.lines().collect();

    walk_identifiers(
        &tree.root_node(),
        source,
        id_kinds,
        symbol_names,
        &source_lines,
        file_path,
        out,
    );
}

fn walk_identifiers(
    node: &tree_sitter::Node,
    source: &str,
    id_kinds: &[&str],
    symbol_names: &HashSet<&str>,
    source_lines: &[&str],
    file_path: &str,
    out: &mut Vec<Reference>,
) {
    if id_kinds.contains(&node.kind()) {
        let name = source.get(node.start_byte()..node.end_byte()).unwrap_or("");
        if symbol_names.contains(name) {
            let line = node.start_position().row + 1;
            let context = if is_import_context(node) {
                RefContext::Import
            } else {
                RefContext::Call
            };
            let source_line = source_lines
                .get(line - 1)
                .map(|l| l.trim().to_string())
                .unwrap_or_default();
            out.push(Reference {
                file_path: file_path.to_string(),
                line,
                symbol_name: name.to_string(),
                context,
                source_line,
            });
        }
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk_identifiers(
            &child,
            source,
            id_kinds,
            symbol_names,
            source_lines,
            file_path,
            out,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// In-memory repository fixture
    struct FakeRepo {
        files: HashMap<String, String>,
        grep_enabled: bool,
    }

    impl FakeRepo {
        fn new(files: &[(&str, &str)], grep_enabled: bool) -> Self {
            Self {
                files: files
                    .iter()
                    .map(|(p, c)| (p.to_string(), c.to_string()))
                    .collect(),
                grep_enabled,
            }
        }
    }

    impl RepoQuery for FakeRepo {
        fn ls_files(&self, _at_ref: &str) -> Vec<String> {
            let mut paths: Vec<String> = self.files.keys().cloned().collect();
            paths.sort();
            paths
        }

        fn file_at_ref(&self, _at_ref: &str, path: &str) -> Option<String> {
            self.files.get(path).cloned()
        }

        fn grep_files(&self, needle: &str, _at_ref: &str) -> Vec<String> {
            if !self.grep_enabled {
                return Vec::new();
            }
            let mut hits: Vec<String> = self
                .files
                .iter()
                .filter(|(_, content)| content.contains(needle))
                .map(|(path, _)| path.clone())
                .collect();
            hits.sort();
            hits
        }
    }

    fn changed(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_call_site_found() {
        let repo = FakeRepo::new(
            &[("app.py", "from lib import other\n\nresult = helper(1)\n")],
            true,
        );
        let refs = find_references(&repo, &changed(&["helper"]), "HEAD", &HashSet::new());
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].file_path, "app.py");
        assert_eq!(refs[0].line, 3);
        assert_eq!(refs[0].context, RefContext::Call);
        assert_eq!(refs[0].source_line, "result = helper(1)");
    }

    #[test]
    fn test_import_context_detected() {
        let repo = FakeRepo::new(&[("app.py", "from lib import helper\n")], true);
        let refs = find_references(&repo, &changed(&["helper"]), "HEAD", &HashSet::new());
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].context, RefContext::Import);
    }

    #[test]
    fn test_typescript_import_and_call() {
        let source = "import { helper } from './lib';\n\nhelper();\n";
        let repo = FakeRepo::new(&[("app.ts", source)], true);
        let refs = find_references(&repo, &changed(&["helper"]), "HEAD", &HashSet::new());
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].context, RefContext::Import);
        assert_eq!(refs[1].context, RefContext::Call);
    }

    #[test]
    fn test_diffed_files_excluded() {
        let repo = FakeRepo::new(&[("app.py", "helper()\n")], true);
        let diffed: HashSet<String> = ["app.py".to_string()].into_iter().collect();
        let refs = find_references(&repo, &changed(&["helper"]), "HEAD", &diffed);
        assert!(refs.is_empty());
    }

    #[test]
    fn test_fallback_to_full_listing_when_grep_unavailable() {
        let repo = FakeRepo::new(&[("app.py", "helper()\n")], false);
        let refs = find_references(&repo, &changed(&["helper"]), "HEAD", &HashSet::new());
        assert_eq!(refs.len(), 1);
    }

    #[test]
    fn test_unsupported_files_skipped() {
        let repo = FakeRepo::new(&[("notes.txt", "helper everywhere\n")], true);
        let refs = find_references(&repo, &changed(&["helper"]), "HEAD", &HashSet::new());
        assert!(refs.is_empty());
    }

    #[test]
    fn test_results_sorted_by_path_then_line() {
        let repo = FakeRepo::new(
            &[
                ("b.py", "helper()\n"),
                ("a.py", "x = 1\nhelper()\nhelper()\n"),
            ],
            true,
        );
        let refs = find_references(&repo, &changed(&["helper"]), "HEAD", &HashSet::new());
        let keys: Vec<(&str, usize)> = refs
            .iter()
            .map(|r| (r.file_path.as_str(), r.line))
            .collect();
        assert_eq!(keys, vec![("a.py", 2), ("a.py", 3), ("b.py", 1)]);
    }

    #[test]
    fn test_no_symbols_short_circuits() {
        let repo = FakeRepo::new(&[("app.py", "helper()\n")], true);
        let refs = find_references(&repo, &[], "HEAD", &HashSet::new());
        assert!(refs.is_empty());
    }
}
