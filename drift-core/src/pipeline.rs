//! End-to-end pipeline: unified diff text to a full [`AnalysisOutput`].
//!
//! One invocation owns all of its state and runs to completion before
//! returning; there is no cross-run cache, so concurrent invocations need
//! no synchronization.

use crate::classifier::classify_changes;
use crate::diff::{generated_patterns, parse_diff, FileDiff};
use crate::languages::Language;
use crate::matcher::{match_cross_file, match_symbols, MatchedSymbol};
use crate::parse::parse_source;
use crate::schema::{AnalysisOutput, ChangeKind, DiffStats, FileChange, Meta, SCHEMA_VERSION};
use crate::summarizer::{build_summary, build_tiered_summary};
use crate::symbol::Symbol;
use std::collections::{HashMap, HashSet};
use std::time::Instant;

/// Source text lookup at a ref. The core never performs version-control IO
/// itself; it is handed this abstraction.
pub trait ContentProvider {
    /// Source text at `ref:path`, or None when the file did not exist there.
    fn content(&self, at_ref: &str, path: &str) -> Option<String>;
}

impl<F> ContentProvider for F
where
    F: Fn(&str, &str) -> Option<String>,
{
    fn content(&self, at_ref: &str, path: &str) -> Option<String> {
        self(at_ref, path)
    }
}

/// Options for one pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    /// Never flag files as generated
    pub skip_generated: bool,
    /// Fold test-file symbols into summary text
    pub include_tests: bool,
    /// List generated/binary/unsupported files in detailed output
    pub show_skipped: bool,
    /// Appended to the built-in generated-file pattern table
    pub extra_generated_patterns: Vec<String>,
}

/// Per-run staging for the deferred cross-file move pass. Created at the
/// start of an invocation and dropped at the end; never shared.
#[derive(Default)]
struct RunContext {
    unmatched_old: Vec<(String, Vec<Symbol>)>,
    unmatched_new: Vec<(String, Vec<Symbol>)>,
}

/// Run the full analysis pipeline on a unified diff.
///
/// `ref_range` (for example `abc123..def456`) resolves the old/new sides for
/// content lookup and is recorded as metadata. Without a content provider,
/// symbol analysis is skipped and only diff-level stats are reported.
pub fn run_pipeline(
    diff_text: &str,
    ref_range: &str,
    provider: Option<&dyn ContentProvider>,
    options: &PipelineOptions,
) -> AnalysisOutput {
    let started = Instant::now();

    let patterns = generated_patterns(&options.extra_generated_patterns);
    let file_diffs = parse_diff(diff_text, &patterns, options.skip_generated);
    tracing::debug!(files = file_diffs.len(), "parsed diff");

    let mut ctx = RunContext::default();
    let mut file_changes: Vec<FileChange> = file_diffs
        .iter()
        .map(|fd| process_file(fd, ref_range, provider, &mut ctx))
        .collect();

    // Cross-file moves, deferred until every file's unmatched set is final
    if !ctx.unmatched_old.is_empty() && !ctx.unmatched_new.is_empty() {
        let moves = match_cross_file(&ctx.unmatched_old, &ctx.unmatched_new);
        tracing::debug!(moves = moves.len(), "cross-file move pass");
        apply_moves(&moves, &mut file_changes);
    }

    let total_add: usize = file_diffs.iter().map(FileDiff::additions).sum();
    let total_del: usize = file_diffs.iter().map(FileDiff::deletions).sum();

    let summary = build_summary(&file_changes);
    let tiered = build_tiered_summary(
        &file_changes,
        &summary,
        options.include_tests,
        options.show_skipped,
    );

    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
    let meta = Meta {
        ref_range: ref_range.to_string(),
        stats: DiffStats {
            files: file_diffs.len(),
            additions: total_add,
            deletions: total_del,
        },
        warnings: Vec::new(),
        timing_ms: Some((elapsed_ms * 100.0).round() / 100.0),
    };

    AnalysisOutput {
        schema_version: SCHEMA_VERSION.to_string(),
        meta,
        files: file_changes,
        summary,
        tiered,
    }
}

/// Resolve (old, new) refs from a range label. `a..b` splits; a single ref
/// compares against its first parent.
fn resolve_refs(ref_range: &str) -> (String, String) {
    match ref_range.split_once("..") {
        Some((old, new)) => (old.to_string(), new.to_string()),
        None => (format!("{ref_range}~1"), ref_range.to_string()),
    }
}

fn process_file(
    fd: &FileDiff,
    ref_range: &str,
    provider: Option<&dyn ContentProvider>,
    ctx: &mut RunContext,
) -> FileChange {
    let path = fd.path().to_string();

    if fd.generated {
        let mut fc = FileChange::skipped(path, fd.change_type);
        fc.generated = true;
        return fc;
    }
    if fd.binary {
        let mut fc = FileChange::skipped(path, fd.change_type);
        fc.binary = true;
        return fc;
    }

    let Some(language) = Language::from_path(&path) else {
        let mut fc = FileChange::skipped(path, fd.change_type);
        fc.unsupported_language = true;
        return fc;
    };

    let Some(provider) = provider else {
        let mut fc = FileChange::skipped(path, fd.change_type);
        fc.language = Some(language);
        return fc;
    };

    let (old_ref, new_ref) = resolve_refs(ref_range);

    let old_source = fd
        .old_path
        .as_deref()
        .and_then(|p| provider.content(&old_ref, p));
    let new_source = fd
        .new_path
        .as_deref()
        .and_then(|p| provider.content(&new_ref, p));

    let mut old_symbols: Vec<Symbol> = Vec::new();
    let mut new_symbols: Vec<Symbol> = Vec::new();
    let mut parse_error = false;

    if let Some(source) = &old_source {
        let pr = parse_source(source, language);
        parse_error |= pr.parse_error;
        old_symbols = pr.symbols;
    }
    if let Some(source) = &new_source {
        let pr = parse_source(source, language);
        parse_error |= pr.parse_error;
        new_symbols = pr.symbols;
    }

    let matches = match_symbols(&old_symbols, &new_symbols);
    let changes = classify_changes(&matches);

    // Stage symbols left unmatched for the deferred cross-file move pass.
    // Membership is tracked by stable identity keys, not references.
    let matched_old: HashSet<_> = matches
        .iter()
        .filter(|m| m.old.is_some() && m.new.is_some())
        .map(|m| m.old.as_ref().unwrap().identity())
        .collect();
    let matched_new: HashSet<_> = matches
        .iter()
        .filter(|m| m.old.is_some() && m.new.is_some())
        .map(|m| m.new.as_ref().unwrap().identity())
        .collect();

    let um_old: Vec<Symbol> = old_symbols
        .into_iter()
        .filter(|s| !matched_old.contains(&s.identity()))
        .collect();
    let um_new: Vec<Symbol> = new_symbols
        .into_iter()
        .filter(|s| !matched_new.contains(&s.identity()))
        .collect();
    if !um_old.is_empty() {
        ctx.unmatched_old.push((path.clone(), um_old));
    }
    if !um_new.is_empty() {
        ctx.unmatched_new.push((path.clone(), um_new));
    }

    FileChange {
        path,
        language: Some(language),
        change_type: fd.change_type,
        generated: false,
        binary: false,
        parse_error,
        unsupported_language: false,
        changes,
    }
}

/// Inject move changes and drop the stale added/removed entries they replace,
/// touching exactly the source and destination files of each move.
fn apply_moves(moves: &[MatchedSymbol], file_changes: &mut [FileChange]) {
    let move_changes = classify_changes(moves);

    // name -> (source, destination)
    let move_paths: HashMap<&str, (&str, &str)> = moves
        .iter()
        .filter_map(|m| {
            let name = m.old.as_ref()?.name.as_str();
            Some((name, (m.file_from.as_deref()?, m.file_to.as_deref()?)))
        })
        .collect();

    for mc in move_changes {
        if mc.kind != ChangeKind::Moved {
            continue;
        }
        let Some(&(src_path, dst_path)) = move_paths.get(mc.name.as_str()) else {
            continue;
        };

        for p in [src_path, dst_path] {
            if let Some(fc) = file_changes.iter_mut().find(|fc| fc.path == p) {
                fc.changes
                    .retain(|c| !(c.name == mc.name && (c.kind.is_added() || c.kind.is_removed())));
            }
        }
        if let Some(dst) = file_changes.iter_mut().find(|fc| fc.path == dst_path) {
            dst.changes.push(mc);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ChangeKind, ChangeType};
    use std::collections::HashMap;

    /// Content provider backed by a (ref, path) -> source map
    fn provider(entries: &[((&str, &str), &str)]) -> HashMap<(String, String), String> {
        entries
            .iter()
            .map(|((r, p), s)| ((r.to_string(), p.to_string()), s.to_string()))
            .collect()
    }

    fn lookup(map: &HashMap<(String, String), String>) -> impl Fn(&str, &str) -> Option<String> + '_ {
        move |r: &str, p: &str| map.get(&(r.to_string(), p.to_string())).cloned()
    }

    fn modified_diff(path: &str) -> String {
        format!(
            "diff --git a/{path} b/{path}\nindex 1111111..2222222 100644\n--- a/{path}\n+++ b/{path}\n@@ -1,2 +1,2 @@\n-old\n+new\n"
        )
    }

    fn opts() -> PipelineOptions {
        PipelineOptions::default()
    }

    #[test]
    fn test_breaking_parameter_addition() {
        let map = provider(&[
            (("old", "app.py"), "def helper(a):\n    return a\n"),
            (("new", "app.py"), "def helper(a, b):\n    return a + b\n"),
        ]);
        let f = lookup(&map);
        let output = run_pipeline(&modified_diff("app.py"), "old..new", Some(&f), &opts());

        assert_eq!(output.files.len(), 1);
        let changes = &output.files[0].changes;
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].kind, ChangeKind::SignatureChanged);
        assert!(changes[0].breaking);
        assert_eq!(output.summary.breaking_changes.len(), 1);
        assert!(output.tiered.oneliner.starts_with("BREAKING:"));
    }

    #[test]
    fn test_body_only_change_is_silent_modification() {
        let map = provider(&[
            (("old", "app.py"), "def helper():\n    return 1\n"),
            (("new", "app.py"), "def helper():\n    return 42\n"),
        ]);
        let f = lookup(&map);
        let output = run_pipeline(&modified_diff("app.py"), "old..new", Some(&f), &opts());

        let changes = &output.files[0].changes;
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].kind, ChangeKind::FunctionModified);
        assert!(!changes[0].breaking);
        assert!(output.summary.breaking_changes.is_empty());
    }

    #[test]
    fn test_removed_symbol() {
        let map = provider(&[
            (
                ("old", "app.py"),
                "def old_func():\n    return 1\n\ndef keep():\n    return 2\n",
            ),
            (("new", "app.py"), "def keep():\n    return 2\n"),
        ]);
        let f = lookup(&map);
        let output = run_pipeline(&modified_diff("app.py"), "old..new", Some(&f), &opts());

        let changes = &output.files[0].changes;
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].kind, ChangeKind::FunctionRemoved);
        assert_eq!(changes[0].name, "old_func");
    }

    #[test]
    fn test_cross_file_move() {
        let diff = format!("{}{}", modified_diff("a.py"), modified_diff("b.py"));
        let map = provider(&[
            (("old", "a.py"), "def helper(x):\n    return x\n"),
            (("new", "a.py"), "\n"),
            (("old", "b.py"), "\n"),
            (("new", "b.py"), "def helper(x):\n    return x\n"),
        ]);
        let f = lookup(&map);
        let output = run_pipeline(&diff, "old..new", Some(&f), &opts());

        let a = output.files.iter().find(|fc| fc.path == "a.py").unwrap();
        let b = output.files.iter().find(|fc| fc.path == "b.py").unwrap();
        assert!(a.changes.is_empty(), "stale removal must be dropped");
        assert_eq!(b.changes.len(), 1);
        assert_eq!(b.changes[0].kind, ChangeKind::Moved);
        assert_eq!(b.changes[0].file_from.as_deref(), Some("a.py"));
    }

    #[test]
    fn test_unrelated_same_name_symbols_not_moved() {
        let diff = format!("{}{}", modified_diff("a.py"), modified_diff("b.py"));
        let map = provider(&[
            (("old", "a.py"), "def helper(x):\n    return x\n"),
            (("new", "a.py"), "\n"),
            (("old", "b.py"), "\n"),
            (("new", "b.py"), "def helper(x, y):\n    return y\n"),
        ]);
        let f = lookup(&map);
        let output = run_pipeline(&diff, "old..new", Some(&f), &opts());

        let a = output.files.iter().find(|fc| fc.path == "a.py").unwrap();
        let b = output.files.iter().find(|fc| fc.path == "b.py").unwrap();
        assert_eq!(a.changes[0].kind, ChangeKind::FunctionRemoved);
        assert_eq!(b.changes[0].kind, ChangeKind::FunctionAdded);
    }

    #[test]
    fn test_generated_file_short_circuits() {
        let output = run_pipeline(
            &modified_diff("package-lock.json"),
            "old..new",
            None,
            &opts(),
        );
        assert!(output.files[0].generated);
        assert!(output.files[0].changes.is_empty());
    }

    #[test]
    fn test_unsupported_language_flagged() {
        let output = run_pipeline(&modified_diff("notes.txt"), "old..new", None, &opts());
        assert!(output.files[0].unsupported_language);
        assert_eq!(output.files[0].language, None);
    }

    #[test]
    fn test_missing_old_side_means_pure_addition() {
        let diff = "\
diff --git a/new.py b/new.py
new file mode 100644
--- /dev/null
+++ b/new.py
@@ -0,0 +1,2 @@
+def fresh():
+    return 1
";
        let map = provider(&[(("new", "new.py"), "def fresh():\n    return 1\n")]);
        let f = lookup(&map);
        let output = run_pipeline(diff, "old..new", Some(&f), &opts());

        assert_eq!(output.files[0].change_type, ChangeType::Added);
        assert_eq!(output.files[0].changes[0].kind, ChangeKind::FunctionAdded);
    }

    #[test]
    fn test_no_provider_reports_stats_only() {
        let output = run_pipeline(&modified_diff("app.py"), "stdin", None, &opts());
        assert_eq!(output.files[0].language, Some(Language::Python));
        assert!(output.files[0].changes.is_empty());
        assert_eq!(output.meta.stats.files, 1);
        assert_eq!(output.meta.stats.additions, 1);
        assert_eq!(output.meta.stats.deletions, 1);
    }

    #[test]
    fn test_single_ref_resolves_to_parent() {
        assert_eq!(
            resolve_refs("HEAD"),
            ("HEAD~1".to_string(), "HEAD".to_string())
        );
        assert_eq!(
            resolve_refs("abc..def"),
            ("abc".to_string(), "def".to_string())
        );
    }

    #[test]
    fn test_parse_error_recorded_not_fatal() {
        let map = provider(&[
            (("old", "app.py"), "def ok():\n    return 1\n"),
            (("new", "app.py"), "def ok():\n    return 2\n\nclass {\n"),
        ]);
        let f = lookup(&map);
        let output = run_pipeline(&modified_diff("app.py"), "old..new", Some(&f), &opts());

        assert!(output.files[0].parse_error);
        assert_eq!(output.files[0].changes[0].kind, ChangeKind::FunctionModified);
    }

    #[test]
    fn test_schema_version_stamped() {
        let output = run_pipeline("", "empty", None, &opts());
        assert_eq!(output.schema_version, SCHEMA_VERSION);
        assert!(output.meta.timing_ms.is_some());
    }

    #[test]
    fn test_output_round_trips_through_json() {
        let map = provider(&[
            (("old", "app.py"), "def helper(a):\n    return a\n"),
            (("new", "app.py"), "def helper(a, b):\n    return a + b\n"),
        ]);
        let f = lookup(&map);
        let output = run_pipeline(&modified_diff("app.py"), "old..new", Some(&f), &opts());
        let json = serde_json::to_string(&output).unwrap();
        let back: AnalysisOutput = serde_json::from_str(&json).unwrap();
        assert_eq!(output, back);
    }
}
