//! Tiered summary generation.
//!
//! Output is ordered by review priority, not file order:
//! breaking changes > removals > signature changes > additions >
//! modifications > moves.

use crate::schema::{ChangeKind, FileChange, Summary, SymbolChange, TieredSummary};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

// Priority buckets (lower = higher priority)
const P_BREAKING: u8 = 0;
const P_REMOVED: u8 = 1;
const P_SIG_CHANGED: u8 = 2;
const P_ADDED: u8 = 3;
const P_MODIFIED: u8 = 4;
const P_MOVED: u8 = 5;

const DETAILED_CAP: usize = 15;

static TEST_PATH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(^|/)(tests?/|spec/|__tests__/)|(^|/)test_[^/]*\.py$|(^|/)[^/]*_test\.py$|(^|/)[^/]*[._]spec\.(ts|js|tsx|jsx)$|(^|/)[^/]*[._]test\.(ts|js|tsx|jsx)$",
    )
    .unwrap()
});

/// True if the path looks like a test file.
pub fn is_test_file(path: &str) -> bool {
    TEST_PATH_RE.is_match(path)
}

fn change_priority(c: &SymbolChange) -> u8 {
    if c.breaking {
        return P_BREAKING;
    }
    match c.kind {
        ChangeKind::SignatureChanged => P_SIG_CHANGED,
        ChangeKind::FunctionRemoved | ChangeKind::ClassRemoved => P_REMOVED,
        ChangeKind::FunctionAdded | ChangeKind::ClassAdded => P_ADDED,
        ChangeKind::FunctionModified | ChangeKind::ClassModified => P_MODIFIED,
        ChangeKind::Moved => P_MOVED,
    }
}

/// All changes across files, sorted by (priority, path, name).
fn all_changes_sorted<'a, I>(files: I) -> Vec<(&'a str, &'a SymbolChange)>
where
    I: IntoIterator<Item = &'a FileChange>,
{
    let mut pairs: Vec<(&'a str, &'a SymbolChange)> = files
        .into_iter()
        .flat_map(|fc| fc.changes.iter().map(|c| (fc.path.as_str(), c)))
        .collect();
    pairs.sort_by(|a, b| {
        (change_priority(a.1), a.0, a.1.name.as_str()).cmp(&(
            change_priority(b.1),
            b.0,
            b.1.name.as_str(),
        ))
    });
    pairs
}

/// Split files into (production, test). The test list is populated only when
/// test inclusion is requested.
fn partition_files(files: &[FileChange], include_tests: bool) -> (Vec<&FileChange>, Vec<&FileChange>) {
    let mut prod = Vec::new();
    let mut test = Vec::new();
    for fc in files {
        if is_test_file(&fc.path) {
            test.push(fc);
        } else {
            prod.push(fc);
        }
    }
    if !include_tests {
        test.clear();
    }
    (prod, test)
}

// ---------------------------------------------------------------------------
// Summary (structured)
// ---------------------------------------------------------------------------

/// Build the structured Summary from classified file changes. Counts and
/// focus always reflect all files; they feed the JSON output.
pub fn build_summary(files: &[FileChange]) -> Summary {
    let mut summary = Summary::default();

    for fc in files {
        for c in &fc.changes {
            *summary.change_types.entry(c.kind).or_insert(0) += 1;
            if c.breaking {
                summary.breaking_changes.push(c.clone());
            }
        }
    }

    // Focus list: up to 5 items, priority ordered, deduped
    let sorted_changes = all_changes_sorted(files);
    let mut seen: BTreeSet<String> = BTreeSet::new();
    for (path, c) in sorted_changes {
        if summary.focus.len() >= 5 {
            break;
        }
        let label = focus_label(path, c);
        if seen.insert(label.clone()) {
            summary.focus.push(label);
        }
    }

    summary
}

fn focus_label(path: &str, c: &SymbolChange) -> String {
    if c.breaking {
        return format!("BREAKING: `{}` signature changed", c.name);
    }
    match c.kind {
        ChangeKind::FunctionRemoved => format!("Removed `{}`", c.name),
        ChangeKind::ClassRemoved => format!("Removed class `{}`", c.name),
        ChangeKind::FunctionAdded => format!("New `{}`", c.name),
        ChangeKind::ClassAdded => format!("New class `{}`", c.name),
        ChangeKind::SignatureChanged => format!("Signature change: `{}`", c.name),
        ChangeKind::FunctionModified => format!("Modified `{}`", c.name),
        ChangeKind::ClassModified => format!("Modified class `{}`", c.name),
        ChangeKind::Moved => format!(
            "Moved `{}` from {}",
            c.name,
            c.file_from.as_deref().unwrap_or(path)
        ),
    }
}

// ---------------------------------------------------------------------------
// Tiered summaries (human-readable text)
// ---------------------------------------------------------------------------

/// Generate oneliner / short / detailed summaries.
///
/// `include_tests` folds test-file symbols into the text output;
/// `show_skipped` adds a section for generated/binary/unsupported files.
pub fn build_tiered_summary(
    files: &[FileChange],
    summary: &Summary,
    include_tests: bool,
    show_skipped: bool,
) -> TieredSummary {
    let (prod_files, test_files) = partition_files(files, include_tests);
    // Oneliner and short use production changes only
    let prod_changes = all_changes_sorted(prod_files.iter().copied());

    // Test-file changes may exist even when not included in the output
    let has_test_changes = files
        .iter()
        .filter(|f| is_test_file(&f.path))
        .any(|f| !f.changes.is_empty());

    let all_changes = all_changes_sorted(files);
    if all_changes.is_empty() {
        let n = files
            .iter()
            .filter(|f| !f.generated && !f.binary && !f.unsupported_language)
            .count();
        let message = if n == 0 {
            "No substantive code changes.".to_string()
        } else {
            format!("Changed {n} file(s) with no symbol-level modifications.")
        };
        return TieredSummary {
            oneliner: message.clone(),
            short: message.clone(),
            detailed: message,
        };
    }

    let (oneliner, mut short) = if prod_changes.is_empty() && has_test_changes {
        ("Test-only changes".to_string(), "Test-only changes".to_string())
    } else if prod_changes.is_empty() {
        (
            "No substantive code changes.".to_string(),
            "No substantive code changes.".to_string(),
        )
    } else {
        (
            build_oneliner(&prod_changes, summary),
            build_short(&prod_changes, summary),
        )
    };

    let mut detailed = build_detailed(&prod_files, &test_files, files, summary, show_skipped);

    // Unsupported-file warning (short + detailed only, when skip list is hidden)
    if let Some(warning) = unsupported_warning(files, show_skipped) {
        short = format!("{short}\n{warning}");
        detailed = if detailed.is_empty() {
            warning
        } else {
            format!("{detailed}\n{warning}")
        };
    }

    TieredSummary {
        oneliner,
        short,
        detailed,
    }
}

fn unsupported_warning(files: &[FileChange], show_skipped: bool) -> Option<String> {
    if show_skipped {
        return None;
    }
    let unsupported: Vec<&FileChange> =
        files.iter().filter(|f| f.unsupported_language).collect();
    if unsupported.is_empty() {
        return None;
    }
    let mut exts: BTreeSet<String> = BTreeSet::new();
    for f in &unsupported {
        let basename = f.path.rsplit('/').next().unwrap_or(&f.path);
        match basename.rfind('.') {
            Some(pos) if pos > 0 => exts.insert(basename[pos..].to_string()),
            _ => exts.insert(basename.to_string()),
        };
    }
    let sorted_exts = exts.into_iter().collect::<Vec<_>>().join(", ");
    let n = unsupported.len();
    let plural = if n != 1 { "s" } else { "" };
    Some(format!(
        "⚠ {n} file{plural} skipped (unsupported: {sorted_exts}) — review manually"
    ))
}

/// Most impactful change only.
fn build_oneliner(sorted_changes: &[(&str, &SymbolChange)], summary: &Summary) -> String {
    if let Some(bc) = summary.breaking_changes.first() {
        return format!("BREAKING: `{}` signature changed", bc.name);
    }
    let (_, top) = sorted_changes[0];
    let verb = match top.kind {
        ChangeKind::FunctionAdded | ChangeKind::ClassAdded => "Add",
        ChangeKind::FunctionRemoved | ChangeKind::ClassRemoved => "Remove",
        ChangeKind::FunctionModified | ChangeKind::ClassModified => "Modify",
        ChangeKind::SignatureChanged => "Change signature of",
        ChangeKind::Moved => "Move",
    };
    format!("{verb} `{}`", top.name)
}

/// Breaking first, then behavioral items, then a structural fallback.
fn build_short(sorted_changes: &[(&str, &SymbolChange)], summary: &Summary) -> String {
    let mut parts: Vec<String> = Vec::new();

    if !summary.breaking_changes.is_empty() {
        let names = summary
            .breaking_changes
            .iter()
            .take(3)
            .map(|c| format!("`{}`", c.name))
            .collect::<Vec<_>>()
            .join(", ");
        parts.push(format!("Breaking: {names}"));
    }

    // Behavioural: added/removed/signature-changed, non-breaking
    let mut behavioural: Vec<String> = Vec::new();
    for (_, c) in sorted_changes {
        if c.breaking {
            continue;
        }
        if c.kind.is_added() || c.kind.is_removed() || c.kind == ChangeKind::SignatureChanged {
            let last = c.kind.as_str().rsplit('_').next().unwrap_or("changed");
            behavioural.push(format!("`{}` ({last})", c.name));
        }
        if behavioural.len() >= 4 {
            break;
        }
    }
    if !behavioural.is_empty() {
        parts.push(behavioural.join("; "));
    }

    // Structural only if nothing else surfaced
    if parts.is_empty() {
        let mod_count = sorted_changes
            .iter()
            .filter(|(_, c)| c.kind.is_modified())
            .count();
        let move_count = sorted_changes
            .iter()
            .filter(|(_, c)| c.kind == ChangeKind::Moved)
            .count();
        let mut bits: Vec<String> = Vec::new();
        if mod_count > 0 {
            bits.push(format!("{mod_count} modified"));
        }
        if move_count > 0 {
            bits.push(format!("{move_count} moved"));
        }
        if bits.is_empty() {
            parts.push("Minor changes".to_string());
        } else {
            parts.push(format!("Refactor: {}", bits.join(", ")));
        }
    }

    parts.join(". ")
}

/// Append grouped change sections to `lines`, up to `cap` items.
/// Breaking items are excluded; they are rendered separately.
/// Returns the number of items emitted.
fn emit_change_sections(
    sorted_changes: &[(&str, &SymbolChange)],
    lines: &mut Vec<String>,
    cap: usize,
) -> usize {
    let mut removed: Vec<String> = Vec::new();
    let mut sig_changes: Vec<String> = Vec::new();
    let mut added: Vec<String> = Vec::new();
    let mut modified: Vec<String> = Vec::new();
    let mut moved: Vec<String> = Vec::new();

    for (path, c) in sorted_changes {
        if c.breaking {
            continue;
        }
        match c.kind {
            ChangeKind::FunctionRemoved | ChangeKind::ClassRemoved => {
                removed.push(format!("- `{}` ({path})", c.name));
            }
            ChangeKind::SignatureChanged => {
                sig_changes.push(format!(
                    "- `{}`: {} → {}",
                    c.name,
                    c.before_signature.as_deref().unwrap_or(""),
                    c.after_signature.as_deref().unwrap_or("")
                ));
            }
            ChangeKind::FunctionAdded | ChangeKind::ClassAdded => {
                added.push(format!("- `{}` ({path})", c.name));
            }
            ChangeKind::FunctionModified | ChangeKind::ClassModified => {
                modified.push(format!("- `{}` ({path})", c.name));
            }
            ChangeKind::Moved => {
                moved.push(format!(
                    "- `{}` from {}",
                    c.name,
                    c.file_from.as_deref().unwrap_or("")
                ));
            }
        }
    }

    let sections: [(&str, Vec<String>); 5] = [
        ("Removed", removed),
        ("Signature Changes", sig_changes),
        ("Added", added),
        ("Modified", modified),
        ("Moved", moved),
    ];

    let mut emitted = 0;
    for (heading, items) in sections {
        if items.is_empty() {
            continue;
        }
        let remaining = cap.saturating_sub(emitted);
        if remaining == 0 {
            break;
        }
        let to_show = &items[..items.len().min(remaining)];
        lines.push(format!("## {heading}"));
        lines.extend(to_show.iter().cloned());
        lines.push(String::new());
        emitted += to_show.len();
    }

    emitted
}

/// Full detail, ordered by review priority, capped at the top items.
fn build_detailed(
    prod_files: &[&FileChange],
    test_files: &[&FileChange],
    all_files: &[FileChange],
    summary: &Summary,
    show_skipped: bool,
) -> String {
    let mut lines: Vec<String> = Vec::new();
    let prod_changes = all_changes_sorted(prod_files.iter().copied());
    let test_changes = all_changes_sorted(test_files.iter().copied());

    // Breaking changes: always shown, not counted toward the cap
    if !summary.breaking_changes.is_empty() {
        lines.push("## Breaking Changes".to_string());
        for c in &summary.breaking_changes {
            lines.push(format!(
                "- `{}`: {} → {}",
                c.name,
                c.before_signature.as_deref().unwrap_or(""),
                c.after_signature.as_deref().unwrap_or("")
            ));
        }
        lines.push(String::new());
    }

    // Production changes (capped)
    let total_prod = prod_changes.len();
    let emitted = emit_change_sections(&prod_changes, &mut lines, DETAILED_CAP);
    let breaking_in_prod = prod_changes.iter().filter(|(_, c)| c.breaking).count();
    let mut remaining = total_prod.saturating_sub(emitted + breaking_in_prod);

    // Test changes section
    if !test_changes.is_empty() {
        lines.push("## Test Changes".to_string());
        let test_cap = if emitted < DETAILED_CAP {
            DETAILED_CAP - emitted
        } else {
            5
        };
        let test_emitted = emit_change_sections(&test_changes, &mut lines, test_cap);
        remaining += test_changes.len().saturating_sub(test_emitted);
    }

    if remaining > 0 {
        lines.push(format!("(and {remaining} more)"));
        lines.push(String::new());
    }

    // Skipped files (opt-in)
    if show_skipped {
        let skipped: Vec<&FileChange> = all_files
            .iter()
            .filter(|f| f.generated || f.binary || f.unsupported_language)
            .collect();
        if !skipped.is_empty() {
            lines.push("## Skipped".to_string());
            for f in skipped {
                let reason = if f.generated {
                    "generated"
                } else if f.binary {
                    "binary"
                } else {
                    "unsupported"
                };
                lines.push(format!("- {} ({reason})", f.path));
            }
            lines.push(String::new());
        }
    }

    lines.join("\n").trim().to_string()
}
