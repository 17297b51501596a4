//! Review report rendering: high-signal findings with caller impact.

use drift_core::refs::Reference;
use drift_core::signatures::{classify_signature_change, ChangeCategory};
use drift_core::{is_test_file, AnalysisOutput, ChangeKind, FileChange, SymbolChange};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

/// A change worth surfacing in review output: breaking, signature-changed,
/// removed, or moved. Everything else stays silent.
pub fn is_high_signal(sc: &SymbolChange) -> bool {
    (sc.before_signature.is_some() && sc.after_signature.is_some())
        || sc.breaking
        || sc.kind.is_removed()
        || sc.kind == ChangeKind::Moved
}

pub fn has_high_signal_changes(output: &AnalysisOutput) -> bool {
    output
        .files
        .iter()
        .flat_map(|fc| &fc.changes)
        .any(is_high_signal)
}

pub fn categorize_change(sc: &SymbolChange) -> ChangeCategory {
    if sc.kind.is_removed() {
        return ChangeCategory::SymbolRemoved;
    }
    if sc.kind == ChangeKind::Moved {
        return ChangeCategory::SymbolMoved;
    }
    if let (Some(before), Some(after)) = (&sc.before_signature, &sc.after_signature) {
        return classify_signature_change(before, after);
    }
    ChangeCategory::Changed
}

pub fn review_hint(category: ChangeCategory) -> &'static str {
    match category {
        ChangeCategory::ParameterRemoved => {
            "These callers will break — removed parameter no longer accepted"
        }
        ChangeCategory::ParameterAddedBreaking => {
            "These callers will break — missing required argument"
        }
        ChangeCategory::ReturnTypeChanged => "Callers depending on the return type may break",
        ChangeCategory::DefaultValueChanged => "Verify callers expect the new default value",
        ChangeCategory::BreakingSignature => "Check all callers handle the new signature",
        ChangeCategory::SignatureChanged => "Review the signature change for compatibility",
        ChangeCategory::SymbolRemoved => "Ensure no remaining callers depend on this symbol",
        ChangeCategory::SymbolMoved => "Update imports in dependent files",
        ChangeCategory::Changed => "Review this change",
    }
}

static RETURN_ANNOTATION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\)\s*->.*$").unwrap());

/// Collapse a signature to the declaration line, folding multi-line
/// parameter lists and skipping decorator lines.
fn compact_sig(sig: &str) -> String {
    for line in sig.lines() {
        let stripped = line.trim();
        let is_decl = stripped.starts_with("def ")
            || stripped.starts_with("class ")
            || stripped.starts_with("func ")
            || stripped.starts_with("function ");
        if !is_decl {
            continue;
        }
        if stripped.contains('(') && !stripped.contains(')') {
            // Multi-line parameter list: fold until the balancing paren
            let start = sig.find(stripped).unwrap_or(0);
            let rest = &sig[start..];
            let mut depth = 0i32;
            let mut collected = String::new();
            let mut consumed = 0usize;
            for ch in rest.chars() {
                consumed += ch.len_utf8();
                match ch {
                    '(' => depth += 1,
                    ')' => depth -= 1,
                    _ => {}
                }
                collected.push(if ch == '\n' { ' ' } else { ch });
                if depth == 0 && ch == ')' {
                    let arrow = rest[consumed..].lines().next().unwrap_or("").trim();
                    if arrow.starts_with("->") {
                        collected.push(' ');
                        collected.push_str(arrow);
                    }
                    break;
                }
            }
            return collected.split_whitespace().collect::<Vec<_>>().join(" ");
        }
        return stripped.to_string();
    }
    sig.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Strip the leading declaration keyword, return annotation, and trailing
/// colon for compact one-line display.
fn strip_keyword(sig: &str) -> String {
    let mut s = sig;
    for kw in ["def ", "class ", "func ", "function "] {
        if let Some(rest) = s.strip_prefix(kw) {
            s = rest;
            break;
        }
    }
    let s = RETURN_ANNOTATION_RE.replace(s, ")");
    s.trim_end_matches(':').to_string()
}

/// Compact one-line display of what changed about a signature.
pub fn sig_display(sc: &SymbolChange) -> String {
    if let (Some(before), Some(after)) = (&sc.before_signature, &sc.after_signature) {
        return format!(
            "{} → {}",
            strip_keyword(&compact_sig(before)),
            strip_keyword(&compact_sig(after))
        );
    }
    if let Some(sig) = &sc.signature {
        return strip_keyword(&compact_sig(sig));
    }
    format!("`{}`", sc.name)
}

fn high_signal_items(output: &AnalysisOutput) -> Vec<(&FileChange, &SymbolChange)> {
    output
        .files
        .iter()
        .flat_map(|fc| fc.changes.iter().map(move |sc| (fc, sc)))
        .filter(|(_, sc)| is_high_signal(sc))
        .collect()
}

fn dep_map(dep_refs: &[Reference]) -> HashMap<&str, Vec<&Reference>> {
    let mut map: HashMap<&str, Vec<&Reference>> = HashMap::new();
    for r in dep_refs {
        map.entry(r.symbol_name.as_str()).or_default().push(r);
    }
    map
}

fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Group call references by basename, preserving first-seen order.
fn group_by_file(refs: &[&Reference]) -> Vec<(String, usize)> {
    let mut grouped: Vec<(String, usize)> = Vec::new();
    for r in refs {
        let fname = basename(&r.file_path).to_string();
        match grouped.iter_mut().find(|(f, _)| *f == fname) {
            Some((_, n)) => *n += 1,
            None => grouped.push((fname, 1)),
        }
    }
    grouped
}

fn caller_parts(refs: &[&Reference]) -> String {
    group_by_file(refs)
        .into_iter()
        .map(|(f, n)| format!("{f} ({n} call{})", if n != 1 { "s" } else { "" }))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Render high-signal findings as actionable review text.
/// Empty string when nothing needs review.
pub fn format_context_output(output: &AnalysisOutput, dep_refs: Option<&[Reference]>) -> String {
    let items = high_signal_items(output);
    if items.is_empty() {
        return String::new();
    }

    let deps = dep_map(dep_refs.unwrap_or(&[]));

    let n = items.len();
    let mut lines: Vec<String> = vec![format!(
        "⚠ drift: {n} change{} need{} review",
        if n != 1 { "s" } else { "" },
        if n == 1 { "s" } else { "" }
    )];
    lines.push(String::new());

    for (idx, (fc, sc)) in items.iter().enumerate() {
        let category = categorize_change(sc);
        let sig_text = sig_display(sc);
        let line_ref = sc.line.map(|l| format!(":{l}")).unwrap_or_default();

        lines.push(format!("{}. {category}: {sig_text}", idx + 1));
        lines.push(format!("   File: {}{line_ref}", fc.path));

        let call_refs: Vec<&Reference> = deps
            .get(sc.name.as_str())
            .map(|rs| {
                rs.iter()
                    .filter(|r| r.context == drift_core::RefContext::Call)
                    .copied()
                    .collect()
            })
            .unwrap_or_default();
        let (test_refs, prod_refs): (Vec<&Reference>, Vec<&Reference>) = call_refs
            .into_iter()
            .partition(|r| is_test_file(&r.file_path));

        if sc.breaking {
            if prod_refs.is_empty() {
                lines.push("   Impact: Breaking change".to_string());
            } else {
                lines.push(format!(
                    "   Impact: {} caller{} rely on the default:",
                    prod_refs.len(),
                    if prod_refs.len() != 1 { "s" } else { "" }
                ));
                for r in prod_refs.iter().take(5) {
                    lines.push(format!(
                        "     {}:{}  `{}`",
                        basename(&r.file_path),
                        r.line,
                        r.source_line
                    ));
                }
            }
        } else if sc.before_signature.is_some() && sc.after_signature.is_some() {
            lines.push("   Impact: Backward-compatible (new kwarg has default)".to_string());
            if !prod_refs.is_empty() {
                lines.push(format!("   Callers: {}", caller_parts(&prod_refs)));
            }
        } else if sc.kind.is_removed() {
            if prod_refs.is_empty() {
                lines.push("   Impact: Symbol removed".to_string());
            } else {
                lines.push(format!(
                    "   Impact: {} caller{} will break:",
                    prod_refs.len(),
                    if prod_refs.len() != 1 { "s" } else { "" }
                ));
                for r in prod_refs.iter().take(5) {
                    lines.push(format!(
                        "     {}:{}  `{}`",
                        basename(&r.file_path),
                        r.line,
                        r.source_line
                    ));
                }
            }
        }

        if !test_refs.is_empty() {
            lines.push(format!("   Callers: {}", caller_parts(&test_refs)));
        }

        lines.push(format!("   Review: {}", review_hint(category)));
        lines.push(String::new());
    }

    lines.join("\n").trim_end().to_string()
}

/// Structured JSON output for the review command.
pub fn build_json_output(
    output: &AnalysisOutput,
    ref_range: &str,
    dep_refs: Option<&[Reference]>,
) -> String {
    let deps = dep_map(dep_refs.unwrap_or(&[]));

    let mut findings: Vec<serde_json::Value> = Vec::new();
    for (fc, sc) in high_signal_items(output) {
        let category = categorize_change(sc);

        let call_refs: Vec<&Reference> = deps
            .get(sc.name.as_str())
            .map(|rs| {
                rs.iter()
                    .filter(|r| r.context == drift_core::RefContext::Call)
                    .copied()
                    .collect()
            })
            .unwrap_or_default();
        let (test_refs, prod_refs): (Vec<&Reference>, Vec<&Reference>) = call_refs
            .into_iter()
            .partition(|r| is_test_file(&r.file_path));

        let callers: Vec<serde_json::Value> = prod_refs
            .iter()
            .chain(test_refs.iter())
            .take(10)
            .map(|r| {
                serde_json::json!({
                    "file": r.file_path,
                    "line": r.line,
                    "source": r.source_line,
                })
            })
            .collect();

        let mut finding = serde_json::json!({
            "category": category.label().replace(' ', "_"),
            "symbol": sc.name,
            "file": fc.path,
            "line": sc.line,
        });
        if let Some(before) = &sc.before_signature {
            finding["before_signature"] = serde_json::json!(before.trim());
        }
        if let Some(after) = &sc.after_signature {
            finding["after_signature"] = serde_json::json!(after.trim());
        }
        finding["impact"] = serde_json::json!({
            "production_callers": prod_refs.len(),
            "test_callers": test_refs.len(),
            "callers": callers,
        });
        finding["review_hint"] = serde_json::json!(review_hint(category));

        findings.push(finding);
    }

    let symbols_changed: usize = output.files.iter().map(|fc| fc.changes.len()).sum();
    let silence_reason = if findings.is_empty() {
        serde_json::json!("no high-signal changes")
    } else {
        serde_json::Value::Null
    };
    let result = serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "ref_range": ref_range,
        "findings": findings,
        "stats": {
            "files_analyzed": output.files.len(),
            "symbols_changed": symbols_changed,
            "silence_reason": silence_reason,
        },
    });
    serde_json::to_string_pretty(&result).unwrap_or_default()
}

/// Empty-diff JSON payload for the review command.
pub fn empty_json_output(ref_range: &str) -> String {
    let result = serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "ref_range": ref_range,
        "findings": [],
        "stats": {
            "files_analyzed": 0,
            "symbols_changed": 0,
            "silence_reason": "no changes in diff",
        },
    });
    serde_json::to_string_pretty(&result).unwrap_or_default()
}
