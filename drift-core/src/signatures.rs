//! Signature comparison for breaking change detection.
//!
//! Pure string analysis with no dependency on the rest of the engine.
//! Conservative: any genuinely ambiguous case resolves to non-breaking.
//!
//! The positional vs keyword-only split keys on a bare `*` separator, a
//! Python convention. Languages without the construct simply see every
//! parameter as positional, a documented precision loss.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

/// Category label for a classified change, ordered by assignment priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeCategory {
    ParameterRemoved,
    ParameterAddedBreaking,
    DefaultValueChanged,
    ReturnTypeChanged,
    BreakingSignature,
    SignatureChanged,
    SymbolRemoved,
    SymbolMoved,
    Changed,
}

impl ChangeCategory {
    pub fn label(self) -> &'static str {
        match self {
            Self::ParameterRemoved => "PARAMETER REMOVED",
            Self::ParameterAddedBreaking => "PARAMETER ADDED (BREAKING)",
            Self::DefaultValueChanged => "DEFAULT VALUE CHANGED",
            Self::ReturnTypeChanged => "RETURN TYPE CHANGED",
            Self::BreakingSignature => "BREAKING SIGNATURE CHANGE",
            Self::SignatureChanged => "SIGNATURE CHANGED",
            Self::SymbolRemoved => "SYMBOL REMOVED",
            Self::SymbolMoved => "SYMBOL MOVED",
            Self::Changed => "CHANGED",
        }
    }
}

impl fmt::Display for ChangeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Extract content between the first balanced parentheses in a signature.
/// Tracks `()[]` nesting so generic types and literal defaults survive.
fn extract_balanced_params(signature: &str) -> Option<&str> {
    let start = signature.find('(')?;
    let mut depth = 0i32;
    for (i, ch) in signature.char_indices().skip_while(|(i, _)| *i < start) {
        match ch {
            '(' | '[' => depth += 1,
            ')' | ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&signature[start + 1..i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Extract the parameter list from a signature string, split on top-level
/// commas only. Implicit receivers (`self`, `cls`) are stripped.
pub fn extract_params(signature: &str) -> Vec<String> {
    let params_str = match extract_balanced_params(signature) {
        Some(s) if !s.trim().is_empty() => s,
        _ => return Vec::new(),
    };

    let mut params: Vec<String> = Vec::new();
    let mut depth = 0i32;
    let mut current = String::new();
    for ch in params_str.chars() {
        match ch {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            _ => {}
        }
        if ch == ',' && depth == 0 {
            params.push(current.trim().to_string());
            current.clear();
        } else {
            current.push(ch);
        }
    }
    let last = current.trim();
    if !last.is_empty() {
        params.push(last.to_string());
    }

    params
        .into_iter()
        .filter(|p| !p.is_empty() && p != "self" && p != "cls")
        .collect()
}

static RETURN_TYPE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\)\s*->\s*(.+)$").unwrap());

fn extract_return_type(signature: &str) -> Option<String> {
    RETURN_TYPE_RE
        .captures(signature)
        .map(|c| c[1].trim().to_string())
}

fn param_has_default(param: &str) -> bool {
    param.contains('=')
}

/// Strip the default value from a parameter, keeping name and type.
fn strip_default(param: &str) -> &str {
    param.split('=').next().unwrap_or(param).trim()
}

fn param_default_value(param: &str) -> Option<&str> {
    param.split_once('=').map(|(_, v)| v.trim())
}

fn param_name(param: &str) -> &str {
    strip_default(param).split(':').next().unwrap_or("").trim()
}

/// Split params into positional and keyword-only (after a bare `*`).
fn split_positional_and_kwonly(params: &[String]) -> (Vec<&String>, Vec<&String>) {
    let mut positional = Vec::new();
    let mut kwonly = Vec::new();
    let mut seen_star = false;
    for p in params {
        if p == "*" {
            seen_star = true;
            continue;
        }
        if seen_star {
            kwonly.push(p);
        } else {
            positional.push(p);
        }
    }
    (positional, kwonly)
}

fn defaults_differ(old_param: &str, new_param: &str) -> bool {
    match (param_default_value(old_param), param_default_value(new_param)) {
        (Some(old_def), Some(new_def)) => old_def != new_def,
        _ => false,
    }
}

/// True when existing parameters kept their names/types but at least one
/// default value changed (both sides carrying a default).
pub fn is_default_value_change(old_signature: &str, new_signature: &str) -> bool {
    let old_params = extract_params(old_signature);
    let new_params = extract_params(new_signature);
    if old_params.len() != new_params.len() {
        return false;
    }
    for (old_p, new_p) in old_params.iter().zip(new_params.iter()) {
        if strip_default(old_p) != strip_default(new_p) {
            return false;
        }
        if defaults_differ(old_p, new_p) {
            return true;
        }
    }
    false
}

/// Assign a specific category to a signature change, in priority order.
pub fn classify_signature_change(old_signature: &str, new_signature: &str) -> ChangeCategory {
    if old_signature == new_signature {
        return ChangeCategory::SignatureChanged;
    }

    let old_params = extract_params(old_signature);
    let new_params = extract_params(new_signature);
    let (old_pos, old_kw) = split_positional_and_kwonly(&old_params);
    let (new_pos, new_kw) = split_positional_and_kwonly(&new_params);

    // Positional parameter removed
    if new_pos.len() < old_pos.len() {
        return ChangeCategory::ParameterRemoved;
    }

    // Keyword-only parameter removed
    let new_kw_names: Vec<&str> = new_kw.iter().map(|k| param_name(k)).collect();
    if old_kw
        .iter()
        .any(|k| !new_kw_names.contains(&param_name(k)))
    {
        return ChangeCategory::ParameterRemoved;
    }

    // New positional params without defaults
    if new_pos.len() > old_pos.len()
        && new_pos[old_pos.len()..]
            .iter()
            .any(|p| !param_has_default(p))
    {
        return ChangeCategory::ParameterAddedBreaking;
    }

    // New keyword-only params without defaults
    let old_kw_names: Vec<&str> = old_kw.iter().map(|k| param_name(k)).collect();
    for new_k in &new_kw {
        if !old_kw_names.contains(&param_name(new_k)) && !param_has_default(new_k) {
            return ChangeCategory::ParameterAddedBreaking;
        }
    }

    if is_default_value_change(old_signature, new_signature) {
        return ChangeCategory::DefaultValueChanged;
    }

    if let (Some(old_ret), Some(new_ret)) = (
        extract_return_type(old_signature),
        extract_return_type(new_signature),
    ) {
        if old_ret != new_ret {
            return ChangeCategory::ReturnTypeChanged;
        }
    }

    // Other breaking changes (type changes on existing params, etc.)
    if is_breaking_change(old_signature, new_signature) {
        return ChangeCategory::BreakingSignature;
    }

    ChangeCategory::SignatureChanged
}

/// Determine whether a signature change would break existing callers.
///
/// Breaking: parameters removed, reordered, type changed, default value
/// changed, or a new positional/keyword-only parameter without a default.
/// Non-breaking: new keyword-only parameters with defaults. When unsure,
/// returns false.
pub fn is_breaking_change(old_signature: &str, new_signature: &str) -> bool {
    if old_signature == new_signature {
        return false;
    }

    let old_params = extract_params(old_signature);
    let new_params = extract_params(new_signature);
    let (old_pos, old_kw) = split_positional_and_kwonly(&old_params);
    let (new_pos, new_kw) = split_positional_and_kwonly(&new_params);

    // Positional parameter removed
    if new_pos.len() < old_pos.len() {
        return true;
    }

    // Existing positional params changed (name/type or default value)
    for (old_p, new_p) in old_pos.iter().zip(new_pos.iter()) {
        if strip_default(old_p) != strip_default(new_p) {
            return true;
        }
        if defaults_differ(old_p, new_p) {
            return true;
        }
    }

    // New positional params added without defaults
    if new_pos.len() > old_pos.len()
        && new_pos[old_pos.len()..]
            .iter()
            .any(|p| !param_has_default(p))
    {
        return true;
    }

    // Existing keyword-only params changed
    let old_kw_by_name: Vec<(&str, &String)> =
        old_kw.iter().map(|k| (param_name(k), *k)).collect();
    for new_k in &new_kw {
        let name = param_name(new_k);
        if let Some((_, old_k)) = old_kw_by_name.iter().find(|(n, _)| *n == name) {
            if strip_default(old_k) != strip_default(new_k) {
                return true;
            }
            if defaults_differ(old_k, new_k) {
                return true;
            }
        }
    }

    // Existing keyword-only param removed
    let new_kw_names: Vec<&str> = new_kw.iter().map(|k| param_name(k)).collect();
    if old_kw_by_name
        .iter()
        .any(|(name, _)| !new_kw_names.contains(name))
    {
        return true;
    }

    // New keyword-only params without defaults
    for new_k in &new_kw {
        let name = param_name(new_k);
        if !old_kw_by_name.iter().any(|(n, _)| *n == name) && !param_has_default(new_k) {
            return true;
        }
    }

    // Return type change, only when both sides are annotated
    if let (Some(old_ret), Some(new_ret)) = (
        extract_return_type(old_signature),
        extract_return_type(new_signature),
    ) {
        if old_ret != new_ret {
            return true;
        }
    }

    false
}
