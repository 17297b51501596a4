//! Symbol matching: old/new symbol pairing for change detection

use crate::symbol::{Symbol, SymbolKind};
use std::collections::HashMap;

type SymbolKey<'a> = (&'a str, SymbolKind, Option<&'a str>);

/// A matched pair of old/new symbols, or an unmatched symbol.
///
/// Exactly one of: old absent (added), new absent (removed), both present
/// (matched or moved). `file_from`/`file_to` are set only for cross-file
/// moves, and only when the files differ.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchedSymbol {
    pub old: Option<Symbol>,
    pub new: Option<Symbol>,
    pub file_from: Option<String>,
    pub file_to: Option<String>,
}

impl MatchedSymbol {
    fn pair(old: &Symbol, new: &Symbol) -> Self {
        Self {
            old: Some(old.clone()),
            new: Some(new.clone()),
            file_from: None,
            file_to: None,
        }
    }

    fn added(new: &Symbol) -> Self {
        Self {
            old: None,
            new: Some(new.clone()),
            file_from: None,
            file_to: None,
        }
    }

    fn removed(old: &Symbol) -> Self {
        Self {
            old: Some(old.clone()),
            new: None,
            file_from: None,
            file_to: None,
        }
    }
}

fn key(s: &Symbol) -> SymbolKey<'_> {
    (s.name.as_str(), s.kind, s.parent.as_deref())
}

fn build_index<'a>(symbols: &'a [Symbol]) -> HashMap<SymbolKey<'a>, Vec<&'a Symbol>> {
    let mut index: HashMap<SymbolKey<'a>, Vec<&'a Symbol>> = HashMap::new();
    for s in symbols {
        index.entry(key(s)).or_default().push(s);
    }
    index
}

/// Match old symbols to new symbols by `(name, kind, parent)` key.
///
/// Duplicates sharing a key fall back to exact-signature pairing, then
/// positional order, an intentional order-dependent tie-break that keeps
/// output deterministic. Every input symbol lands in exactly one result.
pub fn match_symbols(old_symbols: &[Symbol], new_symbols: &[Symbol]) -> Vec<MatchedSymbol> {
    let old_index = build_index(old_symbols);
    let new_index = build_index(new_symbols);

    // Keys in first-seen order: all old keys, then new-only keys
    let mut all_keys: Vec<SymbolKey<'_>> = Vec::new();
    for s in old_symbols {
        if !all_keys.contains(&key(s)) {
            all_keys.push(key(s));
        }
    }
    for s in new_symbols {
        if !all_keys.contains(&key(s)) {
            all_keys.push(key(s));
        }
    }

    let empty: Vec<&Symbol> = Vec::new();
    let mut results: Vec<MatchedSymbol> = Vec::new();

    for k in all_keys {
        let olds = old_index.get(&k).unwrap_or(&empty);
        let news = new_index.get(&k).unwrap_or(&empty);

        if olds.len() > 1 || news.len() > 1 {
            match_duplicates(olds, news, &mut results);
        } else {
            match (olds.first(), news.first()) {
                (Some(o), Some(n)) => results.push(MatchedSymbol::pair(o, n)),
                (Some(o), None) => results.push(MatchedSymbol::removed(o)),
                (None, Some(n)) => results.push(MatchedSymbol::added(n)),
                (None, None) => {}
            }
        }
    }

    results
}

/// Match duplicates by exact signature first, then positional order.
fn match_duplicates(olds: &[&Symbol], news: &[&Symbol], results: &mut Vec<MatchedSymbol>) {
    let mut remaining_new: Vec<&Symbol> = news.to_vec();
    let mut remaining_old: Vec<&Symbol> = Vec::new();

    // Pass 1: exact signature match
    for o in olds {
        if let Some(pos) = remaining_new.iter().position(|n| n.signature == o.signature) {
            let n = remaining_new.remove(pos);
            results.push(MatchedSymbol::pair(o, n));
        } else {
            remaining_old.push(o);
        }
    }

    // Pass 2: positional pairing
    let paired = remaining_old.len().min(remaining_new.len());
    for idx in 0..paired {
        results.push(MatchedSymbol::pair(remaining_old[idx], remaining_new[idx]));
    }

    // Leftovers
    for o in &remaining_old[paired..] {
        results.push(MatchedSymbol::removed(o));
    }
    for n in &remaining_new[paired..] {
        results.push(MatchedSymbol::added(n));
    }
}

/// Match unmatched symbols across files to detect moves.
///
/// Inputs are ordered `(file path, symbols)` lists so iteration, and
/// therefore move resolution, follows file processing order. A move
/// requires matching signature text or body hash; same-named symbols that
/// agree on neither stay as ordinary added/removed entries.
pub fn match_cross_file(
    unmatched_old: &[(String, Vec<Symbol>)],
    unmatched_new: &[(String, Vec<Symbol>)],
) -> Vec<MatchedSymbol> {
    // Flatten new symbols with file info; consumption is tracked positionally
    // rather than by reference identity.
    let mut flat_new: Vec<(&str, &Symbol)> = Vec::new();
    for (file_path, symbols) in unmatched_new {
        for s in symbols {
            flat_new.push((file_path.as_str(), s));
        }
    }

    let mut new_by_key: HashMap<SymbolKey<'_>, Vec<usize>> = HashMap::new();
    for (idx, (_, s)) in flat_new.iter().enumerate() {
        new_by_key.entry(key(s)).or_default().push(idx);
    }

    let mut used = vec![false; flat_new.len()];
    let mut results: Vec<MatchedSymbol> = Vec::new();

    for (old_file, old_symbols) in unmatched_old {
        for old_sym in old_symbols {
            let Some(candidates) = new_by_key.get(&key(old_sym)) else {
                continue;
            };
            for &idx in candidates {
                if used[idx] {
                    continue;
                }
                let (new_file, new_sym) = flat_new[idx];
                if old_sym.signature != new_sym.signature
                    && old_sym.body_hash != new_sym.body_hash
                {
                    continue;
                }
                if new_file != old_file.as_str() {
                    results.push(MatchedSymbol {
                        old: Some(old_sym.clone()),
                        new: Some(new_sym.clone()),
                        file_from: Some(old_file.clone()),
                        file_to: Some(new_file.to_string()),
                    });
                    used[idx] = true;
                    break;
                }
            }
        }
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(name: &str) -> Symbol {
        sym_with(name, "def foo()", "abc123", None)
    }

    fn sym_with(name: &str, signature: &str, body_hash: &str, parent: Option<&str>) -> Symbol {
        Symbol {
            name: name.to_string(),
            kind: if parent.is_some() {
                SymbolKind::Method
            } else {
                SymbolKind::Function
            },
            signature: signature.to_string(),
            start_line: 1,
            end_line: 5,
            body_hash: body_hash.to_string(),
            parent: parent.map(String::from),
        }
    }

    #[test]
    fn test_identical_lists_pair_up() {
        let syms = vec![sym("a"), sym_with("b", "def b()", "abc123", None)];
        let result = match_symbols(&syms, &syms);
        assert_eq!(result.len(), 2);
        assert!(result.iter().all(|m| m.old.is_some() && m.new.is_some()));
    }

    #[test]
    fn test_added_symbol() {
        let old = vec![sym("a")];
        let new = vec![sym("a"), sym_with("b", "def b()", "abc123", None)];
        let result = match_symbols(&old, &new);
        let added: Vec<_> = result.iter().filter(|m| m.old.is_none()).collect();
        assert_eq!(added.len(), 1);
        assert_eq!(added[0].new.as_ref().unwrap().name, "b");
    }

    #[test]
    fn test_removed_symbol() {
        let old = vec![sym("a"), sym_with("b", "def b()", "abc123", None)];
        let new = vec![sym("a")];
        let result = match_symbols(&old, &new);
        let removed: Vec<_> = result.iter().filter(|m| m.new.is_none()).collect();
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].old.as_ref().unwrap().name, "b");
    }

    #[test]
    fn test_partition_covers_every_symbol_once() {
        let old = vec![sym("a"), sym("b"), sym("c")];
        let new = vec![sym("b"), sym("c"), sym("d")];
        let result = match_symbols(&old, &new);
        let old_seen: usize = result.iter().filter(|m| m.old.is_some()).count();
        let new_seen: usize = result.iter().filter(|m| m.new.is_some()).count();
        assert_eq!(old_seen, old.len());
        assert_eq!(new_seen, new.len());
    }

    #[test]
    fn test_same_name_different_parent_not_matched() {
        let old = vec![sym_with("run", "def run(self)", "h1", Some("Server"))];
        let new = vec![sym_with("run", "def run(self)", "h1", Some("Client"))];
        let result = match_symbols(&old, &new);
        assert_eq!(result.len(), 2);
        assert!(result.iter().any(|m| m.new.is_none()));
        assert!(result.iter().any(|m| m.old.is_none()));
    }

    #[test]
    fn test_duplicates_pair_by_signature_first() {
        let old = vec![
            sym_with("f", "def f(a)", "h1", None),
            sym_with("f", "def f(a, b)", "h2", None),
        ];
        let new = vec![
            sym_with("f", "def f(a, b)", "h2", None),
            sym_with("f", "def f(a)", "h1", None),
        ];
        let result = match_symbols(&old, &new);
        assert_eq!(result.len(), 2);
        for m in &result {
            assert_eq!(
                m.old.as_ref().unwrap().signature,
                m.new.as_ref().unwrap().signature
            );
        }
    }

    #[test]
    fn test_duplicates_fall_back_to_positional_order() {
        let old = vec![
            sym_with("f", "def f(a)", "h1", None),
            sym_with("f", "def f(b)", "h2", None),
        ];
        let new = vec![
            sym_with("f", "def f(x)", "h3", None),
            sym_with("f", "def f(y)", "h4", None),
        ];
        let result = match_symbols(&old, &new);
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].old.as_ref().unwrap().signature, "def f(a)");
        assert_eq!(result[0].new.as_ref().unwrap().signature, "def f(x)");
        assert_eq!(result[1].old.as_ref().unwrap().signature, "def f(b)");
        assert_eq!(result[1].new.as_ref().unwrap().signature, "def f(y)");
    }

    #[test]
    fn test_duplicate_leftovers_become_added_removed() {
        let old = vec![
            sym_with("f", "def f(a)", "h1", None),
            sym_with("f", "def f(b)", "h2", None),
        ];
        let new = vec![sym_with("f", "def f(a)", "h1", None)];
        let result = match_symbols(&old, &new);
        assert_eq!(result.len(), 2);
        let removed: Vec<_> = result.iter().filter(|m| m.new.is_none()).collect();
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].old.as_ref().unwrap().signature, "def f(b)");
    }

    #[test]
    fn test_cross_file_move_by_signature() {
        let unmatched_old = vec![(
            "a.py".to_string(),
            vec![sym_with("helper", "def helper(x)", "h1", None)],
        )];
        let unmatched_new = vec![(
            "b.py".to_string(),
            vec![sym_with("helper", "def helper(x)", "h2", None)],
        )];
        let moves = match_cross_file(&unmatched_old, &unmatched_new);
        assert_eq!(moves.len(), 1);
        assert_eq!(moves[0].file_from.as_deref(), Some("a.py"));
        assert_eq!(moves[0].file_to.as_deref(), Some("b.py"));
    }

    #[test]
    fn test_cross_file_move_by_body_hash() {
        let unmatched_old = vec![(
            "a.py".to_string(),
            vec![sym_with("helper", "def helper(x)", "same", None)],
        )];
        let unmatched_new = vec![(
            "b.py".to_string(),
            vec![sym_with("helper", "def helper(x, y=1)", "same", None)],
        )];
        let moves = match_cross_file(&unmatched_old, &unmatched_new);
        assert_eq!(moves.len(), 1);
    }

    #[test]
    fn test_cross_file_no_agreement_is_not_a_move() {
        let unmatched_old = vec![(
            "a.py".to_string(),
            vec![sym_with("helper", "def helper(x)", "h1", None)],
        )];
        let unmatched_new = vec![(
            "b.py".to_string(),
            vec![sym_with("helper", "def helper(x, y)", "h2", None)],
        )];
        let moves = match_cross_file(&unmatched_old, &unmatched_new);
        assert!(moves.is_empty());
    }

    #[test]
    fn test_cross_file_new_symbol_consumed_once() {
        let unmatched_old = vec![
            (
                "a.py".to_string(),
                vec![sym_with("helper", "def helper(x)", "h1", None)],
            ),
            (
                "c.py".to_string(),
                vec![sym_with("helper", "def helper(x)", "h1", None)],
            ),
        ];
        let unmatched_new = vec![(
            "b.py".to_string(),
            vec![sym_with("helper", "def helper(x)", "h1", None)],
        )];
        let moves = match_cross_file(&unmatched_old, &unmatched_new);
        assert_eq!(moves.len(), 1);
        assert_eq!(moves[0].file_from.as_deref(), Some("a.py"));
    }

    #[test]
    fn test_cross_file_same_file_candidate_skipped() {
        let unmatched_old = vec![(
            "a.py".to_string(),
            vec![sym_with("helper", "def helper(x)", "h1", None)],
        )];
        let unmatched_new = vec![(
            "a.py".to_string(),
            vec![sym_with("helper", "def helper(x)", "h1", None)],
        )];
        let moves = match_cross_file(&unmatched_old, &unmatched_new);
        assert!(moves.is_empty());
    }
}
