//! Change classification: matched symbols to schema-ready change records

use crate::matcher::MatchedSymbol;
use crate::schema::{ChangeKind, SymbolChange};
use crate::signatures::is_breaking_change;
use crate::symbol::SymbolKind;

fn added_kind(kind: SymbolKind) -> ChangeKind {
    match kind {
        SymbolKind::Class => ChangeKind::ClassAdded,
        _ => ChangeKind::FunctionAdded,
    }
}

fn removed_kind(kind: SymbolKind) -> ChangeKind {
    match kind {
        SymbolKind::Class => ChangeKind::ClassRemoved,
        _ => ChangeKind::FunctionRemoved,
    }
}

fn modified_kind(kind: SymbolKind) -> ChangeKind {
    match kind {
        SymbolKind::Class => ChangeKind::ClassModified,
        _ => ChangeKind::FunctionModified,
    }
}

/// Classify matched symbols into change records. Pairs with identical body
/// hashes are pure no-ops and never emit a record.
pub fn classify_changes(matches: &[MatchedSymbol]) -> Vec<SymbolChange> {
    matches.iter().filter_map(classify_one).collect()
}

fn classify_one(m: &MatchedSymbol) -> Option<SymbolChange> {
    // Moved symbol
    if let (Some(file_from), Some(_), Some(new)) = (&m.file_from, &m.old, &m.new) {
        return Some(SymbolChange {
            kind: ChangeKind::Moved,
            name: new.name.clone(),
            signature: Some(new.signature.clone()),
            before_signature: None,
            after_signature: None,
            file_from: Some(file_from.clone()),
            line: Some(new.start_line),
            breaking: false,
        });
    }

    match (&m.old, &m.new) {
        // Added
        (None, Some(new)) => Some(SymbolChange {
            kind: added_kind(new.kind),
            name: new.name.clone(),
            signature: Some(new.signature.clone()),
            before_signature: None,
            after_signature: None,
            file_from: None,
            line: Some(new.start_line),
            breaking: false,
        }),
        // Removed
        (Some(old), None) => Some(SymbolChange {
            kind: removed_kind(old.kind),
            name: old.name.clone(),
            signature: Some(old.signature.clone()),
            before_signature: None,
            after_signature: None,
            file_from: None,
            line: Some(old.start_line),
            breaking: false,
        }),
        (Some(old), Some(new)) => {
            // Unchanged
            if old.body_hash == new.body_hash {
                return None;
            }
            // Signature changed
            if old.signature != new.signature {
                return Some(SymbolChange {
                    kind: ChangeKind::SignatureChanged,
                    name: new.name.clone(),
                    signature: None,
                    before_signature: Some(old.signature.clone()),
                    after_signature: Some(new.signature.clone()),
                    file_from: None,
                    line: Some(new.start_line),
                    breaking: is_breaking_change(&old.signature, &new.signature),
                });
            }
            // Body modified, same signature
            Some(SymbolChange {
                kind: modified_kind(new.kind),
                name: new.name.clone(),
                signature: Some(new.signature.clone()),
                before_signature: None,
                after_signature: None,
                file_from: None,
                line: Some(new.start_line),
                breaking: false,
            })
        }
        (None, None) => None,
    }
}
