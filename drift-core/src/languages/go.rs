//! Go symbol extraction.
//!
//! Top-level functions and methods only. Method signatures keep the full
//! receiver clause; the receiver's type name (pointer or value) becomes the
//! symbol's parent.

use super::{end_line, node_text, start_line};
use crate::symbol::{compute_body_hash, Symbol, SymbolKind};

pub fn extract_symbols(tree: &tree_sitter::Tree, source: &str) -> Vec<Symbol> {
    let mut symbols = Vec::new();
    let root = tree.root_node();
    let mut cursor = root.walk();
    for child in root.children(&mut cursor) {
        match child.kind() {
            "function_declaration" => extract_function(&child, source, &mut symbols),
            "method_declaration" => extract_method(&child, source, &mut symbols),
            _ => {}
        }
    }
    symbols
}

fn extract_function(node: &tree_sitter::Node, source: &str, symbols: &mut Vec<Symbol>) {
    let Some(name_node) = node.child_by_field_name("name") else {
        return;
    };
    let name = node_text(&name_node, source);
    let params = node
        .child_by_field_name("parameters")
        .map(|p| node_text(&p, source))
        .unwrap_or_else(|| "()".to_string());
    let result = node
        .child_by_field_name("result")
        .map(|r| format!(" {}", node_text(&r, source)))
        .unwrap_or_default();
    let body_text = node
        .child_by_field_name("body")
        .map(|b| node_text(&b, source))
        .unwrap_or_default();

    symbols.push(Symbol {
        name: name.clone(),
        kind: SymbolKind::Function,
        signature: format!("func {name}{params}{result}"),
        start_line: start_line(node),
        end_line: end_line(node),
        body_hash: compute_body_hash(&body_text),
        parent: None,
    });
}

fn extract_method(node: &tree_sitter::Node, source: &str, symbols: &mut Vec<Symbol>) {
    let Some(name_node) = node.child_by_field_name("name") else {
        return;
    };
    let name = node_text(&name_node, source);
    let receiver_node = node.child_by_field_name("receiver");
    let receiver = receiver_node
        .map(|r| node_text(&r, source))
        .unwrap_or_default();
    let params = node
        .child_by_field_name("parameters")
        .map(|p| node_text(&p, source))
        .unwrap_or_else(|| "()".to_string());
    let result = node
        .child_by_field_name("result")
        .map(|r| format!(" {}", node_text(&r, source)))
        .unwrap_or_default();
    let body_text = node
        .child_by_field_name("body")
        .map(|b| node_text(&b, source))
        .unwrap_or_default();
    let parent = receiver_node.and_then(|r| extract_receiver_type(&r, source));

    symbols.push(Symbol {
        name: name.clone(),
        kind: SymbolKind::Method,
        signature: format!("func {receiver} {name}{params}{result}"),
        start_line: start_line(node),
        end_line: end_line(node),
        body_hash: compute_body_hash(&body_text),
        parent,
    });
}

/// Type name from a receiver parameter list, unwrapping pointer receivers.
fn extract_receiver_type(receiver_node: &tree_sitter::Node, source: &str) -> Option<String> {
    let mut cursor = receiver_node.walk();
    for child in receiver_node.children(&mut cursor) {
        if child.kind() != "parameter_declaration" {
            continue;
        }
        let mut decl_cursor = child.walk();
        for tc in child.children(&mut decl_cursor) {
            if tc.kind() == "type_identifier" {
                return Some(node_text(&tc, source));
            }
            if tc.kind() == "pointer_type" {
                let mut ptr_cursor = tc.walk();
                for ptc in tc.children(&mut ptr_cursor) {
                    if ptc.kind() == "type_identifier" {
                        return Some(node_text(&ptc, source));
                    }
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::languages::Language;
    use crate::parse::parse_source;

    fn symbols_of(source: &str) -> Vec<Symbol> {
        parse_source(source, Language::Go).symbols
    }

    #[test]
    fn test_function_with_result() {
        let source = "package main\n\nfunc Add(a int, b int) int {\n\treturn a + b\n}\n";
        let syms = symbols_of(source);
        assert_eq!(syms.len(), 1);
        assert_eq!(syms[0].name, "Add");
        assert_eq!(syms[0].signature, "func Add(a int, b int) int");
        assert_eq!(syms[0].kind, SymbolKind::Function);
    }

    #[test]
    fn test_method_with_pointer_receiver() {
        let source = "\
package main

func (s *Server) Start(port int) error {
\treturn nil
}
";
        let syms = symbols_of(source);
        assert_eq!(syms.len(), 1);
        assert_eq!(syms[0].kind, SymbolKind::Method);
        assert_eq!(syms[0].parent.as_deref(), Some("Server"));
        assert_eq!(syms[0].signature, "func (s *Server) Start(port int) error");
    }

    #[test]
    fn test_method_with_value_receiver() {
        let source = "package main\n\nfunc (c Config) Valid() bool {\n\treturn true\n}\n";
        let syms = symbols_of(source);
        assert_eq!(syms[0].parent.as_deref(), Some("Config"));
    }

    #[test]
    fn test_function_without_result() {
        let source = "package main\n\nfunc run() {\n}\n";
        let syms = symbols_of(source);
        assert_eq!(syms[0].signature, "func run()");
    }

    #[test]
    fn test_type_declarations_not_extracted() {
        let source = "package main\n\ntype Point struct {\n\tX int\n}\n";
        assert!(symbols_of(source).is_empty());
    }
}
