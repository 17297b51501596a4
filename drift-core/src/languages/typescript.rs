//! TypeScript/JavaScript symbol extraction.
//!
//! One extractor serves both languages; the grammars agree on the node
//! kinds used here. Arrow functions bound to `const`/`let`/`var`
//! identifiers are treated as named function symbols.

use super::{end_line, node_text, start_line};
use crate::symbol::{compute_body_hash, Symbol, SymbolKind};

pub fn extract_symbols(tree: &tree_sitter::Tree, source: &str) -> Vec<Symbol> {
    let mut symbols = Vec::new();
    walk_node(&tree.root_node(), source, &mut symbols);
    symbols
}

fn walk_node(node: &tree_sitter::Node, source: &str, symbols: &mut Vec<Symbol>) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "function_declaration" => extract_function(&child, source, symbols),
            "class_declaration" => extract_class(&child, source, symbols),
            "lexical_declaration" | "variable_declaration" => {
                extract_arrow_functions(&child, source, symbols)
            }
            // export function f() {...} and friends
            "export_statement" => walk_node(&child, source, symbols),
            _ => {}
        }
    }
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
    let body_text = node
        .child_by_field_name("body")
        .map(|b| node_text(&b, source))
        .unwrap_or_default();

    symbols.push(Symbol {
        name: name.clone(),
        kind: SymbolKind::Function,
        signature: format!("function {name}{params}"),
        start_line: start_line(node),
        end_line: end_line(node),
        body_hash: compute_body_hash(&body_text),
        parent: None,
    });
}

fn extract_class(node: &tree_sitter::Node, source: &str, symbols: &mut Vec<Symbol>) {
    let Some(name_node) = node.child_by_field_name("name") else {
        return;
    };
    let class_name = node_text(&name_node, source);
    let body_node = node.child_by_field_name("body");
    let body_text = body_node.map(|b| node_text(&b, source)).unwrap_or_default();

    let mut heritage = String::new();
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == "class_heritage" {
            heritage = format!(" {}", node_text(&child, source));
            break;
        }
    }

    symbols.push(Symbol {
        name: class_name.clone(),
        kind: SymbolKind::Class,
        signature: format!("class {class_name}{heritage}"),
        start_line: start_line(node),
        end_line: end_line(node),
        body_hash: compute_body_hash(&body_text),
        parent: None,
    });

    if let Some(body) = body_node {
        let mut body_cursor = body.walk();
        for child in body.children(&mut body_cursor) {
            if child.kind() == "method_definition" {
                extract_method(&child, source, symbols, &class_name);
            }
        }
    }
}

fn extract_method(
    node: &tree_sitter::Node,
    source: &str,
    symbols: &mut Vec<Symbol>,
    class_name: &str,
) {
    let Some(name_node) = node.child_by_field_name("name") else {
        return;
    };
    let name = node_text(&name_node, source);
    let params = node
        .child_by_field_name("parameters")
        .map(|p| node_text(&p, source))
        .unwrap_or_else(|| "()".to_string());
    let body_text = node
        .child_by_field_name("body")
        .map(|b| node_text(&b, source))
        .unwrap_or_default();

    symbols.push(Symbol {
        name: name.clone(),
        kind: SymbolKind::Method,
        signature: format!("{name}{params}"),
        start_line: start_line(node),
        end_line: end_line(node),
        body_hash: compute_body_hash(&body_text),
        parent: Some(class_name.to_string()),
    });
}

fn extract_arrow_functions(node: &tree_sitter::Node, source: &str, symbols: &mut Vec<Symbol>) {
    // Binding keyword (const/let/var) is an anonymous leading child
    let mut keyword = "const".to_string();
    let mut cursor = node.walk();
    for sib in node.children(&mut cursor) {
        if !sib.is_named() {
            let t = node_text(&sib, source);
            if t == "const" || t == "let" || t == "var" {
                keyword = t;
                break;
            }
        }
    }

    let mut decl_cursor = node.walk();
    for child in node.children(&mut decl_cursor) {
        if child.kind() != "variable_declarator" {
            continue;
        }
        let (Some(name_node), Some(value_node)) = (
            child.child_by_field_name("name"),
            child.child_by_field_name("value"),
        ) else {
            continue;
        };
        if value_node.kind() != "arrow_function" {
            continue;
        }
        let name = node_text(&name_node, source);
        let params = match value_node.child_by_field_name("parameters") {
            Some(p) => node_text(&p, source),
            // Single bare parameter: `x => ...`
            None => match value_node.child_by_field_name("parameter") {
                Some(p) => format!("({})", node_text(&p, source)),
                None => "()".to_string(),
            },
        };
        let body_text = value_node
            .child_by_field_name("body")
            .map(|b| node_text(&b, source))
            .unwrap_or_default();

        symbols.push(Symbol {
            name: name.clone(),
            kind: SymbolKind::Function,
            signature: format!("{keyword} {name} = {params} =>"),
            start_line: start_line(node),
            end_line: end_line(node),
            body_hash: compute_body_hash(&body_text),
            parent: None,
        });
    }
}
