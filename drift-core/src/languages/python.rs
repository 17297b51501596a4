//! Python symbol extraction.
//!
//! Signatures are reconstructed as `def name(params) -> ret` and
//! `class Name(supers)`. Decorator lines are prefixed verbatim so that
//! adding or removing a decorator shows up as a signature change.

use super::{end_line, node_text, start_line};
use crate::symbol::{compute_body_hash, Symbol, SymbolKind};

pub fn extract_symbols(tree: &tree_sitter::Tree, source: &str) -> Vec<Symbol> {
    let mut symbols = Vec::new();
    walk_node(&tree.root_node(), source, &mut symbols, None);
    symbols
}

fn walk_node(
    node: &tree_sitter::Node,
    source: &str,
    symbols: &mut Vec<Symbol>,
    parent_class: Option<&str>,
) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "class_definition" => extract_class(&child, source, symbols),
            "function_definition" => extract_function(&child, source, symbols, parent_class),
            "decorated_definition" => extract_decorated(&child, source, symbols, parent_class),
            _ => {}
        }
    }
}

fn extract_class(node: &tree_sitter::Node, source: &str, symbols: &mut Vec<Symbol>) {
    let Some(name_node) = node.child_by_field_name("name") else {
        return;
    };
    let class_name = node_text(&name_node, source);
    let signature = build_class_signature(node, source);
    let body_node = node.child_by_field_name("body");
    let body_text = body_node.map(|b| node_text(&b, source)).unwrap_or_default();

    symbols.push(Symbol {
        name: class_name.clone(),
        kind: SymbolKind::Class,
        signature,
        start_line: start_line(node),
        end_line: end_line(node),
        body_hash: compute_body_hash(&body_text),
        parent: None,
    });

    if let Some(body) = body_node {
        walk_node(&body, source, symbols, Some(&class_name));
    }
}

fn extract_function(
    node: &tree_sitter::Node,
    source: &str,
    symbols: &mut Vec<Symbol>,
    parent_class: Option<&str>,
) {
    let Some(name_node) = node.child_by_field_name("name") else {
        return;
    };
    let func_name = node_text(&name_node, source);
    let signature = build_function_signature(node, source, &[]);
    let body_node = node.child_by_field_name("body");
    let body_text = body_node.map(|b| node_text(&b, source)).unwrap_or_default();
    let kind = if parent_class.is_some() {
        SymbolKind::Method
    } else {
        SymbolKind::Function
    };

    symbols.push(Symbol {
        name: func_name,
        kind,
        signature,
        start_line: start_line(node),
        end_line: end_line(node),
        body_hash: compute_body_hash(&body_text),
        parent: parent_class.map(String::from),
    });

    if let Some(body) = body_node {
        walk_node(&body, source, symbols, parent_class);
    }
}

fn extract_decorated(
    node: &tree_sitter::Node,
    source: &str,
    symbols: &mut Vec<Symbol>,
    parent_class: Option<&str>,
) {
    let mut decorators: Vec<String> = Vec::new();
    let mut definition: Option<tree_sitter::Node> = None;
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "decorator" => decorators.push(node_text(&child, source)),
            "function_definition" | "class_definition" => definition = Some(child),
            _ => {}
        }
    }

    let Some(definition) = definition else {
        return;
    };

    if definition.kind() == "class_definition" {
        let Some(name_node) = definition.child_by_field_name("name") else {
            return;
        };
        let class_name = node_text(&name_node, source);
        let class_sig = build_class_signature(&definition, source);
        let signature = if decorators.is_empty() {
            class_sig
        } else {
            format!("{}\n{}", decorators.join("\n"), class_sig)
        };
        let body_node = definition.child_by_field_name("body");
        let body_text = body_node.map(|b| node_text(&b, source)).unwrap_or_default();

        symbols.push(Symbol {
            name: class_name.clone(),
            kind: SymbolKind::Class,
            signature,
            start_line: start_line(node),
            end_line: end_line(node),
            body_hash: compute_body_hash(&body_text),
            parent: None,
        });
        if let Some(body) = body_node {
            walk_node(&body, source, symbols, Some(&class_name));
        }
    } else {
        let Some(name_node) = definition.child_by_field_name("name") else {
            return;
        };
        let func_name = node_text(&name_node, source);
        let signature = build_function_signature(&definition, source, &decorators);
        let body_node = definition.child_by_field_name("body");
        let body_text = body_node.map(|b| node_text(&b, source)).unwrap_or_default();
        let kind = if parent_class.is_some() {
            SymbolKind::Method
        } else {
            SymbolKind::Function
        };

        symbols.push(Symbol {
            name: func_name,
            kind,
            signature,
            start_line: start_line(node),
            end_line: end_line(node),
            body_hash: compute_body_hash(&body_text),
            parent: parent_class.map(String::from),
        });
        if let Some(body) = body_node {
            walk_node(&body, source, symbols, parent_class);
        }
    }
}

fn build_function_signature(
    node: &tree_sitter::Node,
    source: &str,
    decorators: &[String],
) -> String {
    let name_node = node.child_by_field_name("name");
    let params_node = node.child_by_field_name("parameters");
    let return_type = node.child_by_field_name("return_type");

    let mut sig = match (name_node, params_node) {
        (Some(name), Some(params)) => {
            let mut s = format!("def {}{}", node_text(&name, source), node_text(&params, source));
            if let Some(ret) = return_type {
                s.push_str(&format!(" -> {}", node_text(&ret, source)));
            }
            s
        }
        // Fallback for partially parsed definitions
        _ => {
            let text = node_text(node, source);
            match text.split_once(':') {
                Some((head, _)) => head.to_string(),
                None => text.lines().next().unwrap_or("").to_string(),
            }
        }
    };

    if !decorators.is_empty() {
        sig = format!("{}\n{}", decorators.join("\n"), sig);
    }

    sig
}

fn build_class_signature(node: &tree_sitter::Node, source: &str) -> String {
    let Some(name_node) = node.child_by_field_name("name") else {
        let text = node_text(node, source);
        return text.split(':').next().unwrap_or("").to_string();
    };

    let mut sig = format!("class {}", node_text(&name_node, source));
    if let Some(supers) = node.child_by_field_name("superclasses") {
        sig.push_str(&node_text(&supers, source));
    }
    sig
}
