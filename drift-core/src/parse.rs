//! Source parsing and symbol extraction entry point

use crate::languages::Language;
use crate::symbol::Symbol;

/// Result of parsing one source file. Best-effort: extraction errors set a
/// flag rather than discarding what could still be recovered.
#[derive(Debug, Clone)]
pub struct ParseResult {
    pub symbols: Vec<Symbol>,
    pub language: Language,
    pub parse_error: bool,
    pub error_message: Option<String>,
}

/// Parse source code and extract symbols for one language.
pub fn parse_source(source: &str, language: Language) -> ParseResult {
    let mut parser = tree_sitter::Parser::new();
    if parser.set_language(&language.grammar()).is_err() {
        return ParseResult {
            symbols: Vec::new(),
            language,
            parse_error: true,
            error_message: Some(format!("failed to load {} grammar", language.as_str())),
        };
    }

    let Some(tree) = parser.parse(source, None) else {
        return ParseResult {
            symbols: Vec::new(),
            language,
            parse_error: true,
            error_message: Some("parser produced no tree".to_string()),
        };
    };

    let has_error = tree.root_node().has_error();
    let symbols = language.extract_symbols(&tree, source);

    ParseResult {
        symbols,
        language,
        parse_error: has_error,
        error_message: has_error.then(|| "parse errors detected in source".to_string()),
    }
}
