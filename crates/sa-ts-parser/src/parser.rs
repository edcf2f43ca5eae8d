//! Tree-sitter parser management.
//!
//! This module provides [`TsParser`], which parses a source file with the
//! grammar matching its extension and extracts its import bindings.

use camino::Utf8Path;
use smallvec::SmallVec;
use tree_sitter::{Language, Parser, Query, Tree};

use crate::error::ParseError;
use crate::import::{ImportBinding, extract_imports};
use crate::queries::{get_tsx_import_query, get_typescript_import_query};

/// The grammar a file is parsed with.
///
/// `.ts`, `.mts` and `.cts` files use the TypeScript grammar; everything
/// else (`.tsx`, `.js`, `.jsx`, `.mjs`, `.cjs`) uses TSX, which accepts
/// JSX as well as plain JavaScript.
///
/// # Examples
///
/// ```
/// use sa_ts_parser::Grammar;
/// use camino::Utf8Path;
///
/// assert_eq!(Grammar::for_path(Utf8Path::new("src/index.ts")), Grammar::TypeScript);
/// assert_eq!(Grammar::for_path(Utf8Path::new("src/App.tsx")), Grammar::Tsx);
/// assert_eq!(Grammar::for_path(Utf8Path::new("worker.mjs")), Grammar::Tsx);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Grammar {
    /// The TypeScript grammar.
    TypeScript,
    /// The TSX grammar.
    Tsx,
}

impl Grammar {
    /// Picks the grammar for a file by its extension.
    #[must_use]
    pub fn for_path(path: &Utf8Path) -> Self {
        match path.extension() {
            Some("ts" | "mts" | "cts") => Self::TypeScript,
            _ => Self::Tsx,
        }
    }

    fn language(self) -> Language {
        match self {
            Self::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Self::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
        }
    }

    fn import_query(self) -> Result<&'static Query, ParseError> {
        match self {
            Self::TypeScript => get_typescript_import_query(),
            Self::Tsx => get_tsx_import_query(),
        }
    }
}

/// Result of parsing one source file.
#[derive(Debug)]
pub struct ParseResult {
    /// Import bindings in source order.
    ///
    /// Uses `SmallVec<[ImportBinding; 8]>` to avoid heap allocation for
    /// typical files.
    pub imports: SmallVec<[ImportBinding; 8]>,

    /// The syntax tree.
    pub tree: Tree,
}

/// Parser for TypeScript and JavaScript source files.
///
/// # Thread Safety
///
/// `TsParser` is `Send` but not `Sync`. For parallel parsing, create one
/// parser per worker (the program service does this with rayon's
/// `map_init`). Compiled queries are shared globally.
///
/// # Examples
///
/// ```
/// use sa_ts_parser::TsParser;
///
/// let mut parser = TsParser::new()?;
/// let result = parser.parse(r#"import { Hono } from "hono"; const app = new Hono();"#)?;
///
/// assert_eq!(result.imports.len(), 1);
/// assert!(!result.tree.root_node().has_error());
/// # Ok::<(), sa_ts_parser::ParseError>(())
/// ```
pub struct TsParser {
    parser: Parser,
    grammar: Grammar,
}

impl TsParser {
    /// Creates a parser for the TypeScript grammar.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::LanguageInit`] if the grammar cannot be loaded.
    pub fn new() -> Result<Self, ParseError> {
        Self::with_grammar(Grammar::TypeScript)
    }

    /// Creates a parser for the TSX grammar.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::LanguageInit`] if the grammar cannot be loaded.
    pub fn new_tsx() -> Result<Self, ParseError> {
        Self::with_grammar(Grammar::Tsx)
    }

    /// Creates a parser for the grammar matching `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::LanguageInit`] if the grammar cannot be loaded.
    pub fn for_path(path: &Utf8Path) -> Result<Self, ParseError> {
        Self::with_grammar(Grammar::for_path(path))
    }

    /// Creates a parser for `grammar`.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::LanguageInit`] if the grammar cannot be loaded.
    pub fn with_grammar(grammar: Grammar) -> Result<Self, ParseError> {
        let mut parser = Parser::new();
        parser
            .set_language(&grammar.language())
            .map_err(|_| ParseError::LanguageInit)?;

        Ok(Self { parser, grammar })
    }

    /// Returns the grammar this parser uses.
    #[inline]
    #[must_use]
    pub const fn grammar(&self) -> Grammar {
        self.grammar
    }

    /// Parses `source` and extracts its imports.
    ///
    /// Syntax errors do not fail the parse; check
    /// `result.tree.root_node().has_error()`.
    ///
    /// # Errors
    ///
    /// - Returns [`ParseError::Parse`] if tree-sitter produced no tree
    /// - Returns [`ParseError::QueryCompile`] if the import query fails to compile
    pub fn parse(&mut self, source: &str) -> Result<ParseResult, ParseError> {
        let tree = self
            .parser
            .parse(source, None)
            .ok_or(ParseError::Parse)?;

        let query = self.grammar.import_query()?;
        let imports = extract_imports(&tree, source, query);

        Ok(ParseResult { imports, tree })
    }
}

impl std::fmt::Debug for TsParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TsParser")
            .field("grammar", &self.grammar)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parser_new() {
        assert_eq!(TsParser::new().expect("parser").grammar(), Grammar::TypeScript);
        assert_eq!(TsParser::new_tsx().expect("parser").grammar(), Grammar::Tsx);
    }

    #[test]
    fn test_for_path_picks_grammar() {
        let parser = TsParser::for_path(Utf8Path::new("src/routes.cts")).expect("parser");
        assert_eq!(parser.grammar(), Grammar::TypeScript);
        let parser = TsParser::for_path(Utf8Path::new("src/view.jsx")).expect("parser");
        assert_eq!(parser.grammar(), Grammar::Tsx);
    }

    #[test]
    fn test_tsx_grammar_accepts_jsx() {
        let mut parser = TsParser::new_tsx().expect("parser");
        let result = parser
            .parse("const view = () => <div>hello</div>;")
            .expect("parses");
        assert!(!result.tree.root_node().has_error());
    }

    #[test]
    fn test_syntax_errors_still_produce_tree() {
        let mut parser = TsParser::new().expect("parser");
        let result = parser.parse("app.get('/users', (c) => {").expect("parses");
        assert!(result.tree.root_node().has_error());
    }
}
