//! Import extraction from parsed source files.
//!
//! Each static import is flattened into one [`ImportBinding`] per local
//! name it introduces. The route extractor uses these bindings to turn
//! identifiers inside a handler into module references.

use smallvec::{SmallVec, smallvec};
use streaming_iterator::StreamingIterator;
use tree_sitter::{Node, Query, QueryCursor, Tree};

use crate::queries::{CAPTURE_IMPORT_SOURCE, CAPTURE_IMPORT_STATEMENT};
use crate::syntax::{has_child_kind, node_text, position, string_literal};

/// The imported name recorded for default imports.
pub const DEFAULT_IMPORT: &str = "default";

/// The imported name recorded for namespace imports.
pub const NAMESPACE_IMPORT: &str = "*";

/// A local name bound by an import statement.
///
/// # Examples
///
/// ```
/// use sa_ts_parser::TsParser;
///
/// let mut parser = TsParser::new()?;
/// let result = parser.parse("import { db as database } from './db';")?;
///
/// let binding = &result.imports[0];
/// assert_eq!(binding.local_name, "database");
/// assert_eq!(binding.imported_name, "db");
/// assert_eq!(binding.source, "./db");
/// # Ok::<(), sa_ts_parser::ParseError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImportBinding {
    /// The name visible in the importing file.
    pub local_name: String,

    /// The exported name in the source module (`default`, `*`, or a named export).
    pub imported_name: String,

    /// The module specifier without quotes.
    pub source: String,

    /// Whether the binding only imports a type.
    pub is_type_only: bool,

    /// Byte offset of the binding in the importing file.
    pub position: u32,
}

impl ImportBinding {
    /// Returns `true` if the specifier is relative (`./` or `../`) or absolute.
    #[inline]
    #[must_use]
    pub fn is_local(&self) -> bool {
        is_local_specifier(&self.source)
    }
}

/// Returns `true` if a module specifier points into the project rather than a package.
#[inline]
#[must_use]
pub fn is_local_specifier(specifier: &str) -> bool {
    matches!(specifier, "." | "..")
        || specifier.starts_with("./")
        || specifier.starts_with("../")
        || specifier.starts_with('/')
}

/// Extracts every import binding from a parsed tree, in source order.
///
/// Side-effect imports (`import './setup'`) bind nothing and are skipped.
pub fn extract_imports(tree: &Tree, source: &str, query: &Query) -> SmallVec<[ImportBinding; 8]> {
    let mut cursor = QueryCursor::new();
    let mut matches = cursor.matches(query, tree.root_node(), source.as_bytes());
    let mut bindings: SmallVec<[ImportBinding; 8]> = smallvec![];

    while let Some(match_) = matches.next() {
        let mut statement = None;
        let mut specifier = None;

        for capture in match_.captures {
            match capture.index {
                CAPTURE_IMPORT_STATEMENT => statement = Some(capture.node),
                CAPTURE_IMPORT_SOURCE => specifier = string_literal(capture.node, source),
                _ => {}
            }
        }

        if let (Some(statement), Some(specifier)) = (statement, specifier) {
            collect_bindings(statement, specifier, source, &mut bindings);
        }
    }

    bindings.sort_by_key(|binding| binding.position);
    bindings
}

fn collect_bindings(
    statement: Node<'_>,
    specifier: &str,
    source: &str,
    out: &mut SmallVec<[ImportBinding; 8]>,
) {
    let statement_type_only = has_child_kind(statement, "type");

    let mut cursor = statement.walk();
    let Some(clause) = statement
        .named_children(&mut cursor)
        .find(|child| child.kind() == "import_clause")
    else {
        return;
    };

    let binding = |node: Node<'_>, imported: &str, type_only: bool| ImportBinding {
        local_name: node_text(node, source).to_owned(),
        imported_name: imported.to_owned(),
        source: specifier.to_owned(),
        is_type_only: type_only,
        position: position(node),
    };

    let mut clause_cursor = clause.walk();
    for child in clause.named_children(&mut clause_cursor) {
        match child.kind() {
            "identifier" => out.push(binding(child, DEFAULT_IMPORT, statement_type_only)),
            "namespace_import" => {
                if let Some(name) = child.named_child(0) {
                    out.push(binding(name, NAMESPACE_IMPORT, statement_type_only));
                }
            }
            "named_imports" => {
                let mut specifier_cursor = child.walk();
                for spec in child
                    .named_children(&mut specifier_cursor)
                    .filter(|node| node.kind() == "import_specifier")
                {
                    let Some(name) = spec.child_by_field_name("name") else {
                        continue;
                    };
                    let imported = string_literal(name, source).unwrap_or(node_text(name, source));
                    let local = spec.child_by_field_name("alias").unwrap_or(name);
                    let type_only = statement_type_only || has_child_kind(spec, "type");
                    out.push(binding(local, imported, type_only));
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TsParser;

    fn imports(source: &str) -> SmallVec<[ImportBinding; 8]> {
        let mut parser = TsParser::new().expect("parser");
        parser.parse(source).expect("parses").imports
    }

    #[test]
    fn test_named_default_and_namespace() {
        let found = imports(
            r#"
import { Hono } from "hono";
import users from "./routes/users";
import * as schema from "../db/schema";
"#,
        );

        let summary: Vec<_> = found
            .iter()
            .map(|b| (b.local_name.as_str(), b.imported_name.as_str(), b.source.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("Hono", "Hono", "hono"),
                ("users", DEFAULT_IMPORT, "./routes/users"),
                ("schema", NAMESPACE_IMPORT, "../db/schema"),
            ]
        );
    }

    #[test]
    fn test_default_plus_named() {
        let found = imports("import app, { helper as h } from './app';");
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].imported_name, DEFAULT_IMPORT);
        assert_eq!(found[1].local_name, "h");
        assert_eq!(found[1].imported_name, "helper");
    }

    #[test]
    fn test_type_only_imports() {
        let found = imports(
            "import type { Env } from './env';\nimport { type Ctx, run } from './ctx';",
        );
        let flags: Vec<_> = found.iter().map(|b| (b.local_name.as_str(), b.is_type_only)).collect();
        assert_eq!(flags, vec![("Env", true), ("Ctx", true), ("run", false)]);
    }

    #[test]
    fn test_side_effect_import_binds_nothing() {
        assert!(imports("import './polyfills';").is_empty());
    }

    #[test]
    fn test_is_local_specifier() {
        assert!(is_local_specifier("./db"));
        assert!(is_local_specifier("../shared/db"));
        assert!(!is_local_specifier("hono"));
        assert!(!is_local_specifier("@hono/zod-openapi"));
    }
}
