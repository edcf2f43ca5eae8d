//! Pre-compiled tree-sitter queries.
//!
//! Queries are compiled once per grammar and cached in a [`OnceLock`].
//! Only static imports are matched; route registrations are recognised by
//! walking call chains, which a query cannot express.

use std::sync::OnceLock;

use tree_sitter::{Language, Query};

use crate::error::ParseError;

/// Tree-sitter query for static import statements.
///
/// # Capture Names
///
/// - `import.statement` - The full `import_statement` node
/// - `import.source` - The module specifier string literal
pub const IMPORT_QUERY: &str = r"
(import_statement
  source: (string) @import.source) @import.statement
";

/// Capture index for `import.source`.
pub const CAPTURE_IMPORT_SOURCE: u32 = 0;

/// Capture index for `import.statement`.
pub const CAPTURE_IMPORT_STATEMENT: u32 = 1;

static IMPORT_QUERY_TS: OnceLock<Query> = OnceLock::new();
static IMPORT_QUERY_TSX: OnceLock<Query> = OnceLock::new();

/// Returns the compiled import query for the TypeScript grammar.
///
/// # Errors
///
/// Returns [`ParseError::QueryCompile`] if the query fails to compile.
pub fn get_typescript_import_query() -> Result<&'static Query, ParseError> {
    cached(&IMPORT_QUERY_TS, &tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into())
}

/// Returns the compiled import query for the TSX grammar.
///
/// # Errors
///
/// Returns [`ParseError::QueryCompile`] if the query fails to compile.
pub fn get_tsx_import_query() -> Result<&'static Query, ParseError> {
    cached(&IMPORT_QUERY_TSX, &tree_sitter_typescript::LANGUAGE_TSX.into())
}

fn cached(cell: &'static OnceLock<Query>, language: &Language) -> Result<&'static Query, ParseError> {
    if let Some(query) = cell.get() {
        return Ok(query);
    }

    let query = compile_query(language)?;
    Ok(cell.get_or_init(|| query))
}

fn compile_query(language: &Language) -> Result<Query, ParseError> {
    Query::new(language, IMPORT_QUERY).map_err(|e| ParseError::QueryCompile {
        offset: e.offset,
        kind: e,
    })
}
