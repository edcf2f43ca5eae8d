//! Error types for the sa-ts-parser crate.
//!
//! This module provides the [`ParseError`] type for errors that can occur
//! while parsing source files and building a program.

/// Errors that can occur during parsing.
///
/// # Examples
///
/// ```
/// use sa_ts_parser::ParseError;
///
/// fn describe(err: &ParseError) -> &'static str {
///     match err {
///         ParseError::LanguageInit => "grammar could not be loaded",
///         ParseError::QueryCompile { .. } => "query is invalid",
///         ParseError::Parse => "parser gave up",
///     }
/// }
///
/// assert_eq!(describe(&ParseError::Parse), "parser gave up");
/// ```
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// Failed to set the TypeScript or TSX language on the parser.
    #[error("failed to set TypeScript language")]
    LanguageInit,

    /// Failed to compile a tree-sitter query.
    #[error("failed to compile query at offset {offset}: {kind:?}")]
    QueryCompile {
        /// The byte offset in the query string where the error occurred.
        offset: usize,
        /// The query error.
        kind: tree_sitter::QueryError,
    },

    /// The parser returned no tree (cancelled or out of memory).
    #[error("failed to parse source code")]
    Parse,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_init_display() {
        assert_eq!(
            ParseError::LanguageInit.to_string(),
            "failed to set TypeScript language"
        );
    }

    #[test]
    fn test_parse_display() {
        assert_eq!(ParseError::Parse.to_string(), "failed to parse source code");
    }
}
