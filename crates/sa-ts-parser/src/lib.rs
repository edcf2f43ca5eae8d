//! TypeScript program model and route extraction using tree-sitter.
//!
//! This crate turns the project's source files into a resource model:
//!
//! - Parse TypeScript/JavaScript files (TSX grammar for JSX-capable files)
//! - Keep a [`Program`] of parsed files, re-parsing only what changed
//! - Resolve relative module specifiers against a [`ServiceHost`]
//! - Extract Hono route trees, routes, middleware and mounts into a
//!   [`ResourceManager`](sa_core::ResourceManager)
//!
//! # Overview
//!
//! [`TsParser`] parses a single file and extracts its imports:
//!
//! ```
//! use sa_ts_parser::TsParser;
//!
//! let mut parser = TsParser::new()?;
//! let result = parser.parse(r#"
//!     import { Hono } from "hono";
//!     import users from "./routes/users";
//! "#)?;
//!
//! assert_eq!(result.imports.len(), 2);
//! assert!(!result.imports[0].is_local());
//! assert!(result.imports[1].is_local());
//! # Ok::<(), sa_ts_parser::ParseError>(())
//! ```
//!
//! A [`LanguageService`] builds a [`Program`] from the files a
//! [`ServiceHost`] exposes. [`TreeSitterService`] caches parsed files by
//! host version and re-parses changed files in parallel with rayon.
//!
//! ```ignore
//! let mut service = TreeSitterService::new();
//! let program = service.get_program(&host).expect("grammar loads");
//! let result = HonoRouteExtractor.extract(&program, &host, host.project_root())?;
//! ```
//!
//! # Recognised Registrations
//!
//! | Call | Stored as |
//! |------|-----------|
//! | `app.get(path, ...handlers)` (and `post`, `put`, `delete`, `patch`, `options`, `head`, `all`) | route entry |
//! | `app.on(method \| [methods], path, ...handlers)` | route entry |
//! | `app.use([path], ...handlers)` | middleware entry (`*` without a path) |
//! | `app.route(path, child)` | route tree reference |
//!
//! Receivers may be chained (`new Hono().get(...).post(...)`) and may be
//! apps imported from other files.
//!
//! # Thread Safety
//!
//! [`TsParser`] is `Send` but not `Sync`; the program service keeps one
//! parser per rayon worker. Compiled queries are shared globally.

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod error;
pub mod extract;
mod import;
mod parser;
pub mod program;
pub mod queries;
pub mod resolve;
mod syntax;

pub use error::ParseError;
pub use extract::{ExtractionResult, HonoRouteExtractor, MATCH_ALL, RouteExtractor};
pub use import::{DEFAULT_IMPORT, ImportBinding, NAMESPACE_IMPORT, extract_imports, is_local_specifier};
pub use parser::{Grammar, ParseResult, TsParser};
pub use program::{
    LanguageService, Program, ServiceHost, SourceFile, SourceSnapshot, TreeSitterService,
};
pub use resolve::{SOURCE_EXTENSIONS, resolve_module};
