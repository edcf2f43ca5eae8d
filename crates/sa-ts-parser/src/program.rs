//! The language analysis service and the program it produces.
//!
//! The monitor owns a virtual file system and exposes it through the
//! [`ServiceHost`] trait. A [`LanguageService`] turns the host's current
//! view into an immutable [`Program`]: every source file parsed with its
//! syntax tree and import bindings.
//!
//! [`TreeSitterService`] is the default service. It keeps the files it
//! parsed last time keyed by `(file, version)` and only re-parses files
//! whose version (or content) changed. Re-parsing fans out across rayon
//! workers, one parser per worker.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use rayon::prelude::*;
use sa_core::FxHashMap;
use smallvec::SmallVec;
use tree_sitter::Tree;

use crate::error::ParseError;
use crate::import::ImportBinding;
use crate::parser::{Grammar, TsParser};

/// An immutable, cheaply cloneable snapshot of a file's text.
///
/// # Examples
///
/// ```
/// use sa_ts_parser::SourceSnapshot;
///
/// let snapshot = SourceSnapshot::from_string("export default app;");
/// let copy = snapshot.clone();
/// assert_eq!(copy.text(), "export default app;");
/// assert!(snapshot.same_as(&copy));
/// ```
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SourceSnapshot(Arc<str>);

impl SourceSnapshot {
    /// Creates a snapshot from file content.
    #[must_use]
    pub fn from_string(content: impl Into<Arc<str>>) -> Self {
        Self(content.into())
    }

    /// Returns the snapshot text.
    #[inline]
    #[must_use]
    pub fn text(&self) -> &str {
        &self.0
    }

    /// Returns the length of the text in bytes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the text is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns `true` if both snapshots share the same allocation.
    #[inline]
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for SourceSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceSnapshot")
            .field("len", &self.0.len())
            .finish()
    }
}

/// The virtual file system a [`LanguageService`] reads from.
///
/// Paths are absolute. Versions are monotonic per file; a service may
/// assume that an unchanged version means unchanged content.
pub trait ServiceHost {
    /// Returns the absolute project root.
    fn project_root(&self) -> &Utf8Path;

    /// Returns every file that belongs to the program.
    fn file_names(&self) -> Vec<Utf8PathBuf>;

    /// Returns the current version of a program file.
    fn script_version(&self, file_name: &Utf8Path) -> Option<u64>;

    /// Returns the current content of a file.
    fn script_snapshot(&self, file_name: &Utf8Path) -> Option<SourceSnapshot>;

    /// Returns `true` if the file exists (in memory or on disk).
    fn file_exists(&self, file_name: &Utf8Path) -> bool;

    /// Returns `true` if the directory exists on disk.
    fn directory_exists(&self, directory: &Utf8Path) -> bool;

    /// Reads a file's content (in memory or from disk).
    fn read_file(&self, file_name: &Utf8Path) -> Option<String>;
}

/// One parsed file of a [`Program`].
pub struct SourceFile {
    /// Absolute file name.
    pub file_name: Utf8PathBuf,

    /// Host version the file was parsed at.
    pub version: u64,

    /// The parsed text.
    pub text: SourceSnapshot,

    /// The syntax tree.
    pub tree: Tree,

    /// Import bindings in source order.
    pub imports: SmallVec<[ImportBinding; 8]>,
}

impl SourceFile {
    /// Returns `true` if the file contains syntax errors.
    #[inline]
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.tree.root_node().has_error()
    }

    /// Finds the import binding for a local name.
    #[must_use]
    pub fn import_for(&self, local_name: &str) -> Option<&ImportBinding> {
        self.imports.iter().find(|binding| binding.local_name == local_name)
    }
}

impl fmt::Debug for SourceFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceFile")
            .field("file_name", &self.file_name)
            .field("version", &self.version)
            .field("imports", &self.imports.len())
            .finish_non_exhaustive()
    }
}

/// An immutable set of parsed source files, ordered by file name.
#[derive(Debug, Default)]
pub struct Program {
    files: BTreeMap<Utf8PathBuf, Arc<SourceFile>>,
}

impl Program {
    /// Builds a program from parsed files.
    #[must_use]
    pub fn from_files(files: impl IntoIterator<Item = Arc<SourceFile>>) -> Self {
        Self {
            files: files
                .into_iter()
                .map(|file| (file.file_name.clone(), file))
                .collect(),
        }
    }

    /// Iterates over the file names in order.
    pub fn source_file_names(&self) -> impl Iterator<Item = &Utf8Path> {
        self.files.keys().map(Utf8PathBuf::as_path)
    }

    /// Iterates over the files in order of file name.
    pub fn source_files(&self) -> impl Iterator<Item = &SourceFile> {
        self.files.values().map(AsRef::as_ref)
    }

    /// Looks up a file by absolute name.
    #[must_use]
    pub fn source_file(&self, file_name: &Utf8Path) -> Option<&SourceFile> {
        self.files.get(file_name).map(AsRef::as_ref)
    }

    /// Returns `true` if the program contains `file_name`.
    #[must_use]
    pub fn contains(&self, file_name: &Utf8Path) -> bool {
        self.files.contains_key(file_name)
    }

    /// Returns `true` if `file_name` is in the program and has syntax errors.
    #[must_use]
    pub fn has_errors(&self, file_name: &Utf8Path) -> bool {
        self.source_file(file_name).is_some_and(SourceFile::has_errors)
    }

    /// Returns the number of files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Returns `true` if the program has no files.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Builds programs from a [`ServiceHost`].
pub trait LanguageService: Send {
    /// Returns a program reflecting the host's current files.
    ///
    /// Returns `None` when no program can be built at all (for example
    /// when the grammars fail to load). Individual unparseable files are
    /// left out instead.
    fn get_program(&mut self, host: &dyn ServiceHost) -> Option<Arc<Program>>;
}

/// A [`LanguageService`] backed by tree-sitter.
#[derive(Debug, Default)]
pub struct TreeSitterService {
    files: FxHashMap<Utf8PathBuf, Arc<SourceFile>>,
    program: Option<Arc<Program>>,
}

struct PendingParse {
    file_name: Utf8PathBuf,
    version: u64,
    text: SourceSnapshot,
}

/// One lazily created parser per grammar, owned by a rayon worker.
#[derive(Default)]
struct WorkerParsers {
    typescript: Option<TsParser>,
    tsx: Option<TsParser>,
}

impl WorkerParsers {
    fn parser(&mut self, grammar: Grammar) -> Result<&mut TsParser, ParseError> {
        let slot = match grammar {
            Grammar::TypeScript => &mut self.typescript,
            Grammar::Tsx => &mut self.tsx,
        };
        if slot.is_none() {
            *slot = Some(TsParser::with_grammar(grammar)?);
        }
        slot.as_mut().ok_or(ParseError::LanguageInit)
    }

    fn parse(&mut self, pending: PendingParse) -> Result<SourceFile, (Utf8PathBuf, ParseError)> {
        let grammar = Grammar::for_path(&pending.file_name);
        let result = self
            .parser(grammar)
            .and_then(|parser| parser.parse(pending.text.text()));

        match result {
            Ok(result) => Ok(SourceFile {
                file_name: pending.file_name,
                version: pending.version,
                text: pending.text,
                tree: result.tree,
                imports: result.imports,
            }),
            Err(error) => Err((pending.file_name, error)),
        }
    }
}

impl TreeSitterService {
    /// Creates a service with an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of cached parsed files.
    #[must_use]
    pub fn cached_files(&self) -> usize {
        self.files.len()
    }
}

impl LanguageService for TreeSitterService {
    fn get_program(&mut self, host: &dyn ServiceHost) -> Option<Arc<Program>> {
        let file_names = host.file_names();
        let mut current: FxHashMap<Utf8PathBuf, Arc<SourceFile>> = FxHashMap::default();
        let mut pending = Vec::new();

        for file_name in file_names {
            let Some(version) = host.script_version(&file_name) else {
                continue;
            };
            let Some(text) = host.script_snapshot(&file_name) else {
                tracing::debug!(file = %file_name, "No snapshot for program file");
                continue;
            };

            match self.files.get(&file_name) {
                Some(cached)
                    if cached.version == version
                        && (cached.text.same_as(&text) || cached.text == text) =>
                {
                    current.insert(file_name, Arc::clone(cached));
                }
                _ => pending.push(PendingParse {
                    file_name,
                    version,
                    text,
                }),
            }
        }

        if pending.is_empty() && current.len() == self.files.len() {
            if let Some(program) = &self.program {
                return Some(Arc::clone(program));
            }
        }

        let reparsed = pending.len();
        let parsed: Vec<_> = pending
            .into_par_iter()
            .map_init(WorkerParsers::default, WorkerParsers::parse)
            .collect();

        for outcome in parsed {
            match outcome {
                Ok(file) => {
                    current.insert(file.file_name.clone(), Arc::new(file));
                }
                Err((file_name, ParseError::LanguageInit)) => {
                    tracing::error!(file = %file_name, "Failed to load grammar");
                    return None;
                }
                Err((file_name, error)) => {
                    tracing::warn!(file = %file_name, %error, "Failed to parse file");
                }
            }
        }

        tracing::debug!(files = current.len(), reparsed, "Built program");

        let program = Arc::new(Program::from_files(current.values().map(Arc::clone)));
        self.files = current;
        self.program = Some(Arc::clone(&program));
        Some(program)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    pub(crate) struct MemoryHost {
        pub files: RefCell<BTreeMap<Utf8PathBuf, (u64, SourceSnapshot)>>,
    }

    impl MemoryHost {
        fn set(&self, name: &str, version: u64, content: &str) {
            self.files.borrow_mut().insert(
                Utf8PathBuf::from(name),
                (version, SourceSnapshot::from_string(content)),
            );
        }
    }

    impl ServiceHost for MemoryHost {
        fn project_root(&self) -> &Utf8Path {
            Utf8Path::new("/p")
        }

        fn file_names(&self) -> Vec<Utf8PathBuf> {
            self.files.borrow().keys().cloned().collect()
        }

        fn script_version(&self, file_name: &Utf8Path) -> Option<u64> {
            self.files.borrow().get(file_name).map(|(v, _)| *v)
        }

        fn script_snapshot(&self, file_name: &Utf8Path) -> Option<SourceSnapshot> {
            self.files.borrow().get(file_name).map(|(_, s)| s.clone())
        }

        fn file_exists(&self, file_name: &Utf8Path) -> bool {
            self.files.borrow().contains_key(file_name)
        }

        fn directory_exists(&self, _directory: &Utf8Path) -> bool {
            false
        }

        fn read_file(&self, file_name: &Utf8Path) -> Option<String> {
            self.script_snapshot(file_name).map(|s| s.text().to_owned())
        }
    }

    #[test]
    fn test_program_contains_host_files() {
        let host = MemoryHost::default();
        host.set("/p/src/a.ts", 0, "export const a = 1;");
        host.set("/p/src/b.tsx", 0, "export const b = <div />;");

        let mut service = TreeSitterService::new();
        let program = service.get_program(&host).expect("program");

        let names: Vec<_> = program.source_file_names().map(Utf8Path::as_str).collect();
        assert_eq!(names, vec!["/p/src/a.ts", "/p/src/b.tsx"]);
        assert!(!program.has_errors(Utf8Path::new("/p/src/b.tsx")));
    }

    #[test]
    fn test_unchanged_host_reuses_program() {
        let host = MemoryHost::default();
        host.set("/p/src/a.ts", 0, "export const a = 1;");

        let mut service = TreeSitterService::new();
        let first = service.get_program(&host).expect("program");
        let second = service.get_program(&host).expect("program");
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_only_changed_files_are_reparsed() {
        let host = MemoryHost::default();
        host.set("/p/src/a.ts", 0, "export const a = 1;");
        host.set("/p/src/b.ts", 0, "export const b = 1;");

        let mut service = TreeSitterService::new();
        let first = service.get_program(&host).expect("program");

        host.set("/p/src/b.ts", 1, "export const b = 2;");
        let second = service.get_program(&host).expect("program");

        let a = Utf8Path::new("/p/src/a.ts");
        let b = Utf8Path::new("/p/src/b.ts");
        assert!(std::ptr::eq(
            first.source_file(a).expect("a"),
            second.source_file(a).expect("a")
        ));
        assert_eq!(second.source_file(b).expect("b").text.text(), "export const b = 2;");
        assert_eq!(second.source_file(b).expect("b").version, 1);
    }

    #[test]
    fn test_removed_files_leave_program() {
        let host = MemoryHost::default();
        host.set("/p/src/a.ts", 0, "export const a = 1;");
        host.set("/p/src/b.ts", 0, "export const b = 1;");

        let mut service = TreeSitterService::new();
        service.get_program(&host).expect("program");

        host.files.borrow_mut().remove(Utf8Path::new("/p/src/b.ts"));
        let program = service.get_program(&host).expect("program");
        assert_eq!(program.len(), 1);
        assert_eq!(service.cached_files(), 1);
    }

    #[test]
    fn test_readded_file_with_reset_version_is_reparsed() {
        let host = MemoryHost::default();
        host.set("/p/src/a.ts", 0, "export const a = 1;");

        let mut service = TreeSitterService::new();
        service.get_program(&host).expect("program");

        host.set("/p/src/a.ts", 0, "export const a = 2;");
        let program = service.get_program(&host).expect("program");
        let file = program.source_file(Utf8Path::new("/p/src/a.ts")).expect("a");
        assert_eq!(file.text.text(), "export const a = 2;");
    }
}
