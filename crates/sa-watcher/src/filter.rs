//! File filtering for watch events.
//!
//! Filtering happens at the source, in the walk and in the notify callback,
//! so the consumer only sees files it can analyze.
//!
//! # Examples
//!
//! ```
//! use sa_watcher::{FileFilter, SourceFileFilter};
//! use sa_core::WatchConfig;
//! use camino::Utf8Path;
//!
//! let filter = SourceFileFilter::from_config(&WatchConfig::default());
//!
//! assert!(filter.should_process(Utf8Path::new("/p/src/index.ts")));
//! assert!(filter.should_process(Utf8Path::new("/p/src/worker.mjs")));
//! assert!(!filter.should_process(Utf8Path::new("/p/src/env.d.ts")));
//! assert!(!filter.should_process(Utf8Path::new("/p/node_modules/hono/index.ts")));
//! assert!(!filter.should_process(Utf8Path::new("/p/README.md")));
//! ```

use camino::Utf8Path;
use sa_core::WatchConfig;
use smallvec::SmallVec;

/// A filter for determining which files to watch.
///
/// Filters must be [`Send`] and [`Sync`] because they are used from the
/// blocking watcher thread.
pub trait FileFilter: Send + Sync + 'static {
    /// Returns `true` if the file at the given path should be processed.
    fn should_process(&self, path: &Utf8Path) -> bool;
}

/// Accepts script sources by extension and skips ignored directories.
///
/// Declaration files (`.d.ts`, `.d.mts`, `.d.cts`) never register routes
/// and are always skipped.
#[derive(Debug, Clone)]
pub struct SourceFileFilter {
    extensions: SmallVec<[String; 8]>,
    ignore_dirs: SmallVec<[String; 8]>,
}

impl SourceFileFilter {
    /// Builds the filter from the watch configuration.
    #[must_use]
    pub fn from_config(config: &WatchConfig) -> Self {
        Self {
            extensions: config.extensions.iter().cloned().collect(),
            ignore_dirs: config.ignore_dirs.iter().cloned().collect(),
        }
    }

    /// Returns `true` if a directory with this name is skipped entirely.
    #[must_use]
    pub fn is_ignored_dir(&self, name: &str) -> bool {
        self.ignore_dirs.iter().any(|dir| dir == name)
    }

    fn has_source_extension(&self, path: &Utf8Path) -> bool {
        path.extension()
            .is_some_and(|ext| self.extensions.iter().any(|known| known == ext))
    }

    fn is_declaration_file(path: &Utf8Path) -> bool {
        path.file_stem()
            .is_some_and(|stem| stem.ends_with(".d"))
    }
}

impl Default for SourceFileFilter {
    fn default() -> Self {
        Self::from_config(&WatchConfig::default())
    }
}

impl FileFilter for SourceFileFilter {
    fn should_process(&self, path: &Utf8Path) -> bool {
        if !self.has_source_extension(path) || Self::is_declaration_file(path) {
            return false;
        }

        !path
            .components()
            .any(|component| self.is_ignored_dir(component.as_str()))
    }
}
