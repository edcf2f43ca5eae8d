//! Glob-based watch locations.
//!
//! Locations are absolute glob patterns (as produced by
//! [`ProjectConfig`]). Each pattern contributes a base directory, the part
//! before its first glob component, which is what gets walked and handed to
//! notify. A file belongs to the watch set when it matches an include
//! pattern and no exclude pattern.

use camino::{Utf8Path, Utf8PathBuf};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use sa_core::{ProjectConfig, paths};

use crate::error::WatchError;

/// The set of files a watcher is responsible for.
///
/// # Examples
///
/// ```
/// use sa_watcher::WatchLocations;
/// use camino::{Utf8Path, Utf8PathBuf};
///
/// let locations = WatchLocations::new(
///     &[Utf8PathBuf::from("/p/src/**/*")],
///     &[Utf8PathBuf::from("/p/src/**/*.test.ts")],
/// )?;
///
/// assert_eq!(locations.bases(), [Utf8PathBuf::from("/p/src")]);
/// assert!(locations.matches(Utf8Path::new("/p/src/routes/users.ts")));
/// assert!(!locations.matches(Utf8Path::new("/p/src/users.test.ts")));
/// assert!(!locations.matches(Utf8Path::new("/p/scripts/seed.ts")));
/// # Ok::<(), sa_watcher::WatchError>(())
/// ```
#[derive(Debug, Clone)]
pub struct WatchLocations {
    include: GlobSet,
    exclude: GlobSet,
    bases: Vec<Utf8PathBuf>,
}

impl WatchLocations {
    /// Compiles include and exclude patterns.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Glob`] if a pattern is not a valid glob.
    pub fn new(include: &[Utf8PathBuf], exclude: &[Utf8PathBuf]) -> Result<Self, WatchError> {
        let mut bases: Vec<Utf8PathBuf> = include.iter().map(|pattern| glob_base(pattern)).collect();
        bases.sort();
        bases.dedup();

        // Nested bases are already covered by a recursive watch on their ancestor.
        let mut outermost: Vec<Utf8PathBuf> = Vec::with_capacity(bases.len());
        for base in bases {
            if !outermost.iter().any(|outer| base.starts_with(outer)) {
                outermost.push(base);
            }
        }

        Ok(Self {
            include: compile(include)?,
            exclude: compile(exclude)?,
            bases: outermost,
        })
    }

    /// Builds the locations a project's `tsconfig.json` asks for.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Glob`] if a pattern is not a valid glob.
    pub fn from_project(project: &ProjectConfig) -> Result<Self, WatchError> {
        Self::new(project.watch_locations(), project.exclude_locations())
    }

    /// Returns the directories to walk and watch, outermost only.
    #[must_use]
    pub fn bases(&self) -> &[Utf8PathBuf] {
        &self.bases
    }

    /// Returns `true` if `path` is inside the watch set.
    #[must_use]
    pub fn matches(&self, path: &Utf8Path) -> bool {
        self.include.is_match(path.as_std_path()) && !self.exclude.is_match(path.as_std_path())
    }
}

fn compile(patterns: &[Utf8PathBuf]) -> Result<GlobSet, WatchError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = GlobBuilder::new(pattern.as_str())
            .literal_separator(true)
            .build()
            .map_err(|source| WatchError::Glob {
                pattern: pattern.to_string(),
                source,
            })?;
        builder.add(glob);
    }
    builder.build().map_err(|source| WatchError::Glob {
        pattern: patterns
            .iter()
            .map(|pattern| pattern.as_str())
            .collect::<Vec<_>>()
            .join(", "),
        source,
    })
}

/// The directory part of a pattern, before its first glob component.
///
/// A pattern without glob characters names one file; its parent is the base.
fn glob_base(pattern: &Utf8Path) -> Utf8PathBuf {
    if !paths::has_glob_chars(pattern.as_str()) {
        return pattern
            .parent()
            .map_or_else(|| pattern.to_owned(), Utf8Path::to_owned);
    }

    pattern
        .components()
        .take_while(|component| !paths::has_glob_chars(component.as_str()))
        .collect()
}
