//! The in-memory project the language service reads from.
//!
//! [`MonitorHost`] owns the file map fed by watch events and implements
//! [`ServiceHost`] on top of it. Every applied change bumps a generation
//! counter, which the monitor uses to decide whether its cached program is
//! still current.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use camino::{Utf8Path, Utf8PathBuf};
use parking_lot::{Mutex, RwLock};
use sa_core::{FxHashMap, FxHashSet, paths};
use sa_ts_parser::{ServiceHost, SourceSnapshot};
use sa_watcher::WatchEvent;
use tracing::{trace, warn};

#[derive(Debug, Clone)]
struct FileInfo {
    version: u64,
    snapshot: SourceSnapshot,
}

/// Known files plus existence caches, shared between the event pump and
/// the analysis pass.
///
/// # Examples
///
/// ```
/// use sa_monitor::MonitorHost;
/// use sa_ts_parser::ServiceHost;
/// use sa_watcher::WatchEvent;
/// use camino::Utf8Path;
///
/// let host = MonitorHost::new("/p", true);
/// host.apply(WatchEvent::added("/p/src/index.ts".into(), "export {};"));
/// host.apply(WatchEvent::updated("/p/src/index.ts".into(), "export const a = 1;"));
///
/// let file = Utf8Path::new("/p/src/index.ts");
/// assert_eq!(host.script_version(file), Some(1));
/// assert_eq!(host.read_file(file).as_deref(), Some("export const a = 1;"));
/// assert!(host.file_exists(file));
/// ```
#[derive(Debug)]
pub struct MonitorHost {
    project_root: Utf8PathBuf,
    files: RwLock<BTreeMap<Utf8PathBuf, FileInfo>>,
    generation: AtomicU64,
    aggressive_caching: AtomicBool,
    file_exists_cache: Mutex<FxHashMap<Utf8PathBuf, bool>>,
    directory_exists_cache: Mutex<FxHashMap<Utf8PathBuf, bool>>,
}

impl MonitorHost {
    /// Creates an empty host rooted at `project_root`.
    pub fn new(project_root: impl AsRef<Utf8Path>, aggressive_caching: bool) -> Self {
        Self {
            project_root: paths::absolutize(project_root.as_ref()),
            files: RwLock::new(BTreeMap::new()),
            generation: AtomicU64::new(0),
            aggressive_caching: AtomicBool::new(aggressive_caching),
            file_exists_cache: Mutex::new(FxHashMap::default()),
            directory_exists_cache: Mutex::new(FxHashMap::default()),
        }
    }

    /// Applies a watch event to the file map.
    ///
    /// - `FileAdded` stores the content at version 0, or one past the current
    ///   version if the file is already known
    /// - `FileUpdated` bumps the version and takes the text of the first
    ///   change; updates for unknown files are ignored with a warning
    /// - `FileRemoved` forgets the file
    ///
    /// Returns `true` if the event should schedule a re-analysis.
    pub fn apply(&self, event: WatchEvent) -> bool {
        let changed = match event {
            WatchEvent::FileAdded { file_name, content } => {
                let mut files = self.files.write();
                let version = files.get(&file_name).map_or(0, |info| info.version + 1);
                trace!(file = %file_name, version, "File added");
                files.insert(file_name, FileInfo::new(version, content));
                self.directory_exists_cache.lock().clear();
                true
            }
            WatchEvent::FileUpdated { file_name, changes } => {
                let mut files = self.files.write();
                if let Some(info) = files.get_mut(&file_name) {
                    let text = changes
                        .into_iter()
                        .next()
                        .map(|change| change.text)
                        .unwrap_or_default();
                    *info = FileInfo::new(info.version + 1, text);
                    trace!(file = %file_name, version = info.version, "File updated");
                    true
                } else {
                    warn!(file = %file_name, "File updated that wasn't added");
                    false
                }
            }
            WatchEvent::FileRemoved { file_name } => {
                if self.files.write().remove(&file_name).is_some() {
                    trace!(file = %file_name, "File removed");
                }
                self.directory_exists_cache.lock().clear();
                true
            }
        };

        if changed {
            self.generation.fetch_add(1, Ordering::AcqRel);
        }
        changed
    }

    /// Forgets every file not in `known`.
    ///
    /// Used on restart, when files may have disappeared while stopped.
    pub fn retain_files(&self, known: &[Utf8PathBuf]) {
        let known: FxHashSet<&Utf8Path> = known.iter().map(Utf8PathBuf::as_path).collect();
        let mut files = self.files.write();
        let before = files.len();
        files.retain(|file_name, _| known.contains(file_name.as_path()));
        if files.len() != before {
            self.generation.fetch_add(1, Ordering::AcqRel);
            self.directory_exists_cache.lock().clear();
        }
    }

    /// Returns a counter that changes whenever the file map changes.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Returns the number of known files.
    pub fn file_count(&self) -> usize {
        self.files.read().len()
    }

    /// Returns `true` if lookups prefer the file map and the existence caches.
    #[inline]
    pub fn aggressive_caching(&self) -> bool {
        self.aggressive_caching.load(Ordering::Relaxed)
    }

    /// Toggles aggressive caching.
    pub fn set_aggressive_caching(&self, enabled: bool) {
        self.aggressive_caching.store(enabled, Ordering::Relaxed);
    }

    /// Drops cached file existence answers.
    pub fn clear_file_exists_cache(&self) {
        self.file_exists_cache.lock().clear();
    }

    fn known_snapshot(&self, file_name: &Utf8Path) -> Option<SourceSnapshot> {
        self.files
            .read()
            .get(file_name)
            .map(|info| info.snapshot.clone())
    }

    fn cached(
        &self,
        cache: &Mutex<FxHashMap<Utf8PathBuf, bool>>,
        path: &Utf8Path,
        lookup: impl FnOnce() -> bool,
    ) -> bool {
        if self.aggressive_caching() {
            if let Some(&hit) = cache.lock().get(path) {
                return hit;
            }
        }
        let exists = lookup();
        cache.lock().insert(path.to_owned(), exists);
        exists
    }
}

impl FileInfo {
    fn new(version: u64, content: impl Into<std::sync::Arc<str>>) -> Self {
        Self {
            version,
            snapshot: SourceSnapshot::from_string(content),
        }
    }
}

impl ServiceHost for MonitorHost {
    fn project_root(&self) -> &Utf8Path {
        &self.project_root
    }

    fn file_names(&self) -> Vec<Utf8PathBuf> {
        self.files.read().keys().cloned().collect()
    }

    fn script_version(&self, file_name: &Utf8Path) -> Option<u64> {
        self.files.read().get(file_name).map(|info| info.version)
    }

    fn script_snapshot(&self, file_name: &Utf8Path) -> Option<SourceSnapshot> {
        if self.aggressive_caching() {
            if let Some(snapshot) = self.known_snapshot(file_name) {
                return Some(snapshot);
            }
        }
        std::fs::read_to_string(file_name)
            .ok()
            .map(SourceSnapshot::from_string)
            .or_else(|| self.known_snapshot(file_name))
    }

    fn file_exists(&self, file_name: &Utf8Path) -> bool {
        self.cached(&self.file_exists_cache, file_name, || {
            self.files.read().contains_key(file_name) || file_name.is_file()
        })
    }

    fn directory_exists(&self, directory: &Utf8Path) -> bool {
        self.cached(&self.directory_exists_cache, directory, || {
            self.files
                .read()
                .keys()
                .any(|file_name| file_name.starts_with(directory))
                || directory.is_dir()
        })
    }

    fn read_file(&self, file_name: &Utf8Path) -> Option<String> {
        self.script_snapshot(file_name)
            .map(|snapshot| snapshot.text().to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(s: &str) -> &Utf8Path {
        Utf8Path::new(s)
    }

    #[test]
    fn test_versions_grow_per_file() {
        let host = MonitorHost::new("/p", true);
        assert!(host.apply(WatchEvent::added("/p/a.ts".into(), "a")));
        assert!(host.apply(WatchEvent::updated("/p/a.ts".into(), "b")));
        assert!(host.apply(WatchEvent::updated("/p/a.ts".into(), "c")));
        assert_eq!(host.script_version(path("/p/a.ts")), Some(2));

        // A re-add never resets the version.
        assert!(host.apply(WatchEvent::added("/p/a.ts".into(), "d")));
        assert_eq!(host.script_version(path("/p/a.ts")), Some(3));
        assert_eq!(host.read_file(path("/p/a.ts")).as_deref(), Some("d"));
    }

    #[test]
    fn test_update_for_unknown_file_is_ignored() {
        let host = MonitorHost::new("/p", true);
        let generation = host.generation();
        assert!(!host.apply(WatchEvent::updated("/p/ghost.ts".into(), "x")));
        assert_eq!(host.generation(), generation);
        assert_eq!(host.file_count(), 0);
    }

    #[test]
    fn test_update_without_changes_empties_file() {
        let host = MonitorHost::new("/p", true);
        host.apply(WatchEvent::added("/p/a.ts".into(), "a"));
        host.apply(WatchEvent::FileUpdated {
            file_name: "/p/a.ts".into(),
            changes: Default::default(),
        });
        assert_eq!(host.read_file(path("/p/a.ts")).as_deref(), Some(""));
    }

    #[test]
    fn test_remove_forgets_file_and_bumps_generation() {
        let host = MonitorHost::new("/p", true);
        host.apply(WatchEvent::added("/p/a.ts".into(), "a"));
        let generation = host.generation();

        assert!(host.apply(WatchEvent::removed("/p/a.ts".into())));
        assert!(host.generation() > generation);
        assert!(host.file_names().is_empty());
        assert!(!host.file_exists(path("/p/a.ts")));
    }

    #[test]
    fn test_aggressive_caching_reuses_existence_answers() {
        let host = MonitorHost::new("/p", true);
        assert!(!host.file_exists(path("/p/late.ts")));

        host.apply(WatchEvent::added("/p/late.ts".into(), "x"));
        assert!(!host.file_exists(path("/p/late.ts")), "cached answer");

        host.clear_file_exists_cache();
        assert!(host.file_exists(path("/p/late.ts")));
    }

    #[test]
    fn test_without_aggressive_caching_lookups_are_fresh() {
        let host = MonitorHost::new("/p", false);
        assert!(!host.file_exists(path("/p/late.ts")));
        host.apply(WatchEvent::added("/p/late.ts".into(), "x"));
        assert!(host.file_exists(path("/p/late.ts")));
        assert!(host.directory_exists(path("/p")));
    }

    #[test]
    fn test_snapshot_prefers_disk_without_aggressive_caching() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let root = Utf8Path::from_path(dir.path()).expect("utf-8 temp dir");
        let file = root.join("a.ts");
        std::fs::write(&file, "on disk").expect("write file");

        let host = MonitorHost::new(root, true);
        host.apply(WatchEvent::added(file.clone(), "in memory"));
        assert_eq!(host.read_file(&file).as_deref(), Some("in memory"));

        host.set_aggressive_caching(false);
        assert_eq!(host.read_file(&file).as_deref(), Some("on disk"));
    }

    #[test]
    fn test_retain_files_prunes_stale_entries() {
        let host = MonitorHost::new("/p", true);
        host.apply(WatchEvent::added("/p/a.ts".into(), "a"));
        host.apply(WatchEvent::added("/p/b.ts".into(), "b"));

        host.retain_files(&[Utf8PathBuf::from("/p/b.ts")]);
        assert_eq!(host.file_names(), vec![Utf8PathBuf::from("/p/b.ts")]);
    }
}
