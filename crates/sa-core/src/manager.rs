//! The resource manager: identity derivation, storage and linking.
//!
//! A [`ResourceManager`] is populated by the route extractor during one
//! analysis pass and then handed off read-only inside a routes result.
//!
//! # Identifiers
//!
//! Located resources are keyed by `{TYPE}:{encoded relative file}@{position}`,
//! module references by `MODULE_REFERENCE:{encoded import path}@{encoded import name}`.
//! Re-deriving the key for the same location always yields the same identifier,
//! so re-parsing a file overwrites the records it produced last time.
//!
//! # Examples
//!
//! ```
//! use sa_core::{IdKey, ResourceManager, ResourceType};
//!
//! let manager = ResourceManager::new("/project");
//! let from_absolute = manager.get_id(IdKey::located(
//!     ResourceType::RouteEntry,
//!     "/project/src/index.ts".as_ref(),
//!     42,
//! ));
//! let from_relative = manager.get_id(IdKey::located(
//!     ResourceType::RouteEntry,
//!     "src/index.ts".as_ref(),
//!     42,
//! ));
//!
//! assert_eq!(from_absolute, from_relative);
//! assert_eq!(from_absolute.as_str(), "ROUTE_ENTRY:src%2Findex.ts@42");
//! ```

use std::collections::BTreeMap;
use std::collections::hash_map::Entry;

use camino::{Utf8Path, Utf8PathBuf};

use crate::error::ResourceError;
use crate::hash::FxHashMap;
use crate::paths;
use crate::resource::{
    Id, MiddlewareEntry, MiddlewareEntryProps, ModuleReference, ModuleReferenceId,
    ModuleReferenceProps, Resource, ResourceProps, ResourceType, RouteEntry, RouteEntryProps,
    RouteTree, RouteTreeEntry, RouteTreeId, RouteTreeProps, RouteTreeReference,
    RouteTreeReferenceProps, SourceReference, SourceReferenceProps, TreeResource, TreeResourceId,
};

/// The key an identifier is derived from.
///
/// Located kinds are keyed by file and position; module references by
/// import path and imported name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdKey<'a> {
    /// A `(kind, file, position)` key.
    Located {
        /// Resource kind.
        kind: ResourceType,
        /// File name, absolute or relative to the project root.
        file_name: &'a Utf8Path,
        /// Offset within the file.
        position: u32,
    },
    /// An `(import path, import name)` key for module references.
    Module {
        /// Module specifier.
        import_path: &'a str,
        /// Imported name.
        import_name: &'a str,
    },
}

impl<'a> IdKey<'a> {
    /// Creates a [`IdKey::Located`] key.
    #[inline]
    #[must_use]
    pub const fn located(kind: ResourceType, file_name: &'a Utf8Path, position: u32) -> Self {
        Self::Located {
            kind,
            file_name,
            position,
        }
    }

    /// Creates a [`IdKey::Module`] key.
    #[inline]
    #[must_use]
    pub const fn module(import_path: &'a str, import_name: &'a str) -> Self {
        Self::Module {
            import_path,
            import_name,
        }
    }
}

/// A decoded located identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedId {
    /// Resource kind.
    pub resource_type: ResourceType,
    /// Absolute file name.
    pub file_name: Utf8PathBuf,
    /// Offset within the file.
    pub position: u32,
}

/// Identity-keyed store of analysis artifacts.
#[derive(Debug, Clone)]
pub struct ResourceManager {
    project_root: Utf8PathBuf,
    references: FxHashMap<TreeResourceId, TreeResource>,
}

impl ResourceManager {
    /// Creates an empty manager anchored on `project_root`.
    ///
    /// A relative root is resolved against the working directory.
    pub fn new(project_root: impl AsRef<Utf8Path>) -> Self {
        Self {
            project_root: paths::absolutize(project_root.as_ref()),
            references: FxHashMap::default(),
        }
    }

    /// Returns the absolute project root.
    #[inline]
    #[must_use]
    pub fn project_root(&self) -> &Utf8Path {
        &self.project_root
    }

    /// Converts an absolute path to one relative to the project root.
    ///
    /// Relative paths are only normalized.
    #[must_use]
    pub fn as_relative_path(&self, path: &Utf8Path) -> Utf8PathBuf {
        if path.is_absolute() {
            paths::relative_to(&self.project_root, path)
        } else {
            paths::normalize(path)
        }
    }

    /// Converts a path relative to the project root to an absolute one.
    ///
    /// Absolute paths are only normalized.
    #[must_use]
    pub fn as_absolute_path(&self, path: &Utf8Path) -> Utf8PathBuf {
        if path.is_absolute() {
            paths::normalize(path)
        } else {
            paths::normalize(&self.project_root.join(path))
        }
    }

    /// Derives the identifier for `key`. Pure; nothing is stored.
    #[must_use]
    pub fn get_id(&self, key: IdKey<'_>) -> TreeResourceId {
        let raw = match key {
            IdKey::Module {
                import_path,
                import_name,
            } => format!(
                "{}:{}@{}",
                ResourceType::ModuleReference,
                urlencoding::encode(import_path),
                urlencoding::encode(import_name),
            ),
            IdKey::Located {
                kind,
                file_name,
                position,
            } => {
                let relative = self.as_relative_path(file_name);
                format!("{kind}:{}@{position}", urlencoding::encode(relative.as_str()))
            }
        };
        TreeResourceId::from_raw(raw)
    }

    /// Derives the typed identifier of a located resource of kind `R`.
    #[must_use]
    pub fn located_id<R: Resource>(&self, file_name: &Utf8Path, position: u32) -> Id<R> {
        Id::new_unchecked(self.get_id(IdKey::located(R::TYPE, file_name, position)))
    }

    /// Derives the identifier of a module reference.
    #[must_use]
    pub fn module_reference_id(&self, import_path: &str, import_name: &str) -> ModuleReferenceId {
        Id::new_unchecked(self.get_id(IdKey::module(import_path, import_name)))
    }

    /// Decodes a located identifier back into kind, absolute file and position.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::InvalidId`] when the identifier is malformed
    /// or names a module reference (whose second half is not a position).
    ///
    /// # Examples
    ///
    /// ```
    /// use sa_core::{IdKey, ResourceManager, ResourceType};
    ///
    /// let manager = ResourceManager::new("/project");
    /// let id = manager.get_id(IdKey::located(ResourceType::SourceReference, "src/a b.ts".as_ref(), 7));
    /// let decoded = manager.decode_id(&id).unwrap();
    ///
    /// assert_eq!(decoded.resource_type, ResourceType::SourceReference);
    /// assert_eq!(decoded.file_name, "/project/src/a b.ts");
    /// assert_eq!(decoded.position, 7);
    /// ```
    pub fn decode_id(&self, id: &TreeResourceId) -> Result<DecodedId, ResourceError> {
        let raw = id.as_str();
        let (prefix, rest) = raw
            .split_once(':')
            .ok_or_else(|| ResourceError::invalid_id(raw, "missing type separator"))?;
        let resource_type = ResourceType::parse(prefix)
            .ok_or_else(|| ResourceError::invalid_id(raw, "unknown resource type"))?;

        if !resource_type.is_located() {
            return Err(ResourceError::invalid_id(
                raw,
                "module reference ids do not encode a position",
            ));
        }

        let (encoded_file, position) = rest
            .rsplit_once('@')
            .ok_or_else(|| ResourceError::invalid_id(raw, "missing position separator"))?;
        let position = position
            .parse::<u32>()
            .map_err(|_| ResourceError::invalid_id(raw, "position is not numeric"))?;
        let file_name = urlencoding::decode(encoded_file)
            .map_err(|_| ResourceError::invalid_id(raw, "file name is not valid UTF-8"))?;

        Ok(DecodedId {
            resource_type,
            file_name: self.as_absolute_path(Utf8Path::new(file_name.as_ref())),
            position,
        })
    }

    /// Builds a record from `props` without storing it.
    pub fn build<P: ResourceProps>(&self, props: P) -> P::Resource {
        let id = Id::new_unchecked(self.get_id(props.id_key()));
        props.into_resource(id, self)
    }

    /// Builds and stores a record, returning a copy of what was stored.
    ///
    /// An existing record with the same identifier is overwritten and a
    /// warning is logged.
    pub fn create<P: ResourceProps>(&mut self, props: P) -> P::Resource {
        let resource = self.build(props);
        let id = resource.id().as_untyped().clone();

        match self.references.entry(id) {
            Entry::Occupied(mut slot) => {
                tracing::warn!(id = %slot.key(), "Resource already exists, overwriting");
                slot.insert(resource.clone().into());
            }
            Entry::Vacant(slot) => {
                slot.insert(resource.clone().into());
            }
        }

        resource
    }

    /// Creates a [`RouteTree`].
    pub fn create_route_tree(&mut self, props: RouteTreeProps) -> RouteTree {
        self.create(props)
    }

    /// Creates a [`RouteEntry`].
    pub fn create_route_entry(&mut self, props: RouteEntryProps) -> RouteEntry {
        self.create(props)
    }

    /// Creates a [`MiddlewareEntry`].
    pub fn create_middleware_entry(&mut self, props: MiddlewareEntryProps) -> MiddlewareEntry {
        self.create(props)
    }

    /// Creates a [`SourceReference`] with an empty module set.
    pub fn create_source_reference(&mut self, props: SourceReferenceProps) -> SourceReference {
        self.create(props)
    }

    /// Creates a [`ModuleReference`].
    pub fn create_module_reference(&mut self, props: ModuleReferenceProps) -> ModuleReference {
        self.create(props)
    }

    /// Creates a [`RouteTreeReference`].
    pub fn create_route_tree_reference(
        &mut self,
        props: RouteTreeReferenceProps,
    ) -> RouteTreeReference {
        self.create(props)
    }

    /// Looks up a resource of the statically expected kind.
    ///
    /// Returns `None` for unknown identifiers; never panics.
    #[must_use]
    pub fn get_resource<R: Resource>(&self, id: &Id<R>) -> Option<&R> {
        self.references.get(id.as_untyped()).and_then(R::from_tree)
    }

    /// Looks up a resource of any kind.
    #[must_use]
    pub fn get_untyped(&self, id: &TreeResourceId) -> Option<&TreeResource> {
        self.references.get(id)
    }

    /// Looks up an entry of a route tree.
    #[must_use]
    pub fn get_route_tree_entry(&self, id: &TreeResourceId) -> Option<RouteTreeEntry<'_>> {
        self.references.get(id).and_then(RouteTreeEntry::from_resource)
    }

    /// Removes a resource. No-op if absent.
    pub fn remove_resource(&mut self, id: &TreeResourceId) -> Option<TreeResource> {
        self.references.remove(id)
    }

    /// Removes every resource.
    pub fn clear_resources(&mut self) {
        self.references.clear();
    }

    /// Links `module` to the source reference at `(file_name, position)`.
    ///
    /// The module is registered first if it is not stored yet (reusing a
    /// module reference is the expected case, so no warning is logged).
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::MissingSourceReference`] if no source reference
    /// exists at that location. Nothing is stored in that case.
    pub fn add_module_to_source_reference(
        &mut self,
        module: ModuleReference,
        file_name: &Utf8Path,
        position: u32,
    ) -> Result<(), ResourceError> {
        let source_id = self.located_id::<SourceReference>(file_name, position);

        if self.get_resource(&source_id).is_none() {
            tracing::error!(
                file_name = %file_name,
                position,
                id = %source_id,
                "Missing source reference"
            );
            return Err(ResourceError::MissingSourceReference {
                file_name: file_name.to_owned(),
                position,
                id: source_id.into(),
            });
        }

        let module_id = module.id.clone();
        self.references
            .entry(module_id.as_untyped().clone())
            .or_insert_with(|| module.into());

        if let Some(source) = self
            .references
            .get_mut(source_id.as_untyped())
            .and_then(SourceReference::from_tree_mut)
        {
            source.modules.insert(module_id);
        }

        Ok(())
    }

    /// Appends an entry to a route tree's registration-ordered entry list.
    ///
    /// Appending an entry that is already listed is a no-op, so re-parsing
    /// a location keeps the original order.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::MissingRouteTree`] if the tree does not exist.
    pub fn add_entry_to_route_tree(
        &mut self,
        route_tree_id: &RouteTreeId,
        entry_id: TreeResourceId,
    ) -> Result<(), ResourceError> {
        let tree = self
            .references
            .get_mut(route_tree_id.as_untyped())
            .and_then(RouteTree::from_tree_mut)
            .ok_or_else(|| ResourceError::MissingRouteTree(route_tree_id.as_untyped().clone()))?;

        if !tree.entries.contains(&entry_id) {
            tree.entries.push(entry_id);
        }
        Ok(())
    }

    /// Returns the entries of a route tree in registration order.
    ///
    /// Entries whose records were removed are skipped.
    pub fn route_tree_entries<'a>(
        &'a self,
        route_tree_id: &RouteTreeId,
    ) -> impl Iterator<Item = RouteTreeEntry<'a>> + 'a {
        self.get_resource(route_tree_id)
            .into_iter()
            .flat_map(|tree| tree.entries.iter())
            .filter_map(|id| self.get_route_tree_entry(id))
    }

    /// Returns an ordered snapshot of every resource, keyed by identifier.
    #[must_use]
    pub fn get_resources(&self) -> BTreeMap<&TreeResourceId, &TreeResource> {
        self.references.iter().collect()
    }

    /// Iterates over every resource in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &TreeResource> {
        self.references.values()
    }

    /// Iterates over every resource of kind `R` in no particular order.
    pub fn resources_of<'a, R: Resource + 'a>(&'a self) -> impl Iterator<Item = &'a R> + 'a {
        self.references.values().filter_map(R::from_tree)
    }

    /// Returns the number of stored resources.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.references.len()
    }

    /// Returns `true` if nothing is stored.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    const ROOT: &str = "/project";

    fn manager() -> ResourceManager {
        ResourceManager::new(ROOT)
    }

    fn tree(manager: &mut ResourceManager) -> RouteTree {
        manager.create_route_tree(RouteTreeProps {
            file_name: Utf8PathBuf::from("/project/src/index.ts"),
            position: 6,
            name: "app".to_owned(),
            base_path: None,
        })
    }

    fn route(manager: &mut ResourceManager, tree: &RouteTree, position: u32, path: &str) -> RouteEntry {
        manager.create_route_entry(RouteEntryProps {
            file_name: Utf8PathBuf::from("/project/src/index.ts"),
            position,
            method: "GET".to_owned(),
            path: path.to_owned(),
            route_tree_id: tree.id.clone(),
            sources: Vec::new(),
        })
    }

    fn source(manager: &mut ResourceManager, file: &str, position: u32) -> SourceReference {
        manager.create_source_reference(SourceReferenceProps {
            file_name: Utf8PathBuf::from(file),
            position,
            content: "(c) => c.json([])".to_owned(),
        })
    }

    fn module(manager: &ResourceManager, path: &str, name: &str) -> ModuleReference {
        manager.build(ModuleReferenceProps {
            import_path: path.to_owned(),
            import_name: name.to_owned(),
            is_external: false,
            file_name: None,
        })
    }

    #[test]
    fn test_get_id_is_deterministic() {
        let manager = manager();
        let key = IdKey::located(ResourceType::RouteEntry, Utf8Path::new("src/index.ts"), 10);
        assert_eq!(manager.get_id(key), manager.get_id(key));
    }

    #[test]
    fn test_get_id_absolute_equals_relative() {
        let manager = manager();
        for kind in ResourceType::ALL.into_iter().filter(|k| k.is_located()) {
            let absolute = manager.get_id(IdKey::located(kind, Utf8Path::new("/project/src/a.ts"), 3));
            let relative = manager.get_id(IdKey::located(kind, Utf8Path::new("src/a.ts"), 3));
            assert_eq!(absolute, relative, "{kind}");
        }
    }

    #[test]
    fn test_module_reference_id_encodes_both_parts() {
        let manager = manager();
        let id = manager.module_reference_id("@hono/zod-openapi", "createRoute");
        assert_eq!(id.as_str(), "MODULE_REFERENCE:%40hono%2Fzod-openapi@createRoute");
    }

    #[test]
    fn test_decode_id_round_trip() {
        let manager = manager();
        let files = ["src/index.ts", "src/routes/users@v2.ts", "src/ünïcode/a b.ts"];
        for kind in ResourceType::ALL.into_iter().filter(|k| k.is_located()) {
            for file in files {
                let id = manager.get_id(IdKey::located(kind, Utf8Path::new(file), 99));
                let decoded = manager.decode_id(&id).expect("decodes");
                assert_eq!(decoded.resource_type, kind);
                assert_eq!(decoded.file_name, Utf8Path::new(ROOT).join(file));
                assert_eq!(decoded.position, 99);
            }
        }
    }

    #[test]
    fn test_decode_id_rejects_module_references_and_garbage() {
        let manager = manager();
        let module_id = manager.module_reference_id("hono", "Hono");
        assert!(manager.decode_id(module_id.as_untyped()).is_err());
        assert!(manager.decode_id(&TreeResourceId::from_raw("nope")).is_err());
        assert!(manager.decode_id(&TreeResourceId::from_raw("ROUTE_ENTRY:a.ts@x")).is_err());
        assert!(manager.decode_id(&TreeResourceId::from_raw("WIDGET:a.ts@1")).is_err());
    }

    #[test]
    fn test_create_stores_relative_file_name() {
        let mut manager = manager();
        let tree = tree(&mut manager);
        assert_eq!(tree.file_name, "src/index.ts");
        assert_eq!(
            manager.get_resource(&tree.id).map(|t| t.name.as_str()),
            Some("app")
        );
    }

    /// Collects formatted log output for the duration of a test.
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
            self.0.lock().expect("log buffer").extend_from_slice(data);
            Ok(data.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl LogBuffer {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().expect("log buffer")).into_owned()
        }
    }

    #[test]
    fn test_create_twice_overwrites() {
        let logs = LogBuffer::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer({
                let logs = logs.clone();
                move || logs.clone()
            })
            .with_ansi(false)
            .with_target(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let mut manager = manager();
        let tree = tree(&mut manager);
        let first = route(&mut manager, &tree, 40, "/users");
        assert!(!logs.contents().contains("already exists"));
        let second = route(&mut manager, &tree, 40, "/people");

        let output = logs.contents();
        assert!(output.contains("WARN"), "{output}");
        assert!(output.contains("Resource already exists, overwriting"), "{output}");
        assert!(output.contains(first.id.as_untyped().as_str()), "{output}");

        let entries: Vec<_> = manager.resources_of::<RouteEntry>().collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path, "/people");
        assert_eq!(manager.get_resource(&second.id).map(|r| r.path.as_str()), Some("/people"));
    }

    #[test]
    fn test_get_resource_kind_mismatch_is_none() {
        let mut manager = manager();
        let tree = tree(&mut manager);
        let as_route: Id<RouteEntry> = Id::new_unchecked(tree.id.as_untyped().clone());
        assert!(manager.get_resource(&as_route).is_none());
        assert!(manager.get_untyped(&TreeResourceId::from_raw("ROUTE_TREE:x@1")).is_none());
    }

    #[test]
    fn test_module_dedup_across_files() {
        let mut manager = manager();
        let a = source(&mut manager, "/project/src/a.ts", 1);
        let b = source(&mut manager, "/project/src/b.ts", 2);

        manager
            .add_module_to_source_reference(module(&manager, "./db", "db"), "src/a.ts".as_ref(), 1)
            .expect("source a exists");
        manager
            .add_module_to_source_reference(module(&manager, "./db", "db"), "/project/src/b.ts".as_ref(), 2)
            .expect("source b exists");

        let a = manager.get_resource(&a.id).expect("a stored");
        let b = manager.get_resource(&b.id).expect("b stored");
        assert_eq!(a.modules, b.modules);
        assert_eq!(manager.resources_of::<ModuleReference>().count(), 1);
    }

    #[test]
    fn test_add_module_to_missing_source_reference_fails() {
        let mut manager = manager();
        let result = manager.add_module_to_source_reference(
            module(&manager, "hono", "Hono"),
            "src/missing.ts".as_ref(),
            5,
        );
        assert!(matches!(
            result,
            Err(ResourceError::MissingSourceReference { position: 5, .. })
        ));
        assert!(manager.is_empty());
    }

    #[test]
    fn test_add_entry_to_route_tree_keeps_order_and_dedups() {
        let mut manager = manager();
        let tree = tree(&mut manager);
        let first = route(&mut manager, &tree, 40, "/a");
        let second = route(&mut manager, &tree, 80, "/b");

        for id in [&first.id, &second.id, &first.id] {
            manager
                .add_entry_to_route_tree(&tree.id, id.as_untyped().clone())
                .expect("tree exists");
        }

        let ids: Vec<_> = manager.route_tree_entries(&tree.id).map(|e| e.id().clone()).collect();
        assert_eq!(ids, vec![first.id.as_untyped().clone(), second.id.as_untyped().clone()]);
    }

    #[test]
    fn test_add_entry_to_missing_route_tree_fails() {
        let mut manager = manager();
        let missing: RouteTreeId = manager.located_id(Utf8Path::new("src/x.ts"), 1);
        let result = manager.add_entry_to_route_tree(&missing, TreeResourceId::from_raw("ROUTE_ENTRY:x@2"));
        assert!(matches!(result, Err(ResourceError::MissingRouteTree(_))));
    }

    #[test]
    fn test_remove_and_clear() {
        let mut manager = manager();
        let tree = tree(&mut manager);
        route(&mut manager, &tree, 40, "/a");
        assert_eq!(manager.len(), 2);

        assert!(manager.remove_resource(tree.id.as_untyped()).is_some());
        assert!(manager.remove_resource(tree.id.as_untyped()).is_none());
        manager.clear_resources();
        assert!(manager.is_empty());
    }

    #[test]
    fn test_get_resources_snapshot_is_ordered() {
        let mut manager = manager();
        let tree = tree(&mut manager);
        route(&mut manager, &tree, 80, "/b");
        route(&mut manager, &tree, 40, "/a");

        let keys: Vec<_> = manager.get_resources().keys().map(|id| id.as_str().to_owned()).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn test_as_absolute_path_round_trip() {
        let manager = manager();
        let relative = manager.as_relative_path(Utf8Path::new("/project/src/x.ts"));
        assert_eq!(manager.as_absolute_path(&relative), "/project/src/x.ts");
    }
}
