//! Creation properties for each resource kind.
//!
//! The route extractor builds one of these and hands it to the
//! [`ResourceManager`], which derives the identifier and stores the record.
//! File names may be absolute or relative; they are stored relative to the
//! project root.

use camino::Utf8PathBuf;

use super::id::{Id, ResourceType};
use super::types::{
    MiddlewareEntry, ModuleReference, RouteEntry, RouteTree, RouteTreeId, RouteTreeReference,
    SourceReference, SourceReferenceId,
};
use super::Resource;
use crate::manager::{IdKey, ResourceManager};

/// Properties from which a resource of kind [`ResourceProps::Resource`] is built.
pub trait ResourceProps {
    /// The resource kind these properties create.
    type Resource: Resource;

    /// Returns the key the resource identifier is derived from.
    fn id_key(&self) -> IdKey<'_>;

    /// Builds the record, normalizing paths through `manager`.
    fn into_resource(self, id: Id<Self::Resource>, manager: &ResourceManager) -> Self::Resource;
}

/// Properties for [`ResourceManager::create_route_tree`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTreeProps {
    /// File containing the app construction.
    pub file_name: Utf8PathBuf,
    /// Offset of the app construction.
    pub position: u32,
    /// Local binding name.
    pub name: String,
    /// Prefix set with `.basePath(...)`.
    pub base_path: Option<String>,
}

impl ResourceProps for RouteTreeProps {
    type Resource = RouteTree;

    fn id_key(&self) -> IdKey<'_> {
        IdKey::located(ResourceType::RouteTree, &self.file_name, self.position)
    }

    fn into_resource(self, id: Id<RouteTree>, manager: &ResourceManager) -> RouteTree {
        RouteTree {
            id,
            file_name: manager.as_relative_path(&self.file_name),
            position: self.position,
            name: self.name,
            base_path: self.base_path,
            entries: Vec::new(),
        }
    }
}

/// Properties for [`ResourceManager::create_route_entry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEntryProps {
    /// File containing the registration.
    pub file_name: Utf8PathBuf,
    /// Offset of the registration call.
    pub position: u32,
    /// Upper-case HTTP method.
    pub method: String,
    /// Route path.
    pub path: String,
    /// The tree the route is registered on.
    pub route_tree_id: RouteTreeId,
    /// Handler locations.
    pub sources: Vec<SourceReferenceId>,
}

impl ResourceProps for RouteEntryProps {
    type Resource = RouteEntry;

    fn id_key(&self) -> IdKey<'_> {
        IdKey::located(ResourceType::RouteEntry, &self.file_name, self.position)
    }

    fn into_resource(self, id: Id<RouteEntry>, manager: &ResourceManager) -> RouteEntry {
        RouteEntry {
            id,
            file_name: manager.as_relative_path(&self.file_name),
            position: self.position,
            method: self.method,
            path: self.path,
            route_tree_id: self.route_tree_id,
            sources: self.sources,
        }
    }
}

/// Properties for [`ResourceManager::create_middleware_entry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MiddlewareEntryProps {
    /// File containing the registration.
    pub file_name: Utf8PathBuf,
    /// Offset of the registration call.
    pub position: u32,
    /// Path pattern.
    pub path: String,
    /// The tree the middleware is registered on.
    pub route_tree_id: RouteTreeId,
    /// Handler locations.
    pub sources: Vec<SourceReferenceId>,
}

impl ResourceProps for MiddlewareEntryProps {
    type Resource = MiddlewareEntry;

    fn id_key(&self) -> IdKey<'_> {
        IdKey::located(ResourceType::MiddlewareEntry, &self.file_name, self.position)
    }

    fn into_resource(self, id: Id<MiddlewareEntry>, manager: &ResourceManager) -> MiddlewareEntry {
        MiddlewareEntry {
            id,
            file_name: manager.as_relative_path(&self.file_name),
            position: self.position,
            path: self.path,
            route_tree_id: self.route_tree_id,
            sources: self.sources,
        }
    }
}

/// Properties for [`ResourceManager::create_source_reference`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceReferenceProps {
    /// File containing the code.
    pub file_name: Utf8PathBuf,
    /// Offset of the code.
    pub position: u32,
    /// Source text.
    pub content: String,
}

impl ResourceProps for SourceReferenceProps {
    type Resource = SourceReference;

    fn id_key(&self) -> IdKey<'_> {
        IdKey::located(ResourceType::SourceReference, &self.file_name, self.position)
    }

    fn into_resource(self, id: Id<SourceReference>, manager: &ResourceManager) -> SourceReference {
        SourceReference {
            id,
            file_name: manager.as_relative_path(&self.file_name),
            position: self.position,
            content: self.content,
            modules: std::collections::BTreeSet::new(),
        }
    }
}

/// Properties for [`ResourceManager::create_module_reference`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleReferenceProps {
    /// Module specifier.
    pub import_path: String,
    /// Imported name.
    pub import_name: String,
    /// Whether the specifier names a package.
    pub is_external: bool,
    /// Resolved file for local modules.
    pub file_name: Option<Utf8PathBuf>,
}

impl ResourceProps for ModuleReferenceProps {
    type Resource = ModuleReference;

    fn id_key(&self) -> IdKey<'_> {
        IdKey::module(&self.import_path, &self.import_name)
    }

    fn into_resource(self, id: Id<ModuleReference>, manager: &ResourceManager) -> ModuleReference {
        ModuleReference {
            id,
            import_path: self.import_path,
            import_name: self.import_name,
            is_external: self.is_external,
            file_name: self
                .file_name
                .map(|file_name| manager.as_relative_path(&file_name)),
        }
    }
}

/// Properties for [`ResourceManager::create_route_tree_reference`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTreeReferenceProps {
    /// File containing the mount call.
    pub file_name: Utf8PathBuf,
    /// Offset of the mount call.
    pub position: u32,
    /// Mount prefix.
    pub path: String,
    /// The tree the mount is registered on.
    pub route_tree_id: RouteTreeId,
    /// The mounted tree, when known.
    pub target_id: Option<RouteTreeId>,
}

impl ResourceProps for RouteTreeReferenceProps {
    type Resource = RouteTreeReference;

    fn id_key(&self) -> IdKey<'_> {
        IdKey::located(ResourceType::RouteTreeReference, &self.file_name, self.position)
    }

    fn into_resource(
        self,
        id: Id<RouteTreeReference>,
        manager: &ResourceManager,
    ) -> RouteTreeReference {
        RouteTreeReference {
            id,
            file_name: manager.as_relative_path(&self.file_name),
            position: self.position,
            path: self.path,
            route_tree_id: self.route_tree_id,
            target_id: self.target_id,
        }
    }
}
