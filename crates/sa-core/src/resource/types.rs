//! Concrete resource records.
//!
//! Records serialize to camelCase JSON. Wrapped in [`TreeResource`] they gain
//! a `"type"` tag, which is the wire format handed to UI consumers.

use std::collections::BTreeSet;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use super::id::{Id, ResourceType, TreeResourceId};

/// Identifier of a [`RouteTree`].
pub type RouteTreeId = Id<RouteTree>;
/// Identifier of a [`RouteEntry`].
pub type RouteEntryId = Id<RouteEntry>;
/// Identifier of a [`MiddlewareEntry`].
pub type MiddlewareEntryId = Id<MiddlewareEntry>;
/// Identifier of a [`SourceReference`].
pub type SourceReferenceId = Id<SourceReference>;
/// Identifier of a [`ModuleReference`].
pub type ModuleReferenceId = Id<ModuleReference>;
/// Identifier of a [`RouteTreeReference`].
pub type RouteTreeReferenceId = Id<RouteTreeReference>;

/// A mounted application or router.
///
/// `entries` lists route entries, middleware entries and route tree
/// references in registration order. Middleware only applies to entries
/// that come after it in this list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteTree {
    /// Derived identifier.
    pub id: RouteTreeId,
    /// File name relative to the project root.
    pub file_name: Utf8PathBuf,
    /// Offset of the app construction within the file.
    pub position: u32,
    /// Local binding name of the app (e.g. `app`).
    pub name: String,
    /// Prefix set with `.basePath(...)`, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_path: Option<String>,
    /// Child entries in registration order.
    #[serde(default)]
    pub entries: Vec<TreeResourceId>,
}

/// A single HTTP route registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteEntry {
    /// Derived identifier.
    pub id: RouteEntryId,
    /// File name relative to the project root.
    pub file_name: Utf8PathBuf,
    /// Offset of the registration call within the file.
    pub position: u32,
    /// Upper-case HTTP method (`GET`, `POST`, ... or `ALL`).
    pub method: String,
    /// Route path as written (e.g. `/users/:id`).
    pub path: String,
    /// The tree this route was registered on.
    pub route_tree_id: RouteTreeId,
    /// Handler locations.
    #[serde(default)]
    pub sources: Vec<SourceReferenceId>,
}

/// A registered middleware.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MiddlewareEntry {
    /// Derived identifier.
    pub id: MiddlewareEntryId,
    /// File name relative to the project root.
    pub file_name: Utf8PathBuf,
    /// Offset of the registration call within the file.
    pub position: u32,
    /// Path pattern the middleware applies to (`*` when omitted).
    pub path: String,
    /// The tree this middleware was registered on.
    pub route_tree_id: RouteTreeId,
    /// Handler locations.
    #[serde(default)]
    pub sources: Vec<SourceReferenceId>,
}

/// A location in source plus the modules the code there uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceReference {
    /// Derived identifier.
    pub id: SourceReferenceId,
    /// File name relative to the project root.
    pub file_name: Utf8PathBuf,
    /// Offset of the referenced code within the file.
    pub position: u32,
    /// Source text of the referenced code.
    pub content: String,
    /// Imported symbols used by the referenced code.
    #[serde(default)]
    pub modules: BTreeSet<ModuleReferenceId>,
}

/// An imported symbol.
///
/// Module references are shared: the same `(import_path, import_name)`
/// used from several files maps to one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleReference {
    /// Derived identifier.
    pub id: ModuleReferenceId,
    /// Module specifier as written in the import (e.g. `./db` or `hono`).
    pub import_path: String,
    /// Imported name (`default` for default imports, `*` for namespaces).
    pub import_name: String,
    /// Whether the specifier names a package rather than a project file.
    pub is_external: bool,
    /// Resolved file, relative to the project root, for local modules.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<Utf8PathBuf>,
}

/// A mount of one route tree inside another (`app.route("/prefix", sub)`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteTreeReference {
    /// Derived identifier.
    pub id: RouteTreeReferenceId,
    /// File name relative to the project root.
    pub file_name: Utf8PathBuf,
    /// Offset of the mount call within the file.
    pub position: u32,
    /// Mount prefix.
    pub path: String,
    /// The tree the mount was registered on.
    pub route_tree_id: RouteTreeId,
    /// The mounted tree, when it could be resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<RouteTreeId>,
}

/// Any resource stored in the [`ResourceManager`](crate::ResourceManager).
///
/// # Examples
///
/// ```
/// use sa_core::{ResourceManager, RouteTreeProps, TreeResource};
///
/// let mut manager = ResourceManager::new("/project");
/// let tree = manager.create_route_tree(RouteTreeProps {
///     file_name: "/project/src/index.ts".into(),
///     position: 6,
///     name: "app".to_owned(),
///     base_path: None,
/// });
///
/// let json = serde_json::to_value(TreeResource::from(tree)).unwrap();
/// assert_eq!(json["type"], "ROUTE_TREE");
/// assert_eq!(json["fileName"], "src/index.ts");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TreeResource {
    /// See [`RouteTree`].
    RouteTree(RouteTree),
    /// See [`RouteEntry`].
    RouteEntry(RouteEntry),
    /// See [`MiddlewareEntry`].
    MiddlewareEntry(MiddlewareEntry),
    /// See [`SourceReference`].
    SourceReference(SourceReference),
    /// See [`ModuleReference`].
    ModuleReference(ModuleReference),
    /// See [`RouteTreeReference`].
    RouteTreeReference(RouteTreeReference),
}

/// The `(file, position)` of a located resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Location<'a> {
    /// File name relative to the project root.
    pub file_name: &'a Utf8Path,
    /// Offset within the file.
    pub position: u32,
}

impl TreeResource {
    /// Returns the untyped identifier of the wrapped resource.
    #[must_use]
    pub fn id(&self) -> &TreeResourceId {
        match self {
            Self::RouteTree(r) => r.id.as_untyped(),
            Self::RouteEntry(r) => r.id.as_untyped(),
            Self::MiddlewareEntry(r) => r.id.as_untyped(),
            Self::SourceReference(r) => r.id.as_untyped(),
            Self::ModuleReference(r) => r.id.as_untyped(),
            Self::RouteTreeReference(r) => r.id.as_untyped(),
        }
    }

    /// Returns the kind of the wrapped resource.
    #[must_use]
    pub const fn resource_type(&self) -> ResourceType {
        match self {
            Self::RouteTree(_) => ResourceType::RouteTree,
            Self::RouteEntry(_) => ResourceType::RouteEntry,
            Self::MiddlewareEntry(_) => ResourceType::MiddlewareEntry,
            Self::SourceReference(_) => ResourceType::SourceReference,
            Self::ModuleReference(_) => ResourceType::ModuleReference,
            Self::RouteTreeReference(_) => ResourceType::RouteTreeReference,
        }
    }

    /// Returns the location for local-file resources, `None` for module references.
    #[must_use]
    pub fn location(&self) -> Option<Location<'_>> {
        let (file_name, position) = match self {
            Self::RouteTree(r) => (&r.file_name, r.position),
            Self::RouteEntry(r) => (&r.file_name, r.position),
            Self::MiddlewareEntry(r) => (&r.file_name, r.position),
            Self::SourceReference(r) => (&r.file_name, r.position),
            Self::RouteTreeReference(r) => (&r.file_name, r.position),
            Self::ModuleReference(_) => return None,
        };
        Some(Location {
            file_name: file_name.as_path(),
            position,
        })
    }
}

/// A concrete resource kind that can be stored in a [`TreeResource`].
pub trait Resource: Sized + Clone + Into<TreeResource> {
    /// The kind tag of this resource.
    const TYPE: ResourceType;

    /// Returns the typed identifier of the resource.
    fn id(&self) -> &Id<Self>;

    /// Borrows the concrete record if `resource` is of this kind.
    fn from_tree(resource: &TreeResource) -> Option<&Self>;

    /// Mutably borrows the concrete record if `resource` is of this kind.
    fn from_tree_mut(resource: &mut TreeResource) -> Option<&mut Self>;
}

macro_rules! impl_resource {
    ($($ty:ident),+ $(,)?) => {
        $(
            impl Resource for $ty {
                const TYPE: ResourceType = ResourceType::$ty;

                fn id(&self) -> &Id<Self> {
                    &self.id
                }

                fn from_tree(resource: &TreeResource) -> Option<&Self> {
                    match resource {
                        TreeResource::$ty(inner) => Some(inner),
                        _ => None,
                    }
                }

                fn from_tree_mut(resource: &mut TreeResource) -> Option<&mut Self> {
                    match resource {
                        TreeResource::$ty(inner) => Some(inner),
                        _ => None,
                    }
                }
            }

            impl From<$ty> for TreeResource {
                fn from(resource: $ty) -> Self {
                    Self::$ty(resource)
                }
            }
        )+
    };
}

impl_resource!(
    RouteTree,
    RouteEntry,
    MiddlewareEntry,
    SourceReference,
    ModuleReference,
    RouteTreeReference,
);

/// A borrowed view over the resources that can sit in a route tree's entry list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteTreeEntry<'a> {
    /// A route registration.
    Route(&'a RouteEntry),
    /// A middleware registration.
    Middleware(&'a MiddlewareEntry),
    /// A mounted sub-tree.
    Mount(&'a RouteTreeReference),
}

impl<'a> RouteTreeEntry<'a> {
    /// Views `resource` as a route tree entry, if it is one.
    #[must_use]
    pub fn from_resource(resource: &'a TreeResource) -> Option<Self> {
        match resource {
            TreeResource::RouteEntry(r) => Some(Self::Route(r)),
            TreeResource::MiddlewareEntry(r) => Some(Self::Middleware(r)),
            TreeResource::RouteTreeReference(r) => Some(Self::Mount(r)),
            _ => None,
        }
    }

    /// Returns the untyped identifier of the entry.
    #[must_use]
    pub fn id(&self) -> &'a TreeResourceId {
        match self {
            Self::Route(r) => r.id.as_untyped(),
            Self::Middleware(r) => r.id.as_untyped(),
            Self::Mount(r) => r.id.as_untyped(),
        }
    }

    /// Returns the tree the entry was registered on.
    #[must_use]
    pub fn route_tree_id(&self) -> &'a RouteTreeId {
        match self {
            Self::Route(r) => &r.route_tree_id,
            Self::Middleware(r) => &r.route_tree_id,
            Self::Mount(r) => &r.route_tree_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree_id() -> RouteTreeId {
        Id::new_unchecked(TreeResourceId::from_raw("ROUTE_TREE:src%2Findex.ts@6"))
    }

    fn route() -> RouteEntry {
        RouteEntry {
            id: Id::new_unchecked(TreeResourceId::from_raw("ROUTE_ENTRY:src%2Findex.ts@40")),
            file_name: Utf8PathBuf::from("src/index.ts"),
            position: 40,
            method: "GET".to_owned(),
            path: "/users".to_owned(),
            route_tree_id: tree_id(),
            sources: Vec::new(),
        }
    }

    #[test]
    fn test_tree_resource_json_shape() {
        let json = serde_json::to_value(TreeResource::from(route())).expect("serialize");
        assert_eq!(json["type"], "ROUTE_ENTRY");
        assert_eq!(json["routeTreeId"], "ROUTE_TREE:src%2Findex.ts@6");
        assert_eq!(json["path"], "/users");
    }

    #[test]
    fn test_tree_resource_json_round_trip() {
        let resource = TreeResource::from(route());
        let json = serde_json::to_string(&resource).expect("serialize");
        let parsed: TreeResource = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, resource);
    }

    #[test]
    fn test_from_tree_matches_kind_only() {
        let resource = TreeResource::from(route());
        assert!(RouteEntry::from_tree(&resource).is_some());
        assert!(RouteTree::from_tree(&resource).is_none());
    }

    #[test]
    fn test_location_of_module_reference_is_none() {
        let module = ModuleReference {
            id: Id::new_unchecked(TreeResourceId::from_raw("MODULE_REFERENCE:hono@Hono")),
            import_path: "hono".to_owned(),
            import_name: "Hono".to_owned(),
            is_external: true,
            file_name: None,
        };
        assert!(TreeResource::from(module).location().is_none());

        let located = TreeResource::from(route());
        let location = located.location().expect("route entries are located");
        assert_eq!(location.position, 40);
        assert_eq!(location.file_name, "src/index.ts");
    }

    #[test]
    fn test_route_tree_entry_view() {
        let resource = TreeResource::from(route());
        let entry = RouteTreeEntry::from_resource(&resource).expect("route is an entry");
        assert!(matches!(entry, RouteTreeEntry::Route(_)));
        assert_eq!(entry.route_tree_id(), &tree_id());
    }
}
