//! The outcome of a successful analysis pass.
//!
//! A [`RoutesResult`] pairs an immutable resource graph with the identifier
//! of its root route tree. It is cheap to clone and safe to hand to other
//! threads: later passes build a new graph rather than touching this one.

use std::sync::Arc;

use sa_core::{
    MiddlewareEntryId, Resource, ResourceManager, RouteEntryId, RouteTree, RouteTreeEntry,
    RouteTreeId,
};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use tracing::warn;

/// A route as a client would reach it, with mounts and base paths applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedRoute {
    /// HTTP method, upper-case (`ALL` for `app.all`).
    pub method: String,
    /// Full path from the root app.
    pub path: String,
    /// The registration this route comes from.
    pub route_id: RouteEntryId,
    /// Middleware that runs before the handler, outermost first.
    pub middleware: Vec<MiddlewareEntryId>,
}

/// A resource graph rooted at one route tree.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use sa_core::{ResourceManager, RouteEntryProps, RouteTreeProps};
/// use sa_monitor::RoutesResult;
///
/// let mut manager = ResourceManager::new("/p");
/// let app = manager.create_route_tree(RouteTreeProps {
///     file_name: "/p/src/index.ts".into(),
///     position: 6,
///     name: "app".to_owned(),
///     base_path: Some("/api".to_owned()),
/// });
/// let health = manager.create_route_entry(RouteEntryProps {
///     file_name: "/p/src/index.ts".into(),
///     position: 40,
///     method: "GET".to_owned(),
///     path: "/health".to_owned(),
///     route_tree_id: app.id.clone(),
///     sources: Vec::new(),
/// });
/// manager.add_entry_to_route_tree(&app.id, health.id.as_untyped().clone())?;
///
/// let result = RoutesResult::new(Arc::new(manager), app.id.clone());
/// let routes = result.routes();
/// assert_eq!(routes[0].method, "GET");
/// assert_eq!(routes[0].path, "/api/health");
/// # Ok::<(), sa_core::ResourceError>(())
/// ```
#[derive(Debug, Clone)]
pub struct RoutesResult {
    manager: Arc<ResourceManager>,
    root_id: RouteTreeId,
}

impl RoutesResult {
    /// Wraps a resource graph and its root.
    #[must_use]
    pub const fn new(manager: Arc<ResourceManager>, root_id: RouteTreeId) -> Self {
        Self { manager, root_id }
    }

    /// Returns the identifier of the root route tree.
    #[inline]
    #[must_use]
    pub const fn root_id(&self) -> &RouteTreeId {
        &self.root_id
    }

    /// Returns the root route tree.
    #[must_use]
    pub fn root(&self) -> Option<&RouteTree> {
        self.manager.get_resource(&self.root_id)
    }

    /// Returns the resource graph.
    #[inline]
    #[must_use]
    pub fn resource_manager(&self) -> &ResourceManager {
        &self.manager
    }

    /// Looks up a resource of kind `R`.
    #[must_use]
    pub fn get_resource<R: Resource>(&self, id: &sa_core::Id<R>) -> Option<&R> {
        self.manager.get_resource(id)
    }

    /// Flattens the graph into the routes served by the root app.
    ///
    /// Mounted trees are followed recursively, prefixing their paths with
    /// the mount path and any `basePath`. Each route lists the middleware
    /// registered before it, on its own tree or an ancestor, whose path
    /// pattern matches the route path. A tree mounted inside itself is
    /// reported once and not followed.
    #[must_use]
    pub fn routes(&self) -> Vec<ResolvedRoute> {
        let mut routes = Vec::new();
        if let Some(root) = self.root() {
            let mut walk = RouteWalk {
                manager: &self.manager,
                visiting: Vec::new(),
                routes: &mut routes,
            };
            walk.visit(root, "", &[]);
        }
        routes
    }

    /// Serializes the result into a JSON value.
    ///
    /// # Errors
    ///
    /// Returns an error if a resource fails to serialize.
    pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

impl Serialize for RoutesResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("RoutesResult", 2)?;
        state.serialize_field("rootId", &self.root_id)?;
        state.serialize_field("resources", &self.manager.get_resources())?;
        state.end()
    }
}

struct RouteWalk<'a, 'r> {
    manager: &'a ResourceManager,
    visiting: Vec<&'a RouteTreeId>,
    routes: &'r mut Vec<ResolvedRoute>,
}

impl<'a> RouteWalk<'a, '_> {
    fn visit(
        &mut self,
        tree: &'a RouteTree,
        prefix: &str,
        inherited: &[(String, MiddlewareEntryId)],
    ) {
        if self.visiting.contains(&&tree.id) {
            warn!(tree = %tree.id, "Route tree mounted inside itself, not following");
            return;
        }
        self.visiting.push(&tree.id);

        let manager = self.manager;
        let base = join_paths(prefix, tree.base_path.as_deref().unwrap_or_default());
        let mut active = inherited.to_vec();

        for entry in manager.route_tree_entries(&tree.id) {
            match entry {
                RouteTreeEntry::Middleware(middleware) => {
                    active.push((join_paths(&base, &middleware.path), middleware.id.clone()));
                }
                RouteTreeEntry::Route(route) => {
                    let path = join_paths(&base, &route.path);
                    let middleware = active
                        .iter()
                        .filter(|(pattern, _)| path_matches(pattern, &path))
                        .map(|(_, id)| id.clone())
                        .collect();
                    self.routes.push(ResolvedRoute {
                        method: route.method.clone(),
                        path,
                        route_id: route.id.clone(),
                        middleware,
                    });
                }
                RouteTreeEntry::Mount(mount) => {
                    let target = mount
                        .target_id
                        .as_ref()
                        .and_then(|id| manager.get_resource(id));
                    if let Some(target) = target {
                        let mount_path = join_paths(&base, &mount.path);
                        self.visit(target, &mount_path, &active);
                    }
                }
            }
        }

        self.visiting.pop();
    }
}

/// Joins two route paths the way Hono merges mount paths.
fn join_paths(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    match (base.is_empty(), path.is_empty()) {
        (true, true) => "/".to_owned(),
        (true, false) => format!("/{path}"),
        (false, true) => base.to_owned(),
        (false, false) => format!("{base}/{path}"),
    }
}

/// Matches a concrete route path against a middleware pattern.
///
/// `*` matches one segment, or any remainder when it is the last segment;
/// `:name` matches one segment.
fn path_matches(pattern: &str, path: &str) -> bool {
    let mut pattern_segments = pattern.split('/').filter(|s| !s.is_empty()).peekable();
    let mut path_segments = path.split('/').filter(|s| !s.is_empty());

    while let Some(expected) = pattern_segments.next() {
        if expected == "*" && pattern_segments.peek().is_none() {
            return true;
        }
        let Some(actual) = path_segments.next() else {
            return false;
        };
        let wildcard = expected == "*" || expected.starts_with(':');
        if !wildcard && expected != actual {
            return false;
        }
    }

    path_segments.next().is_none()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sa_core::{
        MiddlewareEntryProps, RouteEntryProps, RouteTreeProps, RouteTreeReferenceProps,
    };

    struct Graph {
        manager: ResourceManager,
        next_position: u32,
    }

    impl Graph {
        fn new() -> Self {
            Self {
                manager: ResourceManager::new("/p"),
                next_position: 100,
            }
        }

        fn position(&mut self) -> u32 {
            self.next_position += 10;
            self.next_position
        }

        fn tree(&mut self, file: &str, base_path: Option<&str>) -> RouteTree {
            self.manager.create_route_tree(RouteTreeProps {
                file_name: format!("/p/src/{file}").into(),
                position: 0,
                name: "app".to_owned(),
                base_path: base_path.map(str::to_owned),
            })
        }

        fn route(&mut self, tree: &RouteTree, method: &str, path: &str) -> RouteEntryId {
            let position = self.position();
            let entry = self.manager.create_route_entry(RouteEntryProps {
                file_name: tree.file_name.clone(),
                position,
                method: method.to_owned(),
                path: path.to_owned(),
                route_tree_id: tree.id.clone(),
                sources: Vec::new(),
            });
            self.manager
                .add_entry_to_route_tree(&tree.id, entry.id.as_untyped().clone())
                .expect("tree exists");
            entry.id
        }

        fn middleware(&mut self, tree: &RouteTree, path: &str) -> MiddlewareEntryId {
            let position = self.position();
            let entry = self.manager.create_middleware_entry(MiddlewareEntryProps {
                file_name: tree.file_name.clone(),
                position,
                path: path.to_owned(),
                route_tree_id: tree.id.clone(),
                sources: Vec::new(),
            });
            self.manager
                .add_entry_to_route_tree(&tree.id, entry.id.as_untyped().clone())
                .expect("tree exists");
            entry.id
        }

        fn mount(&mut self, parent: &RouteTree, path: &str, child: &RouteTree) {
            let position = self.position();
            let mount = self
                .manager
                .create_route_tree_reference(RouteTreeReferenceProps {
                    file_name: parent.file_name.clone(),
                    position,
                    path: path.to_owned(),
                    route_tree_id: parent.id.clone(),
                    target_id: Some(child.id.clone()),
                });
            self.manager
                .add_entry_to_route_tree(&parent.id, mount.id.as_untyped().clone())
                .expect("tree exists");
        }

        fn result(self, root: &RouteTree) -> RoutesResult {
            RoutesResult::new(Arc::new(self.manager), root.id.clone())
        }
    }

    #[test]
    fn test_join_paths() {
        assert_eq!(join_paths("", ""), "/");
        assert_eq!(join_paths("", "/users"), "/users");
        assert_eq!(join_paths("/api", "/"), "/api");
        assert_eq!(join_paths("/api/", "/users/:id"), "/api/users/:id");
        assert_eq!(join_paths("/api", "*"), "/api/*");
    }

    #[test]
    fn test_path_matches() {
        assert!(path_matches("/*", "/"));
        assert!(path_matches("/api/*", "/api"));
        assert!(path_matches("/api/*", "/api/users/1"));
        assert!(path_matches("/users/:id", "/users/42"));
        assert!(!path_matches("/users/:id", "/users"));
        assert!(!path_matches("/admin/*", "/api/users"));
        assert!(!path_matches("/api", "/api/users"));
    }

    #[test]
    fn test_routes_follow_mounts_and_base_paths() {
        let mut graph = Graph::new();
        let app = graph.tree("index.ts", None);
        let users = graph.tree("users.ts", Some("/v1"));

        graph.route(&app, "GET", "/health");
        graph.mount(&app, "/users", &users);
        graph.route(&users, "GET", "/");
        graph.route(&users, "POST", "/:id");

        let paths: Vec<_> = graph
            .result(&app)
            .routes()
            .into_iter()
            .map(|route| format!("{} {}", route.method, route.path))
            .collect();
        assert_eq!(
            paths,
            vec!["GET /health", "GET /users/v1", "POST /users/v1/:id"]
        );
    }

    #[test]
    fn test_middleware_applies_in_order_and_is_inherited() {
        let mut graph = Graph::new();
        let app = graph.tree("index.ts", None);
        let users = graph.tree("users.ts", None);

        let early = graph.route(&app, "GET", "/early");
        let logger = graph.middleware(&app, "*");
        let auth = graph.middleware(&app, "/users/*");
        graph.mount(&app, "/users", &users);
        let scoped = graph.middleware(&users, "*");
        let list = graph.route(&users, "GET", "/");

        let routes = graph.result(&app).routes();
        let by_id = |id: &RouteEntryId| {
            routes
                .iter()
                .find(|route| &route.route_id == id)
                .map(|route| route.middleware.clone())
        };

        assert_eq!(by_id(&early), Some(Vec::new()));
        assert_eq!(by_id(&list), Some(vec![logger, auth, scoped]));
    }

    #[test]
    fn test_self_mount_is_not_followed() {
        let mut graph = Graph::new();
        let app = graph.tree("index.ts", None);
        graph.route(&app, "GET", "/");
        graph.mount(&app, "/again", &app);

        assert_eq!(graph.result(&app).routes().len(), 1);
    }

    #[test]
    fn test_json_shape() {
        let mut graph = Graph::new();
        let app = graph.tree("index.ts", None);
        graph.route(&app, "GET", "/");
        let result = graph.result(&app);

        let json = result.to_json().expect("serialize");
        assert_eq!(json["rootId"], app.id.as_str());
        assert_eq!(
            json["resources"].as_object().map(serde_json::Map::len),
            Some(2)
        );
        assert_eq!(json["resources"][app.id.as_str()]["type"], "ROUTE_TREE");
    }
}
