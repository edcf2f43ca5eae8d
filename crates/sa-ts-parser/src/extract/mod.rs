//! Route extraction from a parsed [`Program`].
//!
//! A [`RouteExtractor`] turns the current program into a populated
//! [`ResourceManager`]. The stock implementation, [`HonoRouteExtractor`],
//! recognises Hono apps and their route, middleware and mount registrations.
//!
//! Extraction runs in two passes over the program's files:
//!
//! 1. Each file is analyzed on its own: which apps it constructs, what it
//!    exports and which calls it makes on app-like receivers. Every app
//!    becomes a [`RouteTree`](sa_core::RouteTree).
//! 2. Registrations are resolved (receivers and mount targets may live in
//!    other files) and stored as entries of their tree, with one source
//!    reference per handler.

mod analysis;

use camino::Utf8Path;
use sa_core::{
    FxHashMap, MiddlewareEntryProps, ModuleReferenceProps, ResourceError, ResourceManager,
    RouteEntryProps, RouteTree, RouteTreeId, RouteTreeProps, RouteTreeReferenceProps,
    SourceReferenceId, SourceReferenceProps, TreeResourceId, paths,
};

use crate::import::{ImportBinding, NAMESPACE_IMPORT};
use crate::program::{Program, ServiceHost, SourceFile};
use crate::resolve::resolve_module;

use analysis::{
    ExportTarget, FileAnalysis, Handler, PathArg, Registration, RegistrationKind, analyze_file,
};

/// Path recorded for middleware registered without a pattern.
pub const MATCH_ALL: &str = "*";

/// Import chains longer than this are treated as unresolved.
const MAX_RESOLVE_DEPTH: usize = 16;

/// Output of one extraction pass.
#[derive(Debug)]
pub struct ExtractionResult {
    /// The populated resource store.
    pub resource_manager: ResourceManager,

    /// Files with syntax errors plus registrations that could not be read.
    pub error_count: usize,
}

/// Builds the resource model for a program.
pub trait RouteExtractor: Send + Sync {
    /// Extracts every route tree and its entries from `program`.
    ///
    /// `host` is consulted for module resolution only.
    ///
    /// # Errors
    ///
    /// Returns a [`ResourceError`] if the manager rejects a link, which
    /// indicates resources were created out of order.
    fn extract(
        &self,
        program: &Program,
        host: &dyn ServiceHost,
        project_root: &Utf8Path,
    ) -> Result<ExtractionResult, ResourceError>;
}

/// Extracts routes from Hono applications.
///
/// # Examples
///
/// ```ignore
/// let extractor = HonoRouteExtractor;
/// let result = extractor.extract(&program, &host, project_root)?;
/// for tree in result.resource_manager.resources_of::<RouteTree>() {
///     println!("{} ({} entries)", tree.name, tree.entries.len());
/// }
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct HonoRouteExtractor;

impl RouteExtractor for HonoRouteExtractor {
    fn extract(
        &self,
        program: &Program,
        host: &dyn ServiceHost,
        project_root: &Utf8Path,
    ) -> Result<ExtractionResult, ResourceError> {
        let mut manager = ResourceManager::new(project_root);
        let mut error_count = 0;
        let mut analyses = FxHashMap::default();

        for file in program.source_files() {
            if file.has_errors() {
                tracing::debug!(file = %file.file_name, "Source file has syntax errors");
                error_count += 1;
            }
            let analysis = analyze_file(file.tree.root_node(), file.text.text());
            analyses.insert(file.file_name.as_path(), analysis);
        }

        let resolver = Resolver {
            program,
            host,
            analyses,
        };

        // Pass 1: every app is a tree, so mounts can target apps declared later.
        for file in program.source_files() {
            let Some(analysis) = resolver.analysis(file) else {
                continue;
            };
            for app in &analysis.apps {
                manager.create_route_tree(RouteTreeProps {
                    file_name: file.file_name.clone(),
                    position: app.position,
                    name: app.name.clone(),
                    base_path: app.base_path.clone(),
                });
            }
        }

        // Pass 2: registrations, in file then source order.
        for file in program.source_files() {
            let Some(analysis) = resolver.analysis(file) else {
                continue;
            };
            for registration in &analysis.registrations {
                let Some(tree_id) = resolver.resolve_app(&manager, file, &registration.receiver, 0)
                else {
                    continue;
                };
                match create_entry(&resolver, &mut manager, file, registration, &tree_id)? {
                    Some(entry_id) => manager.add_entry_to_route_tree(&tree_id, entry_id)?,
                    None => error_count += 1,
                }
            }
        }

        tracing::debug!(
            files = program.len(),
            resources = manager.len(),
            errors = error_count,
            "Extracted routes"
        );

        Ok(ExtractionResult {
            resource_manager: manager,
            error_count,
        })
    }
}

/// Cross-file lookups over the per-file analyses.
struct Resolver<'a> {
    program: &'a Program,
    host: &'a dyn ServiceHost,
    analyses: FxHashMap<&'a Utf8Path, FileAnalysis>,
}

impl Resolver<'_> {
    fn analysis(&self, file: &SourceFile) -> Option<&FileAnalysis> {
        self.analyses.get(file.file_name.as_path())
    }

    /// Resolves a binding visible in `file` to the route tree it names.
    fn resolve_app(
        &self,
        manager: &ResourceManager,
        file: &SourceFile,
        name: &str,
        depth: usize,
    ) -> Option<RouteTreeId> {
        if depth > MAX_RESOLVE_DEPTH {
            return None;
        }

        if let Some(app) = self.analysis(file).and_then(|analysis| analysis.app(name)) {
            return Some(manager.located_id::<RouteTree>(&file.file_name, app.position));
        }

        let binding = file.import_for(name)?;
        if binding.is_type_only || binding.imported_name == NAMESPACE_IMPORT {
            return None;
        }
        let target = resolve_module(self.host, &file.file_name, &binding.source)?;
        self.resolve_export(manager, &target, &binding.imported_name, depth + 1)
    }

    /// Resolves an exported name of `file_name` to the route tree it names.
    fn resolve_export(
        &self,
        manager: &ResourceManager,
        file_name: &Utf8Path,
        exported: &str,
        depth: usize,
    ) -> Option<RouteTreeId> {
        if depth > MAX_RESOLVE_DEPTH {
            return None;
        }
        let file = self.program.source_file(file_name)?;

        match self.analysis(file)?.exports.get(exported)? {
            ExportTarget::Local(local) => self.resolve_app(manager, file, local, depth + 1),
            ExportTarget::ReExport { specifier, name } => {
                let target = resolve_module(self.host, file_name, specifier)?;
                self.resolve_export(manager, &target, name, depth + 1)
            }
        }
    }
}

/// Stores one registration and its handlers.
///
/// Returns `Ok(None)` when the registration's path or method is not
/// statically known; nothing is stored in that case.
fn create_entry(
    resolver: &Resolver<'_>,
    manager: &mut ResourceManager,
    file: &SourceFile,
    registration: &Registration,
    tree_id: &RouteTreeId,
) -> Result<Option<TreeResourceId>, ResourceError> {
    let path = match (&registration.path, &registration.kind) {
        (PathArg::Literal(path), _) => path.clone(),
        (PathArg::Omitted, RegistrationKind::Middleware) => MATCH_ALL.to_owned(),
        _ => {
            skip(manager, file, registration, "path is not a string literal");
            return Ok(None);
        }
    };

    let file_name = file.file_name.clone();
    let position = registration.position;

    let entry_id = match &registration.kind {
        RegistrationKind::Route { method: None } => {
            skip(manager, file, registration, "method is not a string literal");
            return Ok(None);
        }
        RegistrationKind::Route {
            method: Some(method),
        } => {
            let sources = create_sources(resolver, manager, file, &registration.handlers)?;
            manager
                .create_route_entry(RouteEntryProps {
                    file_name,
                    position,
                    method: method.clone(),
                    path,
                    route_tree_id: tree_id.clone(),
                    sources,
                })
                .id
                .into()
        }
        RegistrationKind::Middleware => {
            let sources = create_sources(resolver, manager, file, &registration.handlers)?;
            manager
                .create_middleware_entry(MiddlewareEntryProps {
                    file_name,
                    position,
                    path,
                    route_tree_id: tree_id.clone(),
                    sources,
                })
                .id
                .into()
        }
        RegistrationKind::Mount { target } => {
            let target_id = target
                .as_deref()
                .and_then(|target| resolver.resolve_app(manager, file, target, 0));
            if target_id.is_none() {
                tracing::debug!(
                    file = %manager.as_relative_path(&file.file_name),
                    position,
                    target = target.as_deref().unwrap_or("<expression>"),
                    "Mount target not resolved"
                );
            }
            manager
                .create_route_tree_reference(RouteTreeReferenceProps {
                    file_name,
                    position,
                    path,
                    route_tree_id: tree_id.clone(),
                    target_id,
                })
                .id
                .into()
        }
    };

    Ok(Some(entry_id))
}

fn skip(manager: &ResourceManager, file: &SourceFile, registration: &Registration, reason: &str) {
    tracing::warn!(
        file = %manager.as_relative_path(&file.file_name),
        position = registration.position,
        reason,
        "Skipping registration"
    );
}

/// Creates a source reference per handler and links the imports it uses.
fn create_sources(
    resolver: &Resolver<'_>,
    manager: &mut ResourceManager,
    file: &SourceFile,
    handlers: &[Handler],
) -> Result<Vec<SourceReferenceId>, ResourceError> {
    let mut sources = Vec::with_capacity(handlers.len());

    for handler in handlers {
        let source = manager.create_source_reference(SourceReferenceProps {
            file_name: file.file_name.clone(),
            position: handler.position,
            content: handler.content.clone(),
        });

        for identifier in &handler.identifiers {
            let Some(binding) = file.import_for(identifier) else {
                continue;
            };
            if binding.is_type_only {
                continue;
            }
            let resolved = resolve_module(resolver.host, &file.file_name, &binding.source);
            let module = manager.build(ModuleReferenceProps {
                import_path: module_path(manager, file, binding, resolved.as_deref()),
                import_name: binding.imported_name.clone(),
                is_external: !binding.is_local(),
                file_name: resolved,
            });
            manager.add_module_to_source_reference(module, &file.file_name, handler.position)?;
        }

        sources.push(source.id);
    }

    Ok(sources)
}

/// The project-wide name of an imported module.
///
/// Package specifiers are kept as written. Local specifiers become the
/// root-relative path of the resolved file (or of the specifier itself when
/// it resolves to nothing), so `./db` imported from two directories yields
/// two distinct modules.
fn module_path(
    manager: &ResourceManager,
    file: &SourceFile,
    binding: &ImportBinding,
    resolved: Option<&Utf8Path>,
) -> String {
    if !binding.is_local() {
        return binding.source.clone();
    }
    let absolute = match resolved {
        Some(resolved) => resolved.to_owned(),
        None => {
            let directory = file.file_name.parent().unwrap_or(manager.project_root());
            paths::normalize(&directory.join(&binding.source))
        }
    };
    manager.as_relative_path(&absolute).into_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::{LanguageService, SourceSnapshot, TreeSitterService};
    use camino::Utf8PathBuf;
    use sa_core::{MiddlewareEntry, ModuleReference, RouteEntry, RouteTreeReference, SourceReference};
    use std::collections::BTreeMap;

    struct FixtureHost(BTreeMap<Utf8PathBuf, SourceSnapshot>);

    impl FixtureHost {
        fn new(files: &[(&str, &str)]) -> Self {
            Self(
                files
                    .iter()
                    .map(|(name, content)| {
                        (Utf8PathBuf::from(*name), SourceSnapshot::from_string(*content))
                    })
                    .collect(),
            )
        }
    }

    impl ServiceHost for FixtureHost {
        fn project_root(&self) -> &Utf8Path {
            Utf8Path::new("/p")
        }

        fn file_names(&self) -> Vec<Utf8PathBuf> {
            self.0.keys().cloned().collect()
        }

        fn script_version(&self, file_name: &Utf8Path) -> Option<u64> {
            self.0.contains_key(file_name).then_some(0)
        }

        fn script_snapshot(&self, file_name: &Utf8Path) -> Option<SourceSnapshot> {
            self.0.get(file_name).cloned()
        }

        fn file_exists(&self, file_name: &Utf8Path) -> bool {
            self.0.contains_key(file_name)
        }

        fn directory_exists(&self, _directory: &Utf8Path) -> bool {
            false
        }

        fn read_file(&self, file_name: &Utf8Path) -> Option<String> {
            self.0.get(file_name).map(|s| s.text().to_owned())
        }
    }

    fn extract(files: &[(&str, &str)]) -> ExtractionResult {
        let host = FixtureHost::new(files);
        let mut service = TreeSitterService::new();
        let program = service.get_program(&host).expect("program");
        HonoRouteExtractor
            .extract(&program, &host, Utf8Path::new("/p"))
            .expect("extracts")
    }

    fn tree<'a>(manager: &'a ResourceManager, file: &str, name: &str) -> &'a RouteTree {
        manager
            .resources_of::<RouteTree>()
            .find(|tree| tree.file_name == file && tree.name == name)
            .expect("tree exists")
    }

    #[test]
    fn test_single_file_entries_in_registration_order() {
        let result = extract(&[(
            "/p/src/index.ts",
            r#"
import { Hono } from "hono";
import { logger } from "hono/logger";
const app = new Hono();
app.use(logger());
app.get("/health", (c) => c.text("ok"));
app.post("/users", async (c) => c.json({}));
export default app;
"#,
        )]);
        let manager = &result.resource_manager;
        assert_eq!(result.error_count, 0);

        let app = tree(manager, "src/index.ts", "app");
        let entries: Vec<String> = manager
            .route_tree_entries(&app.id)
            .map(|entry| match entry {
                sa_core::RouteTreeEntry::Route(route) => format!("{} {}", route.method, route.path),
                sa_core::RouteTreeEntry::Middleware(mw) => format!("USE {}", mw.path),
                sa_core::RouteTreeEntry::Mount(mount) => format!("MOUNT {}", mount.path),
            })
            .collect();
        assert_eq!(entries, vec!["USE *", "GET /health", "POST /users"]);
    }

    #[test]
    fn test_cross_file_mount_resolves_target() {
        let result = extract(&[
            (
                "/p/src/index.ts",
                r#"
import { Hono } from "hono";
import users from "./routes/users";
const app = new Hono();
app.route("/users", users);
"#,
            ),
            (
                "/p/src/routes/users.ts",
                r#"
import { Hono } from "hono";
const users = new Hono();
users.get("/:id", (c) => c.json({}));
export default users;
"#,
            ),
        ]);
        let manager = &result.resource_manager;
        let users = tree(manager, "src/routes/users.ts", "users");
        let mount = manager
            .resources_of::<RouteTreeReference>()
            .next()
            .expect("mount");
        assert_eq!(mount.path, "/users");
        assert_eq!(mount.target_id.as_ref(), Some(&users.id));
        assert_eq!(users.entries.len(), 1);
    }

    #[test]
    fn test_unresolved_mount_has_no_target() {
        let result = extract(&[(
            "/p/src/index.ts",
            r#"
import { Hono } from "hono";
import { admin } from "@acme/admin";
const app = new Hono();
app.route("/admin", admin);
"#,
        )]);
        let mount = result
            .resource_manager
            .resources_of::<RouteTreeReference>()
            .next()
            .expect("mount");
        assert_eq!(mount.target_id, None);
    }

    #[test]
    fn test_dynamic_path_is_counted_and_skipped() {
        let result = extract(&[(
            "/p/src/index.ts",
            r#"
const app = new Hono();
app.get(`/v${version}/items`, (c) => c.json([]));
app.get("/static", (c) => c.json([]));
"#,
        )]);
        assert_eq!(result.error_count, 1);
        let routes: Vec<_> = result.resource_manager.resources_of::<RouteEntry>().collect();
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].path, "/static");
    }

    #[test]
    fn test_syntax_errors_are_counted() {
        let result = extract(&[("/p/src/broken.ts", "const app = new Hono();\napp.get('/x', (c) => {")]);
        assert!(result.error_count >= 1);
    }

    #[test]
    fn test_handler_imports_become_module_references() {
        let result = extract(&[
            (
                "/p/src/index.ts",
                r#"
import { Hono } from "hono";
import { z } from "zod";
import { db } from "./db";
const app = new Hono();
app.post("/items", async (c) => { z.parse(1); return c.json(await db.all()); });
"#,
            ),
            ("/p/src/db.ts", "export const db = {};"),
        ]);
        let manager = &result.resource_manager;

        let source = manager
            .resources_of::<SourceReference>()
            .next()
            .expect("source");
        assert_eq!(source.modules.len(), 2);

        let mut modules: Vec<(&str, bool)> = source
            .modules
            .iter()
            .filter_map(|id| manager.get_resource::<ModuleReference>(id))
            .map(|module| (module.import_path.as_str(), module.is_external))
            .collect();
        modules.sort_unstable();
        assert_eq!(modules, vec![("src/db.ts", false), ("zod", true)]);
    }

    #[test]
    fn test_imported_app_receiver_adds_to_remote_tree() {
        let result = extract(&[
            (
                "/p/src/app.ts",
                "import { Hono } from 'hono';\nexport const app = new Hono();\n",
            ),
            (
                "/p/src/routes.ts",
                "import { app } from './app';\napp.get('/remote', (c) => c.text('x'));\napp.use('/admin/*', guard);\n",
            ),
        ]);
        let manager = &result.resource_manager;
        let app = tree(manager, "src/app.ts", "app");
        assert_eq!(app.entries.len(), 2);
        assert_eq!(manager.resources_of::<MiddlewareEntry>().count(), 1);
    }

    #[test]
    fn test_base_path_and_re_export() {
        let result = extract(&[
            (
                "/p/src/index.ts",
                "import { Hono } from 'hono';\nimport { api } from './routes';\nconst app = new Hono().basePath('/v1');\napp.route('/api', api);\n",
            ),
            ("/p/src/routes/index.ts", "export { default as api } from './api';\n"),
            (
                "/p/src/routes/api.ts",
                "const api = new Hono();\napi.get('/ping', (c) => c.text('pong'));\nexport default api;\n",
            ),
        ]);
        let manager = &result.resource_manager;
        let app = tree(manager, "src/index.ts", "app");
        assert_eq!(app.base_path.as_deref(), Some("/v1"));

        let api = tree(manager, "src/routes/api.ts", "api");
        let mount = manager
            .resources_of::<RouteTreeReference>()
            .next()
            .expect("mount");
        assert_eq!(mount.target_id.as_ref(), Some(&api.id));
    }
}
