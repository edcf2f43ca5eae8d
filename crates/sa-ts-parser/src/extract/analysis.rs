//! Per-file syntactic analysis.
//!
//! Collects what one file declares (apps, exports) and which calls on
//! app-like receivers it makes. Nothing here consults other files or the
//! resource manager; cross-file resolution happens in the extractor.

use rustc_hash::FxHashMap;
use tree_sitter::Node;

use crate::syntax::{Descendants, node_text, position, string_literal, unwrap_expression};

/// Constructors recognised as creating an app.
pub(crate) const APP_CONSTRUCTORS: [&str; 2] = ["Hono", "OpenAPIHono"];

/// Methods that register a route for one HTTP method.
pub(crate) const ROUTE_METHODS: [&str; 8] =
    ["get", "post", "put", "delete", "patch", "options", "head", "all"];

/// Name given to an app constructed directly in `export default`.
pub(crate) const DEFAULT_EXPORT: &str = "default";

/// An app constructed in the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AppDecl {
    pub name: String,
    pub position: u32,
    pub base_path: Option<String>,
}

/// What an exported name refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ExportTarget {
    /// A binding local to the file (which may itself be an import).
    Local(String),
    /// `export { name as exported } from 'specifier'`.
    ReExport { specifier: String, name: String },
}

/// The path argument of a registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PathArg {
    Literal(String),
    /// No path argument was given (middleware without a pattern).
    Omitted,
    /// The path is computed at runtime.
    Dynamic,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RegistrationKind {
    Route { method: Option<String> },
    Middleware,
    Mount { target: Option<String> },
}

/// A handler argument of a registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Handler {
    pub position: u32,
    pub content: String,
    /// Identifiers used in the handler, first occurrence order, no duplicates.
    pub identifiers: Vec<String>,
}

/// A call on an app-like receiver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Registration {
    /// Name of the receiver binding (or the app it was chained from).
    pub receiver: String,
    pub position: u32,
    pub kind: RegistrationKind,
    pub path: PathArg,
    pub handlers: Vec<Handler>,
}

#[derive(Debug, Default)]
pub(crate) struct FileAnalysis {
    pub apps: Vec<AppDecl>,
    pub exports: FxHashMap<String, ExportTarget>,
    pub registrations: Vec<Registration>,
}

impl FileAnalysis {
    pub(crate) fn app(&self, name: &str) -> Option<&AppDecl> {
        self.apps.iter().find(|app| app.name == name)
    }
}

/// Analyzes one parsed file.
pub(crate) fn analyze_file(root: Node<'_>, source: &str) -> FileAnalysis {
    let mut analysis = FileAnalysis::default();
    // Start byte of each app construction, so chains rooted on `new Hono()` find their app.
    let mut constructions: FxHashMap<usize, String> = FxHashMap::default();

    for node in Descendants::new(root) {
        match node.kind() {
            "variable_declarator" => {
                let (Some(name), Some(value)) = (
                    node.child_by_field_name("name"),
                    node.child_by_field_name("value"),
                ) else {
                    continue;
                };
                if name.kind() != "identifier" {
                    continue;
                }
                if let Some((construction, base_path)) = app_construction(value, source) {
                    let name = node_text(name, source).to_owned();
                    constructions.insert(construction.start_byte(), name.clone());
                    analysis.apps.push(AppDecl {
                        name,
                        position: position(construction),
                        base_path,
                    });
                }
            }
            "export_statement" => collect_export(node, source, &mut analysis, &mut constructions),
            _ => {}
        }
    }

    for node in Descendants::new(root).filter(|node| node.kind() == "call_expression") {
        if let Some(registration) = registration(node, source, &constructions) {
            analysis.registrations.push(registration);
        }
    }

    analysis.registrations.sort_by_key(|registration| registration.position);
    analysis
}

/// Recognises `new Hono(...)`, optionally followed by chained calls.
///
/// Returns the `new` expression and the base path set with `.basePath(...)`.
fn app_construction<'tree>(
    expression: Node<'tree>,
    source: &str,
) -> Option<(Node<'tree>, Option<String>)> {
    let expression = unwrap_expression(expression);
    match expression.kind() {
        "new_expression" => {
            let constructor = expression.child_by_field_name("constructor")?;
            let constructor = match constructor.kind() {
                "member_expression" => constructor.child_by_field_name("property")?,
                _ => constructor,
            };
            APP_CONSTRUCTORS
                .contains(&node_text(constructor, source))
                .then_some((expression, None))
        }
        "call_expression" => {
            let (object, property) = member_call(expression, source)?;
            let (construction, base_path) = app_construction(object, source)?;
            let base_path = if property == "basePath" {
                first_argument(expression)
                    .and_then(|arg| string_literal(arg, source))
                    .map(str::to_owned)
                    .or(base_path)
            } else {
                base_path
            };
            Some((construction, base_path))
        }
        _ => None,
    }
}

fn collect_export(
    node: Node<'_>,
    source: &str,
    analysis: &mut FileAnalysis,
    constructions: &mut FxHashMap<usize, String>,
) {
    if let Some(declaration) = node.child_by_field_name("declaration") {
        let mut cursor = declaration.walk();
        for declarator in declaration
            .named_children(&mut cursor)
            .filter(|child| child.kind() == "variable_declarator")
        {
            if let Some(name) = declarator.child_by_field_name("name") {
                let name = node_text(name, source).to_owned();
                analysis.exports.insert(name.clone(), ExportTarget::Local(name));
            }
        }
        return;
    }

    if let Some(value) = node.child_by_field_name("value") {
        let value = unwrap_expression(value);
        if value.kind() == "identifier" {
            analysis.exports.insert(
                DEFAULT_EXPORT.to_owned(),
                ExportTarget::Local(node_text(value, source).to_owned()),
            );
        } else if let Some((construction, base_path)) = app_construction(value, source) {
            constructions.insert(construction.start_byte(), DEFAULT_EXPORT.to_owned());
            analysis.apps.push(AppDecl {
                name: DEFAULT_EXPORT.to_owned(),
                position: position(construction),
                base_path,
            });
            analysis.exports.insert(
                DEFAULT_EXPORT.to_owned(),
                ExportTarget::Local(DEFAULT_EXPORT.to_owned()),
            );
        }
        return;
    }

    let specifier = node
        .child_by_field_name("source")
        .and_then(|source_node| string_literal(source_node, source));

    let mut cursor = node.walk();
    let Some(clause) = node
        .named_children(&mut cursor)
        .find(|child| child.kind() == "export_clause")
    else {
        return;
    };

    let mut clause_cursor = clause.walk();
    for spec in clause
        .named_children(&mut clause_cursor)
        .filter(|child| child.kind() == "export_specifier")
    {
        let Some(name) = spec.child_by_field_name("name") else {
            continue;
        };
        let local = string_literal(name, source).unwrap_or(node_text(name, source));
        let exported = spec
            .child_by_field_name("alias")
            .map_or(local, |alias| string_literal(alias, source).unwrap_or(node_text(alias, source)));

        let target = match specifier {
            Some(specifier) => ExportTarget::ReExport {
                specifier: specifier.to_owned(),
                name: local.to_owned(),
            },
            None => ExportTarget::Local(local.to_owned()),
        };
        analysis.exports.insert(exported.to_owned(), target);
    }
}

/// Splits `object.property(...)` into `(object, property)`.
fn member_call<'tree, 'src>(call: Node<'tree>, source: &'src str) -> Option<(Node<'tree>, &'src str)> {
    let function = unwrap_expression(call.child_by_field_name("function")?);
    if function.kind() != "member_expression" {
        return None;
    }
    let object = function.child_by_field_name("object")?;
    let property = function.child_by_field_name("property")?;
    Some((object, node_text(property, source)))
}

fn arguments(call: Node<'_>) -> Vec<Node<'_>> {
    let Some(arguments) = call.child_by_field_name("arguments") else {
        return Vec::new();
    };
    let mut cursor = arguments.walk();
    arguments
        .named_children(&mut cursor)
        .filter(|child| child.kind() != "comment")
        .collect()
}

fn first_argument(call: Node<'_>) -> Option<Node<'_>> {
    arguments(call).into_iter().next()
}

/// Follows a receiver through chained calls to the binding it starts from.
fn receiver_name(node: Node<'_>, source: &str, constructions: &FxHashMap<usize, String>) -> Option<String> {
    let node = unwrap_expression(node);
    match node.kind() {
        "identifier" => Some(node_text(node, source).to_owned()),
        "new_expression" => constructions.get(&node.start_byte()).cloned(),
        "call_expression" => {
            let (object, _) = member_call(node, source)?;
            receiver_name(object, source, constructions)
        }
        _ => None,
    }
}

fn path_arg(node: Option<Node<'_>>, source: &str) -> PathArg {
    match node {
        None => PathArg::Omitted,
        Some(node) => string_literal(node, source).map_or(PathArg::Dynamic, |path| PathArg::Literal(path.to_owned())),
    }
}

/// Reads the method argument of `app.on(method, path, ...)`.
///
/// Arrays of methods are joined with `|`.
fn on_method(node: Node<'_>, source: &str) -> Option<String> {
    if let Some(method) = string_literal(node, source) {
        return Some(method.to_uppercase());
    }
    if node.kind() != "array" {
        return None;
    }

    let mut cursor = node.walk();
    let methods: Option<Vec<String>> = node
        .named_children(&mut cursor)
        .map(|element| string_literal(element, source).map(str::to_uppercase))
        .collect();
    methods.filter(|methods| !methods.is_empty()).map(|methods| methods.join("|"))
}

fn registration(call: Node<'_>, source: &str, constructions: &FxHashMap<usize, String>) -> Option<Registration> {
    let (object, property) = member_call(call, source)?;
    let is_known = ROUTE_METHODS.contains(&property) || matches!(property, "on" | "use" | "route");
    if !is_known {
        return None;
    }

    let receiver = receiver_name(object, source, constructions)?;
    let property_node = call
        .child_by_field_name("function")
        .and_then(|function| unwrap_expression(function).child_by_field_name("property"))?;
    let args = arguments(call);

    let (kind, path, handler_args) = match property {
        "use" => match args.first() {
            Some(first) if string_literal(*first, source).is_some() || is_dynamic_string(*first) => {
                (RegistrationKind::Middleware, path_arg(Some(*first), source), &args[1..])
            }
            _ => (RegistrationKind::Middleware, PathArg::Omitted, &args[..]),
        },
        "route" => {
            let target = args.get(1).and_then(|target| {
                let target = unwrap_expression(*target);
                (target.kind() == "identifier").then(|| node_text(target, source).to_owned())
            });
            (
                RegistrationKind::Mount { target },
                path_arg(args.first().copied(), source),
                &args[..0],
            )
        }
        "on" => {
            let method = args.first().and_then(|method| on_method(*method, source));
            (
                RegistrationKind::Route { method },
                path_arg(args.get(1).copied(), source),
                args.get(2..).unwrap_or_default(),
            )
        }
        method => (
            RegistrationKind::Route {
                method: Some(method.to_uppercase()),
            },
            path_arg(args.first().copied(), source),
            args.get(1..).unwrap_or_default(),
        ),
    };

    Some(Registration {
        receiver,
        position: position(property_node),
        kind,
        path,
        handlers: handler_args.iter().map(|arg| handler(*arg, source)).collect(),
    })
}

fn is_dynamic_string(node: Node<'_>) -> bool {
    matches!(node.kind(), "template_string" | "binary_expression")
}

fn handler(node: Node<'_>, source: &str) -> Handler {
    let mut identifiers: Vec<String> = Vec::new();
    for descendant in Descendants::new(node) {
        if matches!(descendant.kind(), "identifier" | "shorthand_property_identifier") {
            let text = node_text(descendant, source);
            if !identifiers.iter().any(|known| known == text) {
                identifiers.push(text.to_owned());
            }
        }
    }

    Handler {
        position: position(node),
        content: node_text(node, source).to_owned(),
        identifiers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TsParser;

    fn analyze(source: &str) -> FileAnalysis {
        let mut parser = TsParser::new().expect("parser");
        let result = parser.parse(source).expect("parses");
        analyze_file(result.tree.root_node(), source)
    }

    #[test]
    fn test_app_declarations() {
        let analysis = analyze(
            r#"
import { Hono } from "hono";
const app = new Hono();
const api = new Hono<{ Bindings: Env }>().basePath("/api");
const other = new Map();
"#,
        );
        let apps: Vec<_> = analysis
            .apps
            .iter()
            .map(|app| (app.name.as_str(), app.base_path.as_deref()))
            .collect();
        assert_eq!(apps, vec![("app", None), ("api", Some("/api"))]);
    }

    #[test]
    fn test_route_registrations_in_source_order() {
        let analysis = analyze(
            r#"
const app = new Hono();
app.get("/users", (c) => c.json([])).post("/users", async (c) => c.text("ok"));
app.on(["GET", "put"], "/items", (c) => c.body(null));
"#,
        );
        let routes: Vec<_> = analysis
            .registrations
            .iter()
            .filter_map(|r| match (&r.kind, &r.path) {
                (RegistrationKind::Route { method }, PathArg::Literal(path)) => {
                    Some((method.clone().unwrap_or_default(), path.clone()))
                }
                _ => None,
            })
            .collect();
        assert_eq!(
            routes,
            vec![
                ("GET".to_owned(), "/users".to_owned()),
                ("POST".to_owned(), "/users".to_owned()),
                ("GET|PUT".to_owned(), "/items".to_owned()),
            ]
        );
        assert!(analysis.registrations.iter().all(|r| r.receiver == "app"));
    }

    #[test]
    fn test_middleware_with_and_without_path() {
        let analysis = analyze(
            r#"
const app = new Hono();
app.use(logger());
app.use("/admin/*", auth, audit);
"#,
        );
        assert_eq!(analysis.registrations.len(), 2);
        assert_eq!(analysis.registrations[0].path, PathArg::Omitted);
        assert_eq!(analysis.registrations[0].handlers.len(), 1);
        assert_eq!(
            analysis.registrations[1].path,
            PathArg::Literal("/admin/*".to_owned())
        );
        assert_eq!(analysis.registrations[1].handlers.len(), 2);
    }

    #[test]
    fn test_mount_and_dynamic_path() {
        let analysis = analyze(
            r#"
const app = new Hono();
app.route("/users", users);
app.get(`/v${version}`, (c) => c.text("x"));
"#,
        );
        assert_eq!(
            analysis.registrations[0].kind,
            RegistrationKind::Mount {
                target: Some("users".to_owned())
            }
        );
        assert_eq!(analysis.registrations[1].path, PathArg::Dynamic);
    }

    #[test]
    fn test_exports() {
        let analysis = analyze(
            r#"
const app = new Hono();
export const api = new Hono();
export { app as main };
export { default as users } from "./users";
export default app;
"#,
        );
        assert_eq!(
            analysis.exports.get("main"),
            Some(&ExportTarget::Local("app".to_owned()))
        );
        assert_eq!(
            analysis.exports.get("api"),
            Some(&ExportTarget::Local("api".to_owned()))
        );
        assert_eq!(
            analysis.exports.get("users"),
            Some(&ExportTarget::ReExport {
                specifier: "./users".to_owned(),
                name: "default".to_owned()
            })
        );
        assert_eq!(
            analysis.exports.get(DEFAULT_EXPORT),
            Some(&ExportTarget::Local("app".to_owned()))
        );
    }

    #[test]
    fn test_default_exported_construction_chain() {
        let analysis = analyze(r#"export default new Hono().get("/", (c) => c.text("hi"));"#);
        assert_eq!(analysis.apps.len(), 1);
        assert_eq!(analysis.apps[0].name, DEFAULT_EXPORT);
        assert_eq!(analysis.registrations.len(), 1);
        assert_eq!(analysis.registrations[0].receiver, DEFAULT_EXPORT);
    }

    #[test]
    fn test_handler_identifiers_are_unique_and_ordered() {
        let analysis = analyze(
            r#"
const app = new Hono();
app.get("/", async (c) => { const rows = await db.select(users); return c.json({ rows, db }); });
"#,
        );
        let handler = &analysis.registrations[0].handlers[0];
        assert!(handler.content.starts_with("async (c) =>"));
        assert_eq!(handler.identifiers, vec!["c", "rows", "db", "users"]);
    }
}
