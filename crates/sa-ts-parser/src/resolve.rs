//! Relative module resolution.
//!
//! Resolves `./x` style specifiers the way a bundler would: the exact file,
//! then the specifier with each source extension appended, then an `index`
//! file inside the directory. A `.js`-family extension in the specifier is
//! also tried with its TypeScript counterpart (`./db.js` -> `./db.ts`).
//! Package specifiers are never resolved.

use camino::{Utf8Path, Utf8PathBuf};
use sa_core::paths;

use crate::import::is_local_specifier;
use crate::program::ServiceHost;

/// Extensions probed when a specifier has none, in priority order.
pub const SOURCE_EXTENSIONS: [&str; 8] = ["ts", "tsx", "mts", "cts", "js", "jsx", "mjs", "cjs"];

/// Resolves `specifier` imported from `from_file` to an absolute file name.
///
/// Returns `None` for package specifiers and for local ones that match no
/// existing file.
///
/// # Examples
///
/// ```ignore
/// let target = resolve_module(&host, "/p/src/index.ts".as_ref(), "./routes/users");
/// assert_eq!(target.as_deref(), Some("/p/src/routes/users.ts".as_ref()));
/// ```
#[must_use]
pub fn resolve_module(
    host: &dyn ServiceHost,
    from_file: &Utf8Path,
    specifier: &str,
) -> Option<Utf8PathBuf> {
    if !is_local_specifier(specifier) {
        return None;
    }

    let directory = from_file.parent().unwrap_or(host.project_root());
    let base = paths::normalize(&directory.join(specifier));

    candidates(&base).find(|candidate| host.file_exists(candidate))
}

fn candidates(base: &Utf8Path) -> impl Iterator<Item = Utf8PathBuf> + '_ {
    let exact = base.extension().is_some().then(|| base.to_owned());

    let typescript_twin = base.extension().and_then(|extension| {
        let twin = match extension {
            "js" => "ts",
            "jsx" => "tsx",
            "mjs" => "mts",
            "cjs" => "cts",
            _ => return None,
        };
        Some(base.with_extension(twin))
    });

    let appended = SOURCE_EXTENSIONS
        .into_iter()
        .map(move |extension| Utf8PathBuf::from(format!("{base}.{extension}")));

    let index = SOURCE_EXTENSIONS
        .into_iter()
        .map(move |extension| base.join(format!("index.{extension}")));

    exact
        .into_iter()
        .chain(typescript_twin)
        .chain(appended)
        .chain(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::SourceSnapshot;

    struct ExistsHost(Vec<&'static str>);

    impl ServiceHost for ExistsHost {
        fn project_root(&self) -> &Utf8Path {
            Utf8Path::new("/p")
        }

        fn file_names(&self) -> Vec<Utf8PathBuf> {
            self.0.iter().map(Utf8PathBuf::from).collect()
        }

        fn script_version(&self, _file_name: &Utf8Path) -> Option<u64> {
            Some(0)
        }

        fn script_snapshot(&self, _file_name: &Utf8Path) -> Option<SourceSnapshot> {
            None
        }

        fn file_exists(&self, file_name: &Utf8Path) -> bool {
            self.0.contains(&file_name.as_str())
        }

        fn directory_exists(&self, _directory: &Utf8Path) -> bool {
            false
        }

        fn read_file(&self, _file_name: &Utf8Path) -> Option<String> {
            None
        }
    }

    fn resolve(host: &ExistsHost, specifier: &str) -> Option<String> {
        resolve_module(host, Utf8Path::new("/p/src/index.ts"), specifier).map(String::from)
    }

    #[test]
    fn test_appends_extension() {
        let host = ExistsHost(vec!["/p/src/routes/users.ts"]);
        assert_eq!(resolve(&host, "./routes/users").as_deref(), Some("/p/src/routes/users.ts"));
    }

    #[test]
    fn test_directory_index() {
        let host = ExistsHost(vec!["/p/src/routes/index.tsx"]);
        assert_eq!(resolve(&host, "./routes").as_deref(), Some("/p/src/routes/index.tsx"));
    }

    #[test]
    fn test_js_specifier_maps_to_ts_source() {
        let host = ExistsHost(vec!["/p/lib/db.ts"]);
        assert_eq!(resolve(&host, "../lib/db.js").as_deref(), Some("/p/lib/db.ts"));
    }

    #[test]
    fn test_package_specifier_is_unresolved() {
        let host = ExistsHost(vec!["/p/src/hono.ts"]);
        assert_eq!(resolve(&host, "hono"), None);
    }

    #[test]
    fn test_missing_file_is_unresolved() {
        let host = ExistsHost(vec![]);
        assert_eq!(resolve(&host, "./nowhere"), None);
    }
}
