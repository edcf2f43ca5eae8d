//! Lexical path helpers.
//!
//! Resources store file names relative to the project root and convert back
//! to absolute paths on demand. These helpers do that purely lexically (no
//! filesystem access), so a path that was deleted between two analysis
//! passes still converts the same way.

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};

/// Normalizes a path lexically, resolving `.` and `..` components.
///
/// `..` at the root of an absolute path is dropped; leading `..` components
/// of a relative path are kept.
///
/// # Examples
///
/// ```
/// use sa_core::paths::normalize;
/// use camino::Utf8Path;
///
/// assert_eq!(normalize(Utf8Path::new("/a/b/../c/./d.ts")), "/a/c/d.ts");
/// assert_eq!(normalize(Utf8Path::new("../x/./y")), "../x/y");
/// ```
#[must_use]
pub fn normalize(path: &Utf8Path) -> Utf8PathBuf {
    let mut parts: Vec<Utf8Component<'_>> = Vec::new();

    for component in path.components() {
        match component {
            Utf8Component::CurDir => {}
            Utf8Component::ParentDir => match parts.last() {
                Some(Utf8Component::Normal(_)) => {
                    parts.pop();
                }
                Some(Utf8Component::RootDir | Utf8Component::Prefix(_)) => {}
                _ => parts.push(component),
            },
            other => parts.push(other),
        }
    }

    parts.iter().map(Utf8Component::as_str).collect()
}

/// Returns `path` relative to `base`, the way `path.relative` does in Node.
///
/// Both paths are normalized first. When `path` lies outside `base`, the
/// result climbs out with `..` components. Identical paths yield an empty path.
///
/// # Examples
///
/// ```
/// use sa_core::paths::relative_to;
/// use camino::Utf8Path;
///
/// let root = Utf8Path::new("/project");
/// assert_eq!(relative_to(root, Utf8Path::new("/project/src/index.ts")), "src/index.ts");
/// assert_eq!(relative_to(root, Utf8Path::new("/other/a.ts")), "../other/a.ts");
/// ```
#[must_use]
pub fn relative_to(base: &Utf8Path, path: &Utf8Path) -> Utf8PathBuf {
    let base = normalize(base);
    let path = normalize(path);

    let base_parts: Vec<_> = base.components().collect();
    let path_parts: Vec<_> = path.components().collect();

    let common = base_parts
        .iter()
        .zip(path_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut relative = Utf8PathBuf::new();
    for _ in common..base_parts.len() {
        relative.push("..");
    }
    for part in &path_parts[common..] {
        relative.push(part.as_str());
    }
    relative
}

/// Resolves a possibly relative path against the current working directory.
///
/// Falls back to the normalized input if the working directory is unavailable
/// or not valid UTF-8.
#[must_use]
pub fn absolutize(path: &Utf8Path) -> Utf8PathBuf {
    if path.is_absolute() {
        return normalize(path);
    }

    match std::env::current_dir()
        .ok()
        .and_then(|cwd| Utf8PathBuf::from_path_buf(cwd).ok())
    {
        Some(cwd) => normalize(&cwd.join(path)),
        None => {
            tracing::warn!(path = %path, "Unable to resolve working directory");
            normalize(path)
        }
    }
}

/// Returns `true` if the string contains glob metacharacters.
#[inline]
#[must_use]
pub fn has_glob_chars(pattern: &str) -> bool {
    pattern.contains(['*', '?', '[', '{'])
}
