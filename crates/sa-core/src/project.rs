//! Project discovery.
//!
//! The locations to watch come from the `include` option of the project's
//! `tsconfig.json`. Without one (or without an `include`), the monitor
//! watches `{root}/src/**/*` when a `src` directory exists and
//! `{root}/**/*` otherwise.

use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;

use crate::error::ConfigError;
use crate::paths;

/// Name of the project configuration file looked up in the project root.
pub const TSCONFIG_FILE: &str = "tsconfig.json";

#[derive(Debug, Default, Deserialize)]
struct RawTsConfig {
    #[serde(default)]
    include: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    exclude: Option<Vec<serde_json::Value>>,
}

/// The watch setup derived for a project root.
///
/// # Examples
///
/// ```
/// use sa_core::ProjectConfig;
///
/// let dir = tempfile::TempDir::new().unwrap();
/// std::fs::create_dir(dir.path().join("src")).unwrap();
///
/// let root = camino::Utf8Path::from_path(dir.path()).unwrap();
/// let project = ProjectConfig::discover(root);
///
/// assert_eq!(project.watch_locations(), [root.join("src/**/*")]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectConfig {
    root: Utf8PathBuf,
    config_path: Option<Utf8PathBuf>,
    include: Vec<Utf8PathBuf>,
    exclude: Vec<Utf8PathBuf>,
}

impl ProjectConfig {
    /// Discovers the watch locations for `root`.
    ///
    /// Never fails: an unreadable or malformed `tsconfig.json` is logged and
    /// the fallback locations are used.
    pub fn discover(root: &Utf8Path) -> Self {
        let root = paths::absolutize(root);
        let config_path = root.join(TSCONFIG_FILE);

        match Self::load(&root, &config_path) {
            Ok(Some(project)) => project,
            Ok(None) => Self::fallback(root, None),
            Err(error) => {
                tracing::warn!(path = %config_path, %error, "Ignoring unreadable tsconfig");
                Self::fallback(root, None)
            }
        }
    }

    fn load(root: &Utf8Path, config_path: &Utf8Path) -> Result<Option<Self>, ConfigError> {
        if !config_path.is_file() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path)?;
        let raw: RawTsConfig = serde_json::from_str(&strip_jsonc(&content))?;
        let base = config_path.parent().unwrap_or(root);

        let resolve = |entries: Option<Vec<serde_json::Value>>| -> Vec<Utf8PathBuf> {
            entries
                .unwrap_or_default()
                .iter()
                .filter_map(serde_json::Value::as_str)
                .map(|entry| resolve_pattern(base, entry))
                .collect()
        };

        let include = resolve(raw.include);
        let exclude = resolve(raw.exclude);
        let project = if include.is_empty() {
            Self {
                exclude,
                ..Self::fallback(root.to_owned(), Some(config_path.to_owned()))
            }
        } else {
            Self {
                root: root.to_owned(),
                config_path: Some(config_path.to_owned()),
                include,
                exclude,
            }
        };

        tracing::debug!(
            path = %config_path,
            include = project.include.len(),
            exclude = project.exclude.len(),
            "Loaded tsconfig"
        );
        Ok(Some(project))
    }

    fn fallback(root: Utf8PathBuf, config_path: Option<Utf8PathBuf>) -> Self {
        let src = root.join("src");
        let base = if src.is_dir() { src } else { root.clone() };
        Self {
            include: vec![base.join("**").join("*")],
            root,
            config_path,
            exclude: Vec::new(),
        }
    }

    /// Returns the absolute project root.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Returns the `tsconfig.json` that was read, if any.
    #[must_use]
    pub fn config_path(&self) -> Option<&Utf8Path> {
        self.config_path.as_deref()
    }

    /// Returns the absolute glob patterns to watch.
    #[must_use]
    pub fn watch_locations(&self) -> &[Utf8PathBuf] {
        &self.include
    }

    /// Returns the absolute glob patterns excluded from watching.
    #[must_use]
    pub fn exclude_locations(&self) -> &[Utf8PathBuf] {
        &self.exclude
    }
}

/// Resolves an `include`/`exclude` entry against the tsconfig directory.
///
/// Entries without glob characters or a file extension name a directory
/// and get `/**/*` appended.
fn resolve_pattern(base: &Utf8Path, entry: &str) -> Utf8PathBuf {
    let path = paths::normalize(&base.join(entry));
    let names_directory = !paths::has_glob_chars(entry)
        && (path.is_dir() || path.extension().is_none());

    if names_directory {
        path.join("**").join("*")
    } else {
        path
    }
}

/// Strips `//` and `/* */` comments and trailing commas from JSONC text.
///
/// String literals are copied verbatim, so `"src/**/*"` survives intact.
fn strip_jsonc(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut in_string = false;

    while let Some(c) = chars.next() {
        if in_string {
            output.push(c);
            match c {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        output.push(escaped);
                    }
                }
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                output.push(c);
            }
            '/' if chars.peek() == Some(&'/') => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        output.push('\n');
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut previous = '\0';
                for next in chars.by_ref() {
                    if previous == '*' && next == '/' {
                        break;
                    }
                    previous = next;
                }
            }
            _ => output.push(c),
        }
    }

    remove_trailing_commas(&output)
}

fn remove_trailing_commas(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    let mut in_string = false;
    let mut escaped = false;
    let chars: Vec<char> = input.chars().collect();

    for (i, &c) in chars.iter().enumerate() {
        if in_string {
            output.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        if c == '"' {
            in_string = true;
        } else if c == ',' {
            let next = chars[i + 1..].iter().find(|ch| !ch.is_whitespace());
            if matches!(next, Some(']' | '}')) {
                continue;
            }
        }
        output.push(c);
    }

    output
}
