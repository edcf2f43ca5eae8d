//! Error types for the sa-core crate.
//!
//! This module provides [`ConfigError`] for configuration loading failures and
//! [`ResourceError`] for resource-manager linking and identifier decoding.

use camino::Utf8PathBuf;

use crate::resource::TreeResourceId;

/// Errors that can occur during configuration loading and validation.
///
/// # Examples
///
/// ```
/// use sa_core::ConfigError;
/// use camino::Utf8PathBuf;
///
/// let error = ConfigError::MissingDirectory(Utf8PathBuf::from("/some/path"));
/// assert!(error.to_string().contains("/some/path"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The provided path is invalid or malformed.
    #[error("invalid path '{path}': {reason}")]
    InvalidPath {
        /// The invalid path.
        path: Utf8PathBuf,
        /// Explanation of why the path is invalid.
        reason: String,
    },

    /// A required directory does not exist.
    #[error("missing required directory: {0}")]
    MissingDirectory(Utf8PathBuf),

    /// An I/O error occurred while reading configuration.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors raised by the [`ResourceManager`](crate::ResourceManager).
///
/// Identifier collisions are not errors (they are logged and the newer
/// resource wins). Linking against a resource that was never created is,
/// because it means the extractor called the linking APIs out of order.
#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    /// A module was linked to a source reference that does not exist.
    #[error(
        "missing source reference (file: {file_name}, position: {position}, id: {id}); \
         attempting to add a module to a non-existing reference"
    )]
    MissingSourceReference {
        /// File name the source reference was expected in.
        file_name: Utf8PathBuf,
        /// Position the source reference was expected at.
        position: u32,
        /// The derived identifier that was looked up.
        id: TreeResourceId,
    },

    /// An entry was linked to a route tree that does not exist.
    #[error("missing route tree: {0}")]
    MissingRouteTree(TreeResourceId),

    /// An identifier could not be decoded.
    #[error("invalid resource id '{id}': {reason}")]
    InvalidId {
        /// The raw identifier.
        id: String,
        /// Why decoding failed.
        reason: &'static str,
    },
}

impl ResourceError {
    /// Creates a new [`ResourceError::InvalidId`] error.
    #[inline]
    pub fn invalid_id(id: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidId {
            id: id.into(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_path_display() {
        let error = ConfigError::InvalidPath {
            path: Utf8PathBuf::from("/invalid/path"),
            reason: "not a directory".to_owned(),
        };
        let msg = error.to_string();
        assert!(msg.contains("/invalid/path"));
        assert!(msg.contains("not a directory"));
    }

    #[test]
    fn test_missing_source_reference_display() {
        let error = ResourceError::MissingSourceReference {
            file_name: Utf8PathBuf::from("src/index.ts"),
            position: 42,
            id: TreeResourceId::from_raw("SOURCE_REFERENCE:src%2Findex.ts@42"),
        };
        let msg = error.to_string();
        assert!(msg.contains("missing source reference"));
        assert!(msg.contains("src/index.ts"));
        assert!(msg.contains("42"));
    }

    #[test]
    fn test_invalid_id_display() {
        let error = ResourceError::invalid_id("garbage", "missing type separator");
        assert_eq!(
            error.to_string(),
            "invalid resource id 'garbage': missing type separator"
        );
    }
}
