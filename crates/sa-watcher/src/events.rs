//! Event types for file change notifications.
//!
//! Every event names an absolute file. Additions carry the file's content
//! and updates carry a single full-text replacement, so a consumer can keep
//! an in-memory copy of the project without reading the disk itself.
//!
//! # Event Flow
//!
//! ```text
//! initial walk ──► FileAdded (one per matching file)
//!        │
//! notify + debouncer-mini
//!        │
//!        ▼
//! content hash compared with the known-file table
//!        │
//!        ├─► FileAdded    (new file)
//!        ├─► FileUpdated  (content changed)
//!        └─► FileRemoved  (file gone)
//! ```

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use smallvec::{SmallVec, smallvec};

/// A byte range within the previous content of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRange {
    /// Start offset (inclusive).
    pub start: usize,
    /// End offset (exclusive).
    pub end: usize,
}

/// One textual change carried by [`WatchEvent::FileUpdated`].
///
/// Watchers in this crate always emit a single change without a range,
/// whose `text` is the complete new content of the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextChange {
    /// Replacement text.
    pub text: String,
    /// Range being replaced; `None` replaces the whole file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<TextRange>,
}

impl TextChange {
    /// Creates a whole-file replacement.
    #[inline]
    #[must_use]
    pub fn full(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            range: None,
        }
    }
}

/// A change to a watched file.
///
/// # Examples
///
/// ```
/// use sa_watcher::WatchEvent;
/// use camino::Utf8PathBuf;
///
/// let event = WatchEvent::updated(Utf8PathBuf::from("/p/src/index.ts"), "export {};");
/// assert_eq!(event.file_name().as_str(), "/p/src/index.ts");
/// assert_eq!(event.content(), Some("export {};"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum WatchEvent {
    /// A file started matching the watch locations.
    #[serde(rename_all = "camelCase")]
    FileAdded {
        /// Absolute file name.
        file_name: Utf8PathBuf,
        /// Full content.
        content: String,
    },

    /// A known file's content changed.
    #[serde(rename_all = "camelCase")]
    FileUpdated {
        /// Absolute file name.
        file_name: Utf8PathBuf,
        /// The change; `changes[0].text` is the full new content.
        changes: SmallVec<[TextChange; 1]>,
    },

    /// A known file was deleted or stopped matching.
    #[serde(rename_all = "camelCase")]
    FileRemoved {
        /// Absolute file name.
        file_name: Utf8PathBuf,
    },
}

impl WatchEvent {
    /// Creates a [`WatchEvent::FileAdded`].
    #[inline]
    #[must_use]
    pub fn added(file_name: Utf8PathBuf, content: impl Into<String>) -> Self {
        Self::FileAdded {
            file_name,
            content: content.into(),
        }
    }

    /// Creates a [`WatchEvent::FileUpdated`] carrying a full-text replacement.
    #[inline]
    #[must_use]
    pub fn updated(file_name: Utf8PathBuf, content: impl Into<String>) -> Self {
        Self::FileUpdated {
            file_name,
            changes: smallvec![TextChange::full(content)],
        }
    }

    /// Creates a [`WatchEvent::FileRemoved`].
    #[inline]
    #[must_use]
    pub const fn removed(file_name: Utf8PathBuf) -> Self {
        Self::FileRemoved { file_name }
    }

    /// Returns the file the event is about.
    #[must_use]
    pub fn file_name(&self) -> &Utf8Path {
        match self {
            Self::FileAdded { file_name, .. }
            | Self::FileUpdated { file_name, .. }
            | Self::FileRemoved { file_name } => file_name,
        }
    }

    /// Returns the file's new content, if the event carries it.
    ///
    /// For updates this is `changes[0].text`.
    #[must_use]
    pub fn content(&self) -> Option<&str> {
        match self {
            Self::FileAdded { content, .. } => Some(content),
            Self::FileUpdated { changes, .. } => changes.first().map(|change| change.text.as_str()),
            Self::FileRemoved { .. } => None,
        }
    }

    /// Returns a short label for logging.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::FileAdded { .. } => "added",
            Self::FileUpdated { .. } => "updated",
            Self::FileRemoved { .. } => "removed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_carries_single_full_change() {
        let event = WatchEvent::updated(Utf8PathBuf::from("/p/a.ts"), "new");
        let WatchEvent::FileUpdated { changes, .. } = &event else {
            unreachable!("constructor builds an update");
        };
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].range, None);
        assert_eq!(event.content(), Some("new"));
    }

    #[test]
    fn test_removed_has_no_content() {
        let event = WatchEvent::removed(Utf8PathBuf::from("/p/a.ts"));
        assert_eq!(event.content(), None);
        assert_eq!(event.kind(), "removed");
    }

    #[test]
    fn test_serialized_shape() {
        let event = WatchEvent::added(Utf8PathBuf::from("/p/a.ts"), "x");
        let json = serde_json::to_string(&event).expect("serializes");
        assert_eq!(json, r#"{"kind":"fileAdded","fileName":"/p/a.ts","content":"x"}"#);
    }
}
