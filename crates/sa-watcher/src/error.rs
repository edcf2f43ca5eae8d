//! Error types for the sa-watcher crate.
//!
//! This module provides the [`WatchError`] type for errors that can occur
//! while locating, walking and watching source files.

use camino::Utf8PathBuf;

/// Errors that can occur during file watching operations.
///
/// # Error Recovery Strategy
///
/// - **Notify errors** ([`WatchError::Notify`]): Fatal - propagate immediately
/// - **Invalid glob** ([`WatchError::Glob`]): Fatal - the locations cannot be matched
/// - **Already started** ([`WatchError::AlreadyStarted`]): Fatal - programmer error
/// - **Channel closed** ([`WatchError::ChannelClosed`]): Fatal - communication broken
/// - **Non-UTF-8 path** ([`WatchError::NonUtf8Path`]): Recoverable - skip and continue
/// - **Walk errors** ([`WatchError::Walk`]): Recoverable - skip the entry
/// - **I/O errors** ([`WatchError::Io`]): Recoverable - a file vanished or is unreadable
///
/// # Examples
///
/// ```
/// use sa_watcher::WatchError;
///
/// fn handle_error(err: &WatchError) -> &'static str {
///     if err.is_fatal() { "stop watching" } else { "skip and continue" }
/// }
///
/// assert_eq!(handle_error(&WatchError::ChannelClosed), "stop watching");
/// ```
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// Failed to initialize or operate the notify watcher.
    #[error("notify watcher error: {0}")]
    Notify(#[from] notify::Error),

    /// A watch location is not a valid glob pattern.
    #[error("invalid watch location '{pattern}': {source}")]
    Glob {
        /// The offending pattern.
        pattern: String,
        /// The underlying glob error.
        source: globset::Error,
    },

    /// `start` was called on a watcher that is already running.
    #[error("watcher is already started")]
    AlreadyStarted,

    /// The event channel was closed unexpectedly.
    #[error("event channel closed unexpectedly")]
    ChannelClosed,

    /// A path is not valid UTF-8.
    #[error("path is not valid UTF-8: {}", _0.display())]
    NonUtf8Path(std::path::PathBuf),

    /// The initial directory walk failed for an entry.
    #[error("walk error: {0}")]
    Walk(#[from] ignore::Error),

    /// An I/O error occurred while reading a watched file.
    #[error("I/O error on '{path}': {source}")]
    Io {
        /// The file being read.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}

impl WatchError {
    /// Creates a new [`WatchError::NonUtf8Path`] error.
    #[inline]
    pub fn non_utf8_path(path: impl Into<std::path::PathBuf>) -> Self {
        Self::NonUtf8Path(path.into())
    }

    /// Creates a new [`WatchError::Io`] error.
    #[inline]
    pub fn io(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns `true` if this error is recoverable (watching can continue).
    #[inline]
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::NonUtf8Path(_) | Self::Walk(_) | Self::Io { .. })
    }

    /// Returns `true` if this error is fatal (watching should stop).
    #[inline]
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }

    /// Returns the file path associated with this error, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Utf8PathBuf> {
        match self {
            Self::Io { path, .. } => Some(path),
            Self::Notify(_)
            | Self::Glob { .. }
            | Self::AlreadyStarted
            | Self::ChannelClosed
            | Self::NonUtf8Path(_)
            | Self::Walk(_) => None,
        }
    }
}
