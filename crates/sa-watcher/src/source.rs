//! The watcher interface the monitor consumes.

use std::future::Future;

use camino::Utf8PathBuf;
use tokio::sync::mpsc;

use crate::error::WatchError;
use crate::events::WatchEvent;

/// A source of file events.
///
/// Implementations emit one [`WatchEvent::FileAdded`] per file already
/// present when `start` runs, followed by live changes. Updates always carry
/// the full new content in `changes[0]`.
pub trait WatchSource: Send + 'static {
    /// Starts watching and returns the event stream.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::AlreadyStarted`] if the source is running, or
    /// an implementation-specific error if watching cannot begin.
    fn start(
        &mut self,
    ) -> impl Future<Output = Result<mpsc::UnboundedReceiver<WatchEvent>, WatchError>> + Send;

    /// Stops watching. The event stream ends once buffered events drain.
    ///
    /// Stopping a source that is not running is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the background watcher failed while running.
    fn stop(&mut self) -> impl Future<Output = Result<(), WatchError>> + Send;

    /// Returns every file currently known to the source, sorted.
    fn known_file_names(&self) -> Vec<Utf8PathBuf>;
}
