//! An in-memory watch source driven by code.
//!
//! [`ManualWatcher`] never touches the file system. Files are seeded up
//! front and changed through a [`ManualWatcherHandle`], which makes it the
//! source of choice for tests and for embedding the monitor behind an
//! editor that already knows every buffer.

use std::collections::BTreeMap;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::error::WatchError;
use crate::events::WatchEvent;
use crate::source::WatchSource;

#[derive(Debug, Default)]
struct ManualState {
    files: BTreeMap<Utf8PathBuf, String>,
    sender: Option<mpsc::UnboundedSender<WatchEvent>>,
}

impl ManualState {
    fn emit(&self, event: WatchEvent) {
        if let Some(sender) = &self.sender {
            if sender.send(event).is_err() {
                tracing::debug!("Manual watcher receiver dropped");
            }
        }
    }
}

/// A [`WatchSource`] whose files live in memory.
///
/// # Examples
///
/// ```
/// use sa_watcher::{ManualWatcher, WatchEvent, WatchSource};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), sa_watcher::WatchError> {
/// let mut watcher = ManualWatcher::with_files([("/p/src/index.ts", "export {};")]);
/// let handle = watcher.handle();
///
/// let mut events = watcher.start().await?;
/// assert!(matches!(events.recv().await, Some(WatchEvent::FileAdded { .. })));
///
/// handle.update_file("/p/src/index.ts", "export const x = 1;");
/// assert_eq!(
///     events.recv().await.as_ref().and_then(WatchEvent::content),
///     Some("export const x = 1;")
/// );
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct ManualWatcher {
    state: Arc<Mutex<ManualState>>,
}

impl ManualWatcher {
    /// Creates a watcher with no files.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a watcher seeded with `files`.
    #[must_use]
    pub fn with_files<P, C>(files: impl IntoIterator<Item = (P, C)>) -> Self
    where
        P: Into<Utf8PathBuf>,
        C: Into<String>,
    {
        let files = files
            .into_iter()
            .map(|(path, content)| (path.into(), content.into()))
            .collect();
        Self {
            state: Arc::new(Mutex::new(ManualState {
                files,
                sender: None,
            })),
        }
    }

    /// Returns a handle that changes files after the watcher moved into a monitor.
    #[must_use]
    pub fn handle(&self) -> ManualWatcherHandle {
        ManualWatcherHandle {
            state: Arc::clone(&self.state),
        }
    }

    /// Returns `true` while started.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state.lock().sender.is_some()
    }
}

impl WatchSource for ManualWatcher {
    async fn start(&mut self) -> Result<mpsc::UnboundedReceiver<WatchEvent>, WatchError> {
        let mut state = self.state.lock();
        if state.sender.is_some() {
            return Err(WatchError::AlreadyStarted);
        }

        let (sender, receiver) = mpsc::unbounded_channel();
        for (file_name, content) in &state.files {
            sender
                .send(WatchEvent::added(file_name.clone(), content.clone()))
                .map_err(|_| WatchError::ChannelClosed)?;
        }
        state.sender = Some(sender);

        tracing::debug!(files = state.files.len(), "Manual watcher started");
        Ok(receiver)
    }

    async fn stop(&mut self) -> Result<(), WatchError> {
        if self.state.lock().sender.take().is_some() {
            tracing::debug!("Manual watcher stopped");
        }
        Ok(())
    }

    fn known_file_names(&self) -> Vec<Utf8PathBuf> {
        self.state.lock().files.keys().cloned().collect()
    }
}

/// Changes the files of a [`ManualWatcher`].
///
/// Changes made while the watcher is stopped update its file set without
/// emitting events.
#[derive(Debug, Clone)]
pub struct ManualWatcherHandle {
    state: Arc<Mutex<ManualState>>,
}

impl ManualWatcherHandle {
    /// Adds a file, or replaces it if known (still emitting `FileAdded`).
    pub fn add_file(&self, file_name: impl Into<Utf8PathBuf>, content: impl Into<String>) {
        let (file_name, content) = (file_name.into(), content.into());
        let mut state = self.state.lock();
        state.files.insert(file_name.clone(), content.clone());
        state.emit(WatchEvent::added(file_name, content));
    }

    /// Replaces a file's content and emits `FileUpdated`.
    ///
    /// Unknown files are recorded too; the event is emitted regardless so
    /// consumers can exercise their unknown-file path.
    pub fn update_file(&self, file_name: impl Into<Utf8PathBuf>, content: impl Into<String>) {
        let (file_name, content) = (file_name.into(), content.into());
        let mut state = self.state.lock();
        state.files.insert(file_name.clone(), content.clone());
        state.emit(WatchEvent::updated(file_name, content));
    }

    /// Removes a file. Emits `FileRemoved` only if the file was known.
    pub fn remove_file(&self, file_name: impl AsRef<Utf8Path>) {
        let file_name = file_name.as_ref();
        let mut state = self.state.lock();
        if state.files.remove(file_name).is_some() {
            state.emit(WatchEvent::removed(file_name.to_owned()));
        }
    }

    /// Returns a file's current content.
    #[must_use]
    pub fn content(&self, file_name: impl AsRef<Utf8Path>) -> Option<String> {
        self.state.lock().files.get(file_name.as_ref()).cloned()
    }
}
