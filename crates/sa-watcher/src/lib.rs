//! File watching for the route monitor.
//!
//! This crate turns a set of glob locations into a stream of
//! [`WatchEvent`]s that carry file content, so the monitor can keep its
//! in-memory project without reading the disk:
//!
//! - `FileAdded { file_name, content }` for every file present at start and
//!   every file created later
//! - `FileUpdated { file_name, changes }` with the full new content in
//!   `changes[0]`, only when the content actually changed
//! - `FileRemoved { file_name }`
//!
//! # Sources
//!
//! | Source | Backing | Use |
//! |--------|---------|-----|
//! | [`FileWatcher`] | `ignore` walk + `notify` with `notify-debouncer-mini` | real projects |
//! | [`ManualWatcher`] | in-memory map | tests, editor embedding |
//!
//! Both implement [`WatchSource`], which also exposes the known file names
//! the monitor's readiness check compares against.
//!
//! # Crate Dependencies
//!
//! ```text
//! sa-cli ──► sa-monitor ──► sa-watcher ──► sa-core
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use sa_watcher::{FileWatcher, WatchEvent, WatchSource};
//! use sa_core::{ProjectConfig, WatchConfig};
//! use camino::Utf8Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let project = ProjectConfig::discover(Utf8Path::new("."));
//!     let mut watcher = FileWatcher::for_project(&project, &WatchConfig::default())?;
//!
//!     let mut events = watcher.start().await?;
//!     while let Some(event) = events.recv().await {
//!         match event {
//!             WatchEvent::FileAdded { file_name, .. } => println!("+ {file_name}"),
//!             WatchEvent::FileUpdated { file_name, .. } => println!("~ {file_name}"),
//!             WatchEvent::FileRemoved { file_name } => println!("- {file_name}"),
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Error Handling
//!
//! ```
//! use sa_watcher::WatchError;
//!
//! fn handle_watch_error(err: &WatchError) {
//!     if err.is_fatal() {
//!         tracing::error!(error = %err, "Watcher failed");
//!     } else {
//!         tracing::warn!(error = %err, "Skipping file");
//!     }
//! }
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod error;
pub mod events;
pub mod filter;
pub mod locations;
pub mod manual;
pub mod source;
pub mod watcher;

pub use error::WatchError;
pub use events::{TextChange, TextRange, WatchEvent};
pub use filter::{FileFilter, SourceFileFilter};
pub use locations::WatchLocations;
pub use manual::{ManualWatcher, ManualWatcherHandle};
pub use source::WatchSource;
pub use watcher::FileWatcher;
