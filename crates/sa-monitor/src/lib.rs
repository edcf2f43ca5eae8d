//! Incremental route monitoring for Hono projects.
//!
//! The monitor keeps an in-memory copy of a TypeScript project, fed by a
//! file watcher, and turns it into a graph of route trees, routes,
//! middleware and the handler code behind them. Every change re-runs the
//! analysis after a short debounce window and broadcasts the outcome.
//!
//! - [`RoutesMonitor`] - lifecycle, debouncing and the analysis guard
//! - [`MonitorHost`] - the file map the language service reads from
//! - [`RoutesResult`] - an immutable resource graph plus its root tree
//! - [`analyze`] - root route tree selection
//! - [`AnalysisEvent`] - `analysisStarted` / `analysisCompleted` events
//!
//! # Crate Dependencies
//!
//! ```text
//! sa-cli ──► sa-monitor ──► sa-ts-parser ──► sa-core
//!                       └─► sa-watcher ─────► sa-core
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use sa_monitor::RoutesMonitor;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), sa_monitor::MonitorError> {
//!     let mut monitor = RoutesMonitor::new("./my-api")?;
//!     monitor.set_auto_create_result(false);
//!     monitor.start().await?;
//!
//!     let result = monitor.refresh().await?;
//!     for route in result.routes() {
//!         println!("{} {}", route.method, route.path);
//!     }
//!
//!     monitor.stop().await
//! }
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod analyze;
pub mod error;
pub mod events;
pub mod host;
pub mod monitor;
mod pump;
pub mod result;

pub use analyze::analyze;
pub use error::MonitorError;
pub use events::{AnalysisCompleted, AnalysisEvent};
pub use host::MonitorHost;
pub use monitor::RoutesMonitor;
pub use result::{ResolvedRoute, RoutesResult};
