//! Error types for the sa-monitor crate.

use sa_core::ResourceError;
use sa_watcher::WatchError;

/// Errors that can occur while running the routes monitor.
///
/// # Error Categories
///
/// - **Lifecycle misuse** ([`MonitorError::NotRunning`]): a programmer
///   error, the caller invoked an operation in the wrong state
/// - **Analysis failures** ([`MonitorError::ProgramUnavailable`],
///   [`MonitorError::NoRootRoute`], [`MonitorError::Resource`]): reported
///   through an `analysisCompleted` failure event as well
/// - **Watch failures** ([`MonitorError::Watch`]): the file watcher could not
///   start or stop
///
/// # Examples
///
/// ```
/// use sa_monitor::MonitorError;
///
/// assert!(MonitorError::NotRunning.is_programmer_error());
/// assert!(!MonitorError::NoRootRoute.is_programmer_error());
/// assert_eq!(MonitorError::NoRootRoute.to_string(), "No root route found");
/// ```
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    /// An analysis was requested before `start()` or after `stop()`.
    #[error("Monitor not running")]
    NotRunning,

    /// The language service could not produce a program.
    #[error("Program not initialized")]
    ProgramUnavailable,

    /// The extraction produced no route tree that could act as the root.
    #[error("No root route found")]
    NoRootRoute,

    /// Building the resource graph failed.
    #[error(transparent)]
    Resource(#[from] ResourceError),

    /// The file watcher failed.
    #[error("watcher error: {0}")]
    Watch(#[from] WatchError),

    /// A background analysis task panicked or was cancelled.
    #[error("analysis task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl MonitorError {
    /// Returns `true` if the error comes from calling the monitor in the wrong state.
    #[inline]
    #[must_use]
    pub const fn is_programmer_error(&self) -> bool {
        matches!(self, Self::NotRunning)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_match_event_payloads() {
        assert_eq!(MonitorError::NotRunning.to_string(), "Monitor not running");
        assert_eq!(
            MonitorError::ProgramUnavailable.to_string(),
            "Program not initialized"
        );
    }

    #[test]
    fn test_watch_error_converts() {
        let err: MonitorError = WatchError::AlreadyStarted.into();
        assert!(matches!(err, MonitorError::Watch(WatchError::AlreadyStarted)));
        assert!(!err.is_programmer_error());
    }
}
