//! Analysis lifecycle events broadcast by the monitor.
//!
//! Every analysis pass emits [`AnalysisEvent::Started`] once it holds the
//! analysis guard, followed by exactly one [`AnalysisEvent::Completed`].
//! Subscribers receive them through a `tokio::sync::broadcast` channel.
//!
//! On the wire the events serialize as:
//!
//! ```json
//! {"type": "analysisStarted"}
//! {"type": "analysisCompleted", "success": true, "routesResult": {"rootId": "...", "resources": {}}}
//! {"type": "analysisCompleted", "success": false, "error": "No root route found"}
//! ```

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::result::RoutesResult;

/// Outcome of one analysis pass.
#[derive(Debug, Clone)]
pub enum AnalysisCompleted {
    /// The pass produced a result with a root route tree.
    Success {
        /// The new result.
        routes_result: RoutesResult,
    },
    /// The pass failed; the previous result stays in place.
    Failure {
        /// Human-readable reason.
        error: String,
    },
}

impl AnalysisCompleted {
    /// Returns `true` for [`AnalysisCompleted::Success`].
    #[inline]
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Returns the result of a successful pass.
    #[must_use]
    pub const fn routes_result(&self) -> Option<&RoutesResult> {
        match self {
            Self::Success { routes_result } => Some(routes_result),
            Self::Failure { .. } => None,
        }
    }

    /// Returns the reason of a failed pass.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { error } => Some(error),
        }
    }
}

/// An event emitted by the monitor.
#[derive(Debug, Clone)]
pub enum AnalysisEvent {
    /// An analysis pass began.
    Started,
    /// An analysis pass finished.
    Completed(AnalysisCompleted),
}

impl AnalysisEvent {
    /// Creates a successful completion event.
    #[must_use]
    pub const fn success(routes_result: RoutesResult) -> Self {
        Self::Completed(AnalysisCompleted::Success { routes_result })
    }

    /// Creates a failed completion event.
    #[must_use]
    pub fn failure(error: impl Into<String>) -> Self {
        Self::Completed(AnalysisCompleted::Failure {
            error: error.into(),
        })
    }

    /// Returns the wire name of the event.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Started => "analysisStarted",
            Self::Completed(_) => "analysisCompleted",
        }
    }

    /// Returns the completion payload, if this is a completion event.
    #[must_use]
    pub const fn completed(&self) -> Option<&AnalysisCompleted> {
        match self {
            Self::Started => None,
            Self::Completed(completed) => Some(completed),
        }
    }
}

impl Serialize for AnalysisEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Started => {
                let mut state = serializer.serialize_struct("AnalysisEvent", 1)?;
                state.serialize_field("type", self.name())?;
                state.end()
            }
            Self::Completed(AnalysisCompleted::Success { routes_result }) => {
                let mut state = serializer.serialize_struct("AnalysisEvent", 3)?;
                state.serialize_field("type", self.name())?;
                state.serialize_field("success", &true)?;
                state.serialize_field("routesResult", routes_result)?;
                state.end()
            }
            Self::Completed(AnalysisCompleted::Failure { error }) => {
                let mut state = serializer.serialize_struct("AnalysisEvent", 3)?;
                state.serialize_field("type", self.name())?;
                state.serialize_field("success", &false)?;
                state.serialize_field("error", error)?;
                state.end()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_started_wire_shape() {
        let json = serde_json::to_value(AnalysisEvent::Started).expect("serialize");
        assert_eq!(json, serde_json::json!({"type": "analysisStarted"}));
    }

    #[test]
    fn test_failure_wire_shape() {
        let event = AnalysisEvent::failure("No root route found");
        let json = serde_json::to_value(&event).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({
                "type": "analysisCompleted",
                "success": false,
                "error": "No root route found",
            })
        );
        let completed = event.completed().expect("completion");
        assert!(!completed.is_success());
        assert_eq!(completed.error(), Some("No root route found"));
        assert!(completed.routes_result().is_none());
    }
}
