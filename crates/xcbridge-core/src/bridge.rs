//! The Automation Bridge seam.
//!
//! The orchestrator drives an external development session only through these
//! traits. [`XcodeBridge`](crate::xcode::XcodeBridge) implements them by
//! scripting Xcode; tests implement them with in-memory fakes.
//!
//! Every call may block. Every call returns a `Result` so an unreachable
//! bridge surfaces as [`XcbError::AutomationUnavailable`](crate::error::XcbError)
//! rather than a panic or a silent `None`.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::XcbResult;

/// A diagnostic exactly as the bridge reports it. Every field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawIssue {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, rename = "filePath")]
    pub file_path: Option<String>,
    #[serde(default, rename = "startingLineNumber")]
    pub start_line: Option<usize>,
    #[serde(default, rename = "endingLineNumber")]
    pub end_line: Option<usize>,
    #[serde(default, rename = "startingColumnNumber")]
    pub start_column: Option<usize>,
}

impl RawIssue {
    /// An issue with only a message.
    pub fn message(message: impl Into<String>) -> Self {
        RawIssue {
            message: Some(message.into()),
            ..Default::default()
        }
    }

    /// An issue with a message and a full location.
    pub fn located(
        message: impl Into<String>,
        file_path: impl Into<String>,
        start_line: usize,
        end_line: usize,
        start_column: usize,
    ) -> Self {
        RawIssue {
            message: Some(message.into()),
            file_path: Some(file_path.into()),
            start_line: Some(start_line),
            end_line: Some(end_line),
            start_column: Some(start_column),
        }
    }
}

/// The four diagnostic collections of a finished build.
///
/// A missing collection means the bridge had nothing of that kind, not that
/// something failed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueCollections {
    #[serde(default, rename = "buildErrors")]
    pub errors: Option<Vec<RawIssue>>,
    #[serde(default, rename = "buildWarnings")]
    pub warnings: Option<Vec<RawIssue>>,
    #[serde(default, rename = "analyzerIssues")]
    pub analyzer: Option<Vec<RawIssue>>,
    #[serde(default, rename = "testFailures")]
    pub test_failures: Option<Vec<RawIssue>>,
}

/// Entry point of the external automation interface.
pub trait AutomationBridge {
    /// Session type produced by [`open`](Self::open).
    type Session: BridgeSession;

    /// Open `target`, returning `None` when the bridge has no workspace for it.
    fn open(&self, target: &Path) -> XcbResult<Option<Self::Session>>;
}

/// One open workspace in the external session.
pub trait BridgeSession {
    /// Handle type produced by [`build`](Self::build).
    type Handle: BuildHandle;

    /// Stop whatever the workspace is currently doing. Idempotent.
    fn stop(&self) -> XcbResult<()>;

    /// Start a build, returning `None` when the bridge produced no result handle.
    fn build(&self) -> XcbResult<Option<Self::Handle>>;

    /// Start running the target's active scheme.
    ///
    /// Returns once the launch request has been handed off. Must not wait for
    /// the launched app.
    fn run(&self) -> XcbResult<()>;
}

/// Result handle of a started build.
pub trait BuildHandle {
    /// Whether the build has finished.
    fn completed(&self) -> XcbResult<bool>;

    /// The diagnostics of the finished build.
    fn issues(&self) -> XcbResult<IssueCollections>;
}
