//! Error types and error code constants for xcbridge.
//!
//! This module provides a unified error type (`XcbError`) for every hard
//! failure the core can produce: security refusals, an unreachable automation
//! bridge, builds that never start, and external processes that exceed their
//! deadline.
//!
//! Soft outcomes are not errors. An ambiguous or unresolved path is reported
//! inside [`ResolvedPath`](crate::resolve::ResolvedPath), and an invalid line
//! range is returned as snippet text, so a report can still be assembled
//! around one bad reference.
//!
//! ## Error Code Mapping
//!
//! - `2`: Invalid arguments (bad input from caller)
//! - `3`: Security denied (path outside the permitted root)
//! - `4`: Build errors (no workspace, build did not start, no result)
//! - `5`: Automation bridge unavailable
//! - `6`: Timeout waiting for an external operation
//! - `10`: Internal errors (I/O, unexpected state)

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

// ============================================================================
// Output Error Codes
// ============================================================================

/// Error codes for JSON output and process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OutputErrorCode {
    /// Invalid arguments from caller.
    InvalidArguments = 2,
    /// Path lies outside the permitted root.
    SecurityDenied = 3,
    /// The build could not be started or its result could not be read.
    BuildError = 4,
    /// The automation bridge could not be reached.
    AutomationUnavailable = 5,
    /// An external operation exceeded its deadline.
    Timeout = 6,
    /// Internal errors (bugs, I/O, unexpected state).
    InternalError = 10,
}

impl OutputErrorCode {
    /// Get the numeric code value.
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for OutputErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ============================================================================
// Unified Error Type
// ============================================================================

/// Unified error type for every hard failure in xcbridge.
///
/// The `Display` form of each variant is the short descriptive string handed
/// back to callers of `build_project` and friends.
#[derive(Debug, Error)]
pub enum XcbError {
    /// Invalid arguments from caller.
    #[error("invalid arguments: {message}")]
    InvalidArguments { message: String },

    /// Path resolved outside the permitted root.
    #[error("access denied: {} is outside the permitted root {}", path.display(), root.display())]
    SecurityDenied { path: PathBuf, root: PathBuf },

    /// The bridge returned no workspace for the target.
    #[error("no workspace found for {target}")]
    NoWorkspace { target: String },

    /// The bridge returned no result handle for a build request.
    #[error("failed to start build for {target}")]
    BuildStartFailed { target: String },

    /// The build finished but its result could not be read back.
    #[error("build result unavailable: {message}")]
    BuildResultUnavailable { message: String },

    /// The automation bridge could not be reached or rejected the request.
    #[error("automation unavailable: {message}")]
    AutomationUnavailable { message: String },

    /// An external operation exceeded its deadline.
    #[error("{what} timed out after {timeout:?}")]
    ProcessTimeout { what: String, timeout: Duration },

    /// I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error (bug or unexpected state).
    #[error("internal error: {message}")]
    Internal { message: String },
}

/// Result alias used across the crate.
pub type XcbResult<T> = Result<T, XcbError>;

// ============================================================================
// Error Code Mapping
// ============================================================================

impl From<&XcbError> for OutputErrorCode {
    fn from(err: &XcbError) -> Self {
        match err {
            XcbError::InvalidArguments { .. } => OutputErrorCode::InvalidArguments,
            XcbError::SecurityDenied { .. } => OutputErrorCode::SecurityDenied,
            XcbError::NoWorkspace { .. } => OutputErrorCode::BuildError,
            XcbError::BuildStartFailed { .. } => OutputErrorCode::BuildError,
            XcbError::BuildResultUnavailable { .. } => OutputErrorCode::BuildError,
            XcbError::AutomationUnavailable { .. } => OutputErrorCode::AutomationUnavailable,
            XcbError::ProcessTimeout { .. } => OutputErrorCode::Timeout,
            XcbError::Io(_) => OutputErrorCode::InternalError,
            XcbError::Internal { .. } => OutputErrorCode::InternalError,
        }
    }
}

impl From<XcbError> for OutputErrorCode {
    fn from(err: XcbError) -> Self {
        OutputErrorCode::from(&err)
    }
}

impl From<serde_json::Error> for XcbError {
    fn from(err: serde_json::Error) -> Self {
        XcbError::BuildResultUnavailable {
            message: format!("malformed bridge response: {}", err),
        }
    }
}

// ============================================================================
// Convenience Constructors
// ============================================================================

impl XcbError {
    /// Create an invalid arguments error.
    pub fn invalid_args(message: impl Into<String>) -> Self {
        XcbError::InvalidArguments {
            message: message.into(),
        }
    }

    /// Create an automation-unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        XcbError::AutomationUnavailable {
            message: message.into(),
        }
    }

    /// Create a timeout error.
    pub fn timeout(what: impl Into<String>, timeout: Duration) -> Self {
        XcbError::ProcessTimeout {
            what: what.into(),
            timeout,
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        XcbError::Internal {
            message: message.into(),
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> OutputErrorCode {
        OutputErrorCode::from(self)
    }

    /// Stable name used in JSON error envelopes.
    pub fn kind_name(&self) -> &'static str {
        match self {
            XcbError::InvalidArguments { .. } => "InvalidArguments",
            XcbError::SecurityDenied { .. } => "SecurityDenied",
            XcbError::NoWorkspace { .. } => "NoWorkspace",
            XcbError::BuildStartFailed { .. } => "BuildStartFailed",
            XcbError::BuildResultUnavailable { .. } => "BuildResultUnavailable",
            XcbError::AutomationUnavailable { .. } => "AutomationUnavailable",
            XcbError::ProcessTimeout { .. } => "ProcessTimeout",
            XcbError::Io(_) => "Io",
            XcbError::Internal { .. } => "InternalError",
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    mod error_code_mapping {
        use super::*;

        #[test]
        fn security_denied_maps_to_security_code() {
            let err = XcbError::SecurityDenied {
                path: PathBuf::from("/etc/passwd"),
                root: PathBuf::from("/Users/dev"),
            };
            assert_eq!(err.error_code(), OutputErrorCode::SecurityDenied);
            assert_eq!(err.error_code().code(), 3);
        }

        #[test]
        fn build_failures_share_build_error_code() {
            let no_ws = XcbError::NoWorkspace {
                target: "App.xcodeproj".to_string(),
            };
            let no_start = XcbError::BuildStartFailed {
                target: "App.xcodeproj".to_string(),
            };
            assert_eq!(no_ws.error_code(), OutputErrorCode::BuildError);
            assert_eq!(no_start.error_code(), OutputErrorCode::BuildError);
        }

        #[test]
        fn timeout_maps_to_timeout_code() {
            let err = XcbError::timeout("build", Duration::from_secs(5));
            assert_eq!(err.error_code().code(), 6);
        }

        #[test]
        fn io_maps_to_internal() {
            let err = XcbError::from(std::io::Error::other("boom"));
            assert_eq!(err.error_code(), OutputErrorCode::InternalError);
        }
    }

    mod error_display {
        use super::*;

        #[test]
        fn security_denied_names_the_root() {
            let err = XcbError::SecurityDenied {
                path: PathBuf::from("/etc/passwd"),
                root: PathBuf::from("/Users/dev"),
            };
            let text = err.to_string();
            assert!(text.contains("/Users/dev"), "{}", text);
            assert!(text.contains("/etc/passwd"), "{}", text);
        }

        #[test]
        fn no_workspace_display() {
            let err = XcbError::NoWorkspace {
                target: "App.xcodeproj".to_string(),
            };
            assert_eq!(err.to_string(), "no workspace found for App.xcodeproj");
        }

        #[test]
        fn build_start_failed_display() {
            let err = XcbError::BuildStartFailed {
                target: "App.xcworkspace".to_string(),
            };
            assert_eq!(err.to_string(), "failed to start build for App.xcworkspace");
        }

        #[test]
        fn timeout_display() {
            let err = XcbError::timeout("build", Duration::from_secs(2));
            assert_eq!(err.to_string(), "build timed out after 2s");
        }
    }

    #[test]
    fn code_values_are_stable() {
        assert_eq!(OutputErrorCode::InvalidArguments.code(), 2);
        assert_eq!(OutputErrorCode::SecurityDenied.code(), 3);
        assert_eq!(OutputErrorCode::BuildError.code(), 4);
        assert_eq!(OutputErrorCode::AutomationUnavailable.code(), 5);
        assert_eq!(OutputErrorCode::Timeout.code(), 6);
        assert_eq!(OutputErrorCode::InternalError.code(), 10);
        assert_eq!(format!("{}", OutputErrorCode::Timeout), "6");
    }
}
