//! JSON output types and serialization for CLI responses.
//!
//! ## Conventions
//!
//! 1. **Status first:** every response has `status` as its first field
//! 2. **Versioned:** every response carries `schema_version`
//! 3. **Absent vs null:** an absent field means "not applicable"
//! 4. **Deterministic:** same input gives identical bytes

use std::io::{self, Write};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{OutputErrorCode, XcbError};
use crate::resolve::{MatchKind, ResolvedPath};
use crate::snippet::SnippetResult;

/// Current schema version for all responses.
pub const SCHEMA_VERSION: &str = "1";

fn ok_status() -> String {
    "ok".to_string()
}

// ============================================================================
// Response Structs
// ============================================================================

/// Response for `xcb resolve`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveResponse {
    pub status: String,
    pub schema_version: String,
    pub original: String,
    pub resolved: PathBuf,
    pub match_kind: MatchKind,
    pub score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl From<ResolvedPath> for ResolveResponse {
    fn from(resolved: ResolvedPath) -> Self {
        ResolveResponse {
            status: ok_status(),
            schema_version: SCHEMA_VERSION.to_string(),
            original: resolved.original,
            resolved: resolved.resolved,
            match_kind: resolved.match_kind,
            score: resolved.score,
            warning: resolved.warning,
        }
    }
}

/// Response for `xcb snippet`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnippetResponse {
    pub status: String,
    pub schema_version: String,
    pub path: PathBuf,
    pub language: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl From<SnippetResult> for SnippetResponse {
    fn from(snippet: SnippetResult) -> Self {
        SnippetResponse {
            status: ok_status(),
            schema_version: SCHEMA_VERSION.to_string(),
            path: snippet.path,
            language: snippet.language,
            text: snippet.text,
            warning: snippet.warning,
        }
    }
}

/// Response for `xcb build` and `xcb stop`: the report or acknowledgement text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub status: String,
    pub schema_version: String,
    /// `build`, `run` or `stop`.
    pub action: String,
    pub target: String,
    pub message: String,
}

impl MessageResponse {
    pub fn new(
        action: impl Into<String>,
        target: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        MessageResponse {
            status: ok_status(),
            schema_version: SCHEMA_VERSION.to_string(),
            action: action.into(),
            target: target.into(),
            message: message.into(),
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Error payload of an [`ErrorResponse`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Numeric code, also used as the exit status.
    pub code: u8,
    /// Stable variant name.
    pub kind: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorInfo {
    /// Create from an [`XcbError`].
    pub fn from_error(err: &XcbError) -> Self {
        let details = match err {
            XcbError::SecurityDenied { path, root } => Some(serde_json::json!({
                "path": path,
                "root": root,
            })),
            XcbError::ProcessTimeout { what, timeout } => Some(serde_json::json!({
                "what": what,
                "timeout_secs": timeout.as_secs_f64(),
            })),
            XcbError::NoWorkspace { target } | XcbError::BuildStartFailed { target } => {
                Some(serde_json::json!({ "target": target }))
            }
            _ => None,
        };

        ErrorInfo {
            code: OutputErrorCode::from(err).code(),
            kind: err.kind_name().to_string(),
            message: err.to_string(),
            details,
        }
    }
}

/// Error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Status: "error".
    pub status: String,
    pub schema_version: String,
    pub error: ErrorInfo,
}

impl ErrorResponse {
    /// Create an error response from an [`XcbError`].
    pub fn from_error(err: &XcbError) -> Self {
        ErrorResponse {
            status: "error".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            error: ErrorInfo::from_error(err),
        }
    }
}

// ============================================================================
// Response Emission
// ============================================================================

/// Emit a response as pretty-printed JSON to a writer.
pub fn emit_response<T: Serialize>(response: &T, writer: &mut impl Write) -> io::Result<()> {
    let json = serde_json::to_string_pretty(response)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{}", json)
}

// ============================================================================
// Tests
// ============================================================================
