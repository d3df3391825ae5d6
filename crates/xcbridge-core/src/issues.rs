//! Normalization of raw bridge diagnostics into one record shape.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::bridge::{IssueCollections, RawIssue};

/// Which collection an issue came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    Error,
    Warning,
    Analyzer,
    TestFailure,
}

impl IssueKind {
    /// Upper-case label used in report lines.
    pub fn label(&self) -> &'static str {
        match self {
            IssueKind::Error => "ERROR",
            IssueKind::Warning => "WARNING",
            IssueKind::Analyzer => "ANALYZER",
            IssueKind::TestFailure => "TEST FAILURE",
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Where a located issue points. All four fields are always present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueLocation {
    pub file_path: String,
    pub start_line: usize,
    pub end_line: usize,
    pub start_column: usize,
}

/// A normalized diagnostic. Bare issues have no location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticIssue {
    pub kind: IssueKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<IssueLocation>,
}

impl DiagnosticIssue {
    /// A located issue.
    pub fn located(kind: IssueKind, message: impl Into<String>, location: IssueLocation) -> Self {
        DiagnosticIssue {
            kind,
            message: message.into(),
            location: Some(location),
        }
    }

    /// A bare issue.
    pub fn bare(kind: IssueKind, message: impl Into<String>) -> Self {
        DiagnosticIssue {
            kind,
            message: message.into(),
            location: None,
        }
    }
}

/// Normalize one raw issue.
///
/// Returns `None` when there is no usable message. A location is attached only
/// when path, start line, end line and start column are all present.
pub fn normalize(raw: &RawIssue, kind: IssueKind) -> Option<DiagnosticIssue> {
    let message = raw.message.as_deref().filter(|m| !m.trim().is_empty())?;

    let location = match (&raw.file_path, raw.start_line, raw.end_line, raw.start_column) {
        (Some(file_path), Some(start_line), Some(end_line), Some(start_column))
            if !file_path.is_empty() =>
        {
            Some(IssueLocation {
                file_path: file_path.clone(),
                start_line,
                end_line,
                start_column,
            })
        }
        _ => None,
    };

    Some(DiagnosticIssue {
        kind,
        message: message.to_string(),
        location,
    })
}

/// Normalize every collection, in error, warning, analyzer, test-failure order.
pub fn collect(collections: &IssueCollections) -> Vec<DiagnosticIssue> {
    let sources = [
        (&collections.errors, IssueKind::Error),
        (&collections.warnings, IssueKind::Warning),
        (&collections.analyzer, IssueKind::Analyzer),
        (&collections.test_failures, IssueKind::TestFailure),
    ];

    sources
        .into_iter()
        .filter_map(|(raw, kind)| raw.as_ref().map(|issues| (issues, kind)))
        .flat_map(|(issues, kind)| issues.iter().filter_map(move |raw| normalize(raw, kind)))
        .collect()
}
