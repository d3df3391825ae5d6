//! Assembly of the final build report.
//!
//! The report is plain text: one entry per issue, in input order, followed by
//! an appendix listing each referenced file once, in sorted order.
//!
//! Paths named by the build are read as given. When the resolver has to
//! substitute a different file, the substitute must pass the [`SecurityGate`]
//! before any of its content is embedded.

use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;

use tracing::{debug, warn};

use crate::issues::{DiagnosticIssue, IssueLocation};
use crate::resolve::MatchKind;
use crate::security::SecurityGate;
use crate::snippet::{SnippetExtractor, SnippetResult};

/// Returned instead of an empty report.
pub const BUILD_SUCCEEDED: &str = "Build succeeded with no errors or warnings.";

/// Accumulated report state for one `assemble` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    /// Formatted issue entries in input order.
    pub entries: Vec<String>,
    /// Canonical paths of every file shown, deduplicated and sorted.
    pub files: BTreeSet<PathBuf>,
}

impl Report {
    /// Render entries then the per-file appendix.
    fn render(&self, extractor: &SnippetExtractor<'_>) -> String {
        let mut sections = self.entries.clone();
        for file in &self.files {
            let listing = extractor.extract(&file.to_string_lossy(), None, None, true);
            sections.push(format!("File: {}\n{}", file.display(), fence(&listing)));
        }
        sections.join("\n\n")
    }
}

/// Turns normalized issues into the report text.
#[derive(Debug, Clone, Copy)]
pub struct ReportAssembler<'a> {
    extractor: SnippetExtractor<'a>,
    gate: &'a SecurityGate,
}

impl<'a> ReportAssembler<'a> {
    pub fn new(extractor: SnippetExtractor<'a>, gate: &'a SecurityGate) -> Self {
        ReportAssembler { extractor, gate }
    }

    /// Collect entries and referenced files without rendering the appendix.
    pub fn collect(&self, issues: &[DiagnosticIssue]) -> Report {
        let mut report = Report::default();
        for issue in issues {
            let Some(location) = &issue.location else {
                report
                    .entries
                    .push(format!("[{}] {}", issue.kind, issue.message));
                continue;
            };

            let header = format!(
                "{}:{}:{} [{}] {}",
                location.file_path,
                location.start_line,
                location.start_column,
                issue.kind,
                issue.message
            );
            match self.snippet_for(location) {
                Ok(snippet) => {
                    report.entries.push(format!("{}\n{}", header, fence(&snippet)));
                    if snippet.path.is_file() {
                        let canonical = fs::canonicalize(&snippet.path).unwrap_or(snippet.path);
                        report.files.insert(canonical);
                    }
                }
                Err(denied) => report.entries.push(format!("{}\n{}", header, denied)),
            }
        }
        debug!(
            entries = report.entries.len(),
            files = report.files.len(),
            "report collected"
        );
        report
    }

    /// The full report, or [`BUILD_SUCCEEDED`] for an empty issue list.
    pub fn assemble(&self, issues: &[DiagnosticIssue]) -> String {
        if issues.is_empty() {
            return BUILD_SUCCEEDED.to_string();
        }
        self.collect(issues).render(&self.extractor)
    }

    /// Extract the issue's lines, gating any file the resolver substituted.
    fn snippet_for(&self, location: &IssueLocation) -> Result<SnippetResult, String> {
        let resolved = self.extractor.resolver().resolve(&location.file_path);
        if resolved.is_found() && resolved.match_kind != MatchKind::Exact {
            if let Err(e) = self.gate.check(&resolved.resolved) {
                warn!(
                    path = %location.file_path,
                    substitute = %resolved.resolved.display(),
                    "substituted file denied"
                );
                return Err(e.to_string());
            }
        }
        Ok(self.extractor.extract_resolved(
            resolved,
            Some(location.start_line),
            Some(location.end_line),
            false,
        ))
    }
}

fn fence(snippet: &SnippetResult) -> String {
    let mut out = String::new();
    if let Some(warning) = &snippet.warning {
        out.push_str(warning);
        out.push('\n');
    }
    out.push_str("```");
    out.push_str(&snippet.language);
    out.push('\n');
    out.push_str(snippet.text.trim_end_matches('\n'));
    out.push_str("\n```");
    out
}

// ============================================================================
// Tests
// ============================================================================
