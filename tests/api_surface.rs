//! Compile-only test to verify public API surface.
//!
//! If this file fails to compile, the public API has regressed.
//!
//! Run with: cargo test -- api_surface

// Allow unused imports - this test is about compile-time verification, not runtime usage
#![allow(unused_imports)]

// Resolution and fuzzy matching
use xcbridge::config::{
    CliOverrides, Config, ConfigSource, ConfigValue, ResolveContext, DEFAULT_BUILD_TIMEOUT,
    DEFAULT_POLL_INTERVAL,
};
use xcbridge::fuzzy::{best_match, levenshtein, similarity, FUZZY_THRESHOLD};
use xcbridge::resolve::{MatchKind, PathResolver, ResolvedPath};

// Security, snippets, issues, reports
use xcbridge::issues::{collect, normalize, DiagnosticIssue, IssueKind, IssueLocation};
use xcbridge::report::{Report, ReportAssembler, BUILD_SUCCEEDED};
use xcbridge::security::SecurityGate;
use xcbridge::snippet::{
    language_tag, slice_lines, SnippetExtractor, SnippetResult, INVALID_LINE_RANGE,
};

// Build orchestration and the bridge seam
use xcbridge::bridge::{AutomationBridge, BridgeSession, BuildHandle, IssueCollections, RawIssue};
use xcbridge::orchestrator::{
    BuildMode, BuildOrchestrator, BuildOutcome, BuildSession, BuildStatus, OrchestratorConfig,
};
use xcbridge::script::{ScriptOutput, ScriptRunner};
use xcbridge::xcode::{XcodeBridge, XcodeBuildResult, XcodeWorkspace, OSASCRIPT};

// Facade, errors, output
use xcbridge::cli::{run_build, run_resolve, run_snippet, run_stop};
use xcbridge::engine::{is_target_bundle, Engine};
use xcbridge::error::{OutputErrorCode, XcbError, XcbResult};
use xcbridge::output::{
    emit_response, ErrorInfo, ErrorResponse, MessageResponse, ResolveResponse, SnippetResponse,
    SCHEMA_VERSION,
};

#[test]
fn api_surface_compiles() {
    // If this test compiles, the public API surface is intact.
}
