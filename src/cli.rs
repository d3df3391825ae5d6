//! CLI front door.
//!
//! Each `run_*` function performs one [`Engine`] operation and returns the
//! JSON response text. The caller (typically `main.rs`) builds the engine and
//! prints whatever comes back; errors are left for the caller to render as an
//! error envelope.

use xcbridge_core::bridge::AutomationBridge;
use xcbridge_core::engine::Engine;
use xcbridge_core::error::{XcbError, XcbResult};
use xcbridge_core::output::{MessageResponse, ResolveResponse, SnippetResponse};

/// Serialize a response the way every command prints it.
fn to_json<T: serde::Serialize>(response: &T) -> XcbResult<String> {
    serde_json::to_string_pretty(response)
        .map_err(|e| XcbError::internal(format!("cannot serialize response: {}", e)))
}

/// `xcb resolve <path>`
pub fn run_resolve<B: AutomationBridge>(engine: &Engine<B>, path: &str) -> XcbResult<String> {
    to_json(&ResolveResponse::from(engine.resolve_path(path)))
}

/// `xcb snippet <path> [--start N] [--end N] [--entire]`
pub fn run_snippet<B: AutomationBridge>(
    engine: &Engine<B>,
    path: &str,
    start_line: Option<usize>,
    end_line: Option<usize>,
    entire_file: bool,
) -> XcbResult<String> {
    let snippet = engine.extract_snippet(path, start_line, end_line, entire_file)?;
    to_json(&SnippetResponse::from(snippet))
}

/// `xcb build <target> [--run]`
pub fn run_build<B: AutomationBridge>(
    engine: &Engine<B>,
    target: &str,
    run: bool,
) -> XcbResult<String> {
    let message = engine.build_project(target, run)?;
    let action = if run { "run" } else { "build" };
    to_json(&MessageResponse::new(action, target, message))
}

/// `xcb stop <target>`
pub fn run_stop<B: AutomationBridge>(engine: &Engine<B>, target: &str) -> XcbResult<String> {
    let message = engine.stop_project(target)?;
    to_json(&MessageResponse::new("stop", target, message))
}
