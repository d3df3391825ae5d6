//! [`AutomationBridge`] implementation that scripts Xcode through `osascript`.
//!
//! Each bridge call runs one short JavaScript for Automation program. Programs
//! are stateless: every one re-opens the target (Xcode hands back the already
//! open document) and returns a single JSON value on stdout. Build results are
//! read back through the workspace's `lastSchemeActionResult`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, trace};

use crate::bridge::{AutomationBridge, BridgeSession, BuildHandle, IssueCollections};
use crate::error::{XcbError, XcbResult};
use crate::script::ScriptRunner;

/// Interpreter used to run automation scripts.
pub const OSASCRIPT: &str = "osascript";

/// Shared prelude: open the target and wait for the document to load.
const PRELUDE: &str = r#"
function workspace(target) {
  const app = Application('Xcode');
  const ws = app.open(target);
  if (!ws) { return null; }
  for (let i = 0; i < 120; i++) {
    if (ws.loaded()) { return ws; }
    delay(0.5);
  }
  return ws.loaded() ? ws : null;
}
"#;

const OPEN_BODY: &str = r#"
  return JSON.stringify({ ok: workspace(TARGET) !== null });
"#;

const STOP_BODY: &str = r#"
  const ws = workspace(TARGET);
  if (ws) { ws.stop(); }
  return JSON.stringify({ ok: ws !== null });
"#;

const BUILD_BODY: &str = r#"
  const ws = workspace(TARGET);
  if (!ws) { return JSON.stringify({ ok: false }); }
  const result = ws.build();
  return JSON.stringify({ ok: result !== null && result !== undefined });
"#;

const RUN_BODY: &str = r#"
  const ws = workspace(TARGET);
  if (ws) { ws.run(); }
  return JSON.stringify({ ok: ws !== null });
"#;

const COMPLETED_BODY: &str = r#"
  const ws = workspace(TARGET);
  const result = ws ? ws.lastSchemeActionResult() : null;
  return JSON.stringify({ ok: result ? result.completed() : false });
"#;

const ISSUES_BODY: &str = r#"
  const ws = workspace(TARGET);
  const result = ws ? ws.lastSchemeActionResult() : null;
  if (!result) { return JSON.stringify({}); }
  const field = (issue, name) => {
    try { const v = issue[name](); return v === undefined ? null : v; } catch (e) { return null; }
  };
  const collect = (name) => {
    try {
      return result[name]().map((issue) => ({
        message: field(issue, 'message'),
        filePath: field(issue, 'filePath'),
        startingLineNumber: field(issue, 'startingLineNumber'),
        endingLineNumber: field(issue, 'endingLineNumber'),
        startingColumnNumber: field(issue, 'startingColumnNumber'),
      }));
    } catch (e) { return null; }
  };
  return JSON.stringify({
    buildErrors: collect('buildErrors'),
    buildWarnings: collect('buildWarnings'),
    analyzerIssues: collect('analyzerIssues'),
    testFailures: collect('testFailures'),
  });
"#;

/// Wrap `body` into a complete program bound to `target`.
///
/// The target is embedded as a JSON string literal, which is also a valid
/// JavaScript string literal.
pub fn script_for(body: &str, target: &Path) -> XcbResult<String> {
    let literal = serde_json::to_string(&target.to_string_lossy())
        .map_err(|e| XcbError::internal(format!("cannot encode target: {}", e)))?;
    Ok(format!(
        "const TARGET = {};\n{}\nfunction run() {{{}}}\n",
        literal, PRELUDE, body
    ))
}

#[derive(Debug, Deserialize)]
struct Ack {
    ok: bool,
}

/// Parse the JSON value a script printed on stdout.
fn parse_reply<T: DeserializeOwned>(stdout: &str) -> XcbResult<T> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Err(XcbError::BuildResultUnavailable {
            message: "empty reply from automation script".to_string(),
        });
    }
    Ok(serde_json::from_str(trimmed)?)
}

// ============================================================================
// Bridge
// ============================================================================

/// Scripts Xcode over `osascript -l JavaScript`.
#[derive(Debug, Clone)]
pub struct XcodeBridge {
    runner: ScriptRunner,
}

impl XcodeBridge {
    /// Locate `osascript` on `PATH`.
    pub fn discover(script_timeout: Duration) -> XcbResult<Self> {
        let program = which::which(OSASCRIPT).map_err(|e| {
            XcbError::unavailable(format!("{} not found on PATH: {}", OSASCRIPT, e))
        })?;
        debug!(program = %program.display(), "found automation interpreter");
        Ok(XcodeBridge::with_runner(
            ScriptRunner::new(program)
                .with_args(["-l", "JavaScript"])
                .with_timeout(script_timeout),
        ))
    }

    /// Use a preconfigured runner.
    pub fn with_runner(runner: ScriptRunner) -> Self {
        XcodeBridge { runner }
    }

    /// The runner scripts go through.
    pub fn runner(&self) -> &ScriptRunner {
        &self.runner
    }
}

/// Run `body` against `target` and parse the reply.
fn call<T: DeserializeOwned>(runner: &ScriptRunner, body: &str, target: &Path) -> XcbResult<T> {
    let script = script_for(body, target)?;
    trace!(target = %target.display(), "running automation script");
    let output = runner.run(&script)?;
    if !output.success {
        return Err(XcbError::unavailable(format!(
            "automation script failed (exit {:?}): {}",
            output.exit_code,
            output.stderr.trim()
        )));
    }
    parse_reply(&output.stdout)
}

impl AutomationBridge for XcodeBridge {
    type Session = XcodeWorkspace;

    fn open(&self, target: &Path) -> XcbResult<Option<XcodeWorkspace>> {
        let ack: Ack = call(&self.runner, OPEN_BODY, target)?;
        Ok(ack.ok.then(|| XcodeWorkspace {
            runner: self.runner.clone(),
            target: target.to_path_buf(),
        }))
    }
}

/// An open Xcode workspace document.
#[derive(Debug, Clone)]
pub struct XcodeWorkspace {
    runner: ScriptRunner,
    target: PathBuf,
}

impl XcodeWorkspace {
    /// The project or workspace path this document was opened from.
    pub fn target(&self) -> &Path {
        &self.target
    }
}

impl BridgeSession for XcodeWorkspace {
    type Handle = XcodeBuildResult;

    fn stop(&self) -> XcbResult<()> {
        let _: Ack = call(&self.runner, STOP_BODY, &self.target)?;
        Ok(())
    }

    fn build(&self) -> XcbResult<Option<XcodeBuildResult>> {
        let ack: Ack = call(&self.runner, BUILD_BODY, &self.target)?;
        Ok(ack.ok.then(|| XcodeBuildResult {
            runner: self.runner.clone(),
            target: self.target.clone(),
        }))
    }

    fn run(&self) -> XcbResult<()> {
        let script = script_for(RUN_BODY, &self.target)?;
        self.runner.spawn_detached(&script)
    }
}

/// The scheme action result of the most recent build.
#[derive(Debug, Clone)]
pub struct XcodeBuildResult {
    runner: ScriptRunner,
    target: PathBuf,
}

impl BuildHandle for XcodeBuildResult {
    fn completed(&self) -> XcbResult<bool> {
        let ack: Ack = call(&self.runner, COMPLETED_BODY, &self.target)?;
        Ok(ack.ok)
    }

    fn issues(&self) -> XcbResult<IssueCollections> {
        call(&self.runner, ISSUES_BODY, &self.target)
    }
}

// ============================================================================
// Tests
// ============================================================================
