//! Build/run orchestration against an [`AutomationBridge`].
//!
//! One [`BuildSession`] is created per call and walks the state machine:
//!
//! ```text
//! idle -> opening -> building  -> polling -> completed
//!                 \-> launching -----------> completed
//! (any non-terminal state) -> failed
//! ```
//!
//! Run mode is fire-and-forget: after a short grace period the run request is
//! handed to the bridge, which returns once the launch is dispatched, and the
//! call returns an acknowledgement without waiting for the app. Build mode polls the result handle at a fixed interval,
//! bounded by `build_timeout` when one is configured.
//!
//! Nothing here retries. Each failure is returned as a short [`XcbError`].

use std::fmt;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span, warn};

use crate::bridge::{AutomationBridge, BridgeSession, BuildHandle};
use crate::config::{DEFAULT_BUILD_TIMEOUT, DEFAULT_POLL_INTERVAL, DEFAULT_RUN_GRACE};
use crate::error::{XcbError, XcbResult};
use crate::issues::{self, DiagnosticIssue};
use crate::util::generate_session_id;

// ============================================================================
// Session State
// ============================================================================

/// Whether a call builds or launches the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildMode {
    Build,
    Run,
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildMode::Build => write!(f, "build"),
            BuildMode::Run => write!(f, "run"),
        }
    }
}

/// Lifecycle state of one build session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildStatus {
    Idle,
    Opening,
    Building,
    Launching,
    Polling,
    Completed,
    Failed,
}

impl BuildStatus {
    /// Whether no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, BuildStatus::Completed | BuildStatus::Failed)
    }

    /// Whether `self -> next` is an edge of the state machine.
    pub fn can_transition_to(&self, next: BuildStatus) -> bool {
        use BuildStatus::*;
        match (self, next) {
            (Idle, Opening) => true,
            (Opening, Building) | (Opening, Launching) => true,
            (Building, Polling) => true,
            (Launching, Completed) | (Polling, Completed) => true,
            (from, Failed) => !from.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BuildStatus::Idle => "idle",
            BuildStatus::Opening => "opening",
            BuildStatus::Building => "building",
            BuildStatus::Launching => "launching",
            BuildStatus::Polling => "polling",
            BuildStatus::Completed => "completed",
            BuildStatus::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Per-call session record. Never shared between calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSession {
    /// Correlates log lines of one call.
    pub id: String,
    /// The project or workspace being driven.
    pub target: String,
    pub mode: BuildMode,
    pub status: BuildStatus,
}

impl BuildSession {
    /// A fresh idle session.
    pub fn new(target: impl Into<String>, mode: BuildMode) -> Self {
        BuildSession {
            id: generate_session_id(),
            target: target.into(),
            mode,
            status: BuildStatus::Idle,
        }
    }

    /// Move to `next`, rejecting edges outside the state machine.
    pub fn transition(&mut self, next: BuildStatus) -> XcbResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(XcbError::internal(format!(
                "invalid build transition {} -> {}",
                self.status, next
            )));
        }
        debug!(session = %self.id, from = %self.status, to = %next, "transition");
        self.status = next;
        Ok(())
    }

    /// Mark the session failed and hand `err` back for propagation.
    fn fail(&mut self, err: XcbError) -> XcbError {
        if self.status.can_transition_to(BuildStatus::Failed) {
            self.status = BuildStatus::Failed;
        }
        warn!(session = %self.id, target = %self.target, error = %err, "build session failed");
        err
    }
}

// ============================================================================
// Orchestrator
// ============================================================================

/// Timing knobs for the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Completion sampling interval.
    pub poll_interval: Duration,
    /// Upper bound on the completion wait; `None` waits forever.
    pub build_timeout: Option<Duration>,
    /// Pause before dispatching a run.
    pub run_grace: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        OrchestratorConfig {
            poll_interval: DEFAULT_POLL_INTERVAL,
            build_timeout: Some(DEFAULT_BUILD_TIMEOUT),
            run_grace: DEFAULT_RUN_GRACE,
        }
    }
}

/// What a finished call produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    /// Build mode: the normalized diagnostics of the finished build.
    Built {
        session: BuildSession,
        issues: Vec<DiagnosticIssue>,
    },
    /// Run mode: the run was dispatched; nothing is known about its health.
    Launched {
        session: BuildSession,
        acknowledgement: String,
    },
}

impl BuildOutcome {
    /// The session record of this call.
    pub fn session(&self) -> &BuildSession {
        match self {
            BuildOutcome::Built { session, .. } | BuildOutcome::Launched { session, .. } => {
                session
            }
        }
    }
}

/// Drives one bridge through build and run requests.
#[derive(Debug)]
pub struct BuildOrchestrator<B> {
    bridge: B,
    config: OrchestratorConfig,
}

impl<B: AutomationBridge> BuildOrchestrator<B> {
    /// Create an orchestrator over `bridge`.
    pub fn new(bridge: B, config: OrchestratorConfig) -> Self {
        BuildOrchestrator { bridge, config }
    }

    /// The bridge being driven.
    pub fn bridge(&self) -> &B {
        &self.bridge
    }

    /// The timing configuration.
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Build or run `target`.
    pub fn build(&self, target: &Path, mode: BuildMode) -> XcbResult<BuildOutcome> {
        let mut session = BuildSession::new(target.display().to_string(), mode);
        let span = info_span!("build_session", id = %session.id, %mode);
        let _enter = span.enter();
        info!(target = %session.target, "starting");

        let workspace = self.open(&mut session, target)?;

        // A previous build or run may still be active on this target.
        if let Err(e) = workspace.stop() {
            return Err(session.fail(e));
        }

        match mode {
            BuildMode::Run => self.launch(session, workspace),
            BuildMode::Build => self.build_and_collect(session, workspace),
        }
    }

    /// Stop whatever `target` is doing.
    pub fn stop(&self, target: &Path) -> XcbResult<()> {
        let workspace = self
            .bridge
            .open(target)?
            .ok_or_else(|| XcbError::NoWorkspace {
                target: target.display().to_string(),
            })?;
        workspace.stop()?;
        info!(target = %target.display(), "stopped");
        Ok(())
    }

    fn open(&self, session: &mut BuildSession, target: &Path) -> XcbResult<B::Session> {
        session.transition(BuildStatus::Opening)?;
        match self.bridge.open(target) {
            Ok(Some(workspace)) => Ok(workspace),
            Ok(None) => Err(session.fail(XcbError::NoWorkspace {
                target: session.target.clone(),
            })),
            Err(e) => Err(session.fail(e)),
        }
    }

    fn launch(&self, mut session: BuildSession, workspace: B::Session) -> XcbResult<BuildOutcome> {
        session.transition(BuildStatus::Launching)?;

        if !self.config.run_grace.is_zero() {
            thread::sleep(self.config.run_grace);
        }

        // Dispatch happens on the calling thread: a short-lived caller such as
        // the CLI exits right after this returns.
        if let Err(e) = workspace.run() {
            return Err(session.fail(e));
        }

        session.transition(BuildStatus::Completed)?;
        info!(target = %session.target, "run dispatched");
        let acknowledgement = format!("Run started for '{}'", session.target);
        Ok(BuildOutcome::Launched {
            session,
            acknowledgement,
        })
    }

    fn build_and_collect(
        &self,
        mut session: BuildSession,
        workspace: B::Session,
    ) -> XcbResult<BuildOutcome> {
        session.transition(BuildStatus::Building)?;

        let handle = match workspace.build() {
            Ok(Some(handle)) => handle,
            Ok(None) => {
                return Err(session.fail(XcbError::BuildStartFailed {
                    target: session.target.clone(),
                }))
            }
            Err(e) => return Err(session.fail(e)),
        };

        session.transition(BuildStatus::Polling)?;
        if let Err(e) = self.wait_for_completion(&handle) {
            return Err(session.fail(e));
        }

        let collections = match handle.issues() {
            Ok(c) => c,
            Err(e) => return Err(session.fail(e)),
        };
        let issues = issues::collect(&collections);

        session.transition(BuildStatus::Completed)?;
        info!(target = %session.target, issues = issues.len(), "build finished");
        Ok(BuildOutcome::Built { session, issues })
    }

    /// Sample `handle.completed()` until it reports done or the timeout expires.
    fn wait_for_completion(&self, handle: &<B::Session as BridgeSession>::Handle) -> XcbResult<()> {
        let start = Instant::now();
        let deadline = self.config.build_timeout.map(|t| start + t);
        let mut samples = 0u64;

        loop {
            if handle.completed()? {
                debug!(samples, elapsed = ?start.elapsed(), "build completed");
                return Ok(());
            }
            samples += 1;

            let mut pause = self.config.poll_interval;
            if let Some(deadline) = deadline {
                let now = Instant::now();
                if now >= deadline {
                    let timeout = self.config.build_timeout.unwrap_or_default();
                    return Err(XcbError::timeout("build", timeout));
                }
                pause = pause.min(deadline - now);
            }
            thread::sleep(pause);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{IssueCollections, RawIssue};
    use crate::issues::IssueKind;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Script {
        no_workspace: bool,
        no_build_handle: bool,
        run_fails: bool,
        /// Number of `completed()` calls answering false before true.
        polls_until_done: Option<usize>,
        collections: IssueCollections,
    }

    #[derive(Clone, Default)]
    struct FakeBridge {
        script: Script,
        calls: Arc<Mutex<Vec<String>>>,
        run_signal: Arc<Mutex<Option<mpsc::Sender<()>>>>,
    }

    impl FakeBridge {
        fn log(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    struct FakeSession {
        bridge: FakeBridge,
    }

    struct FakeHandle {
        bridge: FakeBridge,
        polls: AtomicUsize,
    }

    impl AutomationBridge for FakeBridge {
        type Session = FakeSession;

        fn open(&self, target: &Path) -> XcbResult<Option<FakeSession>> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("open {}", target.display()));
            if self.script.no_workspace {
                return Ok(None);
            }
            Ok(Some(FakeSession {
                bridge: self.clone(),
            }))
        }
    }

    impl BridgeSession for FakeSession {
        type Handle = FakeHandle;

        fn stop(&self) -> XcbResult<()> {
            self.bridge.calls.lock().unwrap().push("stop".to_string());
            Ok(())
        }

        fn build(&self) -> XcbResult<Option<FakeHandle>> {
            self.bridge.calls.lock().unwrap().push("build".to_string());
            if self.bridge.script.no_build_handle {
                return Ok(None);
            }
            Ok(Some(FakeHandle {
                bridge: self.bridge.clone(),
                polls: AtomicUsize::new(0),
            }))
        }

        fn run(&self) -> XcbResult<()> {
            self.bridge.calls.lock().unwrap().push("run".to_string());
            if self.bridge.script.run_fails {
                return Err(XcbError::unavailable("osascript exited"));
            }
            if let Some(tx) = self.bridge.run_signal.lock().unwrap().take() {
                let _ = tx.send(());
            }
            Ok(())
        }
    }

    impl BuildHandle for FakeHandle {
        fn completed(&self) -> XcbResult<bool> {
            let n = self.polls.fetch_add(1, Ordering::SeqCst);
            Ok(match self.bridge.script.polls_until_done {
                Some(limit) => n >= limit,
                None => false,
            })
        }

        fn issues(&self) -> XcbResult<IssueCollections> {
            self.bridge.calls.lock().unwrap().push("issues".to_string());
            Ok(self.bridge.script.collections.clone())
        }
    }

    fn fast_config() -> OrchestratorConfig {
        OrchestratorConfig {
            poll_interval: Duration::from_millis(5),
            build_timeout: Some(Duration::from_secs(5)),
            run_grace: Duration::ZERO,
        }
    }

    fn target() -> PathBuf {
        PathBuf::from("/work/App/App.xcodeproj")
    }

    mod state_machine {
        use super::*;

        #[test]
        fn legal_edges() {
            use BuildStatus::*;
            assert!(Idle.can_transition_to(Opening));
            assert!(Opening.can_transition_to(Building));
            assert!(Opening.can_transition_to(Launching));
            assert!(Building.can_transition_to(Polling));
            assert!(Polling.can_transition_to(Completed));
            assert!(Launching.can_transition_to(Completed));
            assert!(Polling.can_transition_to(Failed));
        }

        #[test]
        fn illegal_edges() {
            use BuildStatus::*;
            assert!(!Idle.can_transition_to(Polling));
            assert!(!Building.can_transition_to(Completed));
            assert!(!Completed.can_transition_to(Failed));
            assert!(!Failed.can_transition_to(Opening));
        }

        #[test]
        fn transition_rejects_illegal_edge() {
            let mut session = BuildSession::new("t", BuildMode::Build);
            assert!(session.transition(BuildStatus::Completed).is_err());
            assert_eq!(session.status, BuildStatus::Idle);
        }
    }

    mod build_mode {
        use super::*;

        #[test]
        fn build_stops_first_then_collects_issues() {
            let bridge = FakeBridge {
                script: Script {
                    polls_until_done: Some(3),
                    collections: IssueCollections {
                        errors: Some(vec![RawIssue::located("bad", "/p/A.swift", 1, 1, 1)]),
                        warnings: Some(vec![RawIssue::message("meh")]),
                        ..Default::default()
                    },
                    ..Default::default()
                },
                ..Default::default()
            };
            let orchestrator = BuildOrchestrator::new(bridge.clone(), fast_config());

            let outcome = orchestrator.build(&target(), BuildMode::Build).unwrap();
            let BuildOutcome::Built { session, issues } = outcome else {
                panic!("expected a build outcome");
            };
            assert_eq!(session.status, BuildStatus::Completed);
            assert_eq!(issues.len(), 2);
            assert_eq!(issues[0].kind, IssueKind::Error);
            assert_eq!(issues[1].kind, IssueKind::Warning);
            assert_eq!(
                bridge.log(),
                vec![
                    format!("open {}", target().display()),
                    "stop".to_string(),
                    "build".to_string(),
                    "issues".to_string(),
                ]
            );
        }

        #[test]
        fn missing_workspace_fails() {
            let bridge = FakeBridge {
                script: Script {
                    no_workspace: true,
                    ..Default::default()
                },
                ..Default::default()
            };
            let err = BuildOrchestrator::new(bridge, fast_config())
                .build(&target(), BuildMode::Build)
                .unwrap_err();
            assert!(matches!(err, XcbError::NoWorkspace { .. }));
            assert!(err.to_string().contains("no workspace found"));
        }

        #[test]
        fn missing_build_handle_fails() {
            let bridge = FakeBridge {
                script: Script {
                    no_build_handle: true,
                    ..Default::default()
                },
                ..Default::default()
            };
            let err = BuildOrchestrator::new(bridge, fast_config())
                .build(&target(), BuildMode::Build)
                .unwrap_err();
            assert!(matches!(err, XcbError::BuildStartFailed { .. }));
            assert!(err.to_string().contains("failed to start build"));
        }

        #[test]
        fn never_completing_build_times_out() {
            let bridge = FakeBridge {
                script: Script {
                    polls_until_done: None,
                    ..Default::default()
                },
                ..Default::default()
            };
            let config = OrchestratorConfig {
                build_timeout: Some(Duration::from_millis(100)),
                ..fast_config()
            };
            let start = Instant::now();
            let err = BuildOrchestrator::new(bridge.clone(), config)
                .build(&target(), BuildMode::Build)
                .unwrap_err();
            assert!(matches!(err, XcbError::ProcessTimeout { .. }), "{:?}", err);
            assert!(start.elapsed() < Duration::from_secs(2));
            assert!(!bridge.log().contains(&"issues".to_string()));
        }
    }

    mod run_mode {
        use super::*;

        #[test]
        fn run_is_dispatched_before_acknowledgement() {
            let (tx, rx) = mpsc::channel();
            let bridge = FakeBridge::default();
            *bridge.run_signal.lock().unwrap() = Some(tx);

            let outcome = BuildOrchestrator::new(bridge.clone(), fast_config())
                .build(&target(), BuildMode::Run)
                .unwrap();
            let BuildOutcome::Launched {
                session,
                acknowledgement,
            } = outcome
            else {
                panic!("expected a launch outcome");
            };
            assert_eq!(session.status, BuildStatus::Completed);
            assert!(acknowledgement.starts_with("Run started"));

            // Already sent: nothing is left running in the background.
            rx.try_recv().expect("run should be dispatched before returning");
            let log = bridge.log();
            assert_eq!(&log[1..], ["stop", "run"]);
        }

        #[test]
        fn failed_dispatch_is_an_error() {
            let bridge = FakeBridge {
                script: Script {
                    run_fails: true,
                    ..Default::default()
                },
                ..Default::default()
            };
            let err = BuildOrchestrator::new(bridge, fast_config())
                .build(&target(), BuildMode::Run)
                .unwrap_err();
            assert!(matches!(err, XcbError::AutomationUnavailable { .. }));
        }
    }

    #[test]
    fn stop_opens_and_stops() {
        let bridge = FakeBridge::default();
        BuildOrchestrator::new(bridge.clone(), fast_config())
            .stop(&target())
            .unwrap();
        assert_eq!(bridge.log().last().unwrap(), "stop");
    }
}
