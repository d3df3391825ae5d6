//! Caller-facing facade over resolution, security, snippets and builds.
//!
//! An [`Engine`] owns the explicit resolution context, the security gate and
//! a [`BuildOrchestrator`]. Each operation is independent; nothing is
//! remembered between calls.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::bridge::AutomationBridge;
use crate::error::{XcbError, XcbResult};
use crate::orchestrator::{BuildMode, BuildOrchestrator, BuildOutcome, OrchestratorConfig};
use crate::report::ReportAssembler;
use crate::resolve::{PathResolver, ResolvedPath};
use crate::security::SecurityGate;
use crate::snippet::{SnippetExtractor, SnippetResult};

/// Bundle extensions accepted as build targets.
pub const TARGET_EXTENSIONS: &[&str] = &["xcodeproj", "xcworkspace"];

/// The operations exposed to callers.
#[derive(Debug)]
pub struct Engine<B> {
    resolver: PathResolver,
    gate: SecurityGate,
    orchestrator: BuildOrchestrator<B>,
}

impl<B: AutomationBridge> Engine<B> {
    pub fn new(
        resolver: PathResolver,
        gate: SecurityGate,
        bridge: B,
        config: OrchestratorConfig,
    ) -> Self {
        Engine {
            resolver,
            gate,
            orchestrator: BuildOrchestrator::new(bridge, config),
        }
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    pub fn gate(&self) -> &SecurityGate {
        &self.gate
    }

    pub fn orchestrator(&self) -> &BuildOrchestrator<B> {
        &self.orchestrator
    }

    /// Resolve `path` through the resolution cascade. Never fails.
    pub fn resolve_path(&self, path: &str) -> ResolvedPath {
        self.resolver.resolve(path)
    }

    /// Build `target` and return the report, or launch it and return the
    /// acknowledgement when `run` is set.
    pub fn build_project(&self, target: &str, run: bool) -> XcbResult<String> {
        let target = self.checked_target(target)?;
        let mode = if run { BuildMode::Run } else { BuildMode::Build };

        match self.orchestrator.build(&target, mode)? {
            BuildOutcome::Launched {
                acknowledgement, ..
            } => Ok(acknowledgement),
            BuildOutcome::Built { session, issues } => {
                let extractor = SnippetExtractor::new(&self.resolver);
                let assembler = ReportAssembler::new(extractor, &self.gate);
                let report = assembler.assemble(&issues);
                info!(session = %session.id, issues = issues.len(), "report assembled");
                Ok(report)
            }
        }
    }

    /// Stop whatever `target` is currently doing.
    pub fn stop_project(&self, target: &str) -> XcbResult<String> {
        let target = self.checked_target(target)?;
        self.orchestrator.stop(&target)?;
        Ok(format!("Stopped '{}'", target.display()))
    }

    /// Extract a snippet after resolving `path` and checking it against the gate.
    pub fn extract_snippet(
        &self,
        path: &str,
        start_line: Option<usize>,
        end_line: Option<usize>,
        entire_file: bool,
    ) -> XcbResult<SnippetResult> {
        if path.trim().is_empty() {
            return Err(XcbError::invalid_args("path must not be empty"));
        }
        let resolved = self.resolver.resolve(path);
        if resolved.is_found() {
            self.gate.check(&resolved.resolved)?;
        }
        Ok(SnippetExtractor::new(&self.resolver).extract_resolved(
            resolved,
            start_line,
            end_line,
            entire_file,
        ))
    }

    /// Resolve, validate and security-check a build target.
    fn checked_target(&self, target: &str) -> XcbResult<PathBuf> {
        if target.trim().is_empty() {
            return Err(XcbError::invalid_args("target must not be empty"));
        }
        let resolved = self.resolver.resolve(target);
        let path = resolved.resolved;

        if !is_target_bundle(&path) {
            return Err(XcbError::invalid_args(format!(
                "{} is not an .xcodeproj or .xcworkspace",
                target
            )));
        }
        if !path.exists() {
            return Err(XcbError::invalid_args(format!("{} does not exist", target)));
        }

        let canonical = self.gate.check(&path)?;
        debug!(target = %canonical.display(), "target accepted");
        Ok(canonical)
    }
}

/// Whether `path` names a project or workspace bundle.
pub fn is_target_bundle(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| TARGET_EXTENSIONS.contains(&ext))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{BridgeSession, BuildHandle, IssueCollections};
    use crate::config::ResolveContext;
    use std::fs;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tempfile::TempDir;

    /// Bridge that finishes every build immediately with no issues.
    #[derive(Clone, Default)]
    struct CleanBridge {
        opened: Arc<Mutex<Vec<PathBuf>>>,
    }

    struct CleanSession;
    struct CleanHandle;

    impl AutomationBridge for CleanBridge {
        type Session = CleanSession;

        fn open(&self, target: &Path) -> XcbResult<Option<CleanSession>> {
            self.opened.lock().unwrap().push(target.to_path_buf());
            Ok(Some(CleanSession))
        }
    }

    impl BridgeSession for CleanSession {
        type Handle = CleanHandle;

        fn stop(&self) -> XcbResult<()> {
            Ok(())
        }

        fn build(&self) -> XcbResult<Option<CleanHandle>> {
            Ok(Some(CleanHandle))
        }

        fn run(&self) -> XcbResult<()> {
            Ok(())
        }
    }

    impl BuildHandle for CleanHandle {
        fn completed(&self) -> XcbResult<bool> {
            Ok(true)
        }

        fn issues(&self) -> XcbResult<IssueCollections> {
            Ok(IssueCollections::default())
        }
    }

    fn engine(dir: &TempDir, bridge: CleanBridge) -> Engine<CleanBridge> {
        Engine::new(
            PathResolver::new(ResolveContext::new(dir.path())),
            SecurityGate::new(dir.path()),
            bridge,
            OrchestratorConfig {
                poll_interval: Duration::from_millis(1),
                build_timeout: Some(Duration::from_secs(5)),
                run_grace: Duration::ZERO,
            },
        )
    }

    mod targets {
        use super::*;

        #[test]
        fn bundle_extensions() {
            assert!(is_target_bundle(Path::new("/p/App.xcodeproj")));
            assert!(is_target_bundle(Path::new("/p/App.xcworkspace")));
            assert!(!is_target_bundle(Path::new("/p/App.swift")));
            assert!(!is_target_bundle(Path::new("/p/App")));
        }

        #[test]
        fn wrong_extension_is_invalid() {
            let dir = TempDir::new().unwrap();
            let file = dir.path().join("main.swift");
            fs::write(&file, "").unwrap();
            let err = engine(&dir, CleanBridge::default())
                .build_project(file.to_str().unwrap(), false)
                .unwrap_err();
            assert!(matches!(err, XcbError::InvalidArguments { .. }));
        }

        #[test]
        fn missing_bundle_is_invalid() {
            let dir = TempDir::new().unwrap();
            let target = dir.path().join("Gone.xcodeproj");
            let err = engine(&dir, CleanBridge::default())
                .build_project(target.to_str().unwrap(), false)
                .unwrap_err();
            assert!(matches!(err, XcbError::InvalidArguments { .. }));
        }

        #[test]
        fn target_outside_root_is_denied_before_bridge() {
            let root = TempDir::new().unwrap();
            let other = TempDir::new().unwrap();
            let target = other.path().join("App.xcodeproj");
            fs::create_dir(&target).unwrap();

            let bridge = CleanBridge::default();
            let err = engine(&root, bridge.clone())
                .build_project(target.to_str().unwrap(), false)
                .unwrap_err();
            assert!(matches!(err, XcbError::SecurityDenied { .. }));
            assert!(bridge.opened.lock().unwrap().is_empty());
        }
    }

    #[test]
    fn clean_build_reports_success() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("App.xcodeproj");
        fs::create_dir(&target).unwrap();

        let report = engine(&dir, CleanBridge::default())
            .build_project(target.to_str().unwrap(), false)
            .unwrap();
        assert_eq!(report, crate::report::BUILD_SUCCEEDED);
    }

    #[test]
    fn run_returns_acknowledgement() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("App.xcworkspace");
        fs::create_dir(&target).unwrap();

        let ack = engine(&dir, CleanBridge::default())
            .build_project(target.to_str().unwrap(), true)
            .unwrap();
        assert!(ack.starts_with("Run started for '"), "{}", ack);
    }

    #[test]
    fn stop_reports_target() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("App.xcodeproj");
        fs::create_dir(&target).unwrap();

        let message = engine(&dir, CleanBridge::default())
            .stop_project(target.to_str().unwrap())
            .unwrap();
        assert!(message.starts_with("Stopped '"));
    }

    mod snippets {
        use super::*;

        #[test]
        fn snippet_inside_root() {
            let dir = TempDir::new().unwrap();
            let file = dir.path().join("A.swift");
            fs::write(&file, "one\ntwo\n").unwrap();

            let snippet = engine(&dir, CleanBridge::default())
                .extract_snippet(file.to_str().unwrap(), Some(2), None, false)
                .unwrap();
            assert_eq!(snippet.text, "two");
        }

        #[test]
        fn snippet_outside_root_is_denied() {
            let root = TempDir::new().unwrap();
            let other = TempDir::new().unwrap();
            let file = other.path().join("Secret.swift");
            fs::write(&file, "secret\n").unwrap();

            let err = engine(&root, CleanBridge::default())
                .extract_snippet(file.to_str().unwrap(), Some(1), Some(1), false)
                .unwrap_err();
            assert!(matches!(err, XcbError::SecurityDenied { .. }));
        }

        #[test]
        fn unresolved_snippet_is_not_found_text() {
            let dir = TempDir::new().unwrap();
            let snippet = engine(&dir, CleanBridge::default())
                .extract_snippet("Nowhere.swift", Some(1), None, false)
                .unwrap();
            assert!(snippet.text.starts_with("File not found"));
        }
    }
}
