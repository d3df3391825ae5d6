//! Configuration resolution and the explicit resolution context.
//!
//! Settings are merged from three sources. Precedence (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (`XCB_*`)
//! 3. Defaults
//!
//! Every value remembers where it came from so `xcb` can explain itself at
//! debug log level.
//!
//! [`ResolveContext`] is the value handed to the path resolver and the engine.
//! It replaces any process-wide "current project" state: two engines with
//! different contexts never observe each other.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, warn};

use crate::orchestrator::OrchestratorConfig;

/// Environment variable naming the current project root.
pub const ENV_PROJECT_ROOT: &str = "XCB_PROJECT_ROOT";
/// Environment variable holding extra search roots (OS path-list syntax).
pub const ENV_SEARCH_PATHS: &str = "XCB_SEARCH_PATHS";
/// Environment variable overriding the permitted root.
pub const ENV_ALLOWED_ROOT: &str = "XCB_ALLOWED_ROOT";
/// Environment variable for the build timeout in seconds (`0` = unbounded).
pub const ENV_BUILD_TIMEOUT_SECS: &str = "XCB_BUILD_TIMEOUT_SECS";
/// Environment variable for the completion poll interval in milliseconds.
pub const ENV_POLL_INTERVAL_MS: &str = "XCB_POLL_INTERVAL_MS";
/// Environment variable for the per-script timeout in seconds.
pub const ENV_SCRIPT_TIMEOUT_SECS: &str = "XCB_SCRIPT_TIMEOUT_SECS";

/// Default build timeout.
pub const DEFAULT_BUILD_TIMEOUT: Duration = Duration::from_secs(30 * 60);
/// Default completion poll interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);
/// Default grace period before dispatching a run.
pub const DEFAULT_RUN_GRACE: Duration = Duration::from_secs(1);
/// Default timeout for a single bridge script.
pub const DEFAULT_SCRIPT_TIMEOUT: Duration = Duration::from_secs(60);

// ============================================================================
// Resolution Context
// ============================================================================

/// Roots the path resolver may consult.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveContext {
    /// Directory relative lookups and the first candidate are anchored at.
    pub working_dir: PathBuf,
    /// The "current project" root, if one is known.
    pub project_root: Option<PathBuf>,
    /// Additional directories scanned when direct lookups fail.
    pub search_roots: Vec<PathBuf>,
}

impl ResolveContext {
    /// Create a context anchored at `working_dir` with no project or search roots.
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        ResolveContext {
            working_dir: working_dir.into(),
            project_root: None,
            search_roots: Vec::new(),
        }
    }

    /// Set the project root.
    pub fn with_project_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.project_root = Some(root.into());
        self
    }

    /// Add a search root.
    pub fn with_search_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.search_roots.push(root.into());
        self
    }
}

// ============================================================================
// Configuration Sources
// ============================================================================

/// Configuration value source (for precedence tracking).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfigSource {
    /// Built-in default value.
    Default = 0,
    /// From environment variable.
    EnvVar = 1,
    /// From CLI flag (highest precedence).
    CliFlag = 2,
}

/// A configuration value with its source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigValue<T> {
    /// The actual value.
    pub value: T,
    /// Where the value came from.
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    /// Create a new config value with the given source.
    pub fn new(value: T, source: ConfigSource) -> Self {
        ConfigValue { value, source }
    }
}

// ============================================================================
// Resolved Configuration
// ============================================================================

/// CLI configuration overrides.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    /// --project-root flag.
    pub project_root: Option<PathBuf>,
    /// --search-path flags.
    pub search_roots: Vec<PathBuf>,
    /// --allowed-root flag.
    pub allowed_root: Option<PathBuf>,
    /// --build-timeout flag, seconds (`0` = unbounded).
    pub build_timeout_secs: Option<u64>,
    /// --poll-interval flag, milliseconds.
    pub poll_interval_ms: Option<u64>,
}

/// Resolved configuration with precedence information.
#[derive(Debug, Clone)]
pub struct Config {
    /// Current project root.
    pub project_root: Option<ConfigValue<PathBuf>>,
    /// Extra search roots, CLI entries first.
    pub search_roots: Vec<ConfigValue<PathBuf>>,
    /// Root every touched path must live under.
    pub allowed_root: Option<ConfigValue<PathBuf>>,
    /// Upper bound on the build completion wait; `None` waits forever.
    pub build_timeout: ConfigValue<Option<Duration>>,
    /// Completion sampling interval.
    pub poll_interval: ConfigValue<Duration>,
    /// Pause before dispatching a run so a previous run can wind down.
    pub run_grace: ConfigValue<Duration>,
    /// Upper bound on a single bridge script.
    pub script_timeout: ConfigValue<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            project_root: None,
            search_roots: Vec::new(),
            allowed_root: dirs::home_dir().map(|home| ConfigValue::new(home, ConfigSource::Default)),
            build_timeout: ConfigValue::new(Some(DEFAULT_BUILD_TIMEOUT), ConfigSource::Default),
            poll_interval: ConfigValue::new(DEFAULT_POLL_INTERVAL, ConfigSource::Default),
            run_grace: ConfigValue::new(DEFAULT_RUN_GRACE, ConfigSource::Default),
            script_timeout: ConfigValue::new(DEFAULT_SCRIPT_TIMEOUT, ConfigSource::Default),
        }
    }
}

impl Config {
    /// Resolve configuration from defaults, the process environment and CLI flags.
    pub fn resolve(cli_overrides: &CliOverrides) -> Self {
        Config::resolve_with(|key| std::env::var(key).ok(), cli_overrides)
    }

    /// Resolve configuration using `lookup` in place of the process environment.
    pub fn resolve_with<F>(lookup: F, cli_overrides: &CliOverrides) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();
        config.apply_env_vars(lookup);
        config.apply_cli_overrides(cli_overrides);
        debug!(?config, "resolved configuration");
        config
    }

    fn apply_env_vars<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(root) = lookup(ENV_PROJECT_ROOT).filter(|v| !v.is_empty()) {
            self.project_root = Some(ConfigValue::new(PathBuf::from(root), ConfigSource::EnvVar));
        }

        if let Some(paths) = lookup(ENV_SEARCH_PATHS) {
            for path in std::env::split_paths(&paths) {
                if !path.as_os_str().is_empty() {
                    self.search_roots
                        .push(ConfigValue::new(path, ConfigSource::EnvVar));
                }
            }
        }

        if let Some(root) = lookup(ENV_ALLOWED_ROOT).filter(|v| !v.is_empty()) {
            self.allowed_root = Some(ConfigValue::new(PathBuf::from(root), ConfigSource::EnvVar));
        }

        if let Some(secs) = parse_u64(&lookup, ENV_BUILD_TIMEOUT_SECS) {
            self.build_timeout = ConfigValue::new(timeout_from_secs(secs), ConfigSource::EnvVar);
        }

        if let Some(ms) = parse_u64(&lookup, ENV_POLL_INTERVAL_MS) {
            self.poll_interval =
                ConfigValue::new(Duration::from_millis(ms.max(1)), ConfigSource::EnvVar);
        }

        if let Some(secs) = parse_u64(&lookup, ENV_SCRIPT_TIMEOUT_SECS) {
            self.script_timeout =
                ConfigValue::new(Duration::from_secs(secs.max(1)), ConfigSource::EnvVar);
        }
    }

    fn apply_cli_overrides(&mut self, overrides: &CliOverrides) {
        if let Some(ref root) = overrides.project_root {
            self.project_root = Some(ConfigValue::new(root.clone(), ConfigSource::CliFlag));
        }

        if !overrides.search_roots.is_empty() {
            let mut merged: Vec<ConfigValue<PathBuf>> = overrides
                .search_roots
                .iter()
                .map(|p| ConfigValue::new(p.clone(), ConfigSource::CliFlag))
                .collect();
            for existing in self.search_roots.drain(..) {
                if !merged.iter().any(|m| m.value == existing.value) {
                    merged.push(existing);
                }
            }
            self.search_roots = merged;
        }

        if let Some(ref root) = overrides.allowed_root {
            self.allowed_root = Some(ConfigValue::new(root.clone(), ConfigSource::CliFlag));
        }

        if let Some(secs) = overrides.build_timeout_secs {
            self.build_timeout = ConfigValue::new(timeout_from_secs(secs), ConfigSource::CliFlag);
        }

        if let Some(ms) = overrides.poll_interval_ms {
            self.poll_interval =
                ConfigValue::new(Duration::from_millis(ms.max(1)), ConfigSource::CliFlag);
        }
    }

    /// Build the resolution context for this configuration.
    pub fn context(&self, working_dir: &Path) -> ResolveContext {
        ResolveContext {
            working_dir: working_dir.to_path_buf(),
            project_root: self.project_root.as_ref().map(|v| v.value.clone()),
            search_roots: self.search_roots.iter().map(|v| v.value.clone()).collect(),
        }
    }

    /// Orchestrator timing derived from this configuration.
    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            poll_interval: self.poll_interval.value,
            build_timeout: self.build_timeout.value,
            run_grace: self.run_grace.value,
        }
    }
}

fn parse_u64<F>(lookup: &F, key: &str) -> Option<u64>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<u64>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "ignoring non-numeric environment value");
            None
        }
    }
}

fn timeout_from_secs(secs: u64) -> Option<Duration> {
    if secs == 0 {
        None
    } else {
        Some(Duration::from_secs(secs))
    }
}

// ============================================================================
// Tests
// ============================================================================
