//! Binary entry point for the xcb CLI.
//!
//! ## Usage
//!
//! ```bash
//! # Where does this file name actually live?
//! xcb --project-root ~/src/App resolve ContentView.swift
//!
//! # Lines 10-20 of a file
//! xcb snippet Sources/App/Model.swift --start 10 --end 20
//!
//! # Build and get a snippet-annotated report
//! xcb build ~/src/App/App.xcodeproj
//!
//! # Launch the active scheme, then stop it
//! xcb build ~/src/App/App.xcodeproj --run
//! xcb stop ~/src/App/App.xcodeproj
//! ```

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};

use xcbridge::cli::{run_build, run_resolve, run_snippet, run_stop};
use xcbridge::config::{CliOverrides, Config};
use xcbridge::engine::Engine;
use xcbridge::error::{OutputErrorCode, XcbError};
use xcbridge::output::{emit_response, ErrorResponse};
use xcbridge::resolve::PathResolver;
use xcbridge::security::SecurityGate;
use xcbridge::xcode::XcodeBridge;

// ============================================================================
// CLI Structure
// ============================================================================

/// Drive Xcode builds and read the code behind their diagnostics.
#[derive(Parser, Debug)]
#[command(name = "xcb", version, about = "Xcode build automation with annotated diagnostics")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

/// Global arguments shared by all subcommands.
#[derive(Parser, Debug)]
struct GlobalArgs {
    /// Current project root used for relative resolution.
    #[arg(long, global = true)]
    project_root: Option<PathBuf>,

    /// Extra search root (repeatable).
    #[arg(long = "search-path", global = true)]
    search_paths: Vec<PathBuf>,

    /// Root every touched path must live under (default: home directory).
    #[arg(long, global = true)]
    allowed_root: Option<PathBuf>,

    /// Build completion timeout in seconds (`0` waits forever).
    #[arg(long, global = true)]
    build_timeout: Option<u64>,

    /// Build completion polling interval in milliseconds.
    #[arg(long, global = true)]
    poll_interval_ms: Option<u64>,

    /// Log level for tracing output.
    #[arg(long, global = true, value_enum, default_value = "warn")]
    log_level: LogLevel,
}

impl GlobalArgs {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            project_root: self.project_root.clone(),
            search_roots: self.search_paths.clone(),
            allowed_root: self.allowed_root.clone(),
            build_timeout_secs: self.build_timeout,
            poll_interval_ms: self.poll_interval_ms,
        }
    }
}

/// Log level for tracing output.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn to_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// CLI subcommands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve a path through the resolution cascade.
    Resolve {
        /// Absolute, relative or bare file name.
        path: String,
    },
    /// Print lines of a file, or the whole file.
    Snippet {
        path: String,
        /// First line (1-indexed).
        #[arg(long)]
        start: Option<usize>,
        /// Last line, inclusive (default: same as --start).
        #[arg(long)]
        end: Option<usize>,
        /// Print the entire file.
        #[arg(long)]
        entire: bool,
    },
    /// Build a project or workspace and report its diagnostics.
    Build {
        /// Path to an .xcodeproj or .xcworkspace.
        target: String,
        /// Run the active scheme instead of building and waiting.
        #[arg(long)]
        run: bool,
    },
    /// Stop the current build or run of a project or workspace.
    Stop {
        /// Path to an .xcodeproj or .xcworkspace.
        target: String,
    },
}

// ============================================================================
// Main
// ============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.global.log_level);

    match execute(cli) {
        Ok(json) => {
            let mut stdout = io::stdout().lock();
            let _ = writeln!(stdout, "{}", json);
            ExitCode::SUCCESS
        }
        Err(err) => {
            let error_code = OutputErrorCode::from(&err);
            let response = ErrorResponse::from_error(&err);
            let _ = emit_response(&response, &mut io::stderr());
            ExitCode::from(error_code.code())
        }
    }
}

/// Initialize tracing subscriber.
fn init_tracing(level: LogLevel) {
    use tracing_subscriber::fmt::format::FmtSpan;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_tracing_level().to_string()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Execute the CLI command, returning the JSON response text.
fn execute(cli: Cli) -> Result<String, XcbError> {
    let config = Config::resolve(&cli.global.overrides());
    let working_dir = std::env::current_dir()?;

    let gate = match &config.allowed_root {
        Some(root) => SecurityGate::new(&root.value),
        None => SecurityGate::home()?,
    };

    // Only build and stop talk to Xcode; resolve and snippet work anywhere.
    let bridge = match &cli.command {
        Command::Build { .. } | Command::Stop { .. } => {
            XcodeBridge::discover(config.script_timeout.value)?
        }
        Command::Resolve { .. } | Command::Snippet { .. } => {
            XcodeBridge::with_runner(xcbridge::script::ScriptRunner::new(
                xcbridge::xcode::OSASCRIPT,
            ))
        }
    };

    let engine = Engine::new(
        PathResolver::new(config.context(&working_dir)),
        gate,
        bridge,
        config.orchestrator_config(),
    );

    match cli.command {
        Command::Resolve { path } => run_resolve(&engine, &path),
        Command::Snippet {
            path,
            start,
            end,
            entire,
        } => run_snippet(&engine, &path, start, end, entire),
        Command::Build { target, run } => run_build(&engine, &target, run),
        Command::Stop { target } => run_stop(&engine, &target),
    }
}
