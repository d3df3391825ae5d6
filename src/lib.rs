//! xcbridge: build/run automation for Xcode sessions.
//!
//! Resolves loosely specified file paths, extracts source snippets under a
//! security gate, drives builds through an automation bridge and turns the
//! resulting diagnostics into one snippet-annotated report.

// Core infrastructure - re-exported from xcbridge-core
pub use xcbridge_core::bridge;
pub use xcbridge_core::config;
pub use xcbridge_core::engine;
pub use xcbridge_core::error;
pub use xcbridge_core::fuzzy;
pub use xcbridge_core::issues;
pub use xcbridge_core::orchestrator;
pub use xcbridge_core::output;
pub use xcbridge_core::report;
pub use xcbridge_core::resolve;
pub use xcbridge_core::script;
pub use xcbridge_core::security;
pub use xcbridge_core::snippet;
pub use xcbridge_core::xcode;

// Front door
pub mod cli;
