//! Core infrastructure for xcbridge.
//!
//! This crate provides the pieces an Xcode-driving tool needs:
//! - Path resolution with fuzzy fallback over an explicit context
//! - A security gate confining file access to one root
//! - Source snippet extraction with language tagging
//! - Normalization of raw build diagnostics
//! - Build/run orchestration behind the Automation Bridge traits
//! - Report assembly with a deduplicated file appendix
//! - An `osascript` implementation of the bridge
//! - Layered configuration, error types and JSON output types

pub mod bridge;
pub mod config;
pub mod engine;
pub mod error;
pub mod fuzzy;
pub mod issues;
pub mod orchestrator;
pub mod output;
pub mod report;
pub mod resolve;
pub mod script;
pub mod security;
pub mod snippet;
pub mod util;
pub mod xcode;
