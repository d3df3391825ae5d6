//! Source snippet extraction for report entries and direct callers.
//!
//! Every outcome is a [`SnippetResult`]: a missing file, an unreadable file
//! and an out-of-range request all come back as explanatory text so a report
//! can keep going past one bad reference.
//!
//! Lines are **1-indexed** and ranges are inclusive. Ranges are validated,
//! never clamped.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::resolve::{PathResolver, ResolvedPath};

/// Text returned when a requested line range is out of bounds.
pub const INVALID_LINE_RANGE: &str = "Invalid line numbers";

/// Extension to fence-language table. Anything else is `text`.
const LANGUAGE_TAGS: &[(&str, &str)] = &[
    ("swift", "swift"),
    ("m", "objective-c"),
    ("mm", "objective-cpp"),
    ("h", "objective-c"),
    ("hpp", "cpp"),
    ("cpp", "cpp"),
    ("cc", "cpp"),
    ("cxx", "cpp"),
    ("c", "c"),
    ("metal", "metal"),
    ("js", "javascript"),
    ("ts", "typescript"),
    ("json", "json"),
    ("py", "python"),
    ("rb", "ruby"),
    ("rs", "rust"),
    ("sh", "bash"),
    ("zsh", "bash"),
    ("md", "markdown"),
    ("yml", "yaml"),
    ("yaml", "yaml"),
    ("xml", "xml"),
    ("plist", "xml"),
    ("storyboard", "xml"),
    ("xib", "xml"),
    ("entitlements", "xml"),
    ("xcconfig", "text"),
    ("strings", "text"),
];

/// Fence language tag for `path`, by extension (case-insensitive).
pub fn language_tag(path: &Path) -> &'static str {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return "text";
    };
    let ext = ext.to_ascii_lowercase();
    LANGUAGE_TAGS
        .iter()
        .find(|(known, _)| *known == ext)
        .map(|(_, tag)| *tag)
        .unwrap_or("text")
}

/// Source text for a location, or an explanation of why there is none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnippetResult {
    /// The resolved path the text came from.
    pub path: PathBuf,
    /// Fence language tag.
    pub language: String,
    /// The requested lines, or an explanatory message.
    pub text: String,
    /// Resolution warning carried over from the path resolver.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Pulls line ranges and whole files through a [`PathResolver`].
#[derive(Debug, Clone, Copy)]
pub struct SnippetExtractor<'a> {
    resolver: &'a PathResolver,
}

impl<'a> SnippetExtractor<'a> {
    /// Create an extractor resolving paths through `resolver`.
    pub fn new(resolver: &'a PathResolver) -> Self {
        SnippetExtractor { resolver }
    }

    /// The resolver paths go through.
    pub fn resolver(&self) -> &'a PathResolver {
        self.resolver
    }

    /// Extract lines `start_line..=end_line` of `path`, or the whole file.
    ///
    /// A missing `end_line` means a single line. A missing `start_line` is
    /// only valid together with `entire_file`.
    pub fn extract(
        &self,
        path: &str,
        start_line: Option<usize>,
        end_line: Option<usize>,
        entire_file: bool,
    ) -> SnippetResult {
        let resolved = self.resolver.resolve(path);
        self.extract_resolved(resolved, start_line, end_line, entire_file)
    }

    /// Like [`extract`](Self::extract) for a path the caller already resolved.
    pub fn extract_resolved(
        &self,
        resolved: ResolvedPath,
        start_line: Option<usize>,
        end_line: Option<usize>,
        entire_file: bool,
    ) -> SnippetResult {
        let path = resolved.original.as_str();
        let language = language_tag(&resolved.resolved).to_string();
        let mut result = SnippetResult {
            path: resolved.resolved.clone(),
            language,
            text: String::new(),
            warning: resolved.warning,
        };

        if !resolved.resolved.is_file() {
            result.text = format!("File not found: {}", path);
            return result;
        }

        let content = match fs::read_to_string(&resolved.resolved) {
            Ok(c) => c,
            Err(e) => {
                result.text = format!("Unable to read {}: {}", resolved.resolved.display(), e);
                return result;
            }
        };

        if entire_file {
            result.text = content;
            return result;
        }

        result.text = match slice_lines(&content, start_line, end_line) {
            Some(text) => text,
            None => {
                debug!(path, ?start_line, ?end_line, "invalid line range");
                INVALID_LINE_RANGE.to_string()
            }
        };
        result
    }
}

/// Join lines `start..=end` (1-indexed) of `content`, or `None` when the
/// range violates `1 <= start <= end <= total`.
pub fn slice_lines(content: &str, start: Option<usize>, end: Option<usize>) -> Option<String> {
    let start = start?;
    let end = end.unwrap_or(start);
    let lines: Vec<&str> = content.lines().collect();
    if start == 0 || start > end || end > lines.len() {
        return None;
    }
    Some(lines[start - 1..end].join("\n"))
}

// ============================================================================
// Tests
// ============================================================================
