//! Layered path resolution over an ambiguous, multi-root layout.
//!
//! Diagnostics and callers hand us paths that may be absolute, relative to a
//! project we only know about through [`ResolveContext`], or just a bare file
//! name. [`PathResolver::resolve`] tries, in order:
//!
//! 1. **Exact**: the path exists as given.
//! 2. **Relative**: the path joined onto the project root.
//! 3. **Candidates**: the file name under the working dir, each search root, a
//!    depth-3 walk of each search root, and the project's parent and
//!    grandparent. One candidate wins outright; several produce a warning and
//!    the first in sorted order.
//! 4. **Fuzzy**: the closest file name (depth-2 walk of every known root)
//!    scoring above [`FUZZY_THRESHOLD`].
//! 5. **Unresolved**: the original path is handed back untouched.
//!
//! Resolution never fails. Ambiguity is a warning string, a miss is
//! `MatchKind::Unresolved`, and unreadable directories are skipped.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::ResolveContext;
use crate::fuzzy::{self, FUZZY_THRESHOLD};

/// Maximum depth of the candidate walk under each search root.
pub const CANDIDATE_SEARCH_DEPTH: usize = 3;
/// Maximum depth of the fuzzy walk under each known root.
pub const FUZZY_SEARCH_DEPTH: usize = 2;

// ============================================================================
// Resolved Path
// ============================================================================

/// How a path was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// The path existed as given.
    Exact,
    /// The path existed relative to the project root.
    Relative,
    /// Found by searching known roots for the file name.
    Recursive,
    /// Nearest file name by edit distance.
    Fuzzy,
    /// Nothing found; `resolved` is the original input.
    Unresolved,
}

impl fmt::Display for MatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchKind::Exact => write!(f, "exact"),
            MatchKind::Relative => write!(f, "relative"),
            MatchKind::Recursive => write!(f, "recursive"),
            MatchKind::Fuzzy => write!(f, "fuzzy"),
            MatchKind::Unresolved => write!(f, "unresolved"),
        }
    }
}

/// Outcome of resolving one user-supplied path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedPath {
    /// The path as supplied.
    pub original: String,
    /// The path to use. Never empty: falls back to `original`.
    pub resolved: PathBuf,
    /// Ambiguity or fuzzy-substitution note for the caller.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    /// Which strategy produced `resolved`.
    pub match_kind: MatchKind,
    /// 1.0 for direct matches, the similarity for fuzzy ones, 0.0 when unresolved.
    pub score: f64,
}

impl ResolvedPath {
    fn found(original: &str, resolved: PathBuf, match_kind: MatchKind) -> Self {
        ResolvedPath {
            original: original.to_string(),
            resolved,
            warning: None,
            match_kind,
            score: 1.0,
        }
    }

    fn unresolved(original: &str) -> Self {
        ResolvedPath {
            original: original.to_string(),
            resolved: PathBuf::from(original),
            warning: None,
            match_kind: MatchKind::Unresolved,
            score: 0.0,
        }
    }

    /// Whether any strategy located the file.
    pub fn is_found(&self) -> bool {
        self.match_kind != MatchKind::Unresolved
    }
}

// ============================================================================
// Path Resolver
// ============================================================================

/// Resolves user paths against an explicit [`ResolveContext`].
#[derive(Debug, Clone)]
pub struct PathResolver {
    context: ResolveContext,
}

impl PathResolver {
    /// Create a resolver over `context`.
    pub fn new(context: ResolveContext) -> Self {
        PathResolver { context }
    }

    /// The context this resolver consults.
    pub fn context(&self) -> &ResolveContext {
        &self.context
    }

    /// Resolve `path`. Never fails; see the module docs for the cascade.
    pub fn resolve(&self, path: &str) -> ResolvedPath {
        if path.is_empty() {
            return ResolvedPath::unresolved(path);
        }

        let as_given = Path::new(path);
        if as_given.exists() {
            debug!(path, "exact match");
            return ResolvedPath::found(path, as_given.to_path_buf(), MatchKind::Exact);
        }

        if let Some(joined) = self.relative_to_project(as_given) {
            debug!(path, resolved = %joined.display(), "relative match");
            return ResolvedPath::found(path, joined, MatchKind::Relative);
        }

        let Some(file_name) = as_given.file_name().and_then(|n| n.to_str()) else {
            return ResolvedPath::unresolved(path);
        };

        let mut candidates = self.candidates(file_name);
        match candidates.len() {
            0 => {}
            1 => {
                let only = candidates.remove(0);
                debug!(path, resolved = %only.display(), "single candidate");
                return ResolvedPath::found(path, only, MatchKind::Recursive);
            }
            _ => {
                let warning = ambiguity_warning(file_name, &candidates);
                warn!(path, count = candidates.len(), "ambiguous path");
                let first = candidates.remove(0);
                let mut resolved = ResolvedPath::found(path, first, MatchKind::Recursive);
                resolved.warning = Some(warning);
                return resolved;
            }
        }

        if let Some((found, score)) = self.fuzzy_match(file_name) {
            debug!(path, resolved = %found.display(), score, "fuzzy match");
            let warning = format!(
                "No file named '{}' found. Using closest match '{}' (similarity {:.2}).",
                file_name,
                found.display(),
                score
            );
            return ResolvedPath {
                original: path.to_string(),
                resolved: found,
                warning: Some(warning),
                match_kind: MatchKind::Fuzzy,
                score,
            };
        }

        debug!(path, "unresolved");
        ResolvedPath::unresolved(path)
    }

    fn relative_to_project(&self, path: &Path) -> Option<PathBuf> {
        if path.is_absolute() {
            return None;
        }
        let root = self.context.project_root.as_ref()?;
        let trimmed = path.strip_prefix("./").unwrap_or(path);
        let joined = root.join(trimmed);
        joined.exists().then_some(joined)
    }

    /// Every existing file named `file_name` reachable by the candidate rules,
    /// de-duplicated by canonical path and sorted.
    fn candidates(&self, file_name: &str) -> Vec<PathBuf> {
        let mut found = vec![self.context.working_dir.join(file_name)];

        for root in &self.context.search_roots {
            found.push(root.join(file_name));
        }

        for root in &self.context.search_roots {
            found.extend(
                walk_files(root, CANDIDATE_SEARCH_DEPTH)
                    .filter(|p| p.file_name().and_then(|n| n.to_str()) == Some(file_name)),
            );
        }

        if let Some(root) = &self.context.project_root {
            for ancestor in root.ancestors().skip(1).take(2) {
                found.push(ancestor.join(file_name));
            }
        }

        let mut seen = HashSet::new();
        let mut candidates: Vec<PathBuf> = found
            .into_iter()
            .filter(|p| p.is_file())
            .filter(|p| seen.insert(p.canonicalize().unwrap_or_else(|_| p.clone())))
            .collect();
        candidates.sort();
        candidates
    }

    fn fuzzy_match(&self, file_name: &str) -> Option<(PathBuf, f64)> {
        let mut files: Vec<PathBuf> = Vec::new();
        for root in self.known_roots() {
            files.extend(walk_files(&root, FUZZY_SEARCH_DEPTH));
        }
        files.sort();
        files.dedup();

        let names: Vec<&str> = files
            .iter()
            .map(|p| p.file_name().and_then(|n| n.to_str()).unwrap_or(""))
            .collect();

        let (best_name, score) = fuzzy::best_match(file_name, names.iter().copied())?;
        debug_assert!(score > FUZZY_THRESHOLD);
        let index = names.iter().position(|n| *n == best_name)?;
        Some((files[index].clone(), score))
    }

    fn known_roots(&self) -> Vec<PathBuf> {
        let mut roots = vec![self.context.working_dir.clone()];
        roots.extend(self.context.project_root.iter().cloned());
        roots.extend(self.context.search_roots.iter().cloned());
        let mut seen = HashSet::new();
        roots.retain(|r| seen.insert(r.clone()));
        roots
    }
}

/// Files under `root` up to `max_depth`, skipping anything unreadable.
///
/// Symlinks are not followed, so cyclic links cannot inflate the walk.
fn walk_files(root: &Path, max_depth: usize) -> impl Iterator<Item = PathBuf> {
    WalkDir::new(root)
        .max_depth(max_depth)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
}

fn ambiguity_warning(file_name: &str, candidates: &[PathBuf]) -> String {
    let mut warning = format!("Found multiple files matching '{}':", file_name);
    for (i, candidate) in candidates.iter().enumerate() {
        warning.push_str(&format!("\n[{}] {}", i + 1, candidate.display()));
    }
    warning.push_str("\nUsing the first match.");
    warning
}

// ============================================================================
// Tests
// ============================================================================
