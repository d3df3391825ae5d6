//! Permitted-root checks for every path the engine touches.
//!
//! A path is allowed when its canonical form equals the permitted root or is
//! nested under it. Paths that do not exist yet are canonicalized through
//! their deepest existing ancestor, so a symlinked parent cannot smuggle a
//! write outside the root.

use std::io;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{XcbError, XcbResult};

/// Gate that refuses paths outside a single permitted root.
#[derive(Debug, Clone)]
pub struct SecurityGate {
    root: PathBuf,
}

impl SecurityGate {
    /// Create a gate for `root`.
    ///
    /// The root itself is canonicalized when it exists; a missing root is kept
    /// as given, which makes every check fail closed.
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        let root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
        SecurityGate { root }
    }

    /// Create a gate rooted at the user's home directory.
    pub fn home() -> XcbResult<Self> {
        dirs::home_dir()
            .map(SecurityGate::new)
            .ok_or_else(|| XcbError::internal("cannot determine home directory"))
    }

    /// The permitted root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Check `path`, returning its canonical form when allowed.
    pub fn check(&self, path: impl AsRef<Path>) -> XcbResult<PathBuf> {
        let path = path.as_ref();
        let canonical = match canonicalize_lenient(path) {
            Ok(p) => p,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot canonicalize path");
                return Err(self.denied(path));
            }
        };

        if canonical.starts_with(&self.root) {
            debug!(path = %canonical.display(), "path allowed");
            Ok(canonical)
        } else {
            warn!(path = %canonical.display(), root = %self.root.display(), "path denied");
            Err(self.denied(&canonical))
        }
    }

    /// Whether `path` would pass [`check`](Self::check).
    pub fn allows(&self, path: impl AsRef<Path>) -> bool {
        self.check(path).is_ok()
    }

    fn denied(&self, path: &Path) -> XcbError {
        XcbError::SecurityDenied {
            path: path.to_path_buf(),
            root: self.root.clone(),
        }
    }
}

/// Canonicalize `path`, tolerating a missing tail.
///
/// The deepest existing ancestor is canonicalized and the missing components
/// are re-appended. A `..` inside the missing tail is rejected since it cannot
/// be resolved against the real filesystem.
fn canonicalize_lenient(path: &Path) -> io::Result<PathBuf> {
    if let Ok(p) = path.canonicalize() {
        return Ok(p);
    }

    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    let mut tail: Vec<&std::ffi::OsStr> = Vec::new();
    let mut cursor = absolute.as_path();
    loop {
        if let Ok(base) = cursor.canonicalize() {
            let mut out = base;
            for part in tail.iter().rev() {
                out.push(part);
            }
            return Ok(out);
        }
        match cursor.components().next_back() {
            Some(Component::Normal(name)) => tail.push(name),
            Some(Component::CurDir) => {}
            Some(Component::ParentDir) => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "parent traversal through a missing directory",
                ))
            }
            _ => return Err(io::Error::new(io::ErrorKind::NotFound, "no existing ancestor")),
        }
        cursor = match cursor.parent() {
            Some(parent) => parent,
            None => return Err(io::Error::new(io::ErrorKind::NotFound, "no existing ancestor")),
        };
    }
}

// ============================================================================
// Tests
// ============================================================================
