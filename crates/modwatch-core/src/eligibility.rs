//! Which resolved paths belong to the watchable application surface

use std::path::{Path, PathBuf, is_separator};

/// Decides whether a resolved module path may be tracked.
///
/// Runtime built-ins (bare identifiers such as `util`) and anything under the
/// project's third-party dependency directory are excluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Eligibility {
    dependency_root: PathBuf,
}

impl Eligibility {
    pub fn new(dependency_root: impl Into<PathBuf>) -> Self {
        Eligibility {
            dependency_root: dependency_root.into(),
        }
    }

    /// Build the filter for `<project_root>/<dependency_dir>`.
    pub fn for_project(project_root: &Path, dependency_dir: &str) -> Self {
        Self::new(project_root.join(dependency_dir))
    }

    pub fn dependency_root(&self) -> &Path {
        &self.dependency_root
    }

    pub fn is_trackable(&self, path: &Path) -> bool {
        !(is_builtin(path) || path.starts_with(&self.dependency_root))
    }
}

/// A built-in is named without any directory structure: no separator and no
/// leading `.` or root marker.
pub fn is_builtin(path: &Path) -> bool {
    if path.has_root() {
        return false;
    }
    let raw = path.to_string_lossy();
    !raw.starts_with('.') && !raw.chars().any(is_separator)
}
