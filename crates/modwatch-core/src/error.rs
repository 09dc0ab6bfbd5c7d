//! Error taxonomy for tracking and invalidation

use crate::watch::WatchError;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReloadError>;

#[derive(Debug, Error)]
pub enum ReloadError {
    #[error("the watcher only works on absolute paths - {} is not absolute", .0.display())]
    InvalidPath(PathBuf),

    #[error("the watcher cannot watch built-in modules or files in the dependency directory: {}", .0.display())]
    Ineligible(PathBuf),

    #[error("already watching {tracked} files; only more explicit paths can be added")]
    SessionConflict { tracked: usize },

    /// The native watcher reported a change for a path the graph does not
    /// know. The two have desynchronized.
    #[error("change notification for {} which is not in the dependency graph", .0.display())]
    InconsistentState(PathBuf),

    #[error(transparent)]
    Watch(#[from] WatchError),
}

impl ReloadError {
    /// Fatal errors must stop the dispatch loop.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ReloadError::InconsistentState(_))
    }
}
