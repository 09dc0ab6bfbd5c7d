//! Interface to the native filesystem watch service

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("failed to watch {path}: {reason}")]
    Watch { path: PathBuf, reason: String },

    #[error("failed to unwatch {path}: {reason}")]
    Unwatch { path: PathBuf, reason: String },

    #[error("failed to open native watcher: {0}")]
    Open(String),
}

/// A native watcher bound to one session's set of tracked paths.
///
/// Change notifications are delivered out of band (see the watcher crate);
/// this trait only covers registration.
pub trait PathWatcher: Send {
    fn watch_path(&mut self, path: &Path) -> Result<(), WatchError>;

    fn unwatch_path(&mut self, path: &Path) -> Result<(), WatchError>;

    fn is_watching(&self, path: &Path) -> bool;

    /// Release the native handle. Called once when the session stops.
    fn close(&mut self);
}

/// Opens a fresh native watcher when a session starts.
pub trait WatcherFactory: Send + Sync {
    fn open(&self) -> Result<Box<dyn PathWatcher>, WatchError>;
}
