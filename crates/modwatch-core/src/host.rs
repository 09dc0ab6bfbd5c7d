//! Interface to the host module system

use crate::hooks::LoadHook;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Errors raised by a module host.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("cannot resolve '{request}' from {from}")]
    Resolution { request: String, from: String },

    #[error("failed to load {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The module loader whose cache this crate invalidates.
///
/// Implementations must invoke installed hooks without holding their own
/// cache lock: the reloader calls `evict` while holding its session lock, and
/// hooks take that same lock.
pub trait ModuleHost: Send + Sync {
    /// Resolve `request` as seen from `from` to an absolute path.
    fn resolve(&self, request: &str, from: Option<&Path>) -> Result<PathBuf, HostError>;

    fn is_cached(&self, path: &Path) -> bool;

    /// Drop the cached instance for `path` so the next access loads it afresh.
    fn evict(&self, path: &Path);

    fn cached_paths(&self) -> Vec<PathBuf>;

    /// Install a resolution listener. Returns false if `hook` is already installed.
    fn install_hook(&self, hook: Arc<dyn LoadHook>) -> bool;
}
