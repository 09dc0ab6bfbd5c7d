//! Filesystem watcher implementation

use modwatch_core::{PathWatcher, WatchError, WatcherFactory};
use notify::event::ModifyKind;
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Events emitted by the file watcher for watched paths
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// File created (or replaced by an atomic save)
    Created(PathBuf),
    /// File contents or name changed
    Modified(PathBuf),
    /// File removed
    Removed(PathBuf),
}

impl WatchEvent {
    pub fn path(&self) -> &Path {
        match self {
            WatchEvent::Created(path) | WatchEvent::Modified(path) | WatchEvent::Removed(path) => path,
        }
    }

    pub fn into_path(self) -> PathBuf {
        match self {
            WatchEvent::Created(path) | WatchEvent::Modified(path) | WatchEvent::Removed(path) => path,
        }
    }
}

/// Native watcher over individual files.
///
/// Only events for currently watched paths are forwarded; the set is shared
/// with the notify callback so residual events for unwatched files are dropped
/// at the source.
pub struct NotifyWatcher {
    watcher: Option<RecommendedWatcher>,
    watched_paths: Arc<Mutex<HashSet<PathBuf>>>,
}

impl NotifyWatcher {
    /// Create a watcher that sends events for watched files to `event_tx`.
    pub fn new(event_tx: mpsc::UnboundedSender<WatchEvent>) -> Result<Self, WatchError> {
        let watched_paths = Arc::new(Mutex::new(HashSet::new()));

        let filter = Arc::clone(&watched_paths);
        let watcher = notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
            match res {
                Ok(event) => {
                    debug!("File system event: {:?}", event);
                    Self::handle_notify_event(event, &filter, &event_tx);
                }
                Err(e) => {
                    error!("File system watch error: {}", e);
                }
            }
        })
        .map_err(|e| WatchError::Open(e.to_string()))?;

        Ok(Self {
            watcher: Some(watcher),
            watched_paths,
        })
    }

    /// Handle a notify event and convert to our watch events
    fn handle_notify_event(
        event: notify::Event,
        watched_paths: &Mutex<HashSet<PathBuf>>,
        event_tx: &mpsc::UnboundedSender<WatchEvent>,
    ) {
        let make: fn(PathBuf) -> WatchEvent = match event.kind {
            EventKind::Create(_) => WatchEvent::Created,
            EventKind::Remove(_) => WatchEvent::Removed,
            EventKind::Modify(ModifyKind::Metadata(_)) => return,
            EventKind::Modify(_) => WatchEvent::Modified,
            _ => return,
        };

        let watched = watched_paths.lock();
        for path in event.paths {
            if !watched.contains(&path) {
                continue;
            }
            if let Err(e) = event_tx.send(make(path)) {
                warn!("Failed to send watch event: {}", e);
            }
        }
    }

    /// Get all watched paths
    pub fn watched_paths(&self) -> Vec<PathBuf> {
        self.watched_paths.lock().iter().cloned().collect()
    }
}

impl PathWatcher for NotifyWatcher {
    fn watch_path(&mut self, path: &Path) -> Result<(), WatchError> {
        let watcher = self.watcher.as_mut().ok_or_else(|| WatchError::Watch {
            path: path.to_path_buf(),
            reason: "watcher is closed".to_string(),
        })?;

        // The callback thread takes the path set lock, and registering may
        // wait on that thread, so the lock is not held across `watch`.
        watcher
            .watch(path, RecursiveMode::NonRecursive)
            .map_err(|e| WatchError::Watch {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        self.watched_paths.lock().insert(path.to_path_buf());
        debug!("Watching file: {:?}", path);
        Ok(())
    }

    fn unwatch_path(&mut self, path: &Path) -> Result<(), WatchError> {
        self.watched_paths.lock().remove(path);
        let Some(watcher) = self.watcher.as_mut() else {
            return Ok(());
        };

        debug!("Stopping watch for: {:?}", path);
        watcher.unwatch(path).map_err(|e| WatchError::Unwatch {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    fn is_watching(&self, path: &Path) -> bool {
        self.watched_paths.lock().contains(path)
    }

    fn close(&mut self) {
        self.watched_paths.lock().clear();
        if self.watcher.take().is_some() {
            info!("Native watcher closed");
        }
    }
}

/// Opens [`NotifyWatcher`]s that all report into one channel.
pub struct NotifyFactory {
    event_tx: mpsc::UnboundedSender<WatchEvent>,
}

impl NotifyFactory {
    pub fn new(event_tx: mpsc::UnboundedSender<WatchEvent>) -> Self {
        Self { event_tx }
    }

    /// Create a factory together with the receiving end of its event channel.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<WatchEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        (Self::new(event_tx), event_rx)
    }
}

impl WatcherFactory for NotifyFactory {
    fn open(&self) -> Result<Box<dyn PathWatcher>, WatchError> {
        Ok(Box::new(NotifyWatcher::new(self.event_tx.clone())?))
    }
}
