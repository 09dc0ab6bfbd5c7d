//! Watch session controller and load interception
//!
//! A [`Reloader`] owns the context that ties a module host to a native
//! watcher: the dependency graph and the watcher handle live in a session
//! that is created by the first `watch*` call and torn down by [`Reloader::stop`].
//! Every mutation (interception, cascade, start/stop) runs under one mutex,
//! so a cascade always completes before the next event is applied.

use crate::cascade::Cascade;
use crate::eligibility::Eligibility;
use crate::error::{ReloadError, Result};
use crate::export::GraphSnapshot;
use crate::graph::DependencyGraph;
use crate::hooks::LoadHook;
use crate::host::ModuleHost;
use crate::model::Node;
use crate::watch::{PathWatcher, WatchError, WatcherFactory};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

/// Graph plus the native watcher bound to its paths.
pub(crate) struct Session {
    pub(crate) graph: DependencyGraph,
    pub(crate) watcher: Box<dyn PathWatcher>,
    /// Paths a cascade unwatched during this session. Late native events for
    /// them are expected and dropped.
    pub(crate) retired: HashSet<PathBuf>,
}

impl Session {
    fn open(factory: &dyn WatcherFactory) -> Result<Self> {
        let watcher = factory.open()?;
        info!("Watch session started");
        Ok(Session {
            graph: DependencyGraph::new(),
            watcher,
            retired: HashSet::new(),
        })
    }

    /// Ensure `path` has a node and is natively watched.
    ///
    /// A node whose watch registration fails is removed again, so every node
    /// in the graph is always a watched path.
    pub(crate) fn track(&mut self, path: &Path) -> std::result::Result<(Node, bool), WatchError> {
        let (node, created) = self.graph.ensure_node(path);
        let node = node.clone();
        if created {
            if let Err(e) = self.watcher.watch_path(path) {
                self.graph.remove_node(path);
                return Err(e);
            }
            debug!("Watching {}", path.display());
        }
        Ok((node, created))
    }
}

struct Shared {
    host: Arc<dyn ModuleHost>,
    factory: Arc<dyn WatcherFactory>,
    eligibility: Eligibility,
    session: Mutex<Option<Session>>,
}

impl Shared {
    fn session_or_open<'a>(&self, slot: &'a mut Option<Session>) -> Result<&'a mut Session> {
        let session = match slot.take() {
            Some(session) => session,
            None => Session::open(self.factory.as_ref())?,
        };
        Ok(slot.insert(session))
    }
}

/// Records edges for resolutions made by tracked modules.
struct Interceptor {
    shared: Weak<Shared>,
}

impl LoadHook for Interceptor {
    fn on_resolve(&self, requested: &Path, dependent: Option<&Path>) {
        let Some(dependent) = dependent else {
            return;
        };
        let Some(shared) = self.shared.upgrade() else {
            return;
        };
        if !shared.eligibility.is_trackable(requested) {
            return;
        }

        let mut slot = shared.session.lock();
        let Some(session) = slot.as_mut() else {
            return;
        };
        if !session.graph.has(dependent) {
            return;
        }

        if let Err(e) = session.track(requested) {
            warn!("Not tracking {}: {}", requested.display(), e);
            return;
        }
        if session.graph.record_edge(dependent, requested) {
            debug!("{} depends on {}", dependent.display(), requested.display());
        }
    }
}

/// Handle to the dependency tracker for one module host. Cheap to clone.
#[derive(Clone)]
pub struct Reloader {
    shared: Arc<Shared>,
    interceptor: Arc<dyn LoadHook>,
}

impl std::fmt::Debug for Reloader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reloader")
            .field("eligibility", &self.shared.eligibility)
            .field("active", &self.is_active())
            .finish()
    }
}

impl Reloader {
    /// Create a reloader and install its interception hook into `host`.
    pub fn new(
        host: Arc<dyn ModuleHost>,
        factory: Arc<dyn WatcherFactory>,
        eligibility: Eligibility,
    ) -> Self {
        let shared = Arc::new(Shared {
            host,
            factory,
            eligibility,
            session: Mutex::new(None),
        });
        let interceptor: Arc<dyn LoadHook> = Arc::new(Interceptor {
            shared: Arc::downgrade(&shared),
        });
        let reloader = Reloader {
            shared,
            interceptor,
        };
        reloader.install_hook();
        reloader
    }

    /// Install the interception hook into the host. Re-installing is a no-op.
    pub fn install_hook(&self) -> bool {
        let installed = self
            .shared
            .host
            .install_hook(Arc::clone(&self.interceptor));
        if installed {
            debug!("Load interception hook installed");
        }
        installed
    }

    pub fn eligibility(&self) -> &Eligibility {
        &self.shared.eligibility
    }

    /// Track `path` if given, otherwise everything the host has loaded.
    pub fn start(&self, path: Option<&Path>) -> Result<Vec<Node>> {
        match path {
            Some(path) => self.watch(path).map(|node| vec![node]),
            None => self.watch_loaded(),
        }
    }

    /// Track one absolute, eligible path. Tracking the same path twice yields
    /// the same node and a single native registration.
    pub fn watch(&self, path: &Path) -> Result<Node> {
        if !self.shared.eligibility.is_trackable(path) {
            return Err(ReloadError::Ineligible(path.to_path_buf()));
        }
        if !path.is_absolute() {
            return Err(ReloadError::InvalidPath(path.to_path_buf()));
        }

        let mut slot = self.shared.session.lock();
        let opened = slot.is_none();
        let session = self.shared.session_or_open(&mut slot)?;
        match session.track(path) {
            Ok((node, created)) => {
                if created {
                    info!("Watching {}", path.display());
                }
                Ok(node)
            }
            Err(e) => {
                if opened && session.graph.is_empty() {
                    session.watcher.close();
                    *slot = None;
                    debug!("Closed watch session opened for {}", path.display());
                }
                Err(e.into())
            }
        }
    }

    /// Track every eligible module the host currently caches.
    ///
    /// Only allowed while nothing is tracked; an explicit session cannot be
    /// widened to everything.
    pub fn watch_loaded(&self) -> Result<Vec<Node>> {
        let mut slot = self.shared.session.lock();
        if let Some(session) = slot.as_ref() {
            if !session.graph.is_empty() {
                return Err(ReloadError::SessionConflict {
                    tracked: session.graph.len(),
                });
            }
        }

        let session = self.shared.session_or_open(&mut slot)?;
        info!("Watching everything loaded");
        let mut nodes = Vec::new();
        for path in self.shared.host.cached_paths() {
            if !path.is_absolute() || !self.shared.eligibility.is_trackable(&path) {
                continue;
            }
            match session.track(&path) {
                Ok((node, _)) => nodes.push(node),
                Err(e) => warn!("Not tracking {}: {}", path.display(), e),
            }
        }
        info!("Tracking {} loaded modules", nodes.len());
        Ok(nodes)
    }

    /// Unwatch and forget every node, then close the native watcher.
    pub fn stop(&self) {
        let Some(mut session) = self.shared.session.lock().take() else {
            debug!("stop() called without an active session");
            return;
        };

        for node in session.graph.drain() {
            debug!("Unwatching {}", node.path().display());
            if let Err(e) = session.watcher.unwatch_path(node.path()) {
                warn!("{}", e);
            }
        }
        session.watcher.close();
        info!("Watch session stopped");
    }

    /// Handle a native change notification.
    ///
    /// Events that arrive after `stop`, or for a path an earlier cascade in
    /// this session unwatched, are dropped. Any other untracked path fails
    /// with [`ReloadError::InconsistentState`].
    pub fn notify_changed(&self, path: &Path) -> Result<Option<Cascade>> {
        let mut slot = self.shared.session.lock();
        let Some(session) = slot.as_mut() else {
            debug!("Ignoring change to {}: no active session", path.display());
            return Ok(None);
        };
        if !session.graph.has(path) && session.retired.contains(path) {
            debug!("Ignoring residual change to {}", path.display());
            return Ok(None);
        }
        session.invalidate(self.shared.host.as_ref(), path).map(Some)
    }

    /// Invalidate `path` and everything that transitively depends on it.
    ///
    /// Fails with [`ReloadError::InconsistentState`] if `path` is not tracked.
    pub fn dispatch_change(&self, path: &Path) -> Result<Cascade> {
        let mut slot = self.shared.session.lock();
        match slot.as_mut() {
            Some(session) => session.invalidate(self.shared.host.as_ref(), path),
            None => Err(ReloadError::InconsistentState(path.to_path_buf())),
        }
    }

    pub fn is_active(&self) -> bool {
        self.shared.session.lock().is_some()
    }

    pub fn is_tracked(&self, path: &Path) -> bool {
        self.shared
            .session
            .lock()
            .as_ref()
            .is_some_and(|s| s.graph.has(path))
    }

    pub fn node(&self, path: &Path) -> Option<Node> {
        self.shared
            .session
            .lock()
            .as_ref()
            .and_then(|s| s.graph.get(path).cloned())
    }

    /// All tracked paths, sorted.
    pub fn tracked_paths(&self) -> Vec<PathBuf> {
        let slot = self.shared.session.lock();
        let mut paths: Vec<PathBuf> = slot
            .as_ref()
            .map(|s| s.graph.paths().map(Path::to_path_buf).collect())
            .unwrap_or_default();
        paths.sort();
        paths
    }

    pub fn snapshot(&self) -> GraphSnapshot {
        let slot = self.shared.session.lock();
        match slot.as_ref() {
            Some(session) => GraphSnapshot::from_graph(&session.graph),
            None => GraphSnapshot::default(),
        }
    }
}
