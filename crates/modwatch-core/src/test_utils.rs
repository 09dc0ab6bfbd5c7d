//! Test doubles for the module host and native watcher

use crate::hooks::{HookRegistry, LoadHook};
use crate::host::{HostError, ModuleHost};
use crate::watch::{PathWatcher, WatchError, WatcherFactory};
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// In-memory host: a set of cached paths plus a hook registry.
#[derive(Default)]
pub struct FakeHost {
    cache: Mutex<BTreeSet<PathBuf>>,
    evictions: Mutex<Vec<PathBuf>>,
    hooks: HookRegistry,
}

impl FakeHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Simulate `dependent` loading `path`: hooks fire, then the module is cached.
    pub fn load(&self, path: &str, dependent: Option<&str>) {
        let path = Path::new(path);
        self.hooks.notify(path, dependent.map(Path::new));
        self.cache.lock().insert(path.to_path_buf());
    }

    pub fn evictions(&self) -> Vec<PathBuf> {
        self.evictions.lock().clone()
    }

    pub fn eviction_count(&self, path: &str) -> usize {
        self.evictions
            .lock()
            .iter()
            .filter(|p| p.as_path() == Path::new(path))
            .count()
    }

    pub fn hook_count(&self) -> usize {
        self.hooks.len()
    }
}

impl ModuleHost for FakeHost {
    fn resolve(&self, request: &str, from: Option<&Path>) -> Result<PathBuf, HostError> {
        let request_path = Path::new(request);
        if request_path.is_absolute() {
            return Ok(request_path.to_path_buf());
        }
        match from.and_then(Path::parent) {
            Some(dir) => Ok(dir.join(request_path)),
            None => Err(HostError::Resolution {
                request: request.to_string(),
                from: from.map(|p| p.display().to_string()).unwrap_or_default(),
            }),
        }
    }

    fn is_cached(&self, path: &Path) -> bool {
        self.cache.lock().contains(path)
    }

    fn evict(&self, path: &Path) {
        self.cache.lock().remove(path);
        self.evictions.lock().push(path.to_path_buf());
    }

    fn cached_paths(&self) -> Vec<PathBuf> {
        self.cache.lock().iter().cloned().collect()
    }

    fn install_hook(&self, hook: Arc<dyn LoadHook>) -> bool {
        self.hooks.install(hook)
    }
}

/// Everything a [`RecordingWatcher`] was asked to do.
#[derive(Debug, Default)]
pub struct WatchLog {
    pub watched: HashSet<PathBuf>,
    pub watch_calls: Vec<PathBuf>,
    pub unwatch_calls: Vec<PathBuf>,
    pub opened: usize,
    pub closed: usize,
    /// Paths whose registration should fail.
    pub refuse: HashSet<PathBuf>,
}

impl WatchLog {
    pub fn watch_count(&self, path: &str) -> usize {
        self.watch_calls
            .iter()
            .filter(|p| p.as_path() == Path::new(path))
            .count()
    }
}

pub struct RecordingWatcher {
    log: Arc<Mutex<WatchLog>>,
}

impl PathWatcher for RecordingWatcher {
    fn watch_path(&mut self, path: &Path) -> Result<(), WatchError> {
        let mut log = self.log.lock();
        if log.refuse.contains(path) {
            return Err(WatchError::Watch {
                path: path.to_path_buf(),
                reason: "no such file".to_string(),
            });
        }
        log.watch_calls.push(path.to_path_buf());
        log.watched.insert(path.to_path_buf());
        Ok(())
    }

    fn unwatch_path(&mut self, path: &Path) -> Result<(), WatchError> {
        let mut log = self.log.lock();
        log.unwatch_calls.push(path.to_path_buf());
        log.watched.remove(path);
        Ok(())
    }

    fn is_watching(&self, path: &Path) -> bool {
        self.log.lock().watched.contains(path)
    }

    fn close(&mut self) {
        self.log.lock().closed += 1;
    }
}

/// Factory handing out [`RecordingWatcher`]s that share one log.
#[derive(Default)]
pub struct RecordingFactory {
    pub log: Arc<Mutex<WatchLog>>,
}

impl RecordingFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn refuse(&self, path: &str) {
        self.log.lock().refuse.insert(PathBuf::from(path));
    }

    pub fn allow(&self, path: &str) {
        self.log.lock().refuse.remove(Path::new(path));
    }
}

impl WatcherFactory for RecordingFactory {
    fn open(&self) -> Result<Box<dyn PathWatcher>, WatchError> {
        self.log.lock().opened += 1;
        Ok(Box::new(RecordingWatcher {
            log: Arc::clone(&self.log),
        }))
    }
}
