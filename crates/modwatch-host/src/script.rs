//! Script host implementation

use crate::directive::parse_imports;
use modwatch_core::{HookRegistry, HostError, LoadHook, ModuleHost};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Extension tried when a request names a file without one.
pub const MODULE_EXTENSION: &str = "mod";

/// A module instance held in the host cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedModule {
    pub path: PathBuf,
    pub source: String,
    /// Resolved paths of this module's `@import`s, in directive order.
    pub imports: Vec<PathBuf>,
}

/// Loads module files from disk, caching one instance per canonical path.
///
/// Requests starting with `./` or `../` resolve against the requesting
/// module's directory, absolute requests are taken as-is, and bare requests
/// resolve into the packages directory if one is configured.
pub struct ScriptHost {
    cache: Mutex<HashMap<PathBuf, Arc<LoadedModule>>>,
    hooks: HookRegistry,
    packages_dir: Option<PathBuf>,
}

impl std::fmt::Debug for ScriptHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptHost")
            .field("cached", &self.cache.lock().len())
            .field("hooks", &self.hooks.len())
            .field("packages_dir", &self.packages_dir)
            .finish()
    }
}

impl Default for ScriptHost {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptHost {
    pub fn new() -> Self {
        ScriptHost {
            cache: Mutex::new(HashMap::new()),
            hooks: HookRegistry::new(),
            packages_dir: None,
        }
    }

    /// Resolve bare requests such as `"left-pad"` inside `dir`.
    pub fn with_packages_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.packages_dir = Some(dir.into());
        self
    }

    /// Load `request` on behalf of `from`, serving it from cache when possible.
    ///
    /// Installed hooks see every resolution, cached or not.
    pub fn require(&self, request: &str, from: Option<&Path>) -> Result<Arc<LoadedModule>, HostError> {
        let path = self.resolve(request, from)?;
        self.hooks.notify(&path, from);

        let cached = self.cache.lock().get(&path).cloned();
        if let Some(module) = cached {
            return Ok(module);
        }
        self.load(path)
    }

    /// Read and execute a module. It is cached before its imports run, so an
    /// import cycle sees the partially loaded module instead of recursing.
    fn load(&self, path: PathBuf) -> Result<Arc<LoadedModule>, HostError> {
        let source = std::fs::read_to_string(&path).map_err(|source| HostError::Load {
            path: path.clone(),
            source,
        })?;
        let requests = parse_imports(&source);
        let imports = requests
            .iter()
            .map(|request| self.resolve(request, Some(path.as_path())))
            .collect::<Result<Vec<_>, _>>()?;

        let module = Arc::new(LoadedModule {
            path: path.clone(),
            source,
            imports,
        });
        self.cache.lock().insert(path.clone(), Arc::clone(&module));
        debug!("Loaded {}", path.display());

        for request in &requests {
            if let Err(e) = self.require(request, Some(path.as_path())) {
                self.cache.lock().remove(&path);
                return Err(e);
            }
        }
        Ok(module)
    }

    pub fn get(&self, path: &Path) -> Option<Arc<LoadedModule>> {
        self.cache.lock().get(path).cloned()
    }

    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.lock().is_empty()
    }

    fn candidate(&self, request: &str, from: Option<&Path>) -> Option<PathBuf> {
        let request_path = Path::new(request);
        if request_path.is_absolute() {
            return Some(request_path.to_path_buf());
        }
        if request.starts_with("./") || request.starts_with("../") {
            let base = match from.and_then(Path::parent) {
                Some(dir) => dir.to_path_buf(),
                None => std::env::current_dir().ok()?,
            };
            return Some(base.join(request_path));
        }
        self.packages_dir.as_ref().map(|dir| dir.join(request_path))
    }
}

impl ModuleHost for ScriptHost {
    fn resolve(&self, request: &str, from: Option<&Path>) -> Result<PathBuf, HostError> {
        let unresolved = || HostError::Resolution {
            request: request.to_string(),
            from: from
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "<top level>".to_string()),
        };

        let candidate = self.candidate(request, from).ok_or_else(unresolved)?;
        let file = if candidate.is_file() {
            candidate
        } else if candidate.extension().is_none() {
            candidate.with_extension(MODULE_EXTENSION)
        } else {
            candidate
        };
        std::fs::canonicalize(&file).map_err(|_| unresolved())
    }

    fn is_cached(&self, path: &Path) -> bool {
        self.cache.lock().contains_key(path)
    }

    fn evict(&self, path: &Path) {
        if self.cache.lock().remove(path).is_some() {
            debug!("Evicted {}", path.display());
        }
    }

    fn cached_paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self.cache.lock().keys().cloned().collect();
        paths.sort();
        paths
    }

    fn install_hook(&self, hook: Arc<dyn LoadHook>) -> bool {
        self.hooks.install(hook)
    }
}
