//! Resolution listeners installed into a module host

use parking_lot::RwLock;
use std::path::Path;
use std::sync::Arc;

/// Observer called by a host on every module resolution, including
/// resolutions served from the host's own cache.
pub trait LoadHook: Send + Sync {
    /// `dependent` is `None` for top-level requests that have no requesting module.
    fn on_resolve(&self, requested: &Path, dependent: Option<&Path>);
}

/// Listener slot a host embeds to expose its resolution hook point.
///
/// Installation is idempotent per hook instance: the same `Arc` installed
/// twice is registered once. Identity is compared by pointer.
#[derive(Default)]
pub struct HookRegistry {
    hooks: RwLock<Vec<Arc<dyn LoadHook>>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `hook`. Returns false if this exact hook is already installed.
    pub fn install(&self, hook: Arc<dyn LoadHook>) -> bool {
        let mut hooks = self.hooks.write();
        if hooks.iter().any(|h| same_hook(h, &hook)) {
            return false;
        }
        hooks.push(hook);
        true
    }

    /// Remove `hook`. Returns false if it was not installed.
    pub fn uninstall(&self, hook: &Arc<dyn LoadHook>) -> bool {
        let mut hooks = self.hooks.write();
        let before = hooks.len();
        hooks.retain(|h| !same_hook(h, hook));
        hooks.len() != before
    }

    pub fn len(&self) -> usize {
        self.hooks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.read().is_empty()
    }

    /// Call every installed hook. The listener list is snapshotted first so a
    /// hook may install or uninstall listeners without deadlocking.
    pub fn notify(&self, requested: &Path, dependent: Option<&Path>) {
        let hooks: Vec<_> = self.hooks.read().iter().cloned().collect();
        for hook in hooks {
            hook.on_resolve(requested, dependent);
        }
    }
}

fn same_hook(a: &Arc<dyn LoadHook>, b: &Arc<dyn LoadHook>) -> bool {
    // Compare data pointers only; vtable pointers for one type may differ
    // across codegen units.
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}
