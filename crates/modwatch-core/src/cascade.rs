//! Cascading invalidation over the reverse-dependency graph

use crate::error::{ReloadError, Result};
use crate::host::ModuleHost;
use crate::reloader::Session;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Outcome of one change notification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Cascade {
    /// Path the notification was for.
    pub trigger: PathBuf,
    /// Every path evicted, in eviction order. Starts with `trigger`.
    pub evicted: Vec<PathBuf>,
    /// Roots that were evicted and are watched again.
    pub rearmed: Vec<PathBuf>,
    /// Roots that could not be watched again and left the graph.
    pub dropped: Vec<PathBuf>,
}

impl Cascade {
    fn new(trigger: &Path) -> Self {
        Cascade {
            trigger: trigger.to_path_buf(),
            ..Self::default()
        }
    }

    pub fn was_evicted(&self, path: &Path) -> bool {
        self.evicted.iter().any(|p| p == path)
    }
}

impl Session {
    /// Evict `path` and walk upward through its dependents.
    ///
    /// Each reachable ancestor is removed from the graph, evicted from the
    /// host cache and unwatched exactly once. Evicted roots are watched again
    /// so that the next load re-populates them. Ancestors are never reloaded
    /// here.
    pub(crate) fn invalidate(&mut self, host: &dyn ModuleHost, path: &Path) -> Result<Cascade> {
        if !self.graph.has(path) {
            return Err(ReloadError::InconsistentState(path.to_path_buf()));
        }
        info!("A change was detected on module {}", path.display());

        let mut cascade = Cascade::new(path);
        let mut visited: HashSet<PathBuf> = HashSet::new();
        let mut stack = vec![path.to_path_buf()];

        while let Some(current) = stack.pop() {
            if !visited.insert(current.clone()) {
                continue;
            }
            let Some(node) = self.graph.remove_node(&current) else {
                continue;
            };

            debug!("Invalidating {}", current.display());
            host.evict(&current);
            if let Err(e) = self.watcher.unwatch_path(&current) {
                warn!("{}", e);
            }
            self.retired.insert(current.clone());
            cascade.evicted.push(current.clone());

            if node.is_root() {
                match self.track(&current) {
                    Ok(_) => {
                        debug!("Root node {} re-armed", current.display());
                        cascade.rearmed.push(current);
                    }
                    Err(e) => {
                        warn!("Dropping root {}: {}", current.display(), e);
                        cascade.dropped.push(current);
                    }
                }
                continue;
            }

            for parent in node.parents {
                if !visited.contains(&parent) && self.graph.has(&parent) {
                    stack.push(parent);
                }
            }
        }

        info!(
            "Invalidated {} modules ({} re-armed)",
            cascade.evicted.len(),
            cascade.rearmed.len()
        );
        Ok(cascade)
    }
}
