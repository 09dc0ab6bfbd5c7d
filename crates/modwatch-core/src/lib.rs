//! Modwatch Core — dependency graph, eligibility policy, and cascading invalidation

pub mod model;
pub mod eligibility;
pub mod graph;
pub mod hooks;
pub mod host;
pub mod watch;
pub mod error;
pub mod config;
pub mod cascade;
pub mod reloader;
pub mod export;


#[cfg(any(test, feature = "test-util"))]
pub mod test_utils;

pub use model::Node;
pub use eligibility::Eligibility;
pub use graph::DependencyGraph;
pub use hooks::{HookRegistry, LoadHook};
pub use host::{HostError, ModuleHost};
pub use watch::{PathWatcher, WatchError, WatcherFactory};
pub use error::{ReloadError, Result};
pub use config::{ConfigError, WatchConfig, CONFIG_FILE};
pub use cascade::Cascade;
pub use reloader::Reloader;
pub use export::GraphSnapshot;
