//! Native file watching and the change dispatch loop

pub mod watcher;
pub mod service;

pub use watcher::{NotifyFactory, NotifyWatcher, WatchEvent};
pub use service::ReloadService;
