//! Integration tests for Modwatch
//!
//! These tests drive the real notify watcher, the script host and the
//! dispatch loop together against files on disk.

use modwatch_core::{Cascade, ModuleHost, Reloader};
use modwatch_host::ScriptHost;
use modwatch_watcher::{NotifyFactory, ReloadService};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{Duration, sleep, timeout};

struct Harness {
    _temp_dir: TempDir,
    root: PathBuf,
    host: Arc<ScriptHost>,
    reloader: Reloader,
    cascade_rx: broadcast::Receiver<Cascade>,
    dispatch: JoinHandle<()>,
}

impl Harness {
    fn new(files: &[(&str, &str)]) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let root = fs::canonicalize(temp_dir.path()).unwrap();
        for (name, contents) in files {
            let path = root.join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, contents).unwrap();
        }

        let config = modwatch_core::WatchConfig::for_root(&root);
        let host = Arc::new(ScriptHost::new().with_packages_dir(config.dependency_root()));
        let (factory, event_rx) = NotifyFactory::channel();
        let reloader = Reloader::new(host.clone(), Arc::new(factory), config.eligibility());

        let (cascade_tx, cascade_rx) = broadcast::channel(16);
        let mut service = ReloadService::new(reloader.clone(), event_rx, Duration::from_millis(50))
            .with_broadcast(cascade_tx);
        let dispatch = tokio::spawn(async move {
            let _ = service.process_events().await;
        });

        Harness {
            _temp_dir: temp_dir,
            root,
            host,
            reloader,
            cascade_rx,
            dispatch,
        }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn require(&self, name: &str) {
        self.host
            .require(self.path(name).to_str().unwrap(), None)
            .unwrap();
    }

    async fn next_cascade(&mut self) -> Cascade {
        timeout(Duration::from_secs(10), self.cascade_rx.recv())
            .await
            .expect("no cascade within timeout")
            .unwrap()
    }

    fn shutdown(self) {
        self.reloader.stop();
        self.dispatch.abort();
    }
}

/// Editing a dependency invalidates it and its dependents, and the next
/// require sees the new contents.
#[tokio::test]
async fn test_dependency_change_reloads_fresh_code() {
    let mut harness = Harness::new(&[
        ("main.mod", "@import \"./lib/util.mod\"\nname = main\n"),
        ("lib/util.mod", "value = 1\n"),
    ]);
    let main = harness.path("main.mod");
    let util = harness.path("lib/util.mod");

    harness.reloader.watch(&main).unwrap();
    harness.require("main.mod");
    let mut expected = vec![main.clone(), util.clone()];
    expected.sort();
    assert_eq!(harness.reloader.tracked_paths(), expected);

    sleep(Duration::from_millis(100)).await;
    fs::write(&util, "value = 2\n").unwrap();

    let cascade = harness.next_cascade().await;
    assert_eq!(cascade.trigger, util);
    assert!(cascade.was_evicted(&main));
    assert_eq!(cascade.rearmed, vec![main.clone()]);
    assert!(!harness.host.is_cached(&main));
    assert!(!harness.host.is_cached(&util));

    // Let trailing events from the same write drain before reloading
    sleep(Duration::from_millis(200)).await;
    harness.require("main.mod");
    assert_eq!(harness.host.get(&util).unwrap().source, "value = 2\n");
    assert!(harness.reloader.node(&util).unwrap().has_parent(&main));

    harness.shutdown();
}

/// A root keeps being watched across repeated edits.
#[tokio::test]
async fn test_root_change_is_repeatable() {
    let mut harness = Harness::new(&[("app.mod", "value = 0\n")]);
    let app = harness.path("app.mod");
    harness.reloader.watch(&app).unwrap();

    for round in 1..=2 {
        harness.require("app.mod");
        sleep(Duration::from_millis(100)).await;
        fs::write(&app, format!("value = {round}\n")).unwrap();

        let cascade = harness.next_cascade().await;
        assert_eq!(cascade.evicted, vec![app.clone()]);
        assert!(harness.reloader.is_tracked(&app));

        // Let trailing events from the same write drain before the next round
        sleep(Duration::from_millis(200)).await;
        while harness.cascade_rx.try_recv().is_ok() {}
    }

    harness.require("app.mod");
    assert_eq!(harness.host.get(&app).unwrap().source, "value = 2\n");
    harness.shutdown();
}

/// Vendored modules are loaded but never watched.
#[tokio::test]
async fn test_vendored_modules_are_not_tracked() {
    let harness = Harness::new(&[
        ("main.mod", "@import \"pad\"\n"),
        ("vendor/pad.mod", "value = pad\n"),
    ]);
    let main = harness.path("main.mod");

    harness.reloader.watch(&main).unwrap();
    harness.require("main.mod");

    assert_eq!(harness.reloader.tracked_paths(), vec![main]);
    assert!(harness.host.is_cached(&harness.path("vendor/pad.mod")));
    assert!(harness.reloader.watch(&harness.path("vendor/pad.mod")).is_err());
    harness.shutdown();
}

/// Deleting a root file drops it instead of re-arming a watch on nothing.
#[cfg(target_os = "linux")]
#[tokio::test]
async fn test_deleted_root_is_dropped() {
    let mut harness = Harness::new(&[("gone.mod", "value = 0\n")]);
    let gone = harness.path("gone.mod");
    harness.reloader.watch(&gone).unwrap();
    harness.require("gone.mod");

    sleep(Duration::from_millis(100)).await;
    fs::remove_file(&gone).unwrap();

    let cascade = harness.next_cascade().await;
    assert_eq!(cascade.dropped, vec![gone.clone()]);
    assert!(!harness.reloader.is_tracked(&gone));
    harness.shutdown();
}
