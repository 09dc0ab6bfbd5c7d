//! Unit tests for the script host and its interplay with the reloader

use crate::*;
use modwatch_core::test_utils::RecordingFactory;
use modwatch_core::{Eligibility, ModuleHost, Reloader};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// Create `a.mod -> b.mod -> c.mod` under a temp dir, returning canonical paths.
fn chain_repo() -> (TempDir, PathBuf, PathBuf, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    fs::create_dir_all(root.join("lib")).unwrap();
    fs::write(root.join("a.mod"), "@import \"./lib/b.mod\"\nname = a\n").unwrap();
    fs::write(root.join("lib/b.mod"), "@import \"./c\"\nname = b\n").unwrap();
    fs::write(root.join("lib/c.mod"), "name = c\n").unwrap();

    let a = fs::canonicalize(root.join("a.mod")).unwrap();
    let b = fs::canonicalize(root.join("lib/b.mod")).unwrap();
    let c = fs::canonicalize(root.join("lib/c.mod")).unwrap();
    (temp_dir, a, b, c)
}

fn reloader_for(host: &Arc<ScriptHost>, root: &Path) -> (Arc<RecordingFactory>, Reloader) {
    let factory = RecordingFactory::new();
    let root = fs::canonicalize(root).unwrap();
    let reloader = Reloader::new(
        host.clone(),
        factory.clone(),
        Eligibility::for_project(&root, "vendor"),
    );
    (factory, reloader)
}

#[test]
fn test_require_loads_imports() {
    let (_temp_dir, a, b, c) = chain_repo();
    let host = ScriptHost::new();

    let module = host.require(a.to_str().unwrap(), None).unwrap();

    assert_eq!(module.imports, vec![b.clone()]);
    assert_eq!(host.cached_paths().len(), 3);
    assert_eq!(host.get(&b).unwrap().imports, vec![c.clone()]);
    assert!(host.is_cached(&c));
}

#[test]
fn test_require_serves_from_cache() {
    let (_temp_dir, a, _b, _c) = chain_repo();
    let host = ScriptHost::new();

    let first = host.require(a.to_str().unwrap(), None).unwrap();
    fs::write(&a, "name = changed\n").unwrap();
    let second = host.require(a.to_str().unwrap(), None).unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    host.evict(&a);
    let third = host.require(a.to_str().unwrap(), None).unwrap();
    assert_eq!(third.source, "name = changed\n");
}

#[test]
fn test_import_cycle_loads_once() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("x.mod"), "@import \"./y.mod\"\n").unwrap();
    fs::write(temp_dir.path().join("y.mod"), "@import \"./x.mod\"\n").unwrap();
    let host = ScriptHost::new();

    host.require(temp_dir.path().join("x.mod").to_str().unwrap(), None)
        .unwrap();

    assert_eq!(host.len(), 2);
}

#[test]
fn test_missing_import_fails_and_uncaches() {
    let temp_dir = TempDir::new().unwrap();
    let entry = temp_dir.path().join("entry.mod");
    fs::write(&entry, "@import \"./gone.mod\"\n").unwrap();
    let host = ScriptHost::new();

    let err = host.require(entry.to_str().unwrap(), None).unwrap_err();

    assert!(matches!(err, modwatch_core::HostError::Resolution { .. }));
    assert!(host.is_empty());
}

#[test]
fn test_bare_requests_use_packages_dir() {
    let temp_dir = TempDir::new().unwrap();
    let packages = temp_dir.path().join("vendor");
    fs::create_dir_all(&packages).unwrap();
    fs::write(packages.join("pad.mod"), "name = pad\n").unwrap();
    let entry = temp_dir.path().join("entry.mod");
    fs::write(&entry, "@import \"pad\"\n").unwrap();

    let without = ScriptHost::new();
    assert!(without.require(entry.to_str().unwrap(), None).is_err());

    let host = ScriptHost::new().with_packages_dir(&packages);
    let module = host.require(entry.to_str().unwrap(), None).unwrap();
    assert_eq!(
        module.imports,
        vec![fs::canonicalize(packages.join("pad.mod")).unwrap()]
    );
}

#[test]
fn test_reloader_tracks_loaded_tree() {
    let (temp_dir, a, b, c) = chain_repo();
    let host = Arc::new(ScriptHost::new());
    let (factory, reloader) = reloader_for(&host, temp_dir.path());

    reloader.watch(&a).unwrap();
    host.require(a.to_str().unwrap(), None).unwrap();

    assert_eq!(reloader.tracked_paths().len(), 3);
    assert!(reloader.node(&b).unwrap().has_parent(&a));
    assert!(reloader.node(&c).unwrap().has_parent(&b));
    assert_eq!(factory.log.lock().watched.len(), 3);
}

#[test]
fn test_vendored_imports_are_not_tracked() {
    let temp_dir = TempDir::new().unwrap();
    let root = fs::canonicalize(temp_dir.path()).unwrap();
    fs::create_dir_all(root.join("vendor")).unwrap();
    fs::write(root.join("vendor/pad.mod"), "name = pad\n").unwrap();
    fs::write(root.join("entry.mod"), "@import \"pad\"\n").unwrap();

    let host = Arc::new(ScriptHost::new().with_packages_dir(root.join("vendor")));
    let (_factory, reloader) = reloader_for(&host, &root);

    reloader.watch(&root.join("entry.mod")).unwrap();
    host.require(root.join("entry.mod").to_str().unwrap(), None)
        .unwrap();

    assert_eq!(reloader.tracked_paths(), vec![root.join("entry.mod")]);
    assert!(host.is_cached(&root.join("vendor/pad.mod")));
}

#[test]
fn test_change_reloads_fresh_code() {
    let (temp_dir, a, b, c) = chain_repo();
    let host = Arc::new(ScriptHost::new());
    let (_factory, reloader) = reloader_for(&host, temp_dir.path());
    reloader.watch(&a).unwrap();
    host.require(a.to_str().unwrap(), None).unwrap();

    fs::write(&c, "name = c2\n").unwrap();
    let cascade = reloader.dispatch_change(&c).unwrap();
    assert_eq!(cascade.evicted, vec![c.clone(), b.clone(), a.clone()]);
    assert!(host.is_empty());

    host.require(a.to_str().unwrap(), None).unwrap();
    assert_eq!(host.get(&c).unwrap().source, "name = c2\n");
    assert!(reloader.node(&c).unwrap().has_parent(&b));
}

#[test]
fn test_extension_is_optional() {
    let (_temp_dir, a, _b, _c) = chain_repo();
    let host = ScriptHost::new();
    let bare = a.with_extension("");

    let resolved = host.resolve(bare.to_str().unwrap(), None).unwrap();
    assert_eq!(resolved, a);
}
