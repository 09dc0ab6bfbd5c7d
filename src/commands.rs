//! CLI command implementations

use crate::GraphFormat;
use anyhow::Context;
use modwatch_core::{Reloader, WatchConfig};
use modwatch_host::ScriptHost;
use modwatch_watcher::{NotifyFactory, ReloadService, WatchEvent};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};

/// Resolve the effective config: an explicit file, else `modwatch.toml` in
/// the project root, else defaults. An explicit `root` overrides the file's
/// `project_root`. The project root is canonicalized so dependency paths
/// compare against resolved module paths.
pub fn load_config(root: Option<&Path>, config_file: Option<&Path>) -> anyhow::Result<WatchConfig> {
    let mut config = match config_file {
        Some(file) => WatchConfig::from_file(file)?,
        None => WatchConfig::discover(root.unwrap_or(Path::new(".")))?,
    };
    if let Some(root) = root {
        config.project_root = root.to_path_buf();
    }
    config.project_root = std::fs::canonicalize(&config.project_root)
        .with_context(|| format!("project root {} does not exist", config.project_root.display()))?;
    tracing::debug!("Using config: {:?}", config);
    Ok(config)
}

struct Runtime {
    host: Arc<ScriptHost>,
    reloader: Reloader,
    event_rx: mpsc::UnboundedReceiver<WatchEvent>,
}

fn build(config: &WatchConfig) -> Runtime {
    let host = Arc::new(ScriptHost::new().with_packages_dir(config.dependency_root()));
    let (factory, event_rx) = NotifyFactory::channel();
    let reloader = Reloader::new(host.clone(), Arc::new(factory), config.eligibility());
    Runtime {
        host,
        reloader,
        event_rx,
    }
}

fn entry_path(entry: &Path) -> anyhow::Result<PathBuf> {
    std::fs::canonicalize(entry)
        .with_context(|| format!("entry module {} does not exist", entry.display()))
}

fn load_entry(host: &ScriptHost, entry: &Path) -> anyhow::Result<()> {
    let request = entry.to_string_lossy();
    let module = host.require(&request, None)?;
    tracing::info!(
        "Loaded {} ({} imports, {} modules cached)",
        module.path.display(),
        module.imports.len(),
        host.len()
    );
    Ok(())
}

pub async fn run(config: WatchConfig, entry: PathBuf) -> anyhow::Result<()> {
    let entry = entry_path(&entry)?;
    tracing::info!("Starting modwatch for: {}", entry.display());

    let Runtime {
        host,
        reloader,
        event_rx,
    } = build(&config);
    reloader.watch(&entry)?;
    load_entry(&host, &entry)?;
    tracing::info!("Tracking {} modules", reloader.tracked_paths().len());

    // Start the dispatch loop in background task
    let (cascade_tx, mut cascade_rx) = broadcast::channel(16);
    let mut service =
        ReloadService::new(reloader.clone(), event_rx, config.debounce()).with_broadcast(cascade_tx);
    let mut dispatch = tokio::spawn(async move { service.process_events().await });

    let outcome = loop {
        tokio::select! {
            received = cascade_rx.recv() => match received {
                Ok(cascade) => {
                    tracing::info!(
                        "{} changed, {} modules invalidated",
                        cascade.trigger.display(),
                        cascade.evicted.len()
                    );
                    if let Err(e) = load_entry(&host, &entry) {
                        tracing::warn!("Reload failed: {:#}", e);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!("Missed {} cascades, reloading", skipped);
                    if let Err(e) = load_entry(&host, &entry) {
                        tracing::warn!("Reload failed: {:#}", e);
                    }
                }
                Err(broadcast::error::RecvError::Closed) => break dispatch_outcome((&mut dispatch).await),
            },
            finished = &mut dispatch => break dispatch_outcome(finished),
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down");
                break Ok(());
            }
        }
    };

    dispatch.abort();
    reloader.stop();
    outcome
}

fn dispatch_outcome(
    finished: Result<Result<(), modwatch_core::ReloadError>, tokio::task::JoinError>,
) -> anyhow::Result<()> {
    match finished {
        Ok(result) => result.context("dispatch loop stopped"),
        Err(e) => Err(anyhow::Error::from(e)),
    }
}

pub fn graph(config: WatchConfig, entry: PathBuf, format: GraphFormat) -> anyhow::Result<()> {
    let entry = entry_path(&entry)?;
    let Runtime { host, reloader, .. } = build(&config);

    reloader.watch(&entry)?;
    load_entry(&host, &entry)?;
    let snapshot = reloader.snapshot();
    reloader.stop();

    match format {
        GraphFormat::Json => println!("{}", snapshot.to_json()?),
        GraphFormat::Dot => println!("{}", snapshot.to_dot()),
    }
    Ok(())
}
