//! Dispatch loop feeding native change events into the reloader

use crate::watcher::WatchEvent;
use modwatch_core::{Cascade, ReloadError, Reloader};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{Instant, timeout_at};
use tracing::{debug, error, info, warn};

/// Receives watch events, coalesces bursts, and runs one cascade per changed
/// path. Cascades run one at a time, in arrival order.
pub struct ReloadService {
    reloader: Reloader,
    event_rx: mpsc::UnboundedReceiver<WatchEvent>,
    debounce: Duration,
    cascade_tx: Option<broadcast::Sender<Cascade>>,
}

impl ReloadService {
    pub fn new(
        reloader: Reloader,
        event_rx: mpsc::UnboundedReceiver<WatchEvent>,
        debounce: Duration,
    ) -> Self {
        Self {
            reloader,
            event_rx,
            debounce,
            cascade_tx: None,
        }
    }

    /// Publish every completed cascade on `cascade_tx`.
    pub fn with_broadcast(mut self, cascade_tx: broadcast::Sender<Cascade>) -> Self {
        self.cascade_tx = Some(cascade_tx);
        self
    }

    pub fn reloader(&self) -> &Reloader {
        &self.reloader
    }

    /// Process events until the channel closes.
    ///
    /// Returns an error only when a change arrives for a path the session
    /// never tracked; the caller should treat that as fatal.
    pub async fn process_events(&mut self) -> Result<(), ReloadError> {
        while let Some(event) = self.event_rx.recv().await {
            debug!("Processing watch event: {:?}", event);
            let batch = self.collect_batch(event).await;
            for path in batch {
                self.handle_change(path)?;
            }
        }

        info!("Watch event channel closed");
        Ok(())
    }

    /// Gather events arriving within the debounce window, one entry per path,
    /// in first-seen order.
    async fn collect_batch(&mut self, first: WatchEvent) -> Vec<PathBuf> {
        let mut batch = vec![first.into_path()];
        let deadline = Instant::now() + self.debounce;

        while let Ok(Some(event)) = timeout_at(deadline, self.event_rx.recv()).await {
            debug!("Processing watch event: {:?}", event);
            let path = event.into_path();
            if !batch.contains(&path) {
                batch.push(path);
            }
        }
        batch
    }

    fn handle_change(&self, path: PathBuf) -> Result<(), ReloadError> {
        match self.reloader.notify_changed(&path) {
            Ok(Some(cascade)) => {
                if let Some(ref cascade_tx) = self.cascade_tx {
                    // No receivers just means nobody is listening for reloads
                    let _ = cascade_tx.send(cascade);
                }
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(e) if e.is_fatal() => {
                error!("{}", e);
                Err(e)
            }
            Err(e) => {
                warn!("Failed to invalidate {}: {}", path.display(), e);
                Ok(())
            }
        }
    }
}
