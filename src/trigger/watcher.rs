// src/trigger/watcher.rs

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::engine::RuntimeEvent;
use crate::trigger::marker::TriggerMarker;
use crate::types::Trigger;

/// Handle for the marker watcher.
///
/// Keeps the `notify` watcher alive and owns the polling task. Dropping this
/// handle stops both.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
    poll: JoinHandle<()>,
    events: JoinHandle<()>,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

impl Drop for WatcherHandle {
    fn drop(&mut self) {
        self.poll.abort();
        self.events.abort();
    }
}

/// Consume `marker` and, if this call removed it, forward one
/// `RuntimeEvent::Triggered` for its signal.
///
/// Returns whether an event was sent. Duplicate notifications for a single
/// marker creation find nothing to remove and send nothing. If the runtime
/// is gone the marker is raised again.
pub async fn observe_marker(
    marker: &TriggerMarker,
    runtime_tx: &mpsc::Sender<RuntimeEvent>,
) -> bool {
    if !marker.consume() {
        return false;
    }

    let event = RuntimeEvent::Triggered(Trigger::Signal(marker.kind()));
    if let Err(e) = runtime_tx.send(event).await {
        // Put the request back so the next service start picks it up.
        warn!(signal = %marker.kind(), error = %e, "runtime gone; re-raising marker");
        if let Err(e) = marker.raise() {
            warn!(signal = %marker.kind(), error = %e, "failed to re-raise marker");
        }
        return false;
    }
    true
}

/// Watch the given markers and turn their creation into runtime events.
///
/// - `notify` watches each marker's parent directory (non-recursively).
/// - A polling task checks every `poll_interval` as a backstop for missed
///   notifications. Its first tick fires immediately, which also picks up
///   markers created before the service started.
pub fn spawn_marker_watcher(
    markers: Vec<TriggerMarker>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    poll_interval: Duration,
) -> Result<WatcherHandle> {
    let markers = Arc::new(markers);

    // Channel from the blocking notify callback into the async world.
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if let Err(err) = event_tx.send(event) {
                    // We can't log via tracing here easily, so fallback to stderr.
                    eprintln!("outset: failed to forward notify event: {err}");
                }
            }
            Err(err) => {
                eprintln!("outset: marker watch error: {err}");
            }
        },
        Config::default(),
    )?;

    for marker in markers.iter() {
        marker
            .ensure_parent()
            .with_context(|| format!("creating marker directory for {:?}", marker.path()))?;
    }

    let dirs: BTreeSet<PathBuf> = markers
        .iter()
        .filter_map(|m| m.path().parent().map(|p| p.to_path_buf()))
        .collect();
    for dir in dirs.iter() {
        watcher
            .watch(dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("watching marker directory {:?}", dir))?;
        info!(?dir, "watching for trigger markers");
    }

    let events = {
        let markers = Arc::clone(&markers);
        let runtime_tx = runtime_tx.clone();
        tokio::spawn(async move {
            while let Some(event) = event_rx.recv().await {
                debug!(?event, "received notify event");
                for path in event.paths.iter() {
                    for marker in markers.iter() {
                        if path.file_name() == marker.path().file_name() {
                            observe_marker(marker, &runtime_tx).await;
                        }
                    }
                }
            }
            debug!("marker event loop finished");
        })
    };

    let poll = {
        let markers = Arc::clone(&markers);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poll_interval);
            loop {
                ticker.tick().await;
                for marker in markers.iter() {
                    if marker.is_pending() {
                        debug!(signal = %marker.kind(), "poll found pending marker");
                        observe_marker(marker, &runtime_tx).await;
                    }
                }
            }
        })
    };

    Ok(WatcherHandle {
        _inner: watcher,
        poll,
        events,
    })
}
