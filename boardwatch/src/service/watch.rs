//! Live board connect/disconnect events.
//!
//! A watch runs two tasks. The translation task reads raw discovery events
//! in order, identifies boards for `add` events, and forwards every event to
//! the caller's channel. The cancellation task waits for
//! [`WatchHandle::cancel`] and closes the discovery subscription; the
//! translation task then drains what the subscription already produced and
//! closes the caller's channel.

use super::BoardService;
use crate::{
    board::DetectedPort,
    discovery::{DiscoveryEvent, EventType, SubscriptionCloser},
    error::{Error, Result},
    identify::identify,
    lookup::RemoteLookup,
    session::{ExplorerLease, Instance},
    tracing::prelude::*,
};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::{sync::CancellationToken, task::TaskTracker};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardListWatchRequest {
    pub instance: Instance,
}

/// A port appearing or disappearing, with the boards identified on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WatchEvent {
    pub event_type: EventType,
    pub port: DetectedPort,
    /// Why identification failed for this event, if it did. The event is
    /// still delivered, with no matching boards.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Stops a running watch.
pub struct WatchHandle {
    cancel: CancellationToken,
    tracker: TaskTracker,
}

impl WatchHandle {
    /// Stop watching. Events already read from discovery are still
    /// delivered before the channel closes.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Wait until both watch tasks have finished.
    pub async fn wait(&self) {
        self.tracker.wait().await;
    }
}

impl BoardService {
    /// Stream board connection and disconnection events.
    ///
    /// Must be called from within a Tokio runtime. The returned channel is
    /// bounded; a consumer that stops reading stalls identification rather
    /// than losing events.
    pub fn watch(
        &self,
        req: BoardListWatchRequest,
    ) -> Result<(mpsc::Receiver<WatchEvent>, WatchHandle)> {
        let explorer = self
            .registry
            .acquire(req.instance)
            .ok_or(Error::InvalidInstance)?;
        let (feed, closer) = explorer.discovery().watch()?.into_parts();

        let cancel = CancellationToken::new();
        let done = CancellationToken::new();
        let tracker = TaskTracker::new();
        let (events_tx, events_rx) = mpsc::channel(self.watch_capacity);

        tracker.spawn(propagate_cancel(cancel.clone(), done.clone(), closer.clone()));
        tracker.spawn(translate(
            explorer,
            Arc::clone(&self.remote),
            feed,
            events_tx,
            closer,
            done,
        ));
        tracker.close();
        debug!(instance = req.instance.0, "Watching for board events");

        Ok((events_rx, WatchHandle { cancel, tracker }))
    }
}

async fn propagate_cancel(
    cancel: CancellationToken,
    done: CancellationToken,
    closer: SubscriptionCloser,
) {
    tokio::select! {
        _ = cancel.cancelled() => {
            debug!("Watch cancelled, closing discovery subscription");
            closer.close();
        }
        _ = done.cancelled() => {}
    }
}

async fn translate(
    explorer: ExplorerLease,
    remote: Arc<dyn RemoteLookup>,
    mut feed: mpsc::Receiver<DiscoveryEvent>,
    events_tx: mpsc::Sender<WatchEvent>,
    closer: SubscriptionCloser,
    done: CancellationToken,
) {
    let _done = done.drop_guard();

    while let Some(DiscoveryEvent { event_type, port }) = feed.recv().await {
        let mut detected = DetectedPort::unidentified(port);
        let mut error = None;

        if event_type == EventType::Add {
            match identify(explorer.signatures(), remote.as_ref(), &detected.port).await {
                Ok(boards) => detected.matching_boards = boards,
                Err(e) => {
                    warn!(port = %detected.port.address, error = %e, "Board identification failed");
                    error = Some(e.to_string());
                }
            }
        }

        trace!(event = %event_type, port = %detected.port.address, "Forwarding board event");
        let event = WatchEvent {
            event_type,
            port: detected,
            error,
        };
        if events_tx.send(event).await.is_err() {
            debug!("Watch receiver dropped, closing discovery subscription");
            closer.close();
            break;
        }
    }

    trace!("Watch stream ended.");
}
