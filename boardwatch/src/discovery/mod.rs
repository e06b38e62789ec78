//! Port discovery.
//!
//! Discovery backends enumerate communication ports and report hotplug
//! events. The [`DiscoveryManager`] fans several backends into one snapshot
//! and one event feed; board identification consumes only the manager.
//!
//! Backends follow the same shape: `start()` brings the backend up and takes
//! an initial inventory, `list()` returns the current inventory without
//! blocking, and `monitor()` pushes events until its shutdown token is
//! cancelled or the receiving side goes away.

pub mod serial;

use crate::{
    error::{Error, Result},
    port::Port,
    tracing::prelude::*,
};
use async_trait::async_trait;
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::{sync::CancellationToken, task::TaskTracker};

/// Capacity of the merged discovery feed.
const FEED_CAPACITY: usize = 16;

/// Kind of change reported by a discovery event.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EventType {
    Add,
    Remove,
}

/// A port appearing on or disappearing from a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryEvent {
    pub event_type: EventType,
    pub port: Port,
}

impl DiscoveryEvent {
    pub fn add(port: Port) -> Self {
        Self {
            event_type: EventType::Add,
            port,
        }
    }

    pub fn remove(port: Port) -> Self {
        Self {
            event_type: EventType::Remove,
            port,
        }
    }
}

/// A source of ports.
#[async_trait]
pub trait DiscoveryBackend: Send + Sync {
    /// Short identifier used in logs and start errors (e.g., "serial").
    fn id(&self) -> &str;

    /// Bring the backend up and take the initial inventory.
    async fn start(&self) -> Result<()>;

    /// Ports currently known to this backend.
    fn list(&self) -> Vec<Port>;

    /// Report events on `events` until `shutdown` is cancelled.
    ///
    /// Returning drops `events`; the merged feed closes once every backend
    /// has returned.
    async fn monitor(
        &self,
        events: mpsc::Sender<DiscoveryEvent>,
        shutdown: CancellationToken,
    ) -> Result<()>;
}

/// Set of configured discovery backends.
#[derive(Clone, Default)]
pub struct DiscoveryManager {
    backends: Vec<Arc<dyn DiscoveryBackend>>,
}

impl DiscoveryManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_backend(mut self, backend: Arc<dyn DiscoveryBackend>) -> Self {
        self.add(backend);
        self
    }

    pub fn add(&mut self, backend: Arc<dyn DiscoveryBackend>) {
        debug!(backend = %backend.id(), "Adding discovery backend");
        self.backends.push(backend);
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    /// Start every backend concurrently.
    ///
    /// A backend that fails to start does not prevent the others from
    /// running; its error is returned in the list.
    pub async fn start(&self) -> Vec<Error> {
        let results = join_all(self.backends.iter().map(|backend| async move {
            (backend.id().to_string(), backend.start().await)
        }))
        .await;

        results
            .into_iter()
            .filter_map(|(backend, result)| {
                let e = result.err()?;
                warn!(backend = %backend, error = %e, "Discovery backend failed to start");
                Some(Error::Discovery {
                    backend,
                    message: e.to_string(),
                })
            })
            .collect()
    }

    /// Snapshot of all ports, in backend order.
    pub fn list(&self) -> Vec<Port> {
        self.backends.iter().flat_map(|b| b.list()).collect()
    }

    /// Subscribe to events from every backend.
    pub fn watch(&self) -> Result<Subscription> {
        if self.backends.is_empty() {
            return Err(Error::Discovery {
                backend: "manager".to_string(),
                message: "no discovery backends configured".to_string(),
            });
        }

        let (events_tx, events_rx) = mpsc::channel(FEED_CAPACITY);
        let shutdown = CancellationToken::new();
        let tracker = TaskTracker::new();

        for backend in &self.backends {
            let backend = Arc::clone(backend);
            let events_tx = events_tx.clone();
            let shutdown = shutdown.clone();
            tracker.spawn(async move {
                trace!(backend = %backend.id(), "Monitor started.");
                if let Err(e) = backend.monitor(events_tx, shutdown).await {
                    error!(backend = %backend.id(), error = %e, "Discovery monitor failed");
                }
                trace!(backend = %backend.id(), "Monitor stopped.");
            });
        }
        tracker.close();

        Ok(Subscription {
            feed: events_rx,
            closer: SubscriptionCloser(shutdown),
        })
    }
}

/// A live event feed from the discovery backends.
pub struct Subscription {
    feed: mpsc::Receiver<DiscoveryEvent>,
    closer: SubscriptionCloser,
}

impl Subscription {
    /// Next event, or `None` once the feed is exhausted.
    pub async fn next(&mut self) -> Option<DiscoveryEvent> {
        self.feed.recv().await
    }

    /// Ask the backends to stop. Events already queued remain readable.
    pub fn close(&self) {
        self.closer.close();
    }

    /// Split into the raw feed and a handle that closes it.
    pub fn into_parts(self) -> (mpsc::Receiver<DiscoveryEvent>, SubscriptionCloser) {
        (self.feed, self.closer)
    }
}

/// Closes a [`Subscription`] from another task.
#[derive(Debug, Clone)]
pub struct SubscriptionCloser(CancellationToken);

impl SubscriptionCloser {
    pub fn close(&self) {
        self.0.cancel();
    }
}
