//! Board listing and watching.
//!
//! [`BoardService`] ties an instance's discovery backends and signature
//! database to the remote lookup, and exposes the two operations callers
//! use: a one-shot snapshot ([`BoardService::list`]) and a live event
//! stream ([`BoardService::watch`]).

mod list;
mod watch;

use crate::{lookup::RemoteLookup, session::InstanceRegistry};
use std::sync::Arc;

pub use list::{BoardList, BoardListRequest, ListError};
pub use watch::{BoardListWatchRequest, WatchEvent, WatchHandle};

/// Entry point for board identification over an instance registry.
#[derive(Clone)]
pub struct BoardService {
    registry: Arc<InstanceRegistry>,
    remote: Arc<dyn RemoteLookup>,
    watch_capacity: usize,
}

impl BoardService {
    pub fn new(registry: Arc<InstanceRegistry>, remote: Arc<dyn RemoteLookup>) -> Self {
        Self {
            registry,
            remote,
            watch_capacity: 1,
        }
    }

    /// Capacity of the channel returned by [`BoardService::watch`].
    pub fn with_watch_capacity(mut self, capacity: usize) -> Self {
        self.watch_capacity = capacity.max(1);
        self
    }

    pub fn registry(&self) -> &InstanceRegistry {
        &self.registry
    }
}
