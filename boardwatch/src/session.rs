//! Instances and leased access to their discovery and signature state.
//!
//! An instance owns an [`Explorer`]: the configured discovery backends plus
//! the installed signature database. Operations borrow an explorer through
//! an [`ExplorerLease`], which is released when dropped.

use crate::{discovery::DiscoveryManager, signatures::SignatureDatabase, tracing::prelude::*};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    ops::Deref,
    sync::{
        atomic::{AtomicU32, AtomicUsize, Ordering},
        Arc,
    },
};

/// Handle naming an initialized instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Instance(pub u32);

/// Discovery and signature state shared by one instance.
pub struct Explorer {
    discovery: DiscoveryManager,
    signatures: Arc<dyn SignatureDatabase>,
}

impl Explorer {
    pub fn new(discovery: DiscoveryManager, signatures: Arc<dyn SignatureDatabase>) -> Self {
        Self {
            discovery,
            signatures,
        }
    }

    pub fn discovery(&self) -> &DiscoveryManager {
        &self.discovery
    }

    pub fn signatures(&self) -> &dyn SignatureDatabase {
        self.signatures.as_ref()
    }
}

struct Entry {
    explorer: Arc<Explorer>,
    leases: Arc<AtomicUsize>,
}

/// Registry of initialized instances.
#[derive(Default)]
pub struct InstanceRegistry {
    instances: RwLock<HashMap<Instance, Entry>>,
    next_id: AtomicU32,
}

impl InstanceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an explorer and return the instance naming it.
    pub fn create(&self, explorer: Explorer) -> Instance {
        let instance = Instance(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        self.instances.write().insert(
            instance,
            Entry {
                explorer: Arc::new(explorer),
                leases: Arc::new(AtomicUsize::new(0)),
            },
        );
        debug!(instance = instance.0, "Created instance");
        instance
    }

    /// Forget an instance. Outstanding leases stay valid until dropped.
    pub fn destroy(&self, instance: Instance) -> bool {
        let removed = self.instances.write().remove(&instance).is_some();
        if removed {
            debug!(instance = instance.0, "Destroyed instance");
        }
        removed
    }

    /// Lease the instance's explorer, or `None` if the instance is unknown.
    pub fn acquire(&self, instance: Instance) -> Option<ExplorerLease> {
        let instances = self.instances.read();
        let entry = instances.get(&instance)?;
        entry.leases.fetch_add(1, Ordering::AcqRel);
        trace!(instance = instance.0, "Explorer leased");
        Some(ExplorerLease {
            instance,
            explorer: Arc::clone(&entry.explorer),
            leases: Arc::clone(&entry.leases),
        })
    }

    /// Number of leases currently held on `instance`.
    pub fn active_leases(&self, instance: Instance) -> usize {
        self.instances
            .read()
            .get(&instance)
            .map_or(0, |entry| entry.leases.load(Ordering::Acquire))
    }
}

/// Scoped access to an instance's [`Explorer`].
pub struct ExplorerLease {
    instance: Instance,
    explorer: Arc<Explorer>,
    leases: Arc<AtomicUsize>,
}

impl ExplorerLease {
    pub fn instance(&self) -> Instance {
        self.instance
    }
}

impl Deref for ExplorerLease {
    type Target = Explorer;

    fn deref(&self) -> &Explorer {
        &self.explorer
    }
}

impl Drop for ExplorerLease {
    fn drop(&mut self) {
        self.leases.fetch_sub(1, Ordering::AcqRel);
        trace!(instance = self.instance.0, "Explorer released");
    }
}
