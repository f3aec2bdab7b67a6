//! Atomically swapped configuration snapshot.

use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::config::PluginConfig;
use crate::plugin::PluginChain;

/// Plugin configuration and the chain built from it.
///
/// The only way to get a chain into the store is inside a `Snapshot`
/// together with the config that produced it.
#[derive(Debug)]
pub struct Snapshot {
    config: Option<PluginConfig>,
    chain: PluginChain,
}

impl Snapshot {
    pub fn new(config: Option<PluginConfig>, chain: PluginChain) -> Self {
        Self {
            config,
            chain,
        }
    }

    /// `None` when plugins were loaded without any configuration.
    pub fn config(&self) -> Option<&PluginConfig> {
        self.config.as_ref()
    }

    pub fn chain(&self) -> &PluginChain {
        &self.chain
    }

    /// Configuration as ini text; empty when there is none.
    pub fn config_text(&self) -> String {
        self.config
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default()
    }
}

/// Holds the current snapshot. Readers never block writers.
pub struct SnapshotStore {
    current: ArcSwap<Snapshot>,
}

impl SnapshotStore {
    pub fn new(initial: Snapshot) -> Self {
        Self {
            current: ArcSwap::from_pointee(initial),
        }
    }

    /// The current snapshot. In-flight users keep the one they loaded even
    /// if it is replaced meanwhile.
    pub fn get(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }

    /// Replace the current snapshot and return the stored value itself; the
    /// previous one is dropped once its last reader is done.
    pub fn set(&self, snapshot: Snapshot) -> Arc<Snapshot> {
        let snapshot = Arc::new(snapshot);
        self.current.store(Arc::clone(&snapshot));
        snapshot
    }
}

impl std::fmt::Debug for SnapshotStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotStore")
            .field("current", &self.current.load_full())
            .finish()
    }
}
