//! Named transmit resources.
//!
//! An external transmission engine and the handoff operators agree on the descriptor pool and the
//! channel by name. The registry is where both are published after setup. Operators constructed
//! with explicit handles never consult it.
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::descriptor::DescriptorPool;
use crate::ring::Producer;

/// The well-known name of the transmission channel.
pub const TX_RING: &str = "TX_RING";

/// The well-known name of the descriptor pool.
pub const TX_META_POOL: &str = "TX_META_POOL";

/// A directory of descriptor pools and channel producers.
#[derive(Debug, Default)]
pub struct Registry {
    pools: RwLock<HashMap<String, Arc<DescriptorPool>>>,
    rings: RwLock<HashMap<String, Producer>>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Registry::default()
    }

    /// The process-wide registry.
    pub fn global() -> &'static Arc<Registry> {
        static GLOBAL: OnceLock<Arc<Registry>> = OnceLock::new();
        GLOBAL.get_or_init(|| Arc::new(Registry::new()))
    }

    /// Publish a pool under its name, returning a previously published pool of that name.
    pub fn register_pool(&self, pool: Arc<DescriptorPool>) -> Option<Arc<DescriptorPool>> {
        let name = pool.name().to_owned();
        let previous = self.pools.write().insert(name.clone(), pool);
        if previous.is_some() {
            warn!(pool = %name, "Replaced registered descriptor pool");
        } else {
            debug!(pool = %name, "Registered descriptor pool");
        }
        previous
    }

    /// Publish a channel under its name, returning a previously published channel of that name.
    pub fn register_ring(&self, producer: Producer) -> Option<Producer> {
        let name = producer.ring().name().to_owned();
        let previous = self.rings.write().insert(name.clone(), producer);
        if previous.is_some() {
            warn!(ring = %name, "Replaced registered channel");
        } else {
            debug!(ring = %name, "Registered channel");
        }
        previous
    }

    /// Look up a pool.
    pub fn pool(&self, name: &str) -> Option<Arc<DescriptorPool>> {
        self.pools.read().get(name).cloned()
    }

    /// Look up a channel.
    pub fn ring(&self, name: &str) -> Option<Producer> {
        self.rings.read().get(name).cloned()
    }

    /// Withdraw a pool.
    pub fn unregister_pool(&self, name: &str) -> Option<Arc<DescriptorPool>> {
        self.pools.write().remove(name)
    }

    /// Withdraw a channel.
    pub fn unregister_ring(&self, name: &str) -> Option<Producer> {
        self.rings.write().remove(name)
    }
}
