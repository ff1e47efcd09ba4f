//! Setting up a transmit path.
//!
//! The setup validates the configuration and resolves every interface to a port before creating
//! any resource. If any of that fails there is no transmit path at all, not a partial one.
use std::sync::Arc;

use tracing::info;

use crate::config::TxConfig;
use crate::descriptor::DescriptorPool;
use crate::handoff::HandoffOperator;
use crate::port::{PortTable, Resolve};
use crate::registry::Registry;
use crate::ring::{Consumer, TxRing};
use crate::ConfigError;

/// An initialized transmit path.
#[derive(Debug)]
pub struct TxPath {
    operator: HandoffOperator,
    consumer: Consumer,
    pool: Arc<DescriptorPool>,
    ports: PortTable,
    registry: Arc<Registry>,
}

impl TxPath {
    /// Set up a transmit path with a private registry.
    pub fn init(config: &TxConfig, resolver: &impl Resolve) -> Result<Self, ConfigError> {
        Self::init_in(config, resolver, Arc::new(Registry::new()))
    }

    /// Set up a transmit path, publishing the pool and channel in `registry`.
    ///
    /// Pass [`Registry::global`] to make them available to operators elsewhere in the process.
    pub fn init_in(
        config: &TxConfig,
        resolver: &impl Resolve,
        registry: Arc<Registry>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let ports = PortTable::resolve_all(config, resolver)?;

        let pool = DescriptorPool::new(
            config.pool.name.as_str(),
            config.pool.descriptors,
            config.pool.max_packets,
        );
        let (producer, consumer) = TxRing::with_capacity(config.ring.name.as_str(), config.ring.capacity);

        registry.register_pool(Arc::clone(&pool));
        registry.register_ring(producer.clone());

        info!(
            interfaces = ports.len(),
            descriptors = pool.capacity(),
            ring_capacity = consumer.ring().capacity(),
            "Transmit path initialized",
        );

        Ok(TxPath {
            operator: HandoffOperator::new(Arc::clone(&pool), producer),
            consumer,
            pool,
            ports,
            registry,
        })
    }

    /// The descriptor pool.
    pub fn pool(&self) -> &Arc<DescriptorPool> {
        &self.pool
    }

    /// The resolved ports.
    pub fn ports(&self) -> &PortTable {
        &self.ports
    }

    /// The registry the resources are published in.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Split into the producer side, the consumer side and the port table.
    pub fn into_parts(self) -> (HandoffOperator, Consumer, PortTable) {
        (self.operator, self.consumer, self.ports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::burst::PortId;
    use crate::config::InterfaceConfig;
    use crate::port::StaticResolver;
    use crate::registry::{TX_META_POOL, TX_RING};

    fn config() -> TxConfig {
        let mut config = TxConfig::default();
        config.pool.descriptors = 4;
        config.ring.capacity = 2;
        config.interfaces.push(InterfaceConfig::new("eth0"));
        config
    }

    #[test]
    fn publishes_resources() {
        let resolver: StaticResolver = vec![("eth0", PortId(4))].into_iter().collect();
        let path = TxPath::init(&config(), &resolver).unwrap();

        assert_eq!(path.ports().port("eth0"), Some(PortId(4)));
        let pool = path.registry().pool(TX_META_POOL).unwrap();
        assert!(Arc::ptr_eq(&pool, path.pool()));
        assert_eq!(path.registry().ring(TX_RING).unwrap().ring().capacity(), 2);
    }

    #[test]
    fn invalid_config_creates_nothing() {
        let registry = Arc::new(Registry::new());
        let mut config = config();
        config.pool.descriptors = 0;

        let err = TxPath::init_in(&config, &StaticResolver::new(), Arc::clone(&registry));
        assert!(matches!(err, Err(ConfigError::Invalid(_))));
        assert!(registry.pool(TX_META_POOL).is_none());
    }
}
