use std::sync::Arc;

use txhandoff::{
    BufferPool, Burst, BurstHeader, ConfigError, HandoffOperator, Outcome, PortId, Registry,
    StaticResolver, TxConfig, TxPath, TX_META_POOL, TX_RING,
};

const CONFIG: &str = r#"
    [pool]
    descriptors = 4
    max_packets = 8

    [ring]
    capacity = 2

    [[interface]]
    name = "eth0"
    queues = 2
    batch_size = 8

    [[interface]]
    name = "missing0"
"#;

#[test]
fn unknown_interface_is_fatal() {
    let config = TxConfig::from_toml_str(CONFIG).unwrap();
    // Valid apart from the port, `missing0` falls back to the pool's packet limit.
    config.validate().unwrap();
    assert_eq!(config.batch_size(&config.interfaces[1]), 8);
    let resolver: StaticResolver = vec![("eth0", PortId(0))].into_iter().collect();
    let registry = Arc::new(Registry::new());

    let err = TxPath::init_in(&config, &resolver, Arc::clone(&registry)).unwrap_err();
    match &err {
        ConfigError::UnknownInterface { name } => assert_eq!(name, "missing0"),
        other => panic!("Unexpected error {:?}", other),
    }
    assert_eq!(err.to_string(), "failed to get port id from interface missing0");

    // No resources were published for operators to find.
    assert!(registry.pool(TX_META_POOL).is_none());
    assert!(registry.ring(TX_RING).is_none());
}

#[test]
fn operators_find_published_resources() {
    let config = TxConfig::from_toml_str(CONFIG).unwrap();
    let resolver: StaticResolver = vec![("eth0", PortId(0)), ("missing0", PortId(1))]
        .into_iter()
        .collect();
    let registry = Arc::new(Registry::new());
    let mut operator = HandoffOperator::lookup(Arc::clone(&registry), TX_RING, TX_META_POOL);
    let buffers = BufferPool::new(64, 4);

    let mut early = Burst::new(BurstHeader::default());
    early.push(buffers.alloc().unwrap());
    assert_eq!(operator.compute(early), Outcome::Deferred);

    let path = TxPath::init_in(&config, &resolver, Arc::clone(&registry)).unwrap();
    assert_eq!(path.ports().port("missing0"), Some(PortId(1)));

    let mut late = Burst::new(BurstHeader::default());
    late.push(buffers.alloc().unwrap());
    assert_eq!(operator.compute(late), Outcome::Sent);
    assert_eq!(path.pool().in_use(), 1);

    let (_, mut consumer, _) = path.into_parts();
    assert_eq!(consumer.dequeue().unwrap().len(), 1);
    assert_eq!(buffers.available(), 4);
}

#[test]
fn malformed_files_are_rejected() {
    assert!(matches!(
        TxConfig::from_toml_str("[pool]\ndescriptors = \"many\""),
        Err(ConfigError::Parse(_)),
    ));
    assert!(matches!(
        TxConfig::load("/nonexistent/tx.toml"),
        Err(ConfigError::Io(_)),
    ));
}
