//! Resolution of interface names to ports.
//!
//! Ports are resolved once while setting up the transmit path. The resulting [`PortTable`] is
//! read-only and consulted by nothing on the hot path.
use std::collections::BTreeMap;
use std::ffi::CString;

use tracing::{debug, error};

use crate::burst::PortId;
use crate::config::TxConfig;
use crate::ConfigError;

/// Maps an interface name to a port.
pub trait Resolve {
    /// Find the port of an interface, if there is one.
    fn resolve(&self, if_name: &str) -> Option<PortId>;
}

/// Resolves interfaces known to the host by their interface index.
#[derive(Clone, Copy, Debug, Default)]
pub struct SysResolver;

/// Resolves from a fixed table of names.
#[derive(Clone, Debug, Default)]
pub struct StaticResolver {
    ports: BTreeMap<String, PortId>,
}

/// The resolved ports of all configured interfaces.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PortTable {
    entries: Vec<(String, PortId)>,
}

impl Resolve for SysResolver {
    fn resolve(&self, if_name: &str) -> Option<PortId> {
        let name = CString::new(if_name).ok()?;
        let index = unsafe { libc::if_nametoindex(name.as_ptr()) };
        if index == 0 {
            return None;
        }
        u16::try_from(index).ok().map(PortId)
    }
}

impl StaticResolver {
    /// A resolver that knows no interface.
    pub fn new() -> Self {
        StaticResolver::default()
    }

    /// Add or replace an entry.
    pub fn insert(&mut self, if_name: impl Into<String>, port: PortId) -> &mut Self {
        self.ports.insert(if_name.into(), port);
        self
    }
}

impl Resolve for StaticResolver {
    fn resolve(&self, if_name: &str) -> Option<PortId> {
        self.ports.get(if_name).copied()
    }
}

impl<N: Into<String>> FromIterator<(N, PortId)> for StaticResolver {
    fn from_iter<I: IntoIterator<Item=(N, PortId)>>(iter: I) -> Self {
        StaticResolver {
            ports: iter.into_iter().map(|(name, port)| (name.into(), port)).collect(),
        }
    }
}

impl<R: Resolve + ?Sized> Resolve for &'_ R {
    fn resolve(&self, if_name: &str) -> Option<PortId> {
        (**self).resolve(if_name)
    }
}

impl PortTable {
    /// Resolve every configured interface.
    ///
    /// An explicit `port` in the interface configuration takes precedence over the resolver. The
    /// first interface without a port aborts the resolution, there is no partial table.
    pub fn resolve_all(config: &TxConfig, resolver: &impl Resolve) -> Result<Self, ConfigError> {
        let mut entries = Vec::with_capacity(config.interfaces.len());
        for iface in &config.interfaces {
            let port = match iface.port {
                Some(port) => PortId(port),
                None => match resolver.resolve(&iface.name) {
                    Some(port) => port,
                    None => {
                        error!(interface = %iface.name, "Failed to get port ID from interface");
                        return Err(ConfigError::UnknownInterface {
                            name: iface.name.clone(),
                        });
                    }
                },
            };

            debug!(interface = %iface.name, port = port.0, "Resolved interface");
            entries.push((iface.name.clone(), port));
        }

        Ok(PortTable { entries })
    }

    /// The port of a configured interface.
    pub fn port(&self, if_name: &str) -> Option<PortId> {
        self.entries
            .iter()
            .find(|(name, _)| name == if_name)
            .map(|&(_, port)| port)
    }

    /// All entries in configuration order.
    pub fn iter(&self) -> impl Iterator<Item=(&str, PortId)> + '_ {
        self.entries.iter().map(|(name, port)| (name.as_str(), *port))
    }

    /// The number of resolved interfaces.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no interface was resolved.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InterfaceConfig;
    use tracing_test::traced_test;

    fn config(names: &[&str]) -> TxConfig {
        TxConfig {
            interfaces: names.iter().map(|&name| InterfaceConfig::new(name)).collect(),
            ..TxConfig::default()
        }
    }

    #[test]
    fn resolves_in_order() {
        let resolver: StaticResolver = vec![("eth0", PortId(0)), ("eth1", PortId(1))]
            .into_iter()
            .collect();
        let table = PortTable::resolve_all(&config(&["eth1", "eth0"]), &resolver).unwrap();

        let entries: Vec<_> = table.iter().collect();
        assert_eq!(entries, [("eth1", PortId(1)), ("eth0", PortId(0))]);
        assert_eq!(table.port("eth0"), Some(PortId(0)));
        assert_eq!(table.port("eth2"), None);
    }

    #[test]
    fn unknown_interface_is_named() {
        let mut resolver = StaticResolver::new();
        resolver.insert("eth0", PortId(0));

        match PortTable::resolve_all(&config(&["eth0", "missing0"]), &resolver) {
            Err(ConfigError::UnknownInterface { name }) => assert_eq!(name, "missing0"),
            other => panic!("Unexpected resolution {:?}", other),
        }
    }

    #[traced_test]
    #[test]
    fn unknown_interface_is_logged() {
        let resolver: StaticResolver = vec![("eth0", PortId(0))].into_iter().collect();
        let result = PortTable::resolve_all(&config(&["eth0", "missing0"]), &resolver);
        assert!(result.is_err());

        assert!(logs_contain("ERROR"));
        assert!(logs_contain("Failed to get port ID from interface"));
        assert!(logs_contain("missing0"));
    }

    #[test]
    fn explicit_port_wins() {
        let mut config = config(&["virt0"]);
        config.interfaces[0].port = Some(9);
        let table = PortTable::resolve_all(&config, &StaticResolver::new()).unwrap();
        assert_eq!(table.port("virt0"), Some(PortId(9)));
    }

    #[test]
    fn sys_rejects_bogus_names() {
        assert_eq!(SysResolver.resolve("no such interface"), None);
        assert_eq!(SysResolver.resolve("nul\0byte"), None);
    }
}
