//! Configuration of a transmit path.
//!
//! The configuration is read from toml. Every table is optional except for the interface list,
//! a minimal file only names the interfaces to transmit on:
//!
//! ```
//! # use txhandoff::TxConfig;
//! let config = TxConfig::from_toml_str(r#"
//!     [pool]
//!     descriptors = 512
//!
//!     [[interface]]
//!     name = "eth0"
//!     queues = 2
//!     batch_size = 32
//! "#).unwrap();
//!
//! assert_eq!(config.pool.name, "TX_META_POOL");
//! assert_eq!(config.interfaces[0].queues, 2);
//! ```
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::registry::{TX_META_POOL, TX_RING};
use crate::ConfigError;

/// The complete transmit path configuration.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TxConfig {
    /// The descriptor pool.
    #[serde(default)]
    pub pool: PoolConfig,
    /// The transmission channel.
    #[serde(default)]
    pub ring: RingConfig,
    /// Interfaces to transmit on.
    #[serde(default, rename = "interface")]
    pub interfaces: Vec<InterfaceConfig>,
}

/// Sizing of the descriptor pool.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PoolConfig {
    /// Name under which the pool is registered.
    #[serde(default = "default_pool_name")]
    pub name: String,
    /// Number of descriptors.
    #[serde(default = "default_descriptors")]
    pub descriptors: usize,
    /// Packet handles per descriptor.
    #[serde(default = "default_max_packets")]
    pub max_packets: usize,
}

/// Sizing of the transmission channel.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RingConfig {
    /// Name under which the channel is registered.
    #[serde(default = "default_ring_name")]
    pub name: String,
    /// Number of descriptor slots.
    #[serde(default = "default_ring_capacity")]
    pub capacity: usize,
}

/// One transmit interface.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct InterfaceConfig {
    /// The interface name, e.g. `eth0`.
    pub name: String,
    /// Number of transmit queues.
    #[serde(default = "default_queues")]
    pub queues: u16,
    /// Maximum number of packets per burst.
    ///
    /// Defaults to 64, or `max_packets` of the pool if that is smaller.
    #[serde(default)]
    pub batch_size: Option<usize>,
    /// An explicit port, bypassing interface name resolution.
    #[serde(default)]
    pub port: Option<u16>,
}

fn default_pool_name() -> String {
    TX_META_POOL.to_owned()
}

fn default_ring_name() -> String {
    TX_RING.to_owned()
}

fn default_descriptors() -> usize {
    1 << 12
}

fn default_max_packets() -> usize {
    64
}

fn default_ring_capacity() -> usize {
    1 << 11
}

fn default_queues() -> u16 {
    1
}

fn default_batch_size() -> usize {
    64
}

impl TxConfig {
    /// Parse a configuration from toml.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Look up an interface by name.
    pub fn interface(&self, name: &str) -> Option<&InterfaceConfig> {
        self.interfaces.iter().find(|iface| iface.name == name)
    }

    /// The effective batch size of an interface.
    pub fn batch_size(&self, iface: &InterfaceConfig) -> usize {
        iface
            .batch_size
            .unwrap_or_else(|| default_batch_size().min(self.pool.max_packets))
    }

    /// Check the constraints that parsing alone does not enforce.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pool.descriptors == 0 {
            return Err(invalid("descriptor pool must not be empty"));
        }
        if self.pool.max_packets == 0 {
            return Err(invalid("descriptors must hold at least one packet"));
        }
        if self.ring.capacity == 0 {
            return Err(invalid("transmission channel must not be empty"));
        }
        if self.interfaces.is_empty() {
            return Err(invalid("no transmit interface configured"));
        }

        let mut names = BTreeSet::new();
        for iface in &self.interfaces {
            if !names.insert(iface.name.as_str()) {
                return Err(invalid(format!("interface {} configured twice", iface.name)));
            }
            if iface.queues == 0 {
                return Err(invalid(format!("interface {} has no queues", iface.name)));
            }
            let batch_size = self.batch_size(iface);
            if batch_size == 0 || batch_size > self.pool.max_packets {
                return Err(invalid(format!(
                    "batch size of interface {} must be within 1..={}",
                    iface.name, self.pool.max_packets,
                )));
            }
        }

        Ok(())
    }
}

fn invalid(msg: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(msg.into())
}

impl Default for PoolConfig {
    fn default() -> Self {
        PoolConfig {
            name: default_pool_name(),
            descriptors: default_descriptors(),
            max_packets: default_max_packets(),
        }
    }
}

impl Default for RingConfig {
    fn default() -> Self {
        RingConfig {
            name: default_ring_name(),
            capacity: default_ring_capacity(),
        }
    }
}

impl InterfaceConfig {
    /// An interface with default queue settings.
    pub fn new(name: impl Into<String>) -> Self {
        InterfaceConfig {
            name: name.into(),
            queues: default_queues(),
            batch_size: None,
            port: None,
        }
    }
}
