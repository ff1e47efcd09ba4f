//! The consumer side of the transmit path.
//!
//! A [`TxEngine`] drains the channel and hands every descriptor to a [`Driver`] which performs the
//! actual transmission. After the driver returns the descriptor is retired: its packet buffers go
//! back to their pool and the descriptor back to the descriptor pool. The driver only ever borrows
//! a descriptor so it can not hold on to a packet past its transmission.
//!
//! A real driver wraps a network card. The [`Loopback`] driver included here is a software device
//! which records what it would have sent.
use core::sync::atomic::{AtomicBool, Ordering};
use std::collections::BTreeMap;
use std::thread;

use tracing::{debug, warn};

use crate::burst::{BurstHeader, PortId};
use crate::descriptor::Descriptor;
use crate::ring::Consumer;
use crate::Result;

/// A device transmitting bursts.
pub trait Driver {
    /// Transmit the packets of a descriptor.
    ///
    /// Returns the number of packets accepted by the device. Packets not accepted are released
    /// along with the descriptor afterwards.
    fn transmit(&mut self, descriptor: &Descriptor) -> Result<usize>;
}

/// Drains a transmission channel into a driver.
pub struct TxEngine<D> {
    consumer: Consumer,
    driver: D,
    /// Maximum number of descriptors per poll.
    batch: usize,
    /// Descriptors dequeued in the current poll.
    scratch: Vec<Descriptor>,
    packets: u64,
    failed: u64,
}

/// A software device recording transmissions.
#[derive(Clone, Debug)]
pub struct Loopback {
    ports: BTreeMap<PortId, PortCounters>,
    history: Option<Vec<Observed>>,
}

/// Transmission totals of one port.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PortCounters {
    /// Bursts transmitted.
    pub bursts: u64,
    /// Packets transmitted.
    pub packets: u64,
    /// Payload bytes transmitted.
    pub bytes: u64,
}

/// A burst as observed by the loopback device.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Observed {
    /// The header of the descriptor.
    pub header: BurstHeader,
    /// Number of packets.
    pub packets: usize,
    /// Sum of all packet lengths.
    pub bytes: usize,
}

impl<D: Driver> TxEngine<D> {
    /// Create an engine retiring up to `batch` descriptors per poll.
    pub fn new(consumer: Consumer, driver: D, batch: usize) -> Self {
        let batch = batch.max(1);
        TxEngine {
            consumer,
            driver,
            batch,
            scratch: Vec::with_capacity(batch),
            packets: 0,
            failed: 0,
        }
    }

    /// Transmit and retire the queued descriptors, up to the batch size.
    ///
    /// Returns the number of descriptors retired.
    pub fn poll(&mut self) -> usize {
        let count = self.consumer.dequeue_burst(self.batch, &mut self.scratch);

        for descriptor in self.scratch.drain(..) {
            match self.driver.transmit(&descriptor) {
                Ok(sent) => {
                    if sent < descriptor.len() {
                        debug!(
                            port = descriptor.port().0,
                            sent,
                            packets = descriptor.len(),
                            "Device accepted partial burst",
                        );
                    }
                    self.packets += sent as u64;
                }
                Err(err) => {
                    warn!(port = descriptor.port().0, %err, "Failed to transmit burst");
                    self.failed += 1;
                }
            }
            // Dropping retires the packets and returns the descriptor.
        }

        count
    }

    /// Poll until `stop` is set, then drain what is left in the channel.
    pub fn run(&mut self, stop: &AtomicBool) {
        while !stop.load(Ordering::Acquire) {
            if self.poll() == 0 {
                thread::yield_now();
            }
        }

        while self.poll() != 0 {}
    }

    /// The number of packets accepted by the driver so far.
    pub fn packets(&self) -> u64 {
        self.packets
    }

    /// The number of descriptors the driver failed to transmit.
    pub fn failed(&self) -> u64 {
        self.failed
    }

    /// The underlying driver.
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Unwrap the driver.
    pub fn into_driver(self) -> D {
        self.driver
    }
}

impl<D: Driver + ?Sized> Driver for &'_ mut D {
    fn transmit(&mut self, descriptor: &Descriptor) -> Result<usize> {
        (**self).transmit(descriptor)
    }
}

impl Loopback {
    /// A loopback device recording each burst in order.
    pub fn new() -> Self {
        Loopback {
            ports: BTreeMap::new(),
            history: Some(Vec::new()),
        }
    }

    /// A loopback device only keeping per-port totals.
    pub fn counting() -> Self {
        Loopback {
            ports: BTreeMap::new(),
            history: None,
        }
    }

    /// The totals of a port.
    pub fn port(&self, port: PortId) -> PortCounters {
        self.ports.get(&port).copied().unwrap_or_default()
    }

    /// The totals over all ports.
    pub fn total(&self) -> PortCounters {
        self.ports.values().fold(PortCounters::default(), |acc, port| PortCounters {
            bursts: acc.bursts + port.bursts,
            packets: acc.packets + port.packets,
            bytes: acc.bytes + port.bytes,
        })
    }

    /// The bursts transmitted, in order, if recorded.
    pub fn history(&self) -> &[Observed] {
        self.history.as_deref().unwrap_or(&[])
    }
}

impl Default for Loopback {
    fn default() -> Self {
        Loopback::new()
    }
}

impl Driver for Loopback {
    fn transmit(&mut self, descriptor: &Descriptor) -> Result<usize> {
        let packets = descriptor.len();
        let bytes: usize = descriptor.packets().iter().map(|packet| packet.len()).sum();

        let counters = self.ports.entry(descriptor.port()).or_default();
        counters.bursts += 1;
        counters.packets += packets as u64;
        counters.bytes += bytes as u64;

        if let Some(history) = &mut self.history {
            history.push(Observed {
                header: *descriptor.header(),
                packets,
                bytes,
            });
        }

        Ok(packets)
    }
}
