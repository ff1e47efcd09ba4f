//! Bursts of outbound packets.
//!
//! A burst is the unit in which upstream stages hand packets to the transmit path. It owns its
//! packet buffers, so moving a burst moves the packets and dropping it releases them.
use core::fmt;

use bitflags::bitflags;

use crate::buffer::PacketBuf;

/// The identifier of a hardware port.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PortId(pub u16);

/// The identifier of a transmit queue on a port.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QueueId(pub u16);

bitflags! {
    /// Offloads requested for all packets of a burst.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct BurstFlags: u32 {
        /// Compute the IPv4 header checksum in hardware.
        const IPV4_CHECKSUM = 1 << 0;
        /// Compute the UDP checksum in hardware.
        const UDP_CHECKSUM = 1 << 1;
        /// Compute the TCP checksum in hardware.
        const TCP_CHECKSUM = 1 << 2;
        /// Segment oversized TCP payloads in hardware.
        const SEGMENTATION = 1 << 3;
        /// Request a transmit timestamp.
        const TIMESTAMP = 1 << 4;
    }
}

/// Where and how a burst is to be transmitted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct BurstHeader {
    /// The target port.
    pub port: PortId,
    /// The target queue of the port.
    pub queue: QueueId,
    /// Requested offloads.
    pub flags: BurstFlags,
}

/// A batch of packets ready for transmission.
pub struct Burst {
    header: BurstHeader,
    packets: Vec<PacketBuf>,
}

impl Burst {
    /// Create an empty burst.
    pub fn new(header: BurstHeader) -> Self {
        Burst {
            header,
            packets: Vec::new(),
        }
    }

    /// Create an empty burst with room for `capacity` packets.
    pub fn with_capacity(header: BurstHeader, capacity: usize) -> Self {
        Burst {
            header,
            packets: Vec::with_capacity(capacity),
        }
    }

    /// Append a packet.
    pub fn push(&mut self, packet: PacketBuf) {
        self.packets.push(packet);
    }

    /// The transmission header.
    pub fn header(&self) -> &BurstHeader {
        &self.header
    }

    /// The packets in the order they are to be sent.
    pub fn packets(&self) -> &[PacketBuf] {
        &self.packets
    }

    /// The number of packets.
    pub fn len(&self) -> usize {
        self.packets.len()
    }

    /// Check if the burst contains no packets.
    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    /// Sum of all packet lengths.
    pub fn total_bytes(&self) -> usize {
        self.packets.iter().map(|packet| packet.len()).sum()
    }

    /// Move all packets out, leaving the container empty.
    pub(crate) fn drain_packets(&mut self) -> std::vec::Drain<'_, PacketBuf> {
        self.packets.drain(..)
    }
}

impl fmt::Debug for Burst {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Burst")
            .field("header", &self.header)
            .field("packets", &self.packets.len())
            .finish()
    }
}

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "port {}", self.0)
    }
}

impl fmt::Display for QueueId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "queue {}", self.0)
    }
}
