//! Transmission descriptors and their pool.
//!
//! A descriptor is the metadata record which travels through the transmission channel in place
//! of a burst. The pool preallocates all records, including room for the packet handles of a full
//! burst, so that the hot path never allocates.
//!
//! A descriptor is in exactly one of three states:
//! * free, while its record sits in the pool;
//! * being populated, while a [`Descriptor`] handle is owned by the producer;
//! * in flight, while the handle sits in the channel or is owned by the transmission engine.
//!
//! The handle is not `Clone`. Dropping it is the only way back into the free state and it also
//! releases all packet buffers still referenced by the record. Whether the descriptor was
//! transmitted or rolled back after a failed enqueue makes no difference for the cleanup.
use core::{fmt, mem};
use std::sync::Arc;

use crossbeam_queue::ArrayQueue;
use tracing::debug;

use crate::buffer::PacketBuf;
use crate::burst::{Burst, BurstFlags, BurstHeader, PortId, QueueId};
use crate::{Error, Result};

/// A fixed-capacity pool of transmission descriptors.
pub struct DescriptorPool {
    name: String,
    /// Records not currently handed out.
    free: ArrayQueue<Box<Record>>,
    capacity: usize,
    max_packets: usize,
}

/// The pool memory of one descriptor.
struct Record {
    header: BurstHeader,
    packets: Vec<PacketBuf>,
}

/// An acquired transmission descriptor.
pub struct Descriptor {
    pool: Arc<DescriptorPool>,
    /// Returned to the pool on drop.
    record: mem::ManuallyDrop<Box<Record>>,
}

impl DescriptorPool {
    /// Preallocate `capacity` descriptors with room for `max_packets` packets each.
    ///
    /// # Panics
    ///
    /// This method panics if `capacity` is zero.
    pub fn new(name: impl Into<String>, capacity: usize, max_packets: usize) -> Arc<Self> {
        let free = ArrayQueue::new(capacity);
        for _ in 0..capacity {
            let record = Box::new(Record {
                header: BurstHeader::default(),
                packets: Vec::with_capacity(max_packets),
            });
            // The queue holds exactly `capacity` elements.
            let _ = free.push(record);
        }

        let pool = DescriptorPool {
            name: name.into(),
            free,
            capacity,
            max_packets,
        };
        debug!(pool = %pool.name, capacity, max_packets, "Created descriptor pool");
        Arc::new(pool)
    }

    /// Take a free descriptor.
    ///
    /// Never blocks. Returns `Error::Exhausted` when all descriptors are in use, which only
    /// means that no burst can be transmitted right now.
    pub fn acquire(self: &Arc<Self>) -> Result<Descriptor> {
        let record = self.free.pop().ok_or(Error::Exhausted)?;
        Ok(Descriptor {
            pool: Arc::clone(self),
            record: mem::ManuallyDrop::new(record),
        })
    }

    /// The name under which the pool is registered.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The total number of descriptors.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The number of packet handles each record holds without reallocation.
    pub fn max_packets(&self) -> usize {
        self.max_packets
    }

    /// The number of free descriptors.
    pub fn available(&self) -> usize {
        self.free.len()
    }

    /// The number of descriptors being populated or in flight.
    pub fn in_use(&self) -> usize {
        self.capacity - self.available()
    }
}

impl Descriptor {
    /// Move a burst into this descriptor.
    ///
    /// Only the header and the packet handles are moved, no payload is copied. The emptied burst
    /// container is released before returning. Packets of an earlier fill are released first.
    pub fn fill(&mut self, mut burst: Burst) {
        let record = &mut **self.record;
        record.packets.clear();
        record.header = *burst.header();
        record.packets.extend(burst.drain_packets());
    }

    /// The transmission header.
    pub fn header(&self) -> &BurstHeader {
        &self.record.header
    }

    /// The target port.
    pub fn port(&self) -> PortId {
        self.record.header.port
    }

    /// The target queue.
    pub fn queue(&self) -> QueueId {
        self.record.header.queue
    }

    /// Requested offloads.
    pub fn flags(&self) -> BurstFlags {
        self.record.header.flags
    }

    /// The packets in transmission order.
    pub fn packets(&self) -> &[PacketBuf] {
        &self.record.packets
    }

    /// The number of packets.
    pub fn len(&self) -> usize {
        self.record.packets.len()
    }

    /// Check if the descriptor holds no packets.
    pub fn is_empty(&self) -> bool {
        self.record.packets.is_empty()
    }

    /// Release the packets and return the descriptor to its pool.
    ///
    /// Equivalent to dropping it.
    pub fn release(self) {}
}

impl Drop for Descriptor {
    fn drop(&mut self) {
        // SAFETY: the record is never accessed again after this.
        let mut record = unsafe { mem::ManuallyDrop::take(&mut self.record) };
        record.packets.clear();
        let returned = self.pool.free.push(record);
        debug_assert!(returned.is_ok(), "More records than descriptors");
    }
}

impl fmt::Debug for DescriptorPool {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("DescriptorPool")
            .field("name", &self.name)
            .field("capacity", &self.capacity)
            .field("available", &self.available())
            .finish()
    }
}

impl fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Descriptor")
            .field("pool", &self.pool.name)
            .field("header", &self.record.header)
            .field("packets", &self.record.packets.len())
            .finish()
    }
}
