//! A bounded MPSC ring for owned descriptors.
//!
//! The ring is split into its two ends on construction. The producer end may be cloned and shared
//! by several handoff operators, there is exactly one consumer end which belongs to the
//! transmission engine. Neither end ever blocks: a full ring rejects the descriptor and an empty
//! ring yields nothing.
//!
//! Descriptors are moved through the ring by value. A rejected descriptor is handed back to the
//! caller who remains responsible for it, there is no state in which a descriptor is both queued
//! and owned by someone else.
use core::fmt;
use std::sync::Arc;

use crossbeam_queue::ArrayQueue;

use crate::descriptor::Descriptor;

/// The shared state of a transmission channel.
pub struct TxRing {
    name: String,
    slots: ArrayQueue<Descriptor>,
}

/// The enqueueing end of a [`TxRing`].
#[derive(Clone)]
pub struct Producer {
    ring: Arc<TxRing>,
}

/// The dequeueing end of a [`TxRing`].
///
/// Not `Clone`, the ring has a single consumer.
pub struct Consumer {
    ring: Arc<TxRing>,
}

impl TxRing {
    /// Create a ring with room for `capacity` descriptors.
    ///
    /// # Panics
    ///
    /// This method panics if `capacity` is zero.
    pub fn with_capacity(name: impl Into<String>, capacity: usize) -> (Producer, Consumer) {
        let ring = Arc::new(TxRing {
            name: name.into(),
            slots: ArrayQueue::new(capacity),
        });

        let producer = Producer { ring: Arc::clone(&ring) };
        let consumer = Consumer { ring };
        (producer, consumer)
    }

    /// The name under which the ring is registered.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The number of queued descriptors.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// The maximum number of queued descriptors.
    pub fn capacity(&self) -> usize {
        self.slots.capacity()
    }

    /// Check if no descriptor is queued.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Check if no further descriptor can be queued.
    pub fn is_full(&self) -> bool {
        self.slots.is_full()
    }
}

impl Producer {
    /// Queue a descriptor.
    ///
    /// On success the descriptor belongs to the consumer. If the ring is full then the descriptor
    /// is returned unchanged.
    pub fn enqueue(&self, descriptor: Descriptor) -> Result<(), Descriptor> {
        self.ring.slots.push(descriptor)
    }

    /// The shared ring state.
    pub fn ring(&self) -> &TxRing {
        &self.ring
    }
}

impl Consumer {
    /// Take the oldest queued descriptor.
    pub fn dequeue(&mut self) -> Option<Descriptor> {
        self.ring.slots.pop()
    }

    /// Take up to `max` descriptors, appending them to `out` in queue order.
    ///
    /// Returns the number of descriptors taken.
    pub fn dequeue_burst(&mut self, max: usize, out: &mut Vec<Descriptor>) -> usize {
        let mut count = 0;
        while count < max {
            match self.ring.slots.pop() {
                Some(descriptor) => out.push(descriptor),
                None => break,
            }
            count += 1;
        }
        count
    }

    /// The shared ring state.
    pub fn ring(&self) -> &TxRing {
        &self.ring
    }
}

impl fmt::Debug for TxRing {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("TxRing")
            .field("name", &self.name)
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .finish()
    }
}

impl fmt::Debug for Producer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("Producer").field(&*self.ring).finish()
    }
}

impl fmt::Debug for Consumer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("Consumer").field(&*self.ring).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::burst::{Burst, BurstHeader, QueueId};
    use crate::descriptor::DescriptorPool;

    fn tagged(pool: &Arc<DescriptorPool>, tag: u16) -> Descriptor {
        let mut descriptor = pool.acquire().unwrap();
        descriptor.fill(Burst::new(BurstHeader {
            queue: QueueId(tag),
            ..BurstHeader::default()
        }));
        descriptor
    }

    #[test]
    fn full_returns_descriptor() {
        let pool = DescriptorPool::new("test", 2, 1);
        let (producer, mut consumer) = TxRing::with_capacity("ring", 1);

        producer.enqueue(tagged(&pool, 1)).unwrap();
        assert!(producer.ring().is_full());

        let rejected = producer.enqueue(tagged(&pool, 2)).unwrap_err();
        assert_eq!(rejected.queue(), QueueId(2));
        assert_eq!(pool.available(), 0);
        drop(rejected);
        assert_eq!(pool.available(), 1);

        assert_eq!(consumer.dequeue().unwrap().queue(), QueueId(1));
        assert!(consumer.dequeue().is_none());
        assert_eq!(pool.available(), 2);
    }

    #[test]
    fn burst_dequeue_is_fifo() {
        let pool = DescriptorPool::new("test", 8, 1);
        let (producer, mut consumer) = TxRing::with_capacity("ring", 8);
        for tag in 0..5 {
            producer.enqueue(tagged(&pool, tag)).unwrap();
        }

        let mut out = Vec::new();
        assert_eq!(consumer.dequeue_burst(3, &mut out), 3);
        assert_eq!(consumer.dequeue_burst(8, &mut out), 2);
        assert_eq!(consumer.dequeue_burst(8, &mut out), 0);

        let order: Vec<_> = out.iter().map(|d| d.queue().0).collect();
        assert_eq!(order, [0, 1, 2, 3, 4]);
    }

    #[test]
    fn dropping_ring_releases_queued() {
        let pool = DescriptorPool::new("test", 2, 1);
        let (producer, consumer) = TxRing::with_capacity("ring", 2);
        producer.enqueue(tagged(&pool, 0)).unwrap();
        producer.enqueue(tagged(&pool, 1)).unwrap();
        assert_eq!(pool.available(), 0);

        drop(producer);
        drop(consumer);
        assert_eq!(pool.available(), 2);
    }
}
