use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread;

use txhandoff::{
    BufferPool, Burst, BurstFlags, BurstHeader, DescriptorPool, DropReason, HandoffOperator,
    Loopback, Outcome, PortId, QueueId, TxEngine, TxRing, TX_META_POOL, TX_RING,
};

fn header(port: u16, queue: u16) -> BurstHeader {
    BurstHeader {
        port: PortId(port),
        queue: QueueId(queue),
        flags: BurstFlags::IPV4_CHECKSUM | BurstFlags::UDP_CHECKSUM,
    }
}

fn burst(buffers: &BufferPool, header: BurstHeader, count: usize, len: usize) -> Burst {
    let mut burst = Burst::with_capacity(header, count);
    for _ in 0..count {
        let mut packet = buffers.alloc().expect("Test pool too small");
        packet.resize(len).unwrap();
        burst.push(packet);
    }
    burst
}

#[test]
fn single_slot_channel() {
    let buffers = BufferPool::new(256, 8);
    let pool = DescriptorPool::new(TX_META_POOL, 1, 4);
    let (producer, mut consumer) = TxRing::with_capacity(TX_RING, 1);
    let mut operator = HandoffOperator::new(Arc::clone(&pool), producer);

    let first = burst(&buffers, header(0, 0), 2, 64);
    assert_eq!(operator.compute(first), Outcome::Sent);
    assert_eq!(pool.available(), 0);
    assert_eq!(buffers.available(), 6);

    // Pool and channel are both used up, the descriptor pool is checked first.
    let second = burst(&buffers, header(0, 0), 3, 64);
    assert_eq!(operator.compute(second), Outcome::Dropped(DropReason::Exhausted));
    assert_eq!(buffers.available(), 6);
    assert_eq!(pool.available(), 0);
    assert!(consumer.ring().is_full());

    drop(consumer.dequeue().unwrap());
    assert_eq!(pool.available(), 1);
    assert_eq!(buffers.available(), 8);
}

#[test]
fn backpressure_returns_descriptor() {
    let buffers = BufferPool::new(256, 8);
    let pool = DescriptorPool::new(TX_META_POOL, 2, 4);
    let (producer, mut consumer) = TxRing::with_capacity(TX_RING, 1);
    let mut operator = HandoffOperator::new(Arc::clone(&pool), producer);

    assert_eq!(operator.compute(burst(&buffers, header(0, 0), 1, 60)), Outcome::Sent);
    let free_before = pool.available();

    let rejected = burst(&buffers, header(0, 1), 3, 60);
    assert_eq!(
        operator.compute(rejected),
        Outcome::Dropped(DropReason::Backpressure),
    );
    assert_eq!(pool.available(), free_before);
    assert_eq!(buffers.available(), 7);

    let queued = consumer.dequeue().unwrap();
    assert_eq!(queued.queue(), QueueId(0));
    assert!(consumer.dequeue().is_none());

    let stats = operator.stats();
    assert_eq!(stats.sent, 1);
    assert_eq!(stats.dropped_backpressure, 1);
    assert_eq!(stats.total(), 2);
}

#[test]
fn payload_is_not_copied() {
    let buffers = BufferPool::new(256, 4);
    let pool = DescriptorPool::new(TX_META_POOL, 1, 4);
    let (producer, mut consumer) = TxRing::with_capacity(TX_RING, 1);
    let mut operator = HandoffOperator::new(pool, producer);

    let burst = burst(&buffers, header(3, 1), 4, 128);
    let handles: Vec<*const u8> = burst.packets().iter().map(|packet| packet.as_ptr()).collect();
    let flags = burst.header().flags;
    assert_eq!(operator.compute(burst), Outcome::Sent);

    let descriptor = consumer.dequeue().unwrap();
    let seen: Vec<*const u8> = descriptor.packets().iter().map(|packet| packet.as_ptr()).collect();
    assert_eq!(seen, handles);
    assert_eq!(descriptor.port(), PortId(3));
    assert_eq!(descriptor.queue(), QueueId(1));
    assert_eq!(descriptor.flags(), flags);
    assert!(descriptor.packets().iter().all(|packet| packet.len() == 128));
}

#[test]
fn order_is_kept() {
    let buffers = BufferPool::new(64, 16);
    let pool = DescriptorPool::new(TX_META_POOL, 8, 1);
    let (producer, consumer) = TxRing::with_capacity(TX_RING, 8);
    let mut operator = HandoffOperator::new(pool, producer);
    let mut engine = TxEngine::new(consumer, Loopback::new(), 3);

    for tag in 0..8 {
        assert_eq!(operator.compute(burst(&buffers, header(0, tag), 1, 16)), Outcome::Sent);
    }
    while engine.poll() != 0 {}

    let tags: Vec<u16> = engine
        .driver()
        .history()
        .iter()
        .map(|observed| observed.header.queue.0)
        .collect();
    assert_eq!(tags, (0..8).collect::<Vec<_>>());
    assert_eq!(buffers.available(), 16);
}

#[test]
fn concurrent_handoff_accounts_for_every_burst() {
    const BURSTS: usize = 10_000;
    const PACKETS: usize = 4;

    let buffers = BufferPool::new(128, 256);
    let pool = DescriptorPool::new(TX_META_POOL, 16, PACKETS);
    let (producer, consumer) = TxRing::with_capacity(TX_RING, 8);
    let mut operator = HandoffOperator::new(Arc::clone(&pool), producer);

    let stop = Arc::new(AtomicBool::new(false));
    let engine = {
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            let mut engine = TxEngine::new(consumer, Loopback::counting(), 4);
            engine.run(&stop);
            engine.into_driver()
        })
    };

    let mut starved = 0u64;
    for round in 0..BURSTS {
        let mut next = Burst::new(header((round % 2) as u16, 0));
        for _ in 0..PACKETS {
            match buffers.alloc() {
                Some(mut packet) => {
                    packet.fill_from(&[round as u8; 60]).unwrap();
                    next.push(packet);
                }
                None => break,
            }
        }
        if next.is_empty() {
            starved += 1;
            thread::yield_now();
            continue;
        }
        operator.compute(next);
    }

    stop.store(true, std::sync::atomic::Ordering::Release);
    let loopback = engine.join().unwrap();

    let stats = operator.stats();
    assert_eq!(stats.total() + starved, BURSTS as u64);
    assert_eq!(stats.deferred, 0);
    assert_eq!(loopback.total().bursts, stats.sent);
    assert_eq!(loopback.total().packets, stats.packets_sent);

    // Nothing leaked on either side.
    assert_eq!(pool.available(), pool.capacity());
    assert_eq!(buffers.available(), buffers.capacity());
}
