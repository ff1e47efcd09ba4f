//! A burst generator for the transmit path.
//!
//! Plays the part of the upstream stage: builds bursts round robin over every configured
//! interface and queue, hands them to the operator and lets a loopback engine retire them on a
//! separate thread. The result is reported in the style of iperf.
mod score;

pub mod config;
pub use score::Score;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use std::{panic, thread};

use tracing::{debug, info};

use txhandoff::{
    BufferPool, Burst, BurstHeader, ConfigError, Loopback, PortId, QueueId, StaticResolver,
    SysResolver, TxConfig, TxEngine, TxPath,
};

/// Where the next burst goes.
#[derive(Clone, Copy, Debug)]
struct Target {
    header: BurstHeader,
    batch: usize,
}

/// Run the generator to completion.
pub fn run(options: &config::Options) -> Result<Score, ConfigError> {
    let config = TxConfig::load(&options.config)?;
    if options.length == 0 || options.buffers == 0 {
        return Err(ConfigError::Invalid("packets and buffers must not be empty".into()));
    }

    let path = if options.offline {
        TxPath::init(&config, &offline(&config))?
    } else {
        TxPath::init(&config, &SysResolver)?
    };
    let (mut operator, consumer, ports) = path.into_parts();

    let targets: Vec<Target> = config
        .interfaces
        .iter()
        .zip(ports.iter())
        .flat_map(|(iface, (_, port))| {
            let limit = config.batch_size(iface);
            let batch = options.burst_size.unwrap_or(limit).clamp(1, limit);
            (0..iface.queues).map(move |queue| Target {
                header: BurstHeader {
                    port,
                    queue: QueueId(queue),
                    ..BurstHeader::default()
                },
                batch,
            })
        })
        .collect();
    let engine_batch = targets.iter().map(|target| target.batch).max().unwrap_or(1);

    let buffers = BufferPool::new(options.length, options.buffers);
    let stop = Arc::new(AtomicBool::new(false));
    let engine = {
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            let mut engine = TxEngine::new(consumer, Loopback::counting(), engine_batch);
            engine.run(&stop);
            engine.into_driver()
        })
    };

    info!(bursts = options.bursts, targets = targets.len(), "Generating bursts");
    let start = Instant::now();
    let mut payload = vec![0u8; options.length];
    let mut starved = 0;
    let mut sequence = 0u64;

    for target in targets.iter().cycle().take(options.bursts) {
        let mut burst = Burst::with_capacity(target.header, target.batch);
        for _ in 0..target.batch {
            let mut packet = match buffers.alloc() {
                Some(packet) => packet,
                None => break,
            };
            stamp(&mut payload, sequence);
            sequence += 1;
            let filled = packet.fill_from(&payload);
            debug_assert!(filled.is_ok(), "buffers are sized for the payload");
            burst.push(packet);
        }

        if burst.is_empty() {
            debug!(port = target.header.port.0, "No free packet buffer");
            starved += 1;
            thread::yield_now();
            continue;
        }

        operator.compute(burst);
    }

    stop.store(true, Ordering::Release);
    let loopback = engine.join().unwrap_or_else(|err| panic::resume_unwind(err));
    let time = start.elapsed();

    let score = Score {
        stats: operator.stats(),
        starved,
        ports: ports
            .iter()
            .map(|(name, port)| (name.to_owned(), loopback.port(port)))
            .collect(),
        time,
    };

    info!(
        sent = score.stats.sent,
        dropped = score.stats.dropped(),
        starved,
        "Generator finished",
    );
    Ok(score)
}

/// Number the interfaces in configuration order.
fn offline(config: &TxConfig) -> StaticResolver {
    config
        .interfaces
        .iter()
        .enumerate()
        .map(|(idx, iface)| (iface.name.as_str(), PortId(idx as u16)))
        .collect()
}

/// Write a sequence number to the start of the payload.
fn stamp(payload: &mut [u8], sequence: u64) {
    let bytes = sequence.to_be_bytes();
    let len = bytes.len().min(payload.len());
    payload[..len].copy_from_slice(&bytes[..len]);
}
