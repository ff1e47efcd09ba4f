//! The producer side of the transmit path.
//!
//! The [`HandoffOperator`] is invoked once per available burst. Each invocation is a complete unit
//! of work:
//!
//! 1. Bind the descriptor pool and the channel, if the operator looks them up by name.
//! 2. Acquire a descriptor.
//! 3. Move the burst into the descriptor.
//! 4. Enqueue the descriptor.
//!
//! Any step may fail without the invocation failing. A burst that can not be handed off is
//! released as a whole, its packet buffers return to their pool and an acquired descriptor returns
//! to the descriptor pool. The caller only learns about it through the returned [`Outcome`], the
//! logs and the [`Stats`].
use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, error, trace};

use crate::burst::Burst;
use crate::descriptor::DescriptorPool;
use crate::error::{Error, Result};
use crate::registry::Registry;
use crate::ring::Producer;

/// Hands bursts to the transmission engine.
pub struct HandoffOperator {
    binding: Binding,
    counters: Arc<Counters>,
}

enum Binding {
    Bound {
        pool: Arc<DescriptorPool>,
        ring: Producer,
    },
    /// Resources looked up by name, each cached on the first successful lookup.
    Lookup {
        registry: Arc<Registry>,
        ring_name: String,
        pool_name: String,
        ring: Option<Producer>,
        pool: Option<Arc<DescriptorPool>>,
    },
}

/// The fate of one burst.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// The burst is queued for transmission.
    Sent,
    /// The pool or channel are not available yet, the burst was released.
    Deferred,
    /// The burst was released without being transmitted.
    Dropped(DropReason),
}

/// Why a burst was dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DropReason {
    /// No free descriptor.
    Exhausted,
    /// The channel was full.
    Backpressure,
}

/// Shared counters of an operator.
///
/// Can be read from any thread while the operator is running.
#[derive(Debug, Default)]
pub struct Counters {
    sent: AtomicU64,
    packets_sent: AtomicU64,
    deferred: AtomicU64,
    dropped_exhausted: AtomicU64,
    dropped_backpressure: AtomicU64,
}

/// A snapshot of the counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Stats {
    /// Bursts handed to the channel.
    pub sent: u64,
    /// Packets within the bursts handed to the channel.
    pub packets_sent: u64,
    /// Bursts released since the resources were not bound.
    pub deferred: u64,
    /// Bursts dropped for lack of a descriptor.
    pub dropped_exhausted: u64,
    /// Bursts dropped since the channel was full.
    pub dropped_backpressure: u64,
}

impl HandoffOperator {
    /// An operator using the given pool and channel.
    pub fn new(pool: Arc<DescriptorPool>, ring: Producer) -> Self {
        HandoffOperator {
            binding: Binding::Bound { pool, ring },
            counters: Arc::default(),
        }
    }

    /// An operator looking up its pool and channel by name.
    ///
    /// The lookup happens lazily on each invocation until both names resolve. Until then bursts
    /// are deferred, which is expected while the transmission engine is still starting.
    pub fn lookup(
        registry: Arc<Registry>,
        ring_name: impl Into<String>,
        pool_name: impl Into<String>,
    ) -> Self {
        HandoffOperator {
            binding: Binding::Lookup {
                registry,
                ring_name: ring_name.into(),
                pool_name: pool_name.into(),
                ring: None,
                pool: None,
            },
            counters: Arc::default(),
        }
    }

    /// Hand off one burst.
    ///
    /// Never blocks. The burst is consumed in any case.
    pub fn compute(&mut self, burst: Burst) -> Outcome {
        let counters = &*self.counters;

        let (pool, ring) = match self.binding.resolve() {
            Some(bound) => bound,
            None => {
                trace!(packets = burst.len(), "Transmit resources not bound, deferring");
                counters.deferred.fetch_add(1, Ordering::Relaxed);
                return Outcome::Deferred;
            }
        };

        let mut descriptor = match pool.acquire() {
            Ok(descriptor) => descriptor,
            Err(_) => {
                error!(
                    pool = pool.name(),
                    port = burst.header().port.0,
                    packets = burst.len(),
                    "Failed to get TX meta descriptor",
                );
                counters.dropped_exhausted.fetch_add(1, Ordering::Relaxed);
                return Outcome::Dropped(DropReason::Exhausted);
            }
        };

        let packets = burst.len() as u64;
        descriptor.fill(burst);

        match ring.enqueue(descriptor) {
            Ok(()) => {
                counters.sent.fetch_add(1, Ordering::Relaxed);
                counters.packets_sent.fetch_add(packets, Ordering::Relaxed);
                Outcome::Sent
            }
            Err(rejected) => {
                let port = rejected.port().0;
                rejected.release();
                error!(ring = ring.ring().name(), port, packets, "Failed to enqueue TX work");
                counters.dropped_backpressure.fetch_add(1, Ordering::Relaxed);
                Outcome::Dropped(DropReason::Backpressure)
            }
        }
    }

    /// Check if pool and channel are available, binding them if necessary.
    pub fn bind(&mut self) -> bool {
        self.binding.resolve().is_some()
    }

    /// A snapshot of the counters.
    pub fn stats(&self) -> Stats {
        self.counters.snapshot()
    }

    /// The live counters, for observing the operator from elsewhere.
    pub fn counters(&self) -> Arc<Counters> {
        Arc::clone(&self.counters)
    }
}

impl Binding {
    fn resolve(&mut self) -> Option<(&Arc<DescriptorPool>, &Producer)> {
        let bound = match self {
            Binding::Bound { .. } => None,
            Binding::Lookup { registry, ring_name, pool_name, ring, pool } => {
                if ring.is_none() {
                    *ring = registry.ring(ring_name);
                }
                if pool.is_none() {
                    *pool = registry.pool(pool_name);
                }

                match (pool, ring) {
                    (Some(pool), Some(ring)) => {
                        debug!(pool = pool.name(), ring = ring.ring().name(), "Bound transmit resources");
                        Some(Binding::Bound {
                            pool: Arc::clone(pool),
                            ring: ring.clone(),
                        })
                    }
                    _ => return None,
                }
            }
        };

        if let Some(bound) = bound {
            *self = bound;
        }

        match &*self {
            Binding::Bound { pool, ring } => Some((pool, ring)),
            Binding::Lookup { .. } => None,
        }
    }
}

impl Counters {
    /// Read all counters.
    ///
    /// The counters are read individually, a snapshot taken while bursts are handed off need not
    /// be consistent across fields.
    pub fn snapshot(&self) -> Stats {
        Stats {
            sent: self.sent.load(Ordering::Relaxed),
            packets_sent: self.packets_sent.load(Ordering::Relaxed),
            deferred: self.deferred.load(Ordering::Relaxed),
            dropped_exhausted: self.dropped_exhausted.load(Ordering::Relaxed),
            dropped_backpressure: self.dropped_backpressure.load(Ordering::Relaxed),
        }
    }
}

impl Outcome {
    /// Convert to an error for callers that propagate with `?`.
    ///
    /// A deferred burst maps to [`Error::Unbound`], a full channel to [`Error::Full`].
    pub fn into_result(self) -> Result<()> {
        match self {
            Outcome::Sent => Ok(()),
            Outcome::Deferred => Err(Error::Unbound),
            Outcome::Dropped(DropReason::Exhausted) => Err(Error::Exhausted),
            Outcome::Dropped(DropReason::Backpressure) => Err(Error::Full),
        }
    }
}

impl Stats {
    /// All bursts that were not handed off.
    pub fn dropped(&self) -> u64 {
        self.dropped_exhausted + self.dropped_backpressure
    }

    /// All bursts the operator was invoked with.
    pub fn total(&self) -> u64 {
        self.sent + self.deferred + self.dropped()
    }
}

impl fmt::Debug for HandoffOperator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let bound = matches!(self.binding, Binding::Bound { .. });
        f.debug_struct("HandoffOperator")
            .field("bound", &bound)
            .field("stats", &self.stats())
            .finish()
    }
}
