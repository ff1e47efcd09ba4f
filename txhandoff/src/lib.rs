//! Zero-copy handoff of outbound packet bursts to a transmission engine.
//!
//! ## Table of contents
//!
//! 1. [Design](#design-and-relevant-core-concepts)
//! 2. [Packet buffers and bursts](buffer/index.html)
//! 3. [The descriptor pool](descriptor/index.html)
//! 4. [The transmission channel](ring/index.html)
//! 5. [The handoff operator](handoff/index.html)
//! 6. [Setting up a transmit path](path/index.html)
//! 7. [Draining the channel](engine/index.html)
//!
//! ## Design and relevant core concepts
//!
//! An upstream stage assembles packets into a [`Burst`], a batch of owned packet buffers destined
//! for one queue of one port. Once per available burst the scheduler invokes the
//! [`HandoffOperator`] which moves the burst into a pool allocated [`Descriptor`] and pushes that
//! descriptor onto a bounded [`ring`]. A transmission engine, usually on another thread, pops the
//! descriptors, hands them to the device and retires them.
//!
//! Nothing on this path copies payload bytes. A packet buffer is a unique, non-clonable handle so
//! at any point in time exactly one burst or descriptor refers to it. Releasing a packet is
//! dropping its handle and the same holds for descriptors: a descriptor that is dropped returns
//! its packets to their pool and itself to the descriptor pool. Every failure branch of the
//! handoff is thus balanced against its acquisition by construction.
//!
//! None of the operations ever block. A descriptor pool that is empty or a channel that is full
//! is reported immediately and the burst is dropped, logged and counted. Only configuration
//! errors during setup are fatal, see [`TxPath::init`].
//!
//! All memory is reserved upfront. The descriptor pool, its records and the channel are sized by
//! the [`config`] and never grow while packets flow.
#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod buffer;
pub mod burst;
pub mod config;
pub mod descriptor;
pub mod engine;
mod error;
pub mod handoff;
pub mod path;
pub mod port;
pub mod registry;
pub mod ring;

pub use self::buffer::{BufferPool, PacketBuf};
pub use self::burst::{Burst, BurstFlags, BurstHeader, PortId, QueueId};
pub use self::config::TxConfig;
pub use self::descriptor::{Descriptor, DescriptorPool};
pub use self::engine::{Driver, Loopback, TxEngine};
pub use self::error::{ConfigError, Error, Result};
pub use self::handoff::{DropReason, HandoffOperator, Outcome, Stats};
pub use self::path::TxPath;
pub use self::port::{PortTable, Resolve, StaticResolver, SysResolver};
pub use self::registry::{Registry, TX_META_POOL, TX_RING};
pub use self::ring::{Consumer, Producer, TxRing};
