//! A memory pool for outbound packet buffers.
//!
//! The pool preallocates all of its memory as equally sized entries. Each entry is represented
//! by a ticket, the remaining tickets are kept in a lock-free queue so that buffers can be
//! allocated by the producer and retired by the transmission engine on different threads.
use core::{fmt, mem, ops};
use std::sync::Arc;

use crossbeam_queue::ArrayQueue;

use crate::{Error, Result};

/// A shared pool of packet buffers.
///
/// Cloning the pool is cheap and refers to the same memory.
#[derive(Clone)]
pub struct BufferPool {
    inner: Arc<Inner>,
}

struct Inner {
    /// All remaining tickets (unused buffers).
    tickets: ArrayQueue<Ticket>,

    /// The size of each entry.
    entry_size: usize,

    /// The number of entries.
    entry_count: usize,
}

/// The non-clonable token granting access to one entry's memory.
struct Ticket {
    memory: Box<[u8]>,
}

/// An owned packet buffer.
///
/// This is a unique handle, you can't get a copy of it. The buffer is returned to its pool when
/// the handle is dropped, no matter if the packet was transmitted or discarded.
pub struct PacketBuf {
    /// The pool which we share.
    pool: Arc<Inner>,
    /// We return the ticket, hence do not drop it here.
    ticket: mem::ManuallyDrop<Ticket>,
    /// The initialized length of the packet.
    len: usize,
}

impl BufferPool {
    /// Preallocate `count` buffers of `size` bytes each.
    ///
    /// # Panics
    ///
    /// This method panics if `count` is zero.
    pub fn new(size: usize, count: usize) -> Self {
        let tickets = ArrayQueue::new(count);
        for _ in 0..count {
            let ticket = Ticket {
                memory: vec![0; size].into_boxed_slice(),
            };
            // The queue holds exactly `count` elements.
            let _ = tickets.push(ticket);
        }

        BufferPool {
            inner: Arc::new(Inner {
                tickets,
                entry_size: size,
                entry_count: count,
            }),
        }
    }

    /// Take an unused buffer from the pool.
    ///
    /// The buffer starts out empty. Returns `None` when all buffers are in use.
    pub fn alloc(&self) -> Option<PacketBuf> {
        let ticket = self.inner.tickets.pop()?;
        Some(PacketBuf {
            pool: Arc::clone(&self.inner),
            ticket: mem::ManuallyDrop::new(ticket),
            len: 0,
        })
    }

    /// The number of buffers not currently handed out.
    pub fn available(&self) -> usize {
        self.inner.tickets.len()
    }

    /// The total number of buffers.
    pub fn capacity(&self) -> usize {
        self.inner.entry_count
    }

    /// The size of each buffer.
    pub fn buffer_size(&self) -> usize {
        self.inner.entry_size
    }
}

impl PacketBuf {
    /// The initialized length of the packet.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if no payload has been written.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The maximum length of a packet in this buffer.
    pub fn capacity(&self) -> usize {
        self.ticket.memory.len()
    }

    /// Change the initialized length of the packet.
    ///
    /// Bytes that become part of the packet keep whatever content the buffer had before.
    pub fn resize(&mut self, len: usize) -> Result<()> {
        if len > self.capacity() {
            return Err(Error::BadSize);
        }
        self.len = len;
        Ok(())
    }

    /// Replace the packet contents with `data`.
    pub fn fill_from(&mut self, data: &[u8]) -> Result<()> {
        self.resize(data.len())?;
        self.ticket.memory[..data.len()].copy_from_slice(data);
        Ok(())
    }

    /// The address of the underlying memory.
    ///
    /// Two handles refer to the same packet exactly if their addresses are equal.
    pub fn as_ptr(&self) -> *const u8 {
        self.ticket.memory.as_ptr()
    }
}

impl ops::Deref for PacketBuf {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.ticket.memory[..self.len]
    }
}

impl ops::DerefMut for PacketBuf {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.ticket.memory[..self.len]
    }
}

impl Drop for PacketBuf {
    fn drop(&mut self) {
        // SAFETY: the ticket is never accessed again after this.
        let ticket = unsafe { mem::ManuallyDrop::take(&mut self.ticket) };
        let returned = self.pool.tickets.push(ticket);
        debug_assert!(returned.is_ok(), "More tickets than entries");
    }
}

impl fmt::Debug for BufferPool {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("BufferPool")
            .field("entry_size", &self.inner.entry_size)
            .field("entry_count", &self.inner.entry_count)
            .field("available", &self.available())
            .finish()
    }
}

impl fmt::Debug for PacketBuf {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("PacketBuf")
            .field("ptr", &self.as_ptr())
            .field("len", &self.len)
            .finish()
    }
}
