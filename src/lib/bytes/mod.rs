use lazy_static::lazy_static;
use thiserror::Error;

use crate::crypto::{MAC_LEN, NONCE_LEN};


pub mod buffer;
pub mod pool;

pub use buffer::ByteBuffer;
pub use pool::{BytePool, KeptVector};


static INITIAL_POOL_SIZE: usize = 5;
pub const HEADER_OVERHEAD: usize = 64;

lazy_static! {
    static ref PACKET_POOL: BytePool = BytePool::new(HEADER_OVERHEAD + NONCE_LEN, u16::MAX as usize, MAC_LEN, INITIAL_POOL_SIZE);
}


/// Lease a packet buffer with `size` payload bytes from the process-wide pool.
pub fn get_buffer(size: usize) -> Result<ByteBuffer<'static>, AllocationFailure> {
    PACKET_POOL.allocate(size)
}


/// Backing storage for a packet could not be obtained.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("Could not allocate {requested} bytes of packet storage!")]
pub struct AllocationFailure {
    pub requested: usize
}

impl AllocationFailure {
    /// Requested size does not fit in `usize`.
    pub const OVERFLOW: AllocationFailure = AllocationFailure { requested: usize::MAX };
}


/// Sum of buffer dimensions, failing instead of wrapping.
pub(crate) fn total_size(parts: &[usize]) -> Result<usize, AllocationFailure> {
    parts.iter().try_fold(0usize, |total, part| total.checked_add(*part)).ok_or(AllocationFailure::OVERFLOW)
}


/// Capacity surface a packet buffer exposes to the planner.
///
/// Implementors own the backing allocation; the planner only queries geometry and
/// asks for growth. Both growth methods must leave `self` untouched when they fail.
pub trait PacketBuffer: Sized {
    /// Free bytes in front of the payload window.
    fn headroom(&self) -> usize;

    /// Free bytes after the payload window.
    fn tailroom(&self) -> usize;

    /// Whether another owner references the same backing allocation.
    fn is_shared(&self) -> bool;

    /// Whether the headroom plus the first `len` payload bytes are privately owned by this handle,
    /// so they can be written even while the allocation is shared.
    fn clone_is_header_writable(&self, len: usize) -> bool;

    /// Add `extra_head` bytes of headroom and `extra_tail` bytes of tailroom, keeping the handle.
    fn grow_in_place(&mut self, extra_head: usize, extra_tail: usize) -> Result<(), AllocationFailure>;

    /// Copy the payload into a new private allocation with exactly `new_head` and `new_tail` room.
    fn reallocate(&self, new_head: usize, new_tail: usize) -> Result<Self, AllocationFailure>;
}
