#[cfg(test)]
#[path = "../../../tests/bytes/buffer.rs"]
mod buffer_test;

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use simple_error::bail;

use super::pool::KeptVector;
use super::{total_size, AllocationFailure, PacketBuffer};
use crate::DynResult;


/// Window `[start, end)` over a reference-counted allocation.
///
/// Cloning a handle shares the allocation: both owners see the same bytes, so neither may
/// write outside its payload unless the transport declared that region private with
/// [`ByteBuffer::declare_private_head`].
pub struct ByteBuffer<'a> {
    data: Rc<RefCell<KeptVector<'a>>>,
    start: usize,
    end: usize,
    private_head: usize
}

impl<'a> ByteBuffer<'a> {
    #[inline]
    pub fn precise(before_cap: usize, size: usize, after_cap: usize, kept: KeptVector<'a>) -> Self {
        let buffer_end = before_cap + size;
        debug_assert!(buffer_end + after_cap <= kept.len(), "ByteBuffer exceeded its backing storage!");
        ByteBuffer {
            data: Rc::new(RefCell::new(kept)),
            start: before_cap,
            end: buffer_end,
            private_head: 0
        }
    }

    #[inline]
    pub fn empty(size: usize) -> Self {
        Self::with_room(0, size, 0)
    }

    #[inline]
    pub fn with_room(headroom: usize, size: usize, tailroom: usize) -> Self {
        Self::precise(headroom, size, tailroom, KeptVector::new(headroom + size + tailroom))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.data.borrow().len()
    }

    /// Address of the backing allocation, stable until the buffer is forked or regrown.
    #[inline]
    pub fn identity(&self) -> usize {
        Rc::as_ptr(&self.data) as *const () as usize
    }

    /// Second owner of the same allocation. The new handle owns no header bytes privately.
    #[inline]
    pub fn share(&self) -> Self {
        ByteBuffer {
            data: self.data.clone(),
            start: self.start,
            end: self.end,
            private_head: 0
        }
    }

    /// Record that the first `len` bytes of the allocation belong to this handle alone.
    pub fn declare_private_head(&mut self, len: usize) {
        self.private_head = len.min(self.capacity());
    }

    #[inline]
    pub fn private_head(&self) -> usize {
        self.private_head
    }
}


impl<'a> ByteBuffer<'a> {
    #[inline]
    pub fn slice(&self) -> Ref<'_, [u8]> {
        Ref::map(self.data.borrow(), |b| &b[self.start..self.end])
    }

    /// Writable payload view; refused while another owner can observe the payload.
    pub fn slice_mut(&mut self) -> DynResult<RefMut<'_, [u8]>> {
        if self.is_shared() && !self.clone_is_header_writable(self.len()) {
            bail!("ByteBuffer payload is shared and can not be written!");
        }
        Ok(RefMut::map(self.data.borrow_mut(), |b| &mut b[self.start..self.end]))
    }

    /// Copy of the whole allocation, headroom and tailroom included.
    pub fn raw_snapshot(&self) -> Vec<u8> {
        self.data.borrow().to_vec()
    }

    pub fn push_front(&mut self, other: &[u8]) -> DynResult<()> {
        let other_length = other.len();
        if other_length > self.start {
            bail!("ByteBuffer backward capacity insufficient ({other_length} > {})!", self.start);
        }
        if self.is_shared() && !self.clone_is_header_writable(0) {
            bail!("ByteBuffer headroom is shared and can not be written!");
        }
        let new_start = self.start - other_length;
        self.data.borrow_mut()[new_start..self.start].copy_from_slice(other);
        self.start = new_start;
        Ok(())
    }

    pub fn push_back(&mut self, other: &[u8]) -> DynResult<()> {
        let other_length = other.len();
        if other_length > self.tailroom() {
            bail!("ByteBuffer forward capacity insufficient ({other_length} > {})!", self.tailroom());
        }
        if self.is_shared() {
            bail!("ByteBuffer tailroom is shared and can not be written!");
        }
        let new_end = self.end + other_length;
        self.data.borrow_mut()[self.end..new_end].copy_from_slice(other);
        self.end = new_end;
        Ok(())
    }

    pub fn pull_front(&mut self, size: usize) -> DynResult<()> {
        if size > self.len() {
            bail!("ByteBuffer has negative length ({size} > {})!", self.len());
        }
        self.start += size;
        Ok(())
    }

    #[inline]
    pub fn truncate(&mut self, len: usize) {
        self.end = self.start + len.min(self.len());
    }
}


impl<'a> PacketBuffer for ByteBuffer<'a> {
    #[inline]
    fn headroom(&self) -> usize {
        self.start
    }

    #[inline]
    fn tailroom(&self) -> usize {
        self.capacity() - self.end
    }

    #[inline]
    fn is_shared(&self) -> bool {
        Rc::strong_count(&self.data) > 1
    }

    #[inline]
    fn clone_is_header_writable(&self, len: usize) -> bool {
        self.start + len <= self.private_head
    }

    fn grow_in_place(&mut self, extra_head: usize, extra_tail: usize) -> Result<(), AllocationFailure> {
        if extra_head == 0 && extra_tail == 0 {
            return Ok(());
        }
        let (pool, capacity) = {
            let current = self.data.borrow();
            (current.pool(), current.len())
        };
        let mut grown = KeptVector::allocate(total_size(&[extra_head, capacity, extra_tail])?, pool)?;
        grown[extra_head..extra_head + capacity].copy_from_slice(&self.data.borrow());
        if self.is_shared() {
            // Other owners keep the old allocation untouched, this handle moves to the grown copy.
            self.data = Rc::new(RefCell::new(grown));
            self.private_head = 0;
        } else {
            *self.data.borrow_mut() = grown;
            if self.private_head > 0 {
                self.private_head += extra_head;
            }
        }
        self.start += extra_head;
        self.end += extra_head;
        Ok(())
    }

    fn reallocate(&self, new_head: usize, new_tail: usize) -> Result<Self, AllocationFailure> {
        let size = self.len();
        let pool = self.data.borrow().pool();
        let mut fresh = KeptVector::allocate(total_size(&[new_head, size, new_tail])?, pool)?;
        fresh[new_head..new_head + size].copy_from_slice(&self.slice());
        Ok(ByteBuffer::precise(new_head, size, new_tail, fresh))
    }
}


impl fmt::Debug for ByteBuffer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ByteBuffer {{ headroom: {}, len: {}, tailroom: {}, shared: {} }}", self.headroom(), self.len(), self.tailroom(), self.is_shared())
    }
}

impl<'a> From<Vec<u8>> for ByteBuffer<'a> {
    fn from(value: Vec<u8>) -> Self {
        let length = value.len();
        ByteBuffer::precise(0, length, 0, KeptVector::from(value))
    }
}

impl<'a> From<&[u8]> for ByteBuffer<'a> {
    fn from(value: &[u8]) -> Self {
        ByteBuffer::from(value.to_vec())
    }
}

impl<'a> From<ByteBuffer<'a>> for Vec<u8> {
    #[inline]
    fn from(value: ByteBuffer<'a>) -> Self {
        let vector = value.slice().to_vec();
        vector
    }
}

impl<'a> Clone for ByteBuffer<'a> {
    #[inline]
    fn clone(&self) -> Self {
        self.share()
    }
}
