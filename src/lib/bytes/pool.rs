#[cfg(test)]
#[path = "../../../tests/bytes/pool.rs"]
mod pool_test;

use std::cmp::max;
use std::mem::take;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use log::trace;

use super::buffer::ByteBuffer;
use super::{total_size, AllocationFailure};


pub struct KeptVector<'a> {
    data: Vec<u8>,
    pool: Option<&'a BytePool>
}

impl<'a> KeptVector<'a> {
    pub fn new(size: usize) -> Self {
        KeptVector {
            data: vec![0u8; size],
            pool: None
        }
    }

    /// Zeroed storage of `size` bytes, leased from `pool` if given and from the heap otherwise.
    pub fn allocate(size: usize, pool: Option<&'a BytePool>) -> Result<Self, AllocationFailure> {
        match pool {
            Some(pl) => pl.lease(size),
            None => Ok(KeptVector {
                data: try_zeroed(size)?,
                pool: None
            })
        }
    }

    #[inline]
    pub fn pool(&self) -> Option<&'a BytePool> {
        self.pool
    }
}

impl<'a> From<Vec<u8>> for KeptVector<'a> {
    fn from(value: Vec<u8>) -> Self {
        KeptVector {
            data: value,
            pool: None
        }
    }
}

impl Deref for KeptVector<'_> {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}

impl DerefMut for KeptVector<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.data
    }
}

impl<'a> Drop for KeptVector<'a> {
    fn drop(&mut self) {
        if let Some(pl) = self.pool {
            pl.push(take(&mut self.data))
        }
    }
}


fn try_zeroed(size: usize) -> Result<Vec<u8>, AllocationFailure> {
    let mut data = Vec::new();
    if data.try_reserve_exact(size).is_err() {
        return Err(AllocationFailure { requested: size });
    }
    data.resize(size, 0);
    Ok(data)
}


/// Recycling allocator for packet storage.
///
/// Vectors go back to the free list when the last owner drops them and stay there for the
/// lifetime of the pool. An optional budget caps the capacity of the vectors leased at the same
/// time; requests above it fail instead of growing.
pub struct BytePool {
    before_cap: usize,
    size: usize,
    after_cap: usize,
    budget: Option<usize>,
    leased: AtomicUsize,
    allocations: AtomicUsize,
    pool: Mutex<Vec<Vec<u8>>>
}

impl BytePool {
    pub fn new(before_cap: usize, size: usize, after_cap: usize, initial: usize) -> Self {
        let capacity = before_cap + size + after_cap;
        BytePool {
            before_cap,
            size,
            after_cap,
            budget: None,
            leased: AtomicUsize::new(0),
            allocations: AtomicUsize::new(0),
            pool: Mutex::new(vec![vec![0u8; capacity]; initial])
        }
    }

    pub fn with_budget(mut self, budget: usize) -> Self {
        self.budget = Some(budget);
        self
    }

    #[inline]
    pub fn before_cap(&self) -> usize {
        self.before_cap
    }

    #[inline]
    pub fn after_cap(&self) -> usize {
        self.after_cap
    }

    /// Number of leases served so far.
    #[inline]
    pub fn allocations(&self) -> usize {
        self.allocations.load(Ordering::SeqCst)
    }

    /// Capacity of the vectors currently held by live buffers.
    #[inline]
    pub fn leased_bytes(&self) -> usize {
        self.leased.load(Ordering::SeqCst)
    }

    /// Vectors waiting on the free list.
    pub fn available(&self) -> usize {
        self.free_list().len()
    }

    fn free_list(&self) -> MutexGuard<'_, Vec<Vec<u8>>> {
        self.pool.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, data: Vec<u8>) {
        self.leased.fetch_sub(data.capacity(), Ordering::SeqCst);
        self.free_list().push(data);
    }

    fn reserve(&self, size: usize) -> Result<(), AllocationFailure> {
        let reserved = self.leased.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |leased| match (leased.checked_add(size), self.budget) {
            (Some(total), Some(budget)) if total > budget => None,
            (total, _) => total
        });
        match reserved {
            Ok(_) => Ok(()),
            Err(leased) => {
                trace!("Byte pool budget exhausted: {leased} bytes leased, {size} more requested");
                Err(AllocationFailure { requested: size })
            }
        }
    }

    /// Smallest free vector holding at least `size` bytes, charged to the budget by its capacity.
    fn reuse(&self, size: usize) -> Option<Vec<u8>> {
        let mut list = self.free_list();
        let index = list.iter().enumerate().filter(|(_, v)| v.capacity() >= size).min_by_key(|(_, v)| v.capacity()).map(|(index, _)| index)?;
        let data = list.swap_remove(index);
        if self.reserve(data.capacity()).is_err() {
            list.push(data);
            return None;
        }
        Some(data)
    }

    fn heap(&self, size: usize) -> Result<Vec<u8>, AllocationFailure> {
        self.reserve(size)?;
        match try_zeroed(size) {
            Ok(res) => {
                self.leased.fetch_add(res.capacity() - size, Ordering::SeqCst);
                Ok(res)
            },
            Err(err) => {
                self.leased.fetch_sub(size, Ordering::SeqCst);
                Err(err)
            }
        }
    }

    /// Lease zeroed storage of exactly `size` bytes.
    ///
    /// Free vectors too large for the remaining budget are skipped in favour of a fresh one.
    pub fn lease(&self, size: usize) -> Result<KeptVector<'_>, AllocationFailure> {
        let data = match self.reuse(size) {
            Some(mut res) => {
                res.clear();
                res.resize(size, 0);
                res
            },
            None => self.heap(size)?
        };
        self.allocations.fetch_add(1, Ordering::SeqCst);
        Ok(KeptVector {
            data,
            pool: Some(self)
        })
    }

    /// Lease a buffer holding `size` payload bytes behind the pool headroom.
    ///
    /// Payloads longer than the pool packet size get a larger vector instead of less tailroom.
    pub fn allocate(&self, size: usize) -> Result<ByteBuffer<'_>, AllocationFailure> {
        let after_cap = total_size(&[max(self.size, size) - size, self.after_cap])?;
        let kept = self.lease(total_size(&[self.before_cap, size, after_cap])?)?;
        Ok(ByteBuffer::precise(self.before_cap, size, after_cap, kept))
    }
}
