use crate::bytes::PacketBuffer;

use super::{BytePool, KeptVector};
use super::super::AllocationFailure;


#[test]
fn test_lease_reuses_free_list() {
    let pool = BytePool::new(4, 16, 4, 1);
    assert_eq!(pool.available(), 1, "Pool should be pre-populated!");

    let kept = pool.lease(24).expect("Error leasing storage!");
    assert_eq!(kept.len(), 24, "Leased storage has unexpected length!");
    assert_eq!(pool.available(), 0, "Free list vector should be reused!");
    assert_eq!(pool.allocations(), 1, "Lease should be counted!");
    assert_eq!(pool.leased_bytes(), 24, "Leased bytes should be tracked!");

    drop(kept);
    assert_eq!(pool.available(), 1, "Storage should return to the pool!");
    assert_eq!(pool.leased_bytes(), 0, "Returned storage should not count as leased!");
}

#[test]
fn test_lease_zeroes_reused_storage() {
    let pool = BytePool::new(0, 8, 0, 0);
    let mut kept = pool.lease(8).expect("Error leasing storage!");
    kept.copy_from_slice(&[0xAB; 8]);
    drop(kept);

    let reused = pool.lease(6).expect("Error leasing storage!");
    assert_eq!(pool.available(), 0, "Returned vector should be reused!");
    assert_eq!(&reused[..], &[0u8; 6], "Reused storage should be zeroed!");
}

#[test]
fn test_budget_rejects_excess() {
    let pool = BytePool::new(0, 8, 0, 0).with_budget(16);
    let first = pool.lease(10).expect("Error leasing storage within budget!");

    let second = pool.lease(10);
    assert_eq!(second.err(), Some(AllocationFailure { requested: 10 }), "Lease above budget should fail!");
    assert_eq!(pool.leased_bytes(), 10, "Failed lease should not reserve bytes!");
    assert_eq!(pool.allocations(), 1, "Failed lease should not be counted!");

    drop(first);
    assert!(pool.lease(10).is_ok(), "Lease should succeed once budget is released!");
}

#[test]
fn test_allocate_geometry() {
    let pool = BytePool::new(8, 32, 4, 0);
    let buffer = pool.allocate(20).expect("Error allocating buffer!");
    assert_eq!(buffer.headroom(), 8, "Unexpected headroom!");
    assert_eq!(buffer.len(), 20, "Unexpected payload length!");
    assert_eq!(buffer.tailroom(), 16, "Unused payload space should become tailroom!");
}

#[test]
fn test_allocate_oversized() {
    let pool = BytePool::new(8, 32, 4, 1);
    let buffer = pool.allocate(40).expect("Error allocating buffer!");
    assert_eq!(buffer.headroom(), 8, "Unexpected headroom!");
    assert_eq!(buffer.len(), 40, "Unexpected payload length!");
    assert_eq!(buffer.tailroom(), 4, "Oversized payload should keep pool tailroom!");
    assert_eq!(pool.available(), 1, "Too small vector should stay on the free list!");
}

#[test]
fn test_heap_storage() {
    let kept = KeptVector::allocate(12, None).expect("Error allocating heap storage!");
    assert_eq!(kept.len(), 12, "Unexpected heap storage length!");
    assert!(kept.pool().is_none(), "Heap storage should not belong to a pool!");
}

#[test]
fn test_global_packet_pool() {
    let buffer = super::super::get_buffer(100).expect("Error allocating global buffer!");
    assert_eq!(buffer.headroom(), super::super::HEADER_OVERHEAD + crate::crypto::NONCE_LEN, "Global buffer should reserve header and nonce room!");
    assert!(buffer.tailroom() >= crate::crypto::MAC_LEN, "Global buffer should reserve tag room!");
}

#[test]
fn test_lease_picks_best_fit() {
    let pool = BytePool::new(0, 8, 0, 0);
    drop((pool.lease(64).expect("Error leasing storage!"), pool.lease(16).expect("Error leasing storage!")));
    assert_eq!((pool.available(), pool.leased_bytes()), (2, 0), "Both vectors should return to the pool!");

    let small = pool.lease(10).expect("Error leasing storage!");
    assert_eq!(pool.leased_bytes(), 16, "Smallest fitting vector should be reused and counted by capacity!");
    let large = pool.lease(10).expect("Error leasing storage!");
    assert_eq!(pool.leased_bytes(), 16 + 64, "Remaining vector should be counted by capacity!");
    assert_eq!(pool.available(), 0, "Both free vectors should be reused!");

    drop((small, large));
    assert_eq!(pool.leased_bytes(), 0, "Returned storage should not count as leased!");
}

#[test]
fn test_budget_skips_oversized_free_vector() {
    let pool = BytePool::new(0, 64, 0, 1).with_budget(40);
    let kept = pool.lease(10).expect("Error leasing storage within budget!");
    assert_eq!(pool.available(), 1, "Free vector above budget should stay on the free list!");
    assert_eq!(pool.leased_bytes(), 10, "Fresh storage should be leased instead!");
    drop(kept);
    assert_eq!(pool.leased_bytes(), 0, "Returned storage should not count as leased!");
}

#[test]
fn test_allocate_rejects_overflow() {
    let pool = BytePool::new(8, 32, 4, 0);
    assert_eq!(pool.allocate(usize::MAX - 4).err(), Some(AllocationFailure::OVERFLOW), "Overflowing allocation should be rejected!");
    assert_eq!(pool.leased_bytes(), 0, "Rejected allocation should not reserve bytes!");
}
