use crate::bytes::{BytePool, PacketBuffer};

use super::ByteBuffer;


const SAMPLE_DATA: &[u8] = b"Sample payload for buffer tests";


fn sample_buffer<'a>(headroom: usize, tailroom: usize) -> ByteBuffer<'a> {
    let mut buffer = ByteBuffer::with_room(headroom, SAMPLE_DATA.len(), tailroom);
    buffer.slice_mut().expect("Error writing fresh buffer!").copy_from_slice(SAMPLE_DATA);
    buffer
}


#[test]
fn test_geometry() {
    let buffer = sample_buffer(12, 5);
    assert_eq!(buffer.headroom(), 12, "Unexpected headroom!");
    assert_eq!(buffer.tailroom(), 5, "Unexpected tailroom!");
    assert_eq!(buffer.len(), SAMPLE_DATA.len(), "Unexpected payload length!");
    assert_eq!(buffer.capacity(), 12 + SAMPLE_DATA.len() + 5, "Unexpected capacity!");
    assert!(!buffer.is_shared(), "Fresh buffer should not be shared!");
}

#[test]
fn test_push_front_and_back() {
    let mut buffer = sample_buffer(4, 4);
    buffer.push_front(b"head").expect("Error prepending header!");
    buffer.push_back(b"tail").expect("Error appending trailer!");
    assert_eq!(buffer.headroom(), 0, "Headroom should be consumed!");
    assert_eq!(buffer.tailroom(), 0, "Tailroom should be consumed!");
    assert_eq!(Vec::from(buffer), [&b"head"[..], SAMPLE_DATA, &b"tail"[..]].concat(), "Unexpected frame contents!");
}

#[test]
fn test_push_refuses_insufficient_room() {
    let mut buffer = sample_buffer(2, 2);
    assert!(buffer.push_front(b"head").is_err(), "Prepending beyond headroom should fail!");
    assert!(buffer.push_back(b"tail").is_err(), "Appending beyond tailroom should fail!");
    assert_eq!(buffer.headroom(), 2, "Failed prepend should not move the window!");
    assert_eq!(&*buffer.slice(), SAMPLE_DATA, "Failed writes should not change the payload!");
}

#[test]
fn test_share_tracks_owners() {
    let buffer = sample_buffer(8, 8);
    let sibling = buffer.share();
    assert!(buffer.is_shared() && sibling.is_shared(), "Both handles should be shared!");
    assert_eq!(buffer.identity(), sibling.identity(), "Handles should share the allocation!");
    drop(sibling);
    assert!(!buffer.is_shared(), "Last owner should not be shared!");
}

#[test]
fn test_shared_writes_refused() {
    let mut buffer = sample_buffer(8, 8);
    let sibling = buffer.share();
    let snapshot = sibling.raw_snapshot();

    assert!(buffer.push_front(b"head").is_err(), "Shared headroom should not be written!");
    assert!(buffer.push_back(b"tail").is_err(), "Shared tailroom should not be written!");
    assert!(buffer.slice_mut().is_err(), "Shared payload should not be written!");
    assert_eq!(sibling.raw_snapshot(), snapshot, "Sibling allocation should be untouched!");
}

#[test]
fn test_private_head_allows_header_writes() {
    let mut buffer = sample_buffer(8, 8);
    buffer.declare_private_head(8 + 4);
    let mut sibling = buffer.share();

    assert!(buffer.clone_is_header_writable(4), "Declared region should be writable!");
    assert!(!buffer.clone_is_header_writable(5), "Region beyond declaration should not be writable!");
    assert!(!sibling.clone_is_header_writable(0), "Sibling should not own the header!");

    buffer.push_front(b"head").expect("Error prepending into private headroom!");
    assert!(sibling.push_front(b"head").is_err(), "Sibling should not prepend into shared headroom!");
}

#[test]
fn test_grow_in_place_keeps_identity() {
    let pool = BytePool::new(2, SAMPLE_DATA.len(), 0, 0);
    let mut buffer = pool.allocate(SAMPLE_DATA.len()).expect("Error allocating buffer!");
    buffer.slice_mut().expect("Error writing fresh buffer!").copy_from_slice(SAMPLE_DATA);
    let identity = buffer.identity();

    buffer.grow_in_place(10, 16).expect("Error growing buffer!");
    assert_eq!(buffer.identity(), identity, "In-place growth should keep the handle identity!");
    assert_eq!(buffer.headroom(), 12, "Headroom should grow by the requested amount!");
    assert_eq!(buffer.tailroom(), 16, "Tailroom should grow by the requested amount!");
    assert_eq!(&*buffer.slice(), SAMPLE_DATA, "Payload should be preserved!");
    assert_eq!(pool.available(), 1, "Old storage should return to the pool!");
    assert_eq!(pool.allocations(), 2, "Growth should lease exactly once!");
}

#[test]
fn test_grow_in_place_detaches_shared() {
    let mut buffer = sample_buffer(2, 0);
    buffer.declare_private_head(2 + 14);
    let sibling = buffer.share();
    let snapshot = sibling.raw_snapshot();

    buffer.grow_in_place(6, 0).expect("Error growing shared buffer!");
    assert_ne!(buffer.identity(), sibling.identity(), "Shared buffer should move to its own allocation!");
    assert!(!buffer.is_shared() && !sibling.is_shared(), "Owners should be separated!");
    assert_eq!(buffer.headroom(), 8, "Headroom should grow by the requested amount!");
    assert_eq!(sibling.raw_snapshot(), snapshot, "Sibling allocation should be untouched!");
    assert_eq!(sibling.headroom(), 2, "Sibling geometry should be untouched!");
}

#[test]
fn test_reallocate_copies_payload() {
    let buffer = sample_buffer(3, 1);
    let fresh = buffer.reallocate(20, 16).expect("Error reallocating buffer!");
    assert_ne!(fresh.identity(), buffer.identity(), "Reallocation should produce a new allocation!");
    assert_eq!(fresh.headroom(), 20, "Unexpected reallocated headroom!");
    assert_eq!(fresh.tailroom(), 16, "Unexpected reallocated tailroom!");
    assert_eq!(&*fresh.slice(), SAMPLE_DATA, "Payload should be copied!");
    assert_eq!(buffer.headroom(), 3, "Original geometry should be untouched!");
}

#[test]
fn test_pull_and_truncate() {
    let mut buffer = sample_buffer(0, 0);
    buffer.pull_front(7).expect("Error pulling header!");
    buffer.truncate(7);
    assert_eq!(&*buffer.slice(), b"payload", "Unexpected window after pull and truncate!");
    assert_eq!(buffer.headroom(), 7, "Pulled bytes should become headroom!");
    assert!(buffer.pull_front(8).is_err(), "Pulling beyond payload should fail!");
}
