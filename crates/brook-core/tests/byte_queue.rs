//! ByteQueue 的契约级集成测试。
//!
//! 单元测试覆盖各操作的边界行为，这里专注跨操作组合下的守恒性质：
//! 任意切分方式写入、任意粒度搬移与读出，字节内容与顺序必须保持不变。

use brook_core::{ByteQueue, SEGMENT_SIZE};
use proptest::prelude::*;

proptest! {
    /// 任意切分写入后一次性读出，内容与写入串逐字节一致。
    #[test]
    fn arbitrary_chunking_preserves_content(
        payload in proptest::collection::vec(any::<u8>(), 0..SEGMENT_SIZE * 3),
        chunk in 1usize..2048,
    ) {
        let mut queue = ByteQueue::new();
        for piece in payload.chunks(chunk) {
            queue.write(piece);
        }
        prop_assert_eq!(queue.size(), payload.len() as u64);

        let bytes = queue.read(u64::MAX);
        prop_assert_eq!(&bytes[..], &payload[..]);
        prop_assert!(queue.exhausted());
    }

    /// 经过中转队列任意粒度搬移后，终点收到的串与起点写入的串一致。
    #[test]
    fn transfer_relay_preserves_order(
        payload in proptest::collection::vec(any::<u8>(), 1..SEGMENT_SIZE * 2),
        step in 1u64..4096,
    ) {
        let mut origin = ByteQueue::new();
        origin.write(&payload);

        let mut relay = ByteQueue::new();
        while !origin.exhausted() {
            let take = step.min(origin.size());
            relay.transfer_from(&mut origin, take);
        }

        prop_assert_eq!(relay.size(), payload.len() as u64);
        prop_assert_eq!(&relay.read(u64::MAX)[..], &payload[..]);
    }
}

#[test]
fn complete_segment_count_tracks_alignment_through_mixed_traffic() {
    let mut queue = ByteQueue::new();
    queue.write(&vec![7u8; SEGMENT_SIZE]);
    queue.write(&vec![7u8; SEGMENT_SIZE / 2]);
    assert_eq!(queue.complete_segment_byte_count(), SEGMENT_SIZE as u64);

    // 补满尾段后整个缓冲都可整段外送。
    queue.write(&vec![7u8; SEGMENT_SIZE - SEGMENT_SIZE / 2]);
    assert_eq!(queue.complete_segment_byte_count(), queue.size());
}
