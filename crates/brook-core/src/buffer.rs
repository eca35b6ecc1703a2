use alloc::{boxed::Box, collections::VecDeque};
use bytes::{Bytes, BytesMut};
use core::fmt;

/// 分段字节队列的固定分配单元大小（字节）。
///
/// # 契约说明（What）
/// - "完整段"指按该单元对齐的缓冲前缀；[`ByteQueue::complete_segment_byte_count`]
///   以此为粒度向调用方报告可整段外送的字节数。
pub const SEGMENT_SIZE: usize = 8192;

/// 单个分段：一块固定大小的内存加上读写游标。
///
/// 读取从 `pos` 推进，写入从 `limit` 推进；`pos <= limit <= SEGMENT_SIZE` 恒成立。
struct Segment {
    data: Box<[u8; SEGMENT_SIZE]>,
    pos: usize,
    limit: usize,
}

impl Segment {
    fn new() -> Self {
        Self {
            data: Box::new([0u8; SEGMENT_SIZE]),
            pos: 0,
            limit: 0,
        }
    }

    /// 剩余可读字节数。
    fn len(&self) -> usize {
        self.limit - self.pos
    }

    /// 尾部剩余可写容量。
    fn spare(&self) -> usize {
        SEGMENT_SIZE - self.limit
    }
}

/// `ByteQueue` 是可增长的分段字节 FIFO 队列，本仓库所有字节转移的通用载体。
///
/// # 设计背景（Why）
/// - `BufferedSink` 的暂存缓冲与 `Pipe` 的有界缓冲都需要同一种"按段分配、按段搬移"
///   的字节队列：小写入聚合成整段外送，跨队列转移时整段直接易主而非逐字节拷贝。
///
/// # 逻辑解析（How）
/// - 队列由若干 [`SEGMENT_SIZE`] 字节的分段组成；只有尾段可能留有写入余量，
///   头段可能被部分消费；
/// - `write` 先填满尾段余量，再按需追加新段；`read` 自头段起削减并释放耗尽的段；
/// - `transfer_from` 对整段命中走指针搬移（O(1) 每段），仅最后一个不完整片段退化为拷贝。
///
/// # 契约说明（What）
/// - **不变式**：`size()` 恒等于各段剩余可读字节之和；
/// - **所有权**：队列由当前持有组件独占，跨组件转移只能通过 `read`/`transfer_from`
///   以值搬移完成，绝不向外暴露内部段的引用。
///
/// # 风险提示（Trade-offs）
/// - 段搬移会把中段的"部分段"留在队列中间，`complete_segment_byte_count` 仅扣除
///   尾段的未写满部分——这与上游批量外送的使用方式一致，但意味着该计数是
///   "可整段外送字节数"的上界近似，而非逐段严格对齐统计；
/// - 不做段合并与空洞压缩，频繁的小粒度 `transfer_from` 可能产生较碎的段链。
pub struct ByteQueue {
    segments: VecDeque<Segment>,
    size: u64,
}

impl ByteQueue {
    /// 创建空队列。
    pub fn new() -> Self {
        Self {
            segments: VecDeque::new(),
            size: 0,
        }
    }

    /// 当前缓冲的总字节数。
    pub fn size(&self) -> u64 {
        self.size
    }

    /// 队列是否已读空。
    pub fn exhausted(&self) -> bool {
        self.size == 0
    }

    /// 丢弃全部内容并释放所有分段。
    pub fn clear(&mut self) {
        self.segments.clear();
        self.size = 0;
    }

    /// 返回按整段对齐、可立即外送的字节数。
    ///
    /// # 契约说明（What）
    /// - 若尾段仍有写入余量，其字节数不计入结果；否则结果等于 `size()`；
    /// - 返回 `0` 表示当前只持有一个未写满的尾段（或队列为空），调用方应继续积攒。
    pub fn complete_segment_byte_count(&self) -> u64 {
        match self.segments.back() {
            Some(tail) if tail.spare() > 0 => self.size - tail.len() as u64,
            _ => self.size,
        }
    }

    /// 追加字节：先填满尾段余量，再按需分配新段。
    pub fn write(&mut self, mut bytes: &[u8]) {
        while !bytes.is_empty() {
            let need_segment = match self.segments.back() {
                Some(tail) => tail.spare() == 0,
                None => true,
            };
            if need_segment {
                self.segments.push_back(Segment::new());
            }
            // 上面的分支保证尾段存在且有余量。
            if let Some(tail) = self.segments.back_mut() {
                let n = tail.spare().min(bytes.len());
                tail.data[tail.limit..tail.limit + n].copy_from_slice(&bytes[..n]);
                tail.limit += n;
                self.size += n as u64;
                bytes = &bytes[n..];
            }
        }
    }

    /// 自头部移除至多 `byte_count` 字节并返回（缓冲不足时返回较少字节）。
    pub fn read(&mut self, byte_count: u64) -> Bytes {
        let take = self.size.min(byte_count) as usize;
        let mut out = BytesMut::with_capacity(take);
        let mut remaining = take;
        while remaining > 0 {
            if let Some(head) = self.segments.front_mut() {
                let n = head.len().min(remaining);
                out.extend_from_slice(&head.data[head.pos..head.pos + n]);
                head.pos += n;
                remaining -= n;
                self.size -= n as u64;
                if head.len() == 0 {
                    self.segments.pop_front();
                }
            } else {
                break;
            }
        }
        out.freeze()
    }

    /// 从另一条队列搬移恰好 `byte_count` 字节到本队列尾部。
    ///
    /// # 契约说明（What）
    /// - **前置条件**：`byte_count <= other.size()`，由调用方保证；
    /// - **后置条件**：字节顺序保持 FIFO；整段命中时直接转移段所有权，
    ///   最后一个不完整片段按值拷贝。
    pub fn transfer_from(&mut self, other: &mut ByteQueue, byte_count: u64) {
        debug_assert!(byte_count <= other.size, "transfer_from 超出来源队列的容量");
        let mut remaining = byte_count;
        while remaining > 0 {
            let head_len = match other.segments.front() {
                Some(head) => head.len() as u64,
                None => break,
            };
            if head_len <= remaining {
                // 整段易主，无需触碰字节内容。
                if let Some(head) = other.segments.pop_front() {
                    other.size -= head_len;
                    self.size += head_len;
                    self.segments.push_back(head);
                    remaining -= head_len;
                }
            } else {
                let n = remaining as usize;
                if let Some(head) = other.segments.front_mut() {
                    let chunk_start = head.pos;
                    head.pos += n;
                    other.size -= remaining;
                    // 借用规则不允许同时持有两端的可变引用，这里先拷出再写入。
                    let mut scratch = [0u8; SEGMENT_SIZE];
                    scratch[..n].copy_from_slice(&head.data[chunk_start..chunk_start + n]);
                    self.write(&scratch[..n]);
                }
                remaining = 0;
            }
        }
    }
}

impl Default for ByteQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ByteQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteQueue")
            .field("size", &self.size)
            .field("segments", &self.segments.len())
            .finish()
    }
}
