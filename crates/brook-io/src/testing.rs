//! 进程内测试替身：录制式 Sink 与切片 Source，含阻塞镜像。
//!
//! 所有替身只依赖内存，不触碰真实 I/O；录制侧通过共享状态句柄，
//! 使替身被装箱移交（如折叠进管道）后测试仍可断言其观测结果。

use async_trait::async_trait;
use brook_core::error::codes;
use brook_core::{
    BlockingSink, BlockingSource, ByteQueue, CoreError, Sink, Source, Timeout,
};
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Default)]
struct RecordingState {
    data: Vec<u8>,
    flushes: usize,
    closed: bool,
    fail_writes: bool,
    fail_flush: bool,
    fail_close: bool,
}

/// 录制写入字节、冲刷次数与关闭事件的 Sink 替身，可注入失败。
#[derive(Clone, Default)]
pub struct RecordingSink {
    state: Arc<Mutex<RecordingState>>,
    timeout: Timeout,
}

impl RecordingSink {
    /// 创建空录制 Sink。
    pub fn new() -> Self {
        Self::default()
    }

    /// 创建携带界限策略声明的录制 Sink。
    pub fn with_timeout(timeout: Timeout) -> Self {
        Self {
            state: Arc::default(),
            timeout,
        }
    }

    /// 至今录制到的全部字节。
    pub fn data(&self) -> Vec<u8> {
        self.state.lock().data.clone()
    }

    /// 录制到的冲刷次数。
    pub fn flush_count(&self) -> usize {
        self.state.lock().flushes
    }

    /// 是否已观测到关闭。
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// 让后续写入全部失败。
    pub fn fail_writes(&self) {
        self.state.lock().fail_writes = true;
    }

    /// 让后续冲刷全部失败。
    pub fn fail_flush(&self) {
        self.state.lock().fail_flush = true;
    }

    /// 让后续关闭失败（关闭事件仍会被录制）。
    pub fn fail_close(&self) {
        self.state.lock().fail_close = true;
    }
}

fn injected(op: &'static str) -> CoreError {
    CoreError::new("brook.test.injected", op)
}

#[async_trait]
impl Sink for RecordingSink {
    async fn write(&mut self, source: &mut ByteQueue, byte_count: u64) -> Result<(), CoreError> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(CoreError::new(codes::IO_CLOSED, "recording sink closed"));
        }
        if state.fail_writes {
            return Err(injected("injected write failure"));
        }
        let bytes = source.read(byte_count);
        state.data.extend_from_slice(&bytes);
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), CoreError> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(CoreError::new(codes::IO_CLOSED, "recording sink closed"));
        }
        if state.fail_flush {
            return Err(injected("injected flush failure"));
        }
        state.flushes += 1;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), CoreError> {
        let mut state = self.state.lock();
        state.closed = true;
        if state.fail_close {
            return Err(injected("injected close failure"));
        }
        Ok(())
    }

    fn timeout(&self) -> Timeout {
        self.timeout
    }
}

/// 以内存切片为内容的 Source 替身，可限制单次吐出的最大块长。
pub struct SliceSource {
    data: Vec<u8>,
    position: usize,
    max_chunk: u64,
    closed: bool,
}

impl SliceSource {
    /// 以给定内容创建来源，单次读取不限块长。
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            position: 0,
            max_chunk: u64::MAX,
            closed: false,
        }
    }

    /// 限制单次 `read` 至多吐出 `max_chunk` 字节，用于模拟慢速/碎片化来源。
    pub fn with_max_chunk(mut self, max_chunk: u64) -> Self {
        self.max_chunk = max_chunk.max(1);
        self
    }

    fn pull(&mut self, sink: &mut ByteQueue, byte_count: u64) -> Result<Option<u64>, CoreError> {
        if self.closed {
            return Err(CoreError::new(codes::IO_CLOSED, "slice source closed"));
        }
        if self.position == self.data.len() {
            return Ok(None);
        }
        let remaining = (self.data.len() - self.position) as u64;
        let take = byte_count.min(self.max_chunk).min(remaining) as usize;
        sink.write(&self.data[self.position..self.position + take]);
        self.position += take;
        Ok(Some(take as u64))
    }
}

#[async_trait]
impl Source for SliceSource {
    async fn read(
        &mut self,
        sink: &mut ByteQueue,
        byte_count: u64,
    ) -> Result<Option<u64>, CoreError> {
        self.pull(sink, byte_count)
    }

    async fn close(&mut self) -> Result<(), CoreError> {
        self.closed = true;
        Ok(())
    }
}

/// [`SliceSource`] 的阻塞镜像，供适配层测试使用。
pub struct BlockingSliceSource {
    inner: SliceSource,
}

impl BlockingSliceSource {
    /// 以给定内容创建阻塞来源。
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            inner: SliceSource::new(data),
        }
    }
}

impl BlockingSource for BlockingSliceSource {
    fn read(&mut self, sink: &mut ByteQueue, byte_count: u64) -> Result<Option<u64>, CoreError> {
        self.inner.pull(sink, byte_count)
    }

    fn close(&mut self) -> Result<(), CoreError> {
        self.inner.closed = true;
        Ok(())
    }
}

/// [`RecordingSink`] 的阻塞镜像，共享同一套录制状态句柄。
#[derive(Clone, Default)]
pub struct BlockingRecordingSink {
    state: Arc<Mutex<RecordingState>>,
}

impl BlockingRecordingSink {
    /// 创建空的阻塞录制 Sink。
    pub fn new() -> Self {
        Self::default()
    }

    /// 至今录制到的全部字节。
    pub fn data(&self) -> Vec<u8> {
        self.state.lock().data.clone()
    }

    /// 是否已观测到关闭。
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}

impl BlockingSink for BlockingRecordingSink {
    fn write(&mut self, source: &mut ByteQueue, byte_count: u64) -> Result<(), CoreError> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(CoreError::new(codes::IO_CLOSED, "recording sink closed"));
        }
        let bytes = source.read(byte_count);
        state.data.extend_from_slice(&bytes);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), CoreError> {
        self.state.lock().flushes += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<(), CoreError> {
        self.state.lock().closed = true;
        Ok(())
    }
}
