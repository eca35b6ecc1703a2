//! 阻塞 ↔ 挂起两种表达之间的适配层。
//!
//! # 设计背景（Why）
//! - 遗留的阻塞式传输要接入挂起式组件，反之挂起式传输也要服务阻塞调用方；
//!   两方向的包装若无限叠加会产生"适配器套适配器"的间接层堆积。
//!
//! # 逻辑解析（How）
//! - 阻塞方向：包装时捕获当前 tokio 运行时句柄（不在运行时内时以
//!   `brook.io.no_runtime` 失败），每次调用用 `block_on` 驱动挂起操作，
//!   并以被包装一侧的 `timeout()` 为界限竞速；
//! - 挂起方向：阻塞调用内联执行（见各适配器的风险提示）；
//! - 恒等回转：若入参本身是反方向的适配器，直接拆包归还原实例
//!   （经 `Any` 标签校验），往返转换不叠加间接层。
//!
//! # 风险提示（Trade-offs）
//! - 恒等校验基于具体适配器类型，第三方自行包装的转换器不享受拆包短路。

use crate::bound::run_bounded;
use crate::error::OperationKind;
use async_trait::async_trait;
use brook_core::error::codes;
use brook_core::{
    BlockingSink, BlockingSource, BoxBlockingSink, BoxBlockingSource, BoxSink, BoxSource,
    ByteQueue, CoreError, Sink, Source, Timeout,
};
use std::any::Any;
use tokio::runtime::Handle;

/// 把挂起式来源转换为阻塞式来源。
pub fn to_blocking_source(source: BoxSource) -> Result<BoxBlockingSource, CoreError> {
    let tag: &dyn Any = &*source;
    if tag.is::<SuspendingSourceAdapter>() {
        let any: Box<dyn Any> = source;
        match any.downcast::<SuspendingSourceAdapter>() {
            Ok(adapter) => return Ok(adapter.inner),
            Err(_) => unreachable!("downcast follows a successful type check"),
        }
    }
    Ok(Box::new(BlockingSourceAdapter {
        handle: runtime_handle()?,
        inner: source,
    }))
}

/// 把阻塞式来源转换为挂起式来源。
pub fn to_suspending_source(source: BoxBlockingSource) -> BoxSource {
    let tag: &dyn Any = &*source;
    if tag.is::<BlockingSourceAdapter>() {
        let any: Box<dyn Any> = source;
        match any.downcast::<BlockingSourceAdapter>() {
            Ok(adapter) => return adapter.inner,
            Err(_) => unreachable!("downcast follows a successful type check"),
        }
    }
    Box::new(SuspendingSourceAdapter { inner: source })
}

/// 把挂起式去向转换为阻塞式去向。
pub fn to_blocking_sink(sink: BoxSink) -> Result<BoxBlockingSink, CoreError> {
    let tag: &dyn Any = &*sink;
    if tag.is::<SuspendingSinkAdapter>() {
        let any: Box<dyn Any> = sink;
        match any.downcast::<SuspendingSinkAdapter>() {
            Ok(adapter) => return Ok(adapter.inner),
            Err(_) => unreachable!("downcast follows a successful type check"),
        }
    }
    Ok(Box::new(BlockingSinkAdapter {
        handle: runtime_handle()?,
        inner: sink,
    }))
}

/// 把阻塞式去向转换为挂起式去向。
pub fn to_suspending_sink(sink: BoxBlockingSink) -> BoxSink {
    let tag: &dyn Any = &*sink;
    if tag.is::<BlockingSinkAdapter>() {
        let any: Box<dyn Any> = sink;
        match any.downcast::<BlockingSinkAdapter>() {
            Ok(adapter) => return adapter.inner,
            Err(_) => unreachable!("downcast follows a successful type check"),
        }
    }
    Box::new(SuspendingSinkAdapter { inner: sink })
}

fn runtime_handle() -> Result<Handle, CoreError> {
    Handle::try_current().map_err(|error| {
        CoreError::new(
            codes::IO_NO_RUNTIME,
            format!("no tokio runtime on the current thread: {error}"),
        )
    })
}

/// 以 `block_on` 驱动挂起式来源的阻塞适配器。
///
/// 只能在非运行时工作线程上调用（如 `spawn_blocking` 线程或外部线程）；
/// 在异步任务里直接调用会被 tokio 以 panic 拒绝。
struct BlockingSourceAdapter {
    handle: Handle,
    inner: BoxSource,
}

impl BlockingSource for BlockingSourceAdapter {
    fn read(&mut self, sink: &mut ByteQueue, byte_count: u64) -> Result<Option<u64>, CoreError> {
        let timeout = self.inner.timeout();
        self.handle.block_on(run_bounded(
            &timeout,
            OperationKind::ADAPTER_READ,
            self.inner.read(sink, byte_count),
        ))
    }

    fn close(&mut self) -> Result<(), CoreError> {
        let timeout = self.inner.timeout();
        self.handle.block_on(run_bounded(
            &timeout,
            OperationKind::ADAPTER_CLOSE,
            self.inner.close(),
        ))
    }

    fn timeout(&self) -> Timeout {
        self.inner.timeout()
    }
}

struct BlockingSinkAdapter {
    handle: Handle,
    inner: BoxSink,
}

impl BlockingSink for BlockingSinkAdapter {
    fn write(&mut self, source: &mut ByteQueue, byte_count: u64) -> Result<(), CoreError> {
        let timeout = self.inner.timeout();
        self.handle.block_on(run_bounded(
            &timeout,
            OperationKind::ADAPTER_WRITE,
            self.inner.write(source, byte_count),
        ))
    }

    fn flush(&mut self) -> Result<(), CoreError> {
        let timeout = self.inner.timeout();
        self.handle.block_on(run_bounded(
            &timeout,
            OperationKind::ADAPTER_FLUSH,
            self.inner.flush(),
        ))
    }

    fn close(&mut self) -> Result<(), CoreError> {
        let timeout = self.inner.timeout();
        self.handle.block_on(run_bounded(
            &timeout,
            OperationKind::ADAPTER_CLOSE,
            self.inner.close(),
        ))
    }

    fn timeout(&self) -> Timeout {
        self.inner.timeout()
    }
}

/// 内联执行阻塞调用的挂起适配器。
///
/// # 风险提示（Trade-offs）
/// - 阻塞调用直接占用当前工作线程，适用于内存级或短时阻塞的实现；
///   长阻塞实现应由调用方自行移交 `spawn_blocking` 后再包装。
///   界限策略由阻塞一侧自行履行，本适配器无法从外部中断一次阻塞调用。
struct SuspendingSourceAdapter {
    inner: BoxBlockingSource,
}

#[async_trait]
impl Source for SuspendingSourceAdapter {
    async fn read(
        &mut self,
        sink: &mut ByteQueue,
        byte_count: u64,
    ) -> Result<Option<u64>, CoreError> {
        self.inner.read(sink, byte_count)
    }

    async fn close(&mut self) -> Result<(), CoreError> {
        self.inner.close()
    }

    fn timeout(&self) -> Timeout {
        self.inner.timeout()
    }
}

struct SuspendingSinkAdapter {
    inner: BoxBlockingSink,
}

#[async_trait]
impl Sink for SuspendingSinkAdapter {
    async fn write(&mut self, source: &mut ByteQueue, byte_count: u64) -> Result<(), CoreError> {
        self.inner.write(source, byte_count)
    }

    async fn flush(&mut self) -> Result<(), CoreError> {
        self.inner.flush()
    }

    async fn close(&mut self) -> Result<(), CoreError> {
        self.inner.close()
    }

    fn timeout(&self) -> Timeout {
        self.inner.timeout()
    }
}
