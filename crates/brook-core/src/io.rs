use crate::{ByteQueue, CoreError, Timeout};
use alloc::boxed::Box;
use async_trait::async_trait;
use core::any::Any;

/// 挂起式字节来源契约。
///
/// # 设计背景（Why）
/// - 文件、套接字、进程内管道都向消费方提供"按需拉取字节"的能力；统一成单一契约后，
///   缓冲装饰器与管道折叠逻辑无需针对具体传输编写分支。
///
/// # 契约说明（What）
/// - `read` 把至多 `byte_count` 字节追加到 `sink` 尾部：
///   - 返回 `Ok(Some(n))` 表示实际追加了 `n` 字节，且 `1 <= n <= byte_count`；
///   - 返回 `Ok(None)` 表示来源已永久耗尽，后续调用必须继续返回 `Ok(None)`；
///   - 对 `byte_count > 0` 的请求返回 `Ok(Some(0))` 属于契约违规，调用方可视为
///     [`crate::error::codes::PROTOCOL_ZERO_READ`] 级别的协议错误；
/// - `close` 释放底层资源，允许幂等调用；关闭后 `read` 应返回
///   [`crate::error::codes::IO_CLOSED`] 错误；
/// - `timeout` 声明实现自身的操作界限策略，默认无界限。
///
/// # 风险提示（Trade-offs）
/// - 契约不保证 `read` 被取消（Future 被 drop）后的部分进度可见性；实现应保证
///   取消安全：要么字节已完整追加到 `sink`，要么完全未追加。
#[async_trait]
pub trait Source: Send + Any {
    /// 从来源拉取至多 `byte_count` 字节追加到 `sink`。
    async fn read(&mut self, sink: &mut ByteQueue, byte_count: u64)
    -> Result<Option<u64>, CoreError>;

    /// 关闭来源并释放资源，幂等。
    async fn close(&mut self) -> Result<(), CoreError>;

    /// 实现自身声明的操作界限策略。
    fn timeout(&self) -> Timeout {
        Timeout::none()
    }
}

/// 挂起式字节去向契约。
///
/// # 契约说明（What）
/// - `write` 自 `source` 头部移除恰好 `byte_count` 字节并写出；
///   **前置条件**：`byte_count <= source.size()`，违反时实现可直接 panic 或报错；
/// - `flush` 将所有已入队的字节推到最终目的地后才返回；
/// - `close` 先推完已入队字节再释放资源，幂等；关闭后 `write`/`flush` 应返回
///   [`crate::error::codes::IO_CLOSED`] 错误；
/// - `timeout` 同 [`Source::timeout`]。
#[async_trait]
pub trait Sink: Send + Any {
    /// 自 `source` 移除 `byte_count` 字节并写出。
    async fn write(&mut self, source: &mut ByteQueue, byte_count: u64) -> Result<(), CoreError>;

    /// 将已接收的字节全部推到最终目的地。
    async fn flush(&mut self) -> Result<(), CoreError>;

    /// 推完剩余字节并释放资源，幂等。
    async fn close(&mut self) -> Result<(), CoreError>;

    /// 实现自身声明的操作界限策略。
    fn timeout(&self) -> Timeout {
        Timeout::none()
    }
}

/// [`Source`] 的阻塞镜像，语义逐条对应，只是以线程阻塞代替挂起。
pub trait BlockingSource: Send + Any {
    /// 同 [`Source::read`]，阻塞直到有进展、耗尽或失败。
    fn read(&mut self, sink: &mut ByteQueue, byte_count: u64) -> Result<Option<u64>, CoreError>;

    /// 同 [`Source::close`]。
    fn close(&mut self) -> Result<(), CoreError>;

    /// 同 [`Source::timeout`]。
    fn timeout(&self) -> Timeout {
        Timeout::none()
    }
}

/// [`Sink`] 的阻塞镜像。
pub trait BlockingSink: Send + Any {
    /// 同 [`Sink::write`]。
    fn write(&mut self, source: &mut ByteQueue, byte_count: u64) -> Result<(), CoreError>;

    /// 同 [`Sink::flush`]。
    fn flush(&mut self) -> Result<(), CoreError>;

    /// 同 [`Sink::close`]。
    fn close(&mut self) -> Result<(), CoreError>;

    /// 同 [`Sink::timeout`]。
    fn timeout(&self) -> Timeout {
        Timeout::none()
    }
}

impl core::fmt::Debug for dyn BlockingSource {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("BlockingSource")
    }
}

impl core::fmt::Debug for dyn BlockingSink {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("BlockingSink")
    }
}

/// 装箱的挂起式来源。
pub type BoxSource = Box<dyn Source>;
/// 装箱的挂起式去向。
pub type BoxSink = Box<dyn Sink>;
/// 装箱的阻塞来源。
pub type BoxBlockingSource = Box<dyn BlockingSource>;
/// 装箱的阻塞去向。
pub type BoxBlockingSink = Box<dyn BlockingSink>;

const _: fn() = || {
    fn assert_object_safe(
        _: &dyn Source,
        _: &dyn Sink,
        _: &dyn BlockingSource,
        _: &dyn BlockingSink,
    ) {
    }
};
