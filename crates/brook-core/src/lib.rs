#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![doc = "brook-core: 挂起式字节传输的核心契约层。"]
#![doc = ""]
#![doc = "== 使命概述 =="]
#![doc = "- **Why**：为 `brook-io` 及第三方传输实现（文件、套接字、测试替身）提供共同语言，"]
#![doc = "  使上层组件无需关心字节从哪里来、到哪里去。"]
#![doc = "- **What**：定义分段字节队列 [`ByteQueue`]、挂起式 [`Source`]/[`Sink`] 契约及其阻塞镜像、"]
#![doc = "  截止/超时值对象与取消原语。"]
#![doc = "- **How**：面向 `no_std + alloc` 布局设计，默认开启 `std`；所有跨组件字节转移均以"]
#![doc = "  值拷贝/段搬移完成，不暴露内部缓冲的引用。"]

extern crate alloc;

pub mod buffer;
pub mod cancel;
pub mod error;
pub mod io;
pub mod time;

pub use buffer::{ByteQueue, SEGMENT_SIZE};
pub use cancel::Cancellation;
pub use error::{CoreError, ErrorCategory, ErrorCause};
pub use io::{
    BlockingSink, BlockingSource, BoxBlockingSink, BoxBlockingSource, BoxSink, BoxSource, Sink,
    Source,
};
pub use time::{Deadline, MonotonicTimePoint, Timeout};

use alloc::boxed::Box;
use core::fmt;

/// `brook-core` 统一的结果别名，错误侧默认为 [`CoreError`]。
pub type Result<T, E = CoreError> = core::result::Result<T, E>;

/// `brook-core` 中所有错误必须实现的 `no_std` 基础 Trait。
///
/// # 设计背景（Why）
/// - `std::error::Error` 在 `no_std` 环境中不可用，需要一个对象安全、与平台无关的
///   错误抽象来串联底层错误链。
///
/// # 契约说明（What）
/// - 实现者必须提供 `Debug` 与 `Display`，便于日志采集。
/// - `source` 返回的引用生命周期受限于 `self`，与 `std::error::Error::source` 语义一致。
pub trait Error: fmt::Debug + fmt::Display {
    /// 返回当前错误的上游来源。
    fn source(&self) -> Option<&(dyn Error + 'static)>;
}

impl<E> Error for Box<E>
where
    E: Error + ?Sized,
{
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        (**self).source()
    }
}
