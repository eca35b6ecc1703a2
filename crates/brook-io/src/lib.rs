#![deny(unsafe_code)]
#![doc = "brook-io: 挂起式字节传输契约的 tokio 实现层。"]
#![doc = ""]
#![doc = "== 使命概述 =="]
#![doc = "- **Why**：`brook-core` 只定义契约；本 crate 提供可直接落地的标准件——"]
#![doc = "  写路径的整段聚合装饰器、带背压的进程内管道、界限竞速帮助函数与阻塞适配层。"]
#![doc = "- **What**：[`BufferedSink`]、[`Pipe`]（折叠 / 取消）、[`run_bounded`]、"]
#![doc = "  `to_blocking_*` / `to_suspending_*` 转换函数及内存测试替身。"]
#![doc = "- **How**：账目锁（parking_lot）从不跨 `.await` 持有；等待基于 tokio `Notify`"]
#![doc = "  的许可语义；委托 I/O 一律在锁外执行并受 [`brook_core::Timeout`] 交集约束。"]

pub mod adapters;
pub mod bound;
pub mod buffered;
pub mod error;
pub mod pipe;
pub mod testing;

pub use adapters::{to_blocking_sink, to_blocking_source, to_suspending_sink, to_suspending_source};
pub use bound::{monotonic_now, run_bounded};
pub use buffered::BufferedSink;
pub use error::OperationKind;
pub use pipe::{Pipe, PipeBuilder, PipeSink, PipeSource};
