use crate::error::OperationKind;
use brook_core::{CoreError, MonotonicTimePoint, Timeout};
use std::future::Future;
use std::sync::OnceLock;
use std::time::Instant;

/// 进程级单调时钟原点，所有 [`MonotonicTimePoint`] 以此为基准。
fn monotonic_base() -> Instant {
    static BASE: OnceLock<Instant> = OnceLock::new();
    *BASE.get_or_init(Instant::now)
}

/// 读取当前单调时间点。
///
/// # 契约说明（What）
/// - 同一进程内返回值单调不减，可安全用于 [`Timeout::effective_bound`] 与
///   截止比较；跨进程无意义。
pub fn monotonic_now() -> MonotonicTimePoint {
    MonotonicTimePoint::from_offset(monotonic_base().elapsed())
}

/// 在给定界限内驱动 Future，超时则以稳定错误码失败。
///
/// # 设计背景（Why）
/// - 管道等待、折叠外送与适配层驱动都需要"剩余预算在检查时刻重算"的竞速语义；
///   集中在一个帮助函数里，保证所有路径的超时错误形态一致。
///
/// # 逻辑解析（How）
/// - 先以 [`monotonic_now`] 重算 `timeout` 的剩余上限：无界限直接驱动 Future；
///   上限已为零直接以超时失败，不再投喂 Future；
/// - 否则用 `tokio::select!`（biased）让计时器先行检查，到期后立即放弃 Future，
///   未完成的部分进度随 Future 一并丢弃。
///
/// # 契约说明（What）
/// - **后置条件**：超时错误分类为 `Timeout`，`message` 带上 `kind` 的操作文案；
/// - 调用方需保证被丢弃的 Future 取消安全（要么完成整笔转移，要么毫无痕迹）。
pub async fn run_bounded<T, F>(
    timeout: &Timeout,
    kind: OperationKind,
    future: F,
) -> Result<T, CoreError>
where
    F: Future<Output = Result<T, CoreError>>,
{
    match timeout.effective_bound(monotonic_now()) {
        None => future.await,
        Some(bound) if bound.is_zero() => {
            tracing::trace!(operation = kind.code(), "bound already expired before polling");
            Err(kind.timeout_error())
        }
        Some(bound) => {
            tokio::select! {
                biased;
                _ = tokio::time::sleep(bound) => {
                    tracing::trace!(operation = kind.code(), ?bound, "operation timed out");
                    Err(kind.timeout_error())
                }
                result = future => result,
            }
        }
    }
}
