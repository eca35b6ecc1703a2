use alloc::sync::Arc;
use core::sync::atomic::{AtomicBool, Ordering};

/// 管道及其等待路径共享的取消位。
///
/// # 设计背景（Why）
/// - 写者可能挂在"缓冲腾空间"上、读者挂在"缓冲来数据"上，二者都不持有
///   对方的句柄；取消必须经由第三方（持有管道的一侧）一次性打断两端，
///   所以取消状态要独立于任何一端存活，由各等待路径共享同一份。
///
/// # 逻辑解析（How）
/// - 单个 [`AtomicBool`] 经 [`Arc`] 共享；`cancel` 用 CAS 完成
///   false→true 的唯一一次翻转，首次翻转者得到 `true`；
/// - 翻转本身不携带唤醒能力：持有方（如管道）在 `cancel` 返回 `true` 后
///   负责敲自己的唤醒原语，被唤醒的等待者回到锁内先查本标记再评估条件；
/// - `child` 派生共享同一原子位的副本，供折叠委托等下游路径传播信号。
///
/// # 契约说明（What）
/// - 粘性：一旦置位永不复原，之后所有读写入口都以取消错误短路；
/// - `cancel` 的布尔返回值用来保证"清缓冲、唤两端"这类兜底动作只执行一次。
///
/// # 风险提示（Trade-offs）
/// - 纯标志位，不抢占已经越过检查点、正在锁外执行的委托 I/O；
///   那部分进度按各自的 `Timeout` 界限自行收尾。
#[derive(Clone, Debug)]
pub struct Cancellation {
    inner: Arc<CancellationState>,
}

#[derive(Debug, Default)]
struct CancellationState {
    flag: AtomicBool,
}

impl Cancellation {
    /// 创建处于"未取消"状态的取消令牌。
    pub fn new() -> Self {
        Self {
            inner: Arc::new(CancellationState {
                flag: AtomicBool::new(false),
            }),
        }
    }

    /// 查询当前是否已被标记取消。
    pub fn is_cancelled(&self) -> bool {
        self.inner.flag.load(Ordering::Acquire)
    }

    /// 将当前令牌标记为取消。
    ///
    /// 返回 `true` 表示本次调用首次触发取消；返回 `false` 表示之前已被取消。
    pub fn cancel(&self) -> bool {
        self.inner
            .flag
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// 派生共享同一原子位的子令牌。
    pub fn child(&self) -> Self {
        self.clone()
    }
}

impl Default for Cancellation {
    fn default() -> Self {
        Self::new()
    }
}
