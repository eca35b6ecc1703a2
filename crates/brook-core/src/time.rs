use core::time::Duration;

/// 单调时间点：相对进程内某个固定原点的偏移量。
///
/// # 设计背景（Why）
/// - 截止时间比较必须基于单调时钟，壁钟回拨会导致超时判断失真；
/// - 以"原点 + 偏移"表达时间点，使契约层无需依赖 `std::time::Instant`，
///   具体原点由运行时实现（如 `brook-io` 的进程级基准）选取。
///
/// # 契约说明（What）
/// - 全序比较有意义的前提是两个时间点来自同一原点；
/// - `saturating_add` / `saturating_duration_since` 在溢出时饱和，不会回绕。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonotonicTimePoint {
    offset: Duration,
}

impl MonotonicTimePoint {
    /// 以距原点的偏移量构造时间点。
    pub const fn from_offset(offset: Duration) -> Self {
        Self { offset }
    }

    /// 返回距原点的偏移量。
    pub const fn as_duration(&self) -> Duration {
        self.offset
    }

    /// 向后推移指定时长，溢出时饱和。
    pub fn saturating_add(self, duration: Duration) -> Self {
        Self {
            offset: self.offset.saturating_add(duration),
        }
    }

    /// 计算自 `earlier` 以来经过的时长，若 `earlier` 在未来则返回零。
    pub fn saturating_duration_since(self, earlier: Self) -> Duration {
        self.offset.saturating_sub(earlier.offset)
    }
}

/// 可选的绝对截止点，[`Timeout`] 的两种界限之一。
///
/// # 设计背景（Why）
/// - 一次写入可能跨越多轮"搬移—挂起—再搬移"，若每轮都重置相对时长，
///   慢速消费方可以让写者无限期滞留；把预算钉在绝对时间点上，
///   各轮等待共同消耗同一份余额；
/// - `None` 表示调用方未施加硬界限，与"零预算"严格区分。
///
/// # 契约说明（What）
/// - 比较与到期判断都以调用方显式传入的 `now` 为准，本类型从不自行读钟，
///   因此在无时钟环境（测试、`no_std`）下同样可用；
/// - `with_timeout(now, d)` 生成的截止点与 `now` 必须同源，跨原点比较无意义。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Deadline {
    instant: Option<MonotonicTimePoint>,
}

impl Deadline {
    /// 创建未设置截止时间的实例。
    pub const fn none() -> Self {
        Self { instant: None }
    }

    /// 根据绝对时间点构造截止时间。
    pub const fn at(instant: MonotonicTimePoint) -> Self {
        Self {
            instant: Some(instant),
        }
    }

    /// 基于当前时间点加持续时间生成截止时间。
    pub fn with_timeout(now: MonotonicTimePoint, timeout: Duration) -> Self {
        Self::at(now.saturating_add(timeout))
    }

    /// 返回内部时间点，便于与调度器协作。
    pub const fn instant(&self) -> Option<MonotonicTimePoint> {
        self.instant
    }

    /// 判断是否已经超时。
    pub fn is_expired(&self, now: MonotonicTimePoint) -> bool {
        match self.instant {
            Some(deadline) => now >= deadline,
            None => false,
        }
    }
}

/// 超时值对象：组合"相对时长上限"与"绝对截止点"两种界限。
///
/// # 设计背景（Why）
/// - 每个 Source/Sink 通过 `timeout()` 声明自身操作的界限策略；当管道折叠到外部 Sink
///   时，两份策略同时生效，需要一个可交集、可在检查时刻重算的值对象。
///
/// # 逻辑解析（How）
/// - `intersect` 取两者中更紧的界限：时长取较小者，截止点取较早者；
/// - `effective_bound` 在给定的"现在"重算剩余等待上限：对截止点取
///   `deadline - now`（饱和），再与相对时长取较小值；两者皆缺省时返回 `None`。
///
/// # 契约说明（What）
/// - **前置条件**：参与比较的截止点必须来自同一单调原点；
/// - **后置条件**：`effective_bound` 返回 `Some(Duration::ZERO)` 表示界限已到期，
///   调用方应立即以超时失败，而非再次挂起。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Timeout {
    duration: Option<Duration>,
    deadline: Deadline,
}

impl Timeout {
    /// 创建无界限的超时策略。
    pub const fn none() -> Self {
        Self {
            duration: None,
            deadline: Deadline::none(),
        }
    }

    /// 以相对时长构造超时策略。
    pub const fn of(duration: Duration) -> Self {
        Self {
            duration: Some(duration),
            deadline: Deadline::none(),
        }
    }

    /// 以绝对截止点构造超时策略。
    pub const fn until(deadline: Deadline) -> Self {
        Self {
            duration: None,
            deadline,
        }
    }

    /// 在现有策略上补充绝对截止点。
    pub const fn with_deadline(mut self, deadline: Deadline) -> Self {
        self.deadline = deadline;
        self
    }

    /// 返回相对时长上限。
    pub const fn duration(&self) -> Option<Duration> {
        self.duration
    }

    /// 返回绝对截止点。
    pub const fn deadline(&self) -> Deadline {
        self.deadline
    }

    /// 是否完全无界限。
    pub const fn is_unbounded(&self) -> bool {
        self.duration.is_none() && self.deadline.instant().is_none()
    }

    /// 取两份策略的交集（更紧的界限）。
    pub fn intersect(&self, other: &Timeout) -> Timeout {
        let duration = match (self.duration, other.duration) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (Some(a), None) => Some(a),
            (None, Some(b)) => Some(b),
            (None, None) => None,
        };
        let deadline = match (self.deadline.instant(), other.deadline.instant()) {
            (Some(a), Some(b)) => Deadline::at(a.min(b)),
            (Some(a), None) => Deadline::at(a),
            (None, Some(b)) => Deadline::at(b),
            (None, None) => Deadline::none(),
        };
        Timeout { duration, deadline }
    }

    /// 相对 `now` 重算当前生效的剩余等待上限；无界限时返回 `None`。
    pub fn effective_bound(&self, now: MonotonicTimePoint) -> Option<Duration> {
        let from_deadline = self
            .deadline
            .instant()
            .map(|instant| instant.saturating_duration_since(now));
        match (self.duration, from_deadline) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (Some(a), None) => Some(a),
            (None, Some(b)) => Some(b),
            (None, None) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: u64) -> MonotonicTimePoint {
        MonotonicTimePoint::from_offset(Duration::from_secs(secs))
    }

    #[test]
    fn deadline_expiry_is_relative_to_provided_now() {
        let deadline = Deadline::with_timeout(at(10), Duration::from_secs(5));
        assert!(!deadline.is_expired(at(14)));
        assert!(deadline.is_expired(at(15)));
        assert!(!Deadline::none().is_expired(at(1_000_000)));
    }

    /// 验证交集总是取更紧的界限，且与操作数顺序无关。
    #[test]
    fn intersect_picks_the_tighter_bound() {
        let a = Timeout::of(Duration::from_secs(3)).with_deadline(Deadline::at(at(20)));
        let b = Timeout::of(Duration::from_secs(7)).with_deadline(Deadline::at(at(12)));

        let both = a.intersect(&b);
        assert_eq!(both.duration(), Some(Duration::from_secs(3)));
        assert_eq!(both.deadline().instant(), Some(at(12)));
        assert_eq!(b.intersect(&a), both);

        let with_unbounded = a.intersect(&Timeout::none());
        assert_eq!(with_unbounded.duration(), Some(Duration::from_secs(3)));
        assert_eq!(with_unbounded.deadline().instant(), Some(at(20)));
    }

    #[test]
    fn effective_bound_recomputes_against_now() {
        let timeout = Timeout::of(Duration::from_secs(10)).with_deadline(Deadline::at(at(8)));

        // 距截止点还有 3 秒，比相对时长 10 秒更紧。
        assert_eq!(timeout.effective_bound(at(5)), Some(Duration::from_secs(3)));
        // 截止点已过，剩余等待饱和为零。
        assert_eq!(timeout.effective_bound(at(9)), Some(Duration::ZERO));
        assert_eq!(Timeout::none().effective_bound(at(0)), None);
        assert!(Timeout::none().is_unbounded());
    }
}
