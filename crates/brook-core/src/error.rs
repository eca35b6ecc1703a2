use crate::Error;
use alloc::{borrow::Cow, boxed::Box};
use core::fmt;

/// `ErrorCause` 封装底层原因，保持 `Send + Sync` 以方便跨线程传递。
pub type ErrorCause = Box<dyn Error + Send + Sync + 'static>;

/// 表征错误的处置分类，供调用方在不解析错误码的情况下做快速决策。
///
/// # 设计背景（Why）
/// - 超时与取消在挂起式 I/O 中是常态而非异常，调用方经常需要区分"值得上报的故障"
///   与"协作式中断"；分类字段使这种判断不依赖字符串匹配。
///
/// # 契约说明（What）
/// - `Timeout`：操作在截止界限内未完成；
/// - `Cancelled`：操作被取消原语协作式打断；
/// - `ProtocolViolation`：对端或实现违反了 Source/Sink 契约（例如零字节读取）；
/// - `ResourceExhausted`：容量或配额耗尽；
/// - `NonRetryable`：其余不可重试的故障（本层不执行任何重试）。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorCategory {
    /// 操作超出截止界限。
    Timeout,
    /// 操作被协作式取消。
    Cancelled,
    /// Source/Sink 契约被违反。
    ProtocolViolation,
    /// 容量或配额耗尽。
    ResourceExhausted,
    /// 不可重试的一般性故障。
    NonRetryable,
}

/// `CoreError` 提供稳定的错误码与根因链路，是本仓库错误分层的最底层。
///
/// # 设计背景（Why）
/// - 日志、指标与上层兜底策略都依赖稳定的错误标识；错误码以 `'static` 字符串承载
///   `namespace.reason` 语义，`message` 面向排障人员，两者职责分离。
/// - 通过对象安全的 [`Error`] 实现，保证在 `no_std + alloc` 环境下同样可用。
///
/// # 契约说明（What）
/// - `code`：稳定字符串，必须来自 [`codes`] 模块或遵循 `namespace.reason` 约定；
/// - `message`：人类可读描述，避免包含敏感信息；
/// - `category`：处置分类，默认 [`ErrorCategory::NonRetryable`]；
/// - `cause`：可选底层原因，经 `source()` 暴露完整链路。
///
/// # 风险提示（Trade-offs）
/// - 结构体仅负责承载信息，不执行格式化或指标上报；调用方需自行处理。
#[derive(Debug)]
pub struct CoreError {
    code: &'static str,
    message: Cow<'static, str>,
    category: ErrorCategory,
    cause: Option<ErrorCause>,
}

impl CoreError {
    /// 构造核心错误，默认分类为 [`ErrorCategory::NonRetryable`]。
    pub fn new(code: &'static str, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            code,
            message: message.into(),
            category: ErrorCategory::NonRetryable,
            cause: None,
        }
    }

    /// 指定处置分类并返回新的核心错误。
    pub fn with_category(mut self, category: ErrorCategory) -> Self {
        self.category = category;
        self
    }

    /// 附带底层原因并返回新的核心错误。
    pub fn with_cause(mut self, cause: impl Error + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// 获取稳定错误码。
    pub fn code(&self) -> &'static str {
        self.code
    }

    /// 获取描述。
    pub fn message(&self) -> &str {
        &self.message
    }

    /// 获取处置分类。
    pub fn category(&self) -> ErrorCategory {
        self.category
    }

    /// 获取底层原因。
    pub fn cause(&self) -> Option<&ErrorCause> {
        self.cause.as_ref()
    }

    /// 是否为超时错误。
    pub fn is_timeout(&self) -> bool {
        self.category == ErrorCategory::Timeout
    }

    /// 是否为取消错误。
    pub fn is_cancelled(&self) -> bool {
        self.category == ErrorCategory::Cancelled
    }
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl Error for CoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.cause
            .as_ref()
            .map(|boxed| boxed.as_ref() as &(dyn Error + 'static))
    }
}

/// 本仓库内置的错误码常量集合，确保可观测性系统具有稳定识别符。
///
/// # 契约说明（What）
/// - 错误码遵循 `<领域>.<语义>` 命名约定，方便在跨组件日志中检索与聚合；
/// - 调用方收到这些错误码后可据此触发兜底策略（如释放资源、标记连接失效或请求人工干预）。
pub mod codes {
    /// 对已关闭的 Source/Sink 执行操作。
    pub const IO_CLOSED: &str = "brook.io.closed";
    /// 在满足精确字节数之前 Source 已耗尽。
    pub const IO_EOF: &str = "brook.io.eof";
    /// 操作超出截止界限。
    pub const IO_TIMEOUT: &str = "brook.io.timeout";
    /// 操作被协作式取消。
    pub const IO_CANCELLED: &str = "brook.io.cancelled";
    /// 当前线程不在异步运行时上下文内，无法构造阻塞适配器。
    pub const IO_NO_RUNTIME: &str = "brook.io.no_runtime";
    /// Source 对非零请求返回了零字节，违反读取契约。
    pub const PROTOCOL_ZERO_READ: &str = "brook.protocol.zero_read";
    /// 管道读端已关闭，写端无法继续投递。
    pub const PIPE_SOURCE_CLOSED: &str = "brook.pipe.source_closed";
    /// 管道端点已关闭。
    pub const PIPE_CLOSED: &str = "brook.pipe.closed";
    /// 管道已被取消。
    pub const PIPE_CANCELED: &str = "brook.pipe.canceled";
    /// 管道已经折叠到外部 Sink，折叠操作不可重入。
    pub const PIPE_FOLDED: &str = "brook.pipe.folded";
}

const _: fn() = || {
    fn assert_error_traits<T: Error + Send + Sync + 'static>() {}

    assert_error_traits::<CoreError>();
};
