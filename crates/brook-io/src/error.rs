use brook_core::error::codes;
use brook_core::{CoreError, ErrorCategory};

/// 操作种类描述符：为超时与取消错误提供稳定错误码与排障文案。
///
/// # 设计背景（Why）
/// - 超时错误在日志与指标中必须能区分"卡在哪一步"：管道写入被背压卡住、折叠
///   外送被慢 Sink 卡住、适配层被阻塞调用卡住，三者的兜底策略完全不同；
/// - 以 `const` 描述符而非字符串字面量贯穿调用链，保证错误码不因手误漂移。
///
/// # 契约说明（What）
/// - `code` 仅用于日志检索的操作标识，超时错误的错误码统一为
///   [`codes::IO_TIMEOUT`]，操作标识进入 `message`；
/// - 所有描述符都是 `'static` 常量，可自由拷贝。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OperationKind {
    code: &'static str,
    message: &'static str,
}

impl OperationKind {
    /// 管道写端向缓冲投递字节。
    pub const PIPE_WRITE: Self = Self {
        code: "pipe.write",
        message: "pipe sink write",
    };
    /// 管道读端自缓冲拉取字节。
    pub const PIPE_READ: Self = Self {
        code: "pipe.read",
        message: "pipe source read",
    };
    /// 管道写端冲刷（折叠后委托给外部 Sink）。
    pub const PIPE_FLUSH: Self = Self {
        code: "pipe.flush",
        message: "pipe sink flush",
    };
    /// 管道写端关闭（折叠后委托给外部 Sink）。
    pub const PIPE_CLOSE: Self = Self {
        code: "pipe.close",
        message: "pipe sink close",
    };
    /// 折叠外送：把管道缓冲排空到外部 Sink。
    pub const PIPE_FOLD: Self = Self {
        code: "pipe.fold",
        message: "pipe fold drain",
    };
    /// 阻塞适配层驱动挂起式读取。
    pub const ADAPTER_READ: Self = Self {
        code: "adapter.read",
        message: "blocking adapter read",
    };
    /// 阻塞适配层驱动挂起式写入。
    pub const ADAPTER_WRITE: Self = Self {
        code: "adapter.write",
        message: "blocking adapter write",
    };
    /// 阻塞适配层驱动挂起式冲刷。
    pub const ADAPTER_FLUSH: Self = Self {
        code: "adapter.flush",
        message: "blocking adapter flush",
    };
    /// 阻塞适配层驱动挂起式关闭。
    pub const ADAPTER_CLOSE: Self = Self {
        code: "adapter.close",
        message: "blocking adapter close",
    };

    /// 返回操作标识。
    pub const fn code(&self) -> &'static str {
        self.code
    }

    /// 返回排障文案。
    pub const fn message(&self) -> &'static str {
        self.message
    }

    /// 构造该操作对应的超时错误。
    pub fn timeout_error(&self) -> CoreError {
        CoreError::new(
            codes::IO_TIMEOUT,
            alloc_message(self.message, "timed out"),
        )
        .with_category(ErrorCategory::Timeout)
    }
}

fn alloc_message(operation: &str, suffix: &str) -> String {
    let mut message = String::with_capacity(operation.len() + suffix.len() + 1);
    message.push_str(operation);
    message.push(' ');
    message.push_str(suffix);
    message
}

/// 管道已被取消。
pub(crate) fn pipe_canceled() -> CoreError {
    CoreError::new(codes::PIPE_CANCELED, "pipe has been canceled")
        .with_category(ErrorCategory::Cancelled)
}

/// 写端已关闭，拒绝后续操作。
pub(crate) fn pipe_sink_closed() -> CoreError {
    CoreError::new(codes::PIPE_CLOSED, "pipe sink already closed")
}

/// 读端已不在，写端无法继续投递或安全关闭。
pub(crate) fn pipe_source_closed(context: &'static str) -> CoreError {
    CoreError::new(codes::PIPE_SOURCE_CLOSED, context)
}

/// 折叠操作不可重入。
pub(crate) fn pipe_already_folded() -> CoreError {
    CoreError::new(codes::PIPE_FOLDED, "pipe has already been folded into a sink")
}

/// Source 对非零请求返回了零字节。
pub(crate) fn zero_byte_read() -> CoreError {
    CoreError::new(
        codes::PROTOCOL_ZERO_READ,
        "source returned zero bytes for a non-zero request",
    )
    .with_category(ErrorCategory::ProtocolViolation)
}
