use crate::error::zero_byte_read;
use async_trait::async_trait;
use brook_core::error::codes;
use brook_core::{ByteQueue, CoreError, SEGMENT_SIZE, Sink, Source, Timeout};

/// `BufferedSink` 把零散写入聚合成整段后再外送，是写路径的标准装饰器。
///
/// # 设计背景（Why）
/// - 下游 Sink（套接字、文件、管道）对小写入的每次调用都有固定开销；按
///   [`SEGMENT_SIZE`] 对齐批量外送可把 N 次小写入合并为一次段写出，
///   同时最多滞留一个未写满的尾段，延迟可控。
///
/// # 逻辑解析（How）
/// - 所有写入先进入内部 [`ByteQueue`]，随后检查
///   [`ByteQueue::complete_segment_byte_count`]：只要存在完整段就立即写给内层 Sink；
/// - `emit` 无视对齐强制清空；`flush` 在 `emit` 之后把冲刷传导给内层；
/// - `close` 先推出滞留字节再关闭内层，即使推出失败也保证内层被关闭，
///   两者皆失败时上抛先发生的推出失败。
///
/// # 契约说明（What）
/// - **不变式**：任意操作返回后，内部缓冲至多滞留 `SEGMENT_SIZE - 1` 字节；
/// - `close` 幂等；关闭后除 `close` 外的操作一律以
///   [`codes::IO_CLOSED`] 失败；
/// - `timeout()` 透传内层 Sink 的界限策略，本装饰器不额外施加界限。
///
/// # 风险提示（Trade-offs）
/// - 装饰器自身不加锁，遵循单持有者使用方式；并发写入需调用方在外部串行化。
pub struct BufferedSink<S: Sink> {
    inner: S,
    buffer: ByteQueue,
    closed: bool,
}

impl<S: Sink> BufferedSink<S> {
    /// 包装内层 Sink，初始缓冲为空。
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            buffer: ByteQueue::new(),
            closed: false,
        }
    }

    /// 当前滞留在内部缓冲、尚未外送的字节数。
    pub fn buffered_byte_count(&self) -> u64 {
        self.buffer.size()
    }

    /// 访问内层 Sink。
    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    fn check_open(&self) -> Result<(), CoreError> {
        if self.closed {
            Err(CoreError::new(codes::IO_CLOSED, "buffered sink already closed"))
        } else {
            Ok(())
        }
    }

    /// 把所有完整段写给内层，未写满的尾段继续滞留。
    async fn emit_complete_segments(&mut self) -> Result<(), CoreError> {
        let count = self.buffer.complete_segment_byte_count();
        if count > 0 {
            self.inner.write(&mut self.buffer, count).await?;
        }
        Ok(())
    }

    /// 无视段对齐，把缓冲中的全部字节推给内层 Sink。
    pub async fn emit(&mut self) -> Result<(), CoreError> {
        self.check_open()?;
        self.emit_everything().await
    }

    async fn emit_everything(&mut self) -> Result<(), CoreError> {
        let count = self.buffer.size();
        if count > 0 {
            self.inner.write(&mut self.buffer, count).await?;
        }
        Ok(())
    }

    /// 写入单个字节。
    pub async fn write_u8(&mut self, value: u8) -> Result<(), CoreError> {
        self.write_slice(&[value]).await
    }

    /// 以大端序写入 16 位整数。
    pub async fn write_u16(&mut self, value: u16) -> Result<(), CoreError> {
        self.write_slice(&value.to_be_bytes()).await
    }

    /// 以大端序写入 32 位整数。
    pub async fn write_u32(&mut self, value: u32) -> Result<(), CoreError> {
        self.write_slice(&value.to_be_bytes()).await
    }

    /// 以大端序写入 64 位整数。
    pub async fn write_u64(&mut self, value: u64) -> Result<(), CoreError> {
        self.write_slice(&value.to_be_bytes()).await
    }

    /// 写入一段字节，随后外送已攒满的完整段。
    pub async fn write_slice(&mut self, bytes: &[u8]) -> Result<(), CoreError> {
        self.check_open()?;
        self.buffer.write(bytes);
        self.emit_complete_segments().await
    }

    /// 写入 UTF-8 文本。
    pub async fn write_utf8(&mut self, text: &str) -> Result<(), CoreError> {
        self.write_slice(text.as_bytes()).await
    }

    /// 把来源读到耗尽，返回转移的总字节数。
    ///
    /// # 契约说明（What）
    /// - 每次至多读入一个段的字节量，读后立刻外送完整段，内存占用有界；
    /// - 来源对非零请求返回零字节时，以
    ///   [`codes::PROTOCOL_ZERO_READ`] 失败。
    pub async fn write_all(&mut self, source: &mut dyn Source) -> Result<u64, CoreError> {
        self.check_open()?;
        let mut total = 0u64;
        loop {
            match source.read(&mut self.buffer, SEGMENT_SIZE as u64).await? {
                None => break,
                Some(0) => return Err(zero_byte_read()),
                Some(read) => {
                    total += read;
                    self.emit_complete_segments().await?;
                }
            }
        }
        Ok(total)
    }

    /// 从来源精确复制 `byte_count` 字节。
    ///
    /// 来源在满足字节数之前耗尽时，以 [`codes::IO_EOF`] 失败；
    /// 失败前已读入的字节仍滞留在缓冲中，等待后续 `emit`/`close` 处置。
    pub async fn write_from(
        &mut self,
        source: &mut dyn Source,
        byte_count: u64,
    ) -> Result<(), CoreError> {
        self.check_open()?;
        let mut remaining = byte_count;
        while remaining > 0 {
            match source.read(&mut self.buffer, remaining).await? {
                None => {
                    return Err(CoreError::new(
                        codes::IO_EOF,
                        "source exhausted before the requested byte count was met",
                    ));
                }
                Some(0) => return Err(zero_byte_read()),
                Some(read) => {
                    remaining -= read;
                    self.emit_complete_segments().await?;
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl<S: Sink> Sink for BufferedSink<S> {
    async fn write(&mut self, source: &mut ByteQueue, byte_count: u64) -> Result<(), CoreError> {
        self.check_open()?;
        self.buffer.transfer_from(source, byte_count);
        self.emit_complete_segments().await
    }

    async fn flush(&mut self) -> Result<(), CoreError> {
        self.check_open()?;
        self.emit_everything().await?;
        self.inner.flush().await
    }

    async fn close(&mut self) -> Result<(), CoreError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let pending = self.buffer.size();
        let push_result = self.emit_everything().await;
        tracing::debug!(
            pending,
            pushed = push_result.is_ok(),
            "closing buffered sink"
        );
        // 即使推出失败也必须关闭内层；首个失败优先上抛。
        let close_result = self.inner.close().await;
        match push_result {
            Ok(()) => close_result,
            Err(push_error) => Err(push_error),
        }
    }

    fn timeout(&self) -> Timeout {
        self.inner.timeout()
    }
}
