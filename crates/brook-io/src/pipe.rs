use crate::bound::run_bounded;
use crate::error::{
    OperationKind, pipe_already_folded, pipe_canceled, pipe_sink_closed, pipe_source_closed,
};
use async_trait::async_trait;
use brook_core::{BoxSink, ByteQueue, Cancellation, CoreError, Sink, Source, Timeout};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, Notify};

/// 管道生命周期阶段：活跃缓冲或已折叠到外部 Sink。
///
/// 折叠是一次性的单向迁移；以带标签的枚举显式表达两个阶段，
/// 使"缓冲仍在"与"已移交委托"在类型上互斥，杜绝空值判断。
enum Stage {
    /// 字节经进程内缓冲中转，读端仍可拉取。
    Active(ByteQueue),
    /// 缓冲已排空并移交给外部 Sink，写端操作全部委托给它。
    Folded(Arc<AsyncMutex<BoxSink>>),
}

struct PipeState {
    stage: Stage,
    sink_closed: bool,
    source_closed: bool,
    folded: bool,
}

struct Shared {
    max_buffer_size: u64,
    sink_timeout: Timeout,
    source_timeout: Timeout,
    state: Mutex<PipeState>,
    cancel: Cancellation,
    /// 缓冲出现新字节或写端关闭时唤醒读端。
    readable: Notify,
    /// 缓冲腾出空间、读端关闭或发生折叠/取消时唤醒写端。
    writable: Notify,
}

/// 有界进程内管道：一写一读、背压挂起、可取消、可一次性折叠到外部 Sink。
///
/// # 设计背景（Why）
/// - 生产者与消费者速率不匹配时需要一块有上限的中转缓冲：写端在缓冲占满时
///   协作式挂起而非无限堆积，读端在缓冲空时挂起而非忙等；
/// - "折叠"支持一种常见的移交场景：先在进程内积攒，待外部目的地就绪后把
///   已缓冲的字节与后续写入原子地转交给它，读端随之退役。
///
/// # 逻辑解析（How）
/// - 账目（阶段、关闭位）由 [`parking_lot::Mutex`] 保护，锁从不跨 `.await` 持有；
/// - 等待使用两个 [`Notify`]，依赖 `notify_one` 的许可语义避免"先通知后等待"
///   的丢失唤醒；被唤醒后总是回到锁内重新评估条件；
/// - 折叠后写端的委托 I/O 在 [`AsyncMutex`] 保护下于锁外执行，
///   界限取管道写端策略与委托自身策略的交集。
///
/// # 契约说明（What）
/// - 单写者、单读者纪律：并发写者须在外部自行串行化；
/// - 字节经缓冲保持 FIFO；所有转移均为值搬移，缓冲从不按引用外借；
/// - `cancel` 粘性且终态：清空缓冲、唤醒两端，后续读写一律以取消错误失败，
///   已在锁外进行的委托 I/O 不被抢占。
///
/// # 风险提示（Trade-offs）
/// - `fold` 的排空循环次数与竞争写入次数同阶，活性依赖写者最终停写或被取消；
/// - 取消只设置标志并唤醒等待者，不会中断委托 Sink 内部的慢操作。
pub struct Pipe {
    shared: Arc<Shared>,
}

/// [`Pipe`] 的配置入口：容量与两端的界限策略。
pub struct PipeBuilder {
    max_buffer_size: u64,
    sink_timeout: Timeout,
    source_timeout: Timeout,
}

impl PipeBuilder {
    fn new() -> Self {
        Self {
            max_buffer_size: 64 * 1024,
            sink_timeout: Timeout::none(),
            source_timeout: Timeout::none(),
        }
    }

    /// 设置缓冲容量上限（字节），必须至少为 1。
    pub fn max_buffer_size(mut self, bytes: u64) -> Self {
        self.max_buffer_size = bytes;
        self
    }

    /// 设置写端操作的界限策略。
    pub fn sink_timeout(mut self, timeout: Timeout) -> Self {
        self.sink_timeout = timeout;
        self
    }

    /// 设置读端操作的界限策略。
    pub fn source_timeout(mut self, timeout: Timeout) -> Self {
        self.source_timeout = timeout;
        self
    }

    /// 构建管道。
    ///
    /// # Panics
    /// 容量为 0 属于调用方编程错误，直接 panic。
    pub fn build(self) -> Pipe {
        assert!(self.max_buffer_size >= 1, "pipe capacity must be at least 1 byte");
        Pipe {
            shared: Arc::new(Shared {
                max_buffer_size: self.max_buffer_size,
                sink_timeout: self.sink_timeout,
                source_timeout: self.source_timeout,
                state: Mutex::new(PipeState {
                    stage: Stage::Active(ByteQueue::new()),
                    sink_closed: false,
                    source_closed: false,
                    folded: false,
                }),
                cancel: Cancellation::new(),
                readable: Notify::new(),
                writable: Notify::new(),
            }),
        }
    }
}

impl Pipe {
    /// 以默认界限策略创建容量为 `max_buffer_size` 字节的管道。
    ///
    /// # Panics
    /// 容量为 0 时 panic，与 [`PipeBuilder::build`] 一致。
    pub fn new(max_buffer_size: u64) -> Self {
        Self::builder().max_buffer_size(max_buffer_size).build()
    }

    /// 返回配置入口。
    pub fn builder() -> PipeBuilder {
        PipeBuilder::new()
    }

    /// 取得生产者句柄（单写者纪律）。
    pub fn sink(&self) -> PipeSink {
        PipeSink {
            shared: Arc::clone(&self.shared),
        }
    }

    /// 取得消费者句柄（单读者纪律）。
    pub fn source(&self) -> PipeSource {
        PipeSource {
            shared: Arc::clone(&self.shared),
        }
    }

    /// 查询管道是否已被取消。
    pub fn is_cancelled(&self) -> bool {
        self.shared.cancel.is_cancelled()
    }

    /// 取消管道：丢弃缓冲字节并唤醒两端，粘性且不可逆。
    pub fn cancel(&self) {
        if !self.shared.cancel.cancel() {
            return;
        }
        let discarded = {
            let mut state = self.shared.state.lock();
            match &mut state.stage {
                Stage::Active(buffer) => {
                    let size = buffer.size();
                    buffer.clear();
                    size
                }
                Stage::Folded(_) => 0,
            }
        };
        tracing::debug!(discarded, "pipe canceled");
        self.shared.readable.notify_one();
        self.shared.writable.notify_one();
    }

    /// 把管道一次性折叠到外部 Sink。
    ///
    /// # 逻辑解析（How）
    /// - 缓冲非空时：锁内把整个缓冲搬进私有快照并唤醒写端，锁外把快照
    ///   写出并冲刷到委托；有竞争写入时重复该回合；
    /// - 缓冲为空时：退役读端、把阶段切换为 `Folded`，若写端此前已关闭则在
    ///   锁外把关闭传导给委托。
    ///
    /// # 契约说明（What）
    /// - 一次性操作：重复调用以 `brook.pipe.folded` 失败；
    /// - 已取消的管道仍会安装委托（使后续写端关闭可传导），随后以
    ///   `brook.pipe.canceled` 失败；
    /// - 委托写出失败时先退役读端（避免写者悬挂）再上抛。
    pub async fn fold(&self, sink: BoxSink) -> Result<(), CoreError> {
        let delegate = Arc::new(AsyncMutex::new(sink));
        loop {
            enum FoldStep {
                Install { close_delegate: bool },
                Drain(ByteQueue),
            }

            let step = {
                let mut guard = self.shared.state.lock();
                let state = &mut *guard;
                if state.folded {
                    return Err(pipe_already_folded());
                }
                if self.shared.cancel.is_cancelled() {
                    state.folded = true;
                    state.source_closed = true;
                    state.stage = Stage::Folded(Arc::clone(&delegate));
                    drop(guard);
                    self.shared.readable.notify_one();
                    self.shared.writable.notify_one();
                    return Err(pipe_canceled());
                }
                match &mut state.stage {
                    Stage::Active(buffer) if buffer.exhausted() => {
                        state.folded = true;
                        state.source_closed = true;
                        let close_delegate = state.sink_closed;
                        state.stage = Stage::Folded(Arc::clone(&delegate));
                        FoldStep::Install { close_delegate }
                    }
                    Stage::Active(buffer) => {
                        let mut snapshot = ByteQueue::new();
                        let pending = buffer.size();
                        snapshot.transfer_from(buffer, pending);
                        FoldStep::Drain(snapshot)
                    }
                    // folded 标志先于阶段切换置位，这里不可达。
                    Stage::Folded(_) => return Err(pipe_already_folded()),
                }
            };

            match step {
                FoldStep::Install { close_delegate } => {
                    tracing::debug!(close_delegate, "pipe folded into delegate sink");
                    // 读端已退役，等待中的读者必须被唤醒以观察到该事实。
                    self.shared.readable.notify_one();
                    self.shared.writable.notify_one();
                    if close_delegate {
                        let mut guard = delegate.lock().await;
                        let bound = self.shared.sink_timeout.intersect(&guard.timeout());
                        run_bounded(&bound, OperationKind::PIPE_CLOSE, guard.close()).await?;
                    }
                    return Ok(());
                }
                FoldStep::Drain(mut snapshot) => {
                    let pending = snapshot.size();
                    tracing::trace!(pending, "draining pipe buffer into delegate sink");
                    self.shared.writable.notify_one();
                    let drained = {
                        let mut guard = delegate.lock().await;
                        let bound = self.shared.sink_timeout.intersect(&guard.timeout());
                        run_bounded(&bound, OperationKind::PIPE_FOLD, async {
                            guard.write(&mut snapshot, pending).await?;
                            guard.flush().await
                        })
                        .await
                    };
                    if let Err(error) = drained {
                        // 委托失败后读端不会再有数据，必须退役以免写者悬挂。
                        self.shared.state.lock().source_closed = true;
                        self.shared.readable.notify_one();
                        self.shared.writable.notify_one();
                        return Err(error);
                    }
                }
            }
        }
    }
}

/// 管道的生产者句柄。
pub struct PipeSink {
    shared: Arc<Shared>,
}

/// 管道的消费者句柄。
pub struct PipeSource {
    shared: Arc<Shared>,
}

#[async_trait]
impl Sink for PipeSink {
    async fn write(&mut self, source: &mut ByteQueue, byte_count: u64) -> Result<(), CoreError> {
        debug_assert!(byte_count <= source.size(), "write 超出来源队列的容量");
        let mut remaining = byte_count;
        loop {
            enum WriteStep {
                Delegate(Arc<AsyncMutex<BoxSink>>),
                Moved,
                Wait,
            }

            let step = {
                let mut guard = self.shared.state.lock();
                let state = &mut *guard;
                if self.shared.cancel.is_cancelled() {
                    return Err(pipe_canceled());
                }
                if state.sink_closed {
                    return Err(pipe_sink_closed());
                }
                if remaining == 0 {
                    return Ok(());
                }
                match &mut state.stage {
                    Stage::Folded(delegate) => WriteStep::Delegate(Arc::clone(delegate)),
                    Stage::Active(_) if state.source_closed => {
                        return Err(pipe_source_closed(
                            "pipe source is closed, writes can no longer be read",
                        ));
                    }
                    Stage::Active(buffer) => {
                        let space = self.shared.max_buffer_size - buffer.size();
                        if space == 0 {
                            WriteStep::Wait
                        } else {
                            let take = space.min(remaining);
                            buffer.transfer_from(source, take);
                            remaining -= take;
                            WriteStep::Moved
                        }
                    }
                }
            };

            match step {
                WriteStep::Delegate(delegate) => {
                    let mut guard = delegate.lock().await;
                    let bound = self.shared.sink_timeout.intersect(&guard.timeout());
                    return run_bounded(
                        &bound,
                        OperationKind::PIPE_WRITE,
                        guard.write(source, remaining),
                    )
                    .await;
                }
                WriteStep::Moved => {
                    self.shared.readable.notify_one();
                }
                WriteStep::Wait => {
                    tracing::trace!(remaining, "pipe buffer full, writer suspending");
                    let notified = self.shared.writable.notified();
                    run_bounded(&self.shared.sink_timeout, OperationKind::PIPE_WRITE, async {
                        notified.await;
                        Ok(())
                    })
                    .await?;
                }
            }
        }
    }

    async fn flush(&mut self) -> Result<(), CoreError> {
        let delegate = {
            let guard = self.shared.state.lock();
            let state = &*guard;
            if self.shared.cancel.is_cancelled() {
                return Err(pipe_canceled());
            }
            if state.sink_closed {
                return Err(pipe_sink_closed());
            }
            match &state.stage {
                Stage::Folded(delegate) => Some(Arc::clone(delegate)),
                Stage::Active(buffer) => {
                    if state.source_closed && !buffer.exhausted() {
                        return Err(pipe_source_closed(
                            "pipe source is closed, buffered bytes can no longer be read",
                        ));
                    }
                    None
                }
            }
        };
        match delegate {
            Some(delegate) => {
                let mut guard = delegate.lock().await;
                let bound = self.shared.sink_timeout.intersect(&guard.timeout());
                run_bounded(&bound, OperationKind::PIPE_FLUSH, guard.flush()).await
            }
            None => Ok(()),
        }
    }

    async fn close(&mut self) -> Result<(), CoreError> {
        // 取消后的关闭仍然成功：关闭是资源释放，不是数据投递。
        let delegate = {
            let mut guard = self.shared.state.lock();
            let state = &mut *guard;
            if state.sink_closed {
                return Ok(());
            }
            match &state.stage {
                Stage::Folded(delegate) => {
                    let delegate = Arc::clone(delegate);
                    state.sink_closed = true;
                    Some(delegate)
                }
                Stage::Active(buffer) => {
                    if state.source_closed
                        && !buffer.exhausted()
                        && !self.shared.cancel.is_cancelled()
                    {
                        return Err(pipe_source_closed(
                            "pipe source is closed, buffered bytes would be dropped",
                        ));
                    }
                    state.sink_closed = true;
                    None
                }
            }
        };
        match delegate {
            Some(delegate) => {
                let mut guard = delegate.lock().await;
                let bound = self.shared.sink_timeout.intersect(&guard.timeout());
                run_bounded(&bound, OperationKind::PIPE_CLOSE, guard.close()).await
            }
            None => {
                // 读端需要观察到"不再有新字节"才能返回耗尽。
                self.shared.readable.notify_one();
                Ok(())
            }
        }
    }

    fn timeout(&self) -> Timeout {
        self.shared.sink_timeout
    }
}

#[async_trait]
impl Source for PipeSource {
    async fn read(
        &mut self,
        sink: &mut ByteQueue,
        byte_count: u64,
    ) -> Result<Option<u64>, CoreError> {
        loop {
            enum ReadStep {
                Moved(u64),
                Wait,
            }

            let step = {
                let mut guard = self.shared.state.lock();
                let state = &mut *guard;
                if self.shared.cancel.is_cancelled() {
                    return Err(pipe_canceled());
                }
                if state.source_closed {
                    return Err(CoreError::new(
                        brook_core::error::codes::PIPE_CLOSED,
                        "pipe source already closed",
                    ));
                }
                if byte_count == 0 {
                    return Ok(Some(0));
                }
                match &mut state.stage {
                    // 折叠先退役读端，这个分支只在极端竞争下可见，视同已折叠。
                    Stage::Folded(_) => return Err(pipe_already_folded()),
                    Stage::Active(buffer) if buffer.exhausted() => {
                        if state.sink_closed {
                            return Ok(None);
                        }
                        ReadStep::Wait
                    }
                    Stage::Active(buffer) => {
                        let take = byte_count.min(buffer.size());
                        sink.transfer_from(buffer, take);
                        ReadStep::Moved(take)
                    }
                }
            };

            match step {
                ReadStep::Moved(read) => {
                    self.shared.writable.notify_one();
                    return Ok(Some(read));
                }
                ReadStep::Wait => {
                    tracing::trace!("pipe buffer empty, reader suspending");
                    let notified = self.shared.readable.notified();
                    run_bounded(
                        &self.shared.source_timeout,
                        OperationKind::PIPE_READ,
                        async {
                            notified.await;
                            Ok(())
                        },
                    )
                    .await?;
                }
            }
        }
    }

    async fn close(&mut self) -> Result<(), CoreError> {
        self.shared.state.lock().source_closed = true;
        self.shared.writable.notify_one();
        Ok(())
    }

    fn timeout(&self) -> Timeout {
        self.shared.source_timeout
    }
}
