//! 管道的行为级集成测试：背压挂起、关闭语义、折叠与取消。
//!
//! 涉及真实计时的断言都包着宽松的墙钟护栏（`tokio::time::timeout`），
//! 避免实现退化成悬挂时拖垮整个测试进程。

use brook_core::error::codes;
use brook_core::{ByteQueue, Sink, Source, Timeout};
use brook_io::Pipe;
use brook_io::testing::RecordingSink;
use std::time::Duration;
use tokio::time::{sleep, timeout};

const GUARD: Duration = Duration::from_secs(2);

fn queue(bytes: &[u8]) -> ByteQueue {
    let mut queue = ByteQueue::new();
    queue.write(bytes);
    queue
}

async fn read_bytes(source: &mut brook_io::PipeSource, byte_count: u64) -> Option<Vec<u8>> {
    let mut staging = ByteQueue::new();
    match source.read(&mut staging, byte_count).await.unwrap() {
        Some(read) => Some(staging.read(read).to_vec()),
        None => None,
    }
}

/// 容量 8 的完整剧本：短写直读、长写背压、读出后放行、字节序保持。
#[tokio::test]
async fn capacity_eight_hello_scenario() {
    let pipe = Pipe::new(8);
    let mut sink = pipe.sink();
    let mut source = pipe.source();

    sink.write(&mut queue(b"hello"), 5).await.unwrap();
    assert_eq!(read_bytes(&mut source, 10).await.unwrap(), b"hello".to_vec());

    let writer = tokio::spawn(async move {
        sink.write(&mut queue(b"0123456789"), 10).await.unwrap();
        sink
    });

    // 写者应在缓冲到达 8 字节后挂起。
    sleep(Duration::from_millis(50)).await;
    assert!(!writer.is_finished());

    let mut collected = read_bytes(&mut source, 8).await.unwrap();
    let mut sink = timeout(GUARD, writer).await.unwrap().unwrap();
    collected.extend(read_bytes(&mut source, 8).await.unwrap());
    assert_eq!(collected, b"0123456789".to_vec());

    sink.close().await.unwrap();
    assert_eq!(read_bytes(&mut source, 1).await, None);
}

/// 读端关闭必须在有限时间内唤醒被背压挂住的写者，并给出稳定错误码。
#[tokio::test]
async fn closing_the_source_unblocks_a_suspended_writer() {
    let pipe = Pipe::new(2);
    let mut sink = pipe.sink();
    let mut source = pipe.source();

    let writer = tokio::spawn(async move { sink.write(&mut queue(b"abcde"), 5).await });

    sleep(Duration::from_millis(50)).await;
    assert!(!writer.is_finished());
    source.close().await.unwrap();

    let error = timeout(GUARD, writer)
        .await
        .expect("writer must wake in bounded time")
        .unwrap()
        .expect_err("write must fail once the reader is gone");
    assert_eq!(error.code(), codes::PIPE_SOURCE_CLOSED);
}

#[tokio::test]
async fn sink_close_fails_only_when_buffered_bytes_would_be_dropped() {
    // 读端已关、缓冲非空：关闭会丢数据，必须失败。
    let pipe = Pipe::new(8);
    let mut sink = pipe.sink();
    let mut source = pipe.source();
    sink.write(&mut queue(b"abc"), 3).await.unwrap();
    source.close().await.unwrap();
    let error = sink.close().await.expect_err("buffered bytes would be dropped");
    assert_eq!(error.code(), codes::PIPE_SOURCE_CLOSED);

    // 读端仍开：缓冲字节仍可被读走，关闭成功，读端先见数据再见耗尽。
    let pipe = Pipe::new(8);
    let mut sink = pipe.sink();
    let mut source = pipe.source();
    sink.write(&mut queue(b"tail"), 4).await.unwrap();
    sink.close().await.unwrap();
    sink.close().await.unwrap();
    assert_eq!(read_bytes(&mut source, 8).await.unwrap(), b"tail".to_vec());
    assert_eq!(read_bytes(&mut source, 8).await, None);

    // 关闭后写入以稳定错误码拒绝。
    let error = sink
        .write(&mut queue(b"x"), 1)
        .await
        .expect_err("write after close");
    assert_eq!(error.code(), codes::PIPE_CLOSED);
}

#[tokio::test]
async fn reader_sees_exhaustion_only_after_the_buffer_drains() {
    let pipe = Pipe::new(8);
    let mut sink = pipe.sink();
    let mut source = pipe.source();

    let reader = tokio::spawn(async move {
        let mut collected = Vec::new();
        while let Some(bytes) = read_bytes(&mut source, 3).await {
            collected.extend(bytes);
        }
        collected
    });

    sink.write(&mut queue(b"stream"), 6).await.unwrap();
    sink.close().await.unwrap();

    let collected = timeout(GUARD, reader).await.unwrap().unwrap();
    assert_eq!(collected, b"stream".to_vec());
}

/// 折叠与竞争写入：缓冲中的 B1 与后续写入的 B2 恰好各送达一次，顺序保持。
#[tokio::test]
async fn fold_delivers_buffered_and_racing_bytes_exactly_once() {
    let pipe = Pipe::new(4);
    let mut sink = pipe.sink();

    sink.write(&mut queue(b"AB"), 2).await.unwrap();

    // 写者装入 "CD" 后占满容量，剩下的 "EF" 要等折叠放行。
    let writer = tokio::spawn(async move {
        sink.write(&mut queue(b"CDEF"), 4).await.unwrap();
        sink
    });
    sleep(Duration::from_millis(50)).await;
    assert!(!writer.is_finished());

    let recorder = RecordingSink::new();
    timeout(GUARD, pipe.fold(Box::new(recorder.clone())))
        .await
        .unwrap()
        .unwrap();
    let mut sink = timeout(GUARD, writer).await.unwrap().unwrap();

    assert_eq!(recorder.data(), b"ABCDEF".to_vec());
    assert!(recorder.flush_count() >= 1);

    // 折叠后写端关闭传导给委托。
    sink.close().await.unwrap();
    assert!(recorder.is_closed());
}

#[tokio::test]
async fn fold_is_one_shot() {
    let pipe = Pipe::new(8);
    pipe.fold(Box::new(RecordingSink::new())).await.unwrap();
    let error = pipe
        .fold(Box::new(RecordingSink::new()))
        .await
        .expect_err("second fold must fail");
    assert_eq!(error.code(), codes::PIPE_FOLDED);
}

/// 写端先关、再折叠：缓冲仍要排空，随后把关闭传导给委托。
#[tokio::test]
async fn fold_after_sink_close_drains_then_closes_the_delegate() {
    let pipe = Pipe::new(8);
    let mut sink = pipe.sink();
    sink.write(&mut queue(b"hi"), 2).await.unwrap();
    sink.close().await.unwrap();

    let recorder = RecordingSink::new();
    pipe.fold(Box::new(recorder.clone())).await.unwrap();
    assert_eq!(recorder.data(), b"hi".to_vec());
    assert!(recorder.is_closed());
}

#[tokio::test]
async fn fold_on_a_canceled_pipe_still_installs_the_delegate() {
    let pipe = Pipe::new(8);
    let mut sink = pipe.sink();
    sink.write(&mut queue(b"gone"), 4).await.unwrap();
    pipe.cancel();

    let recorder = RecordingSink::new();
    let error = pipe
        .fold(Box::new(recorder.clone()))
        .await
        .expect_err("fold on a canceled pipe fails");
    assert_eq!(error.code(), codes::PIPE_CANCELED);
    assert!(error.is_cancelled());
    // 取消丢弃了缓冲字节，但委托仍被安装：写端关闭可传导。
    assert!(recorder.data().is_empty());
    sink.close().await.unwrap();
    assert!(recorder.is_closed());
}

/// 取消同时唤醒被挂起的写者与读者，双方都观察到取消错误。
#[tokio::test]
async fn cancel_unblocks_both_ends() {
    let pipe = Pipe::new(1);
    let mut sink = pipe.sink();
    let mut source = pipe.source();

    let writer = tokio::spawn(async move { sink.write(&mut queue(b"xy"), 2).await });
    sleep(Duration::from_millis(50)).await;
    assert!(!writer.is_finished());

    pipe.cancel();
    let error = timeout(GUARD, writer)
        .await
        .unwrap()
        .unwrap()
        .expect_err("canceled writer");
    assert!(error.is_cancelled());
    assert_eq!(error.code(), codes::PIPE_CANCELED);

    // 读者：取消是粘性的，之后的读也立即失败。
    let mut staging = ByteQueue::new();
    let error = source
        .read(&mut staging, 1)
        .await
        .expect_err("canceled reader");
    assert!(error.is_cancelled());

    // 重复取消无害；取消后的写端关闭仍然成功。
    pipe.cancel();
    assert!(pipe.is_cancelled());
    pipe.sink().close().await.unwrap();
}

#[tokio::test]
async fn cancel_wakes_a_suspended_reader() {
    let pipe = Pipe::new(4);
    let mut source = pipe.source();

    let reader = tokio::spawn(async move {
        let mut staging = ByteQueue::new();
        source.read(&mut staging, 1).await
    });
    sleep(Duration::from_millis(50)).await;
    assert!(!reader.is_finished());

    pipe.cancel();
    let error = timeout(GUARD, reader)
        .await
        .unwrap()
        .unwrap()
        .expect_err("canceled reader");
    assert_eq!(error.code(), codes::PIPE_CANCELED);
}

#[tokio::test]
async fn per_end_timeouts_bound_suspended_waits() {
    let pipe = Pipe::builder()
        .max_buffer_size(1)
        .sink_timeout(Timeout::of(Duration::from_millis(30)))
        .source_timeout(Timeout::of(Duration::from_millis(30)))
        .build();
    let mut sink = pipe.sink();
    let mut source = pipe.source();

    // 空缓冲上的读在界限内失败。
    let mut staging = ByteQueue::new();
    let error = timeout(GUARD, source.read(&mut staging, 1))
        .await
        .unwrap()
        .expect_err("read must time out");
    assert!(error.is_timeout());

    // 占满缓冲后的写同样受界限约束。
    sink.write(&mut queue(b"a"), 1).await.unwrap();
    let error = timeout(GUARD, sink.write(&mut queue(b"b"), 1))
        .await
        .unwrap()
        .expect_err("write must time out");
    assert!(error.is_timeout());
}
