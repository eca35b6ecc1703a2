//! 适配层的集成测试：运行时依赖、双向驱动与恒等回转。

use brook_core::error::codes;
use brook_core::{
    BlockingSink, BlockingSource, BoxBlockingSink, BoxBlockingSource, BoxSink, BoxSource,
    ByteQueue, Sink,
};
use brook_io::testing::{BlockingRecordingSink, BlockingSliceSource, RecordingSink, SliceSource};
use brook_io::{to_blocking_sink, to_blocking_source, to_suspending_sink, to_suspending_source};

/// 运行时外包装挂起式端点必须失败，而不是在首次调用时 panic。
#[test]
fn wrapping_outside_a_runtime_fails_with_a_stable_code() {
    let source: BoxSource = Box::new(SliceSource::new(b"data".to_vec()));
    let error = to_blocking_source(source).expect_err("no runtime on this thread");
    assert_eq!(error.code(), codes::IO_NO_RUNTIME);

    let sink: BoxSink = Box::new(RecordingSink::new());
    let error = to_blocking_sink(sink).expect_err("no runtime on this thread");
    assert_eq!(error.code(), codes::IO_NO_RUNTIME);
}

/// 回转拆包归还原实例：阻塞 → 挂起 → 阻塞不需要运行时，也不叠加间接层。
#[test]
fn round_trip_unwraps_instead_of_stacking_adapters() {
    let blocking: BoxBlockingSource = Box::new(BlockingSliceSource::new(b"payload".to_vec()));
    let suspending = to_suspending_source(blocking);
    // 若此处真的包装了一层新适配器，在无运行时的线程上会以 no_runtime 失败。
    let mut unwrapped = to_blocking_source(suspending).expect("unwrap must not need a runtime");

    let mut staging = ByteQueue::new();
    let read = unwrapped.read(&mut staging, 64).expect("read").expect("bytes");
    assert_eq!(read, 7);
    assert_eq!(&staging.read(64)[..], b"payload");

    let recorder = BlockingRecordingSink::new();
    let blocking: BoxBlockingSink = Box::new(recorder.clone());
    let suspending = to_suspending_sink(blocking);
    let mut unwrapped = to_blocking_sink(suspending).expect("unwrap must not need a runtime");
    let mut staging = ByteQueue::new();
    staging.write(b"echo");
    unwrapped.write(&mut staging, 4).expect("write");
    unwrapped.close().expect("close");
    assert_eq!(recorder.data(), b"echo".to_vec());
    assert!(recorder.is_closed());
}

/// 阻塞适配器在 `spawn_blocking` 线程上驱动挂起式端点。
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn blocking_adapter_drives_a_suspending_source() {
    let source: BoxSource = Box::new(SliceSource::new(b"from async".to_vec()).with_max_chunk(3));
    let mut blocking = to_blocking_source(source).expect("inside a runtime");

    let collected = tokio::task::spawn_blocking(move || {
        let mut staging = ByteQueue::new();
        let mut collected = Vec::new();
        while let Some(read) = blocking.read(&mut staging, 64).expect("read") {
            collected.extend_from_slice(&staging.read(read));
        }
        blocking.close().expect("close");
        collected
    })
    .await
    .unwrap();

    assert_eq!(collected, b"from async".to_vec());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn blocking_adapter_drives_a_suspending_sink() {
    let recorder = RecordingSink::new();
    let sink: BoxSink = Box::new(recorder.clone());
    let mut blocking = to_blocking_sink(sink).expect("inside a runtime");

    tokio::task::spawn_blocking(move || {
        let mut staging = ByteQueue::new();
        staging.write(b"bridged");
        blocking.write(&mut staging, 7).expect("write");
        blocking.flush().expect("flush");
        blocking.close().expect("close");
    })
    .await
    .unwrap();

    assert_eq!(recorder.data(), b"bridged".to_vec());
    assert_eq!(recorder.flush_count(), 1);
    assert!(recorder.is_closed());
}

/// 挂起方向的包装不依赖运行时，内联执行阻塞调用。
#[test]
fn suspending_adapter_serves_a_blocking_sink_without_tokio() {
    let recorder = BlockingRecordingSink::new();
    let mut suspending = to_suspending_sink(Box::new(recorder.clone()));

    futures::executor::block_on(async {
        let mut staging = ByteQueue::new();
        staging.write(b"inline");
        suspending.write(&mut staging, 6).await.expect("write");
        suspending.close().await.expect("close");
    });

    assert_eq!(recorder.data(), b"inline".to_vec());
    assert!(recorder.is_closed());
}
