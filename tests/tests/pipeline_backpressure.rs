
use common::{gateway, RecordingFactory, StubBackend};
use keybench_core::{keys::KeyGenerator, MetricsRegistry, Pipeline, PipelineConfig, PipelineState, THROUGHPUT_COUNTER};
use std::{sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;

#[tokio::test(start_paused = true)]
async fn test_full_queue_blocks_generator() {
    let release = CancellationToken::new();
    let backend = Arc::new(StubBackend::gated(release.clone()));
    let (factory, log) = RecordingFactory::new(KeyGenerator::TimeOrdered, gateway("seq_keys", backend.clone()));

    let metrics = MetricsRegistry::new();
    let config = PipelineConfig { queue_capacity: 5, workers: 2, cooldown: Duration::from_secs(1) };
    let pipeline = Pipeline::new(factory, config, &metrics);
    let state = pipeline.state();
    let cancel = CancellationToken::new();
    let running = tokio::spawn(pipeline.run(cancel.clone()));

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(*state.borrow(), PipelineState::Running);

    // each worker holds one operation, the queue holds five, and the
    // generator is suspended on pushing the next one
    assert_eq!(backend.calls().len(), 2);
    assert_eq!(log.count(), 2 + 5 + 1);

    // nothing moves while the workers are stuck
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(log.count(), 8);
    assert_eq!(backend.calls().len(), 2);

    cancel.cancel();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(*state.borrow(), PipelineState::Draining);

    // the two in-flight operations complete; queued ones are never pulled
    release.cancel();
    let report = running.await.unwrap().unwrap();
    assert_eq!(*state.borrow(), PipelineState::Stopped);
    assert_eq!(report.created, 8);
    assert_eq!(report.succeeded, 2);
    assert_eq!(report.failed, 0);
    assert_eq!(backend.calls().len(), 2);

    let counter = metrics.counter(THROUGHPUT_COUNTER, &report.descriptor.labels());
    assert_eq!(counter.get(), 2);
}
