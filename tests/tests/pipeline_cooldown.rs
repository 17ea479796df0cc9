
use common::{gateway, RecordingFactory, StubBackend};
use keybench_core::{keys::KeyGenerator, MetricsRegistry, Pipeline, PipelineConfig, THROUGHPUT_COUNTER};
use std::{sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;

const COOLDOWN: Duration = Duration::from_secs(1);

fn single_worker() -> PipelineConfig { PipelineConfig { queue_capacity: 1, workers: 1, cooldown: COOLDOWN } }

#[tokio::test(start_paused = true)]
async fn test_failure_pauses_worker_and_is_not_counted() {
    let backend = Arc::new(StubBackend::failing());
    let (factory, _log) = RecordingFactory::new(KeyGenerator::TimeOrdered, gateway("seq_keys", backend.clone()));

    let metrics = MetricsRegistry::new();
    let cancel = CancellationToken::new();
    let running = tokio::spawn(Pipeline::new(factory, single_worker(), &metrics).run(cancel.clone()));

    tokio::time::sleep(Duration::from_millis(3_500)).await;
    cancel.cancel();
    let report = running.await.unwrap().unwrap();

    let calls = backend.calls();
    assert_eq!(calls.len(), 4);
    for pair in calls.windows(2) {
        assert!(pair[1].at - pair[0].at >= COOLDOWN);
    }
    assert_eq!(report.failed, 4);
    assert_eq!(report.succeeded, 0);
    assert_eq!(metrics.counter(THROUGHPUT_COUNTER, &report.descriptor.labels()).get(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_worker_recovers_after_cooldown() {
    let latency = Duration::from_millis(100);
    let backend = Arc::new(StubBackend::succeeding().with_latency(latency).failing_first(2));
    let (factory, _log) = RecordingFactory::new(KeyGenerator::TimeOrdered, gateway("seq_keys", backend.clone()));

    let metrics = MetricsRegistry::new();
    let cancel = CancellationToken::new();
    let running = tokio::spawn(Pipeline::new(factory, single_worker(), &metrics).run(cancel.clone()));

    tokio::time::sleep(Duration::from_secs(5)).await;
    cancel.cancel();
    let report = running.await.unwrap().unwrap();

    let calls = backend.calls();
    assert!(calls[1].at - calls[0].at >= latency + COOLDOWN);
    assert!(calls[2].at - calls[1].at >= latency + COOLDOWN);
    // no pause after a success
    assert!(calls[3].at - calls[2].at < COOLDOWN);

    assert_eq!(report.failed, 2);
    assert!(report.succeeded >= 20);
    assert_eq!(metrics.counter(THROUGHPUT_COUNTER, &report.descriptor.labels()).get(), report.succeeded);
}

#[tokio::test(start_paused = true)]
async fn test_failing_pipeline_does_not_stall_others() {
    let failing = Arc::new(StubBackend::failing());
    let healthy = Arc::new(StubBackend::succeeding().with_latency(Duration::from_millis(10)));
    let (broken_factory, _) = RecordingFactory::new(KeyGenerator::truncated_from_now(), gateway("broken_keys", failing));
    let (seq_factory, _) = RecordingFactory::new(KeyGenerator::TimeOrdered, gateway("seq_keys", healthy));

    let metrics = MetricsRegistry::new();
    let cancel = CancellationToken::new();
    let broken = tokio::spawn(Pipeline::new(broken_factory, PipelineConfig::default(), &metrics).run(cancel.clone()));
    let seq = tokio::spawn(Pipeline::new(seq_factory, PipelineConfig::default(), &metrics).run(cancel.clone()));

    tokio::time::sleep(Duration::from_secs(3)).await;
    cancel.cancel();
    let broken = broken.await.unwrap().unwrap();
    let seq = seq.await.unwrap().unwrap();

    assert_eq!(broken.succeeded, 0);
    assert!(broken.failed > 0);
    assert!(seq.succeeded > 0);
    assert_eq!(seq.failed, 0);
    assert_eq!(metrics.counter(THROUGHPUT_COUNTER, &broken.descriptor.labels()).get(), 0);
    assert_eq!(metrics.counter(THROUGHPUT_COUNTER, &seq.descriptor.labels()).get(), seq.succeeded);
}
