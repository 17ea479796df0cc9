
use common::{gateway, StubBackend};
use keybench_core::{
    keys::KeyGenerator, BenchmarkConfig, MetricsRegistry, OperationDescriptor, OperationKind, Orchestrator, Target, THROUGHPUT_COUNTER,
};
use std::{sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_two_variants_against_separate_backends() {
    let seq_backend = Arc::new(StubBackend::succeeding().with_latency(Duration::from_millis(1)));
    let broken_backend = Arc::new(StubBackend::succeeding().with_latency(Duration::from_millis(1)));
    let targets = vec![
        Target::new(KeyGenerator::TimeOrdered, gateway("seq_keys", seq_backend.clone())),
        Target::new(KeyGenerator::truncated_from_now(), gateway("broken_keys", broken_backend.clone())),
    ];

    let config = BenchmarkConfig::builder().queue_capacity(30).workers(30).reset_schema(false).build();
    let metrics = MetricsRegistry::new();
    let orchestrator = Orchestrator::new(config, metrics.clone());

    let cancel = CancellationToken::new();
    let stopper = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            cancel.cancel();
        })
    };

    let reports = tokio::time::timeout(Duration::from_secs(15), orchestrator.run(targets, cancel))
        .await
        .expect("run did not stop after cancellation")
        .unwrap();
    stopper.await.unwrap();
    assert_eq!(reports.len(), 4);

    for (key_type, backend) in [("Primitives_Uuid", &seq_backend), ("Uuid_As_Broken_Guid", &broken_backend)] {
        let insert = metrics.counter(THROUGHPUT_COUNTER, &OperationDescriptor::new(key_type, OperationKind::Insert).labels()).get();
        let select = metrics.counter(THROUGHPUT_COUNTER, &OperationDescriptor::new(key_type, OperationKind::Select).labels()).get();

        let inserts = backend.calls_with_verb("INSERT");
        assert!(insert > 0, "{key_type} inserted nothing");
        assert!(select > 0, "{key_type} selected nothing");
        assert_eq!(insert, inserts.len() as u64);
        assert_eq!(select, backend.calls_with_verb("SELECT").len() as u64);
        assert!(inserts.iter().all(|call| call.keys == 100));

        // schema setup ran once, without a reset
        assert_eq!(backend.calls_with_verb("CREATE").len(), 3);
        assert!(backend.calls_with_verb("DROP").is_empty());
    }

    for report in &reports {
        assert_eq!(report.failed, 0);
        assert_eq!(metrics.counter(THROUGHPUT_COUNTER, &report.descriptor.labels()).get(), report.succeeded);
    }

    let rendered = metrics.render();
    assert!(rendered.contains("# HELP uuid_variants_throughput Operation Throughput"));
    assert!(rendered.contains("uuid_variants_throughput{key_type=\"Uuid_As_Broken_Guid\",operation_type=\"insert\"}"));
}
