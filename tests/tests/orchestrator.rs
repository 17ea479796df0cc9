
use common::{gateway, StubBackend};
use keybench_core::{keys::KeyGenerator, BenchmarkConfig, BenchmarkError, MetricsRegistry, OperationKind, Orchestrator, SetupError, Target};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

fn targets(seq: &Arc<StubBackend>, broken: &Arc<StubBackend>) -> Vec<Target> {
    vec![
        Target::new(KeyGenerator::TimeOrdered, gateway("seq_keys", seq.clone())),
        Target::new(KeyGenerator::truncated_from_now(), gateway("broken_keys", broken.clone())),
    ]
}

#[tokio::test]
async fn test_setup_failure_aborts_before_any_pipeline() {
    let seq = Arc::new(StubBackend::succeeding());
    let broken = Arc::new(StubBackend::failing_on("CREATE TABLE"));
    let orchestrator = Orchestrator::new(BenchmarkConfig::builder().reset_schema(false).build(), MetricsRegistry::new());

    let result = orchestrator.run(targets(&seq, &broken), CancellationToken::new()).await;

    match result {
        Err(BenchmarkError::Setup(SetupError::Backend { table, .. })) => assert_eq!(table, "broken_keys"),
        other => panic!("expected a setup failure, got {other:?}"),
    }
    assert!(seq.calls_with_verb("INSERT").is_empty());
    assert!(broken.calls_with_verb("INSERT").is_empty());
    assert!(orchestrator.metrics().snapshot().is_empty());
}

#[tokio::test]
async fn test_reset_drops_before_creating() {
    let seq = Arc::new(StubBackend::succeeding());
    let broken = Arc::new(StubBackend::succeeding());
    let orchestrator = Orchestrator::new(BenchmarkConfig::builder().reset_schema(true).build(), MetricsRegistry::new());

    orchestrator.setup(&targets(&seq, &broken)).await.unwrap();

    for backend in [&seq, &broken] {
        let verbs: Vec<String> = backend.calls().into_iter().map(|call| call.verb).collect();
        assert_eq!(verbs, ["DROP", "CREATE", "CREATE", "CREATE"]);
    }
}

#[tokio::test]
async fn test_cancelled_run_reports_every_pipeline() {
    let seq = Arc::new(StubBackend::succeeding());
    let broken = Arc::new(StubBackend::succeeding());
    let orchestrator = Orchestrator::new(BenchmarkConfig::builder().reset_schema(false).build(), MetricsRegistry::new());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let reports = orchestrator.run(targets(&seq, &broken), cancel).await.unwrap();

    assert_eq!(reports.len(), 4);
    assert!(reports.iter().all(|report| (report.created, report.succeeded, report.failed) == (0, 0, 0)));
    assert!(seq.calls_with_verb("INSERT").is_empty());
}

#[tokio::test]
async fn test_insert_only_run() {
    let seq = Arc::new(StubBackend::succeeding());
    let broken = Arc::new(StubBackend::succeeding());
    let config = BenchmarkConfig::builder().operations(vec![OperationKind::Insert]).reset_schema(false).build();
    let orchestrator = Orchestrator::new(config, MetricsRegistry::new());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let reports = orchestrator.run(targets(&seq, &broken), cancel).await.unwrap();
    assert_eq!(reports.len(), 2);
    assert!(reports.iter().all(|report| report.descriptor.operation == OperationKind::Insert));
}

#[tokio::test]
async fn test_no_operations_is_a_config_error() {
    let seq = Arc::new(StubBackend::succeeding());
    let broken = Arc::new(StubBackend::succeeding());
    let config = BenchmarkConfig::builder().operations(Vec::new()).build();
    let orchestrator = Orchestrator::new(config, MetricsRegistry::new());

    let result = orchestrator.run(targets(&seq, &broken), CancellationToken::new()).await;
    assert!(matches!(result, Err(BenchmarkError::Setup(SetupError::Config(_)))));
    assert!(seq.calls().is_empty());
}
