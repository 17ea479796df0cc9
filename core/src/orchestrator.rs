use keybench_keys::KeyGenerator;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::{
    catalog::{InsertOperationFactory, OperationDescriptor, OperationFactory, OperationKind, SelectOperationFactory},
    config::BenchmarkConfig,
    error::{BenchmarkError, PipelineError, SetupError},
    gateway::TableGateway,
    metrics::MetricsRegistry,
    pipeline::{Pipeline, PipelineReport},
};

/// A key generator bound to the table its keys go into.
#[derive(Clone, Debug)]
pub struct Target {
    pub generator: KeyGenerator,
    pub gateway: TableGateway,
}

impl Target {
    pub fn new(generator: KeyGenerator, gateway: TableGateway) -> Self { Self { generator, gateway } }
}

/// Prepares every target's schema, then runs one pipeline per target and
/// operation kind until cancelled.
pub struct Orchestrator {
    config: BenchmarkConfig,
    metrics: MetricsRegistry,
}

impl Orchestrator {
    pub fn new(config: BenchmarkConfig, metrics: MetricsRegistry) -> Self { Self { config, metrics } }

    pub fn metrics(&self) -> &MetricsRegistry { &self.metrics }

    /// Optionally drops, then creates, the schema of every target. Any failure aborts the run.
    pub async fn setup(&self, targets: &[Target]) -> Result<(), SetupError> {
        if self.config.operations.is_empty() {
            return Err(SetupError::Config("no operation kinds configured".into()));
        }
        if self.config.reset_schema {
            for target in targets {
                target.gateway.drop_schema().await?;
            }
        }
        for target in targets {
            target.gateway.ensure_schema_present().await?;
        }
        Ok(())
    }

    /// Runs every pipeline to completion. Returns after `cancel` fires and all
    /// pipelines stopped, or as soon as one pipeline fails fatally.
    pub async fn run(&self, targets: Vec<Target>, cancel: CancellationToken) -> Result<Vec<PipelineReport>, BenchmarkError> {
        self.setup(&targets).await?;

        let run = cancel.child_token();
        let mut pipelines = JoinSet::new();
        for target in &targets {
            for kind in &self.config.operations {
                match kind {
                    OperationKind::Insert => {
                        let factory = InsertOperationFactory::new(target.generator, target.gateway.clone())
                            .with_batch_size(self.config.insert_batch_size);
                        self.spawn(&mut pipelines, factory, run.clone());
                    }
                    OperationKind::Select => {
                        let factory =
                            SelectOperationFactory::new(&target.generator, target.gateway.clone()).with_limit(self.config.sample_limit);
                        self.spawn(&mut pipelines, factory, run.clone());
                    }
                }
            }
        }
        info!("Orchestrator: {} pipelines running against {} targets", pipelines.len(), targets.len());

        let mut reports = Vec::new();
        let mut failure = None;
        while let Some(joined) = pipelines.join_next().await {
            let (descriptor, result) = match joined {
                Ok(outcome) => outcome,
                Err(err) => (None, Err(PipelineError::Task(err))),
            };
            match result {
                Ok(report) => reports.push(report),
                Err(source) => {
                    let descriptor = descriptor.map_or_else(|| "<unknown>".to_string(), |d| d.to_string());
                    error!("Orchestrator: pipeline {descriptor} failed, stopping the run: {source}");
                    run.cancel();
                    failure.get_or_insert(BenchmarkError::Pipeline { descriptor, source });
                }
            }
        }

        match failure {
            Some(err) => Err(err),
            None => Ok(reports),
        }
    }

    fn spawn<F: OperationFactory>(
        &self,
        pipelines: &mut JoinSet<(Option<OperationDescriptor>, Result<PipelineReport, PipelineError>)>,
        factory: F,
        cancel: CancellationToken,
    ) {
        let pipeline = Pipeline::new(factory, self.config.pipeline.clone(), &self.metrics);
        let descriptor = pipeline.descriptor().clone();
        pipelines.spawn(async move { (Some(descriptor), pipeline.run(cancel).await) });
    }
}
