//! Bounded producer/consumer harness.
//!
//! One generation task creates operations and pushes them onto a bounded
//! queue; a fixed pool of workers pulls and executes them. A full queue
//! suspends the generator, so it never gets more than the queue capacity
//! ahead of the workers. A failed operation is logged and dropped, and the
//! worker that ran it pauses for the configured cooldown before pulling again.
//!
//! Cancellation is observed at both queue suspension points and during the
//! cooldown. Work already pulled from the queue runs to completion.

use async_channel::{Receiver, Sender};
use serde::Serialize;
use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::{sync::watch, task::JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::{
    catalog::{Operation, OperationDescriptor, OperationFactory},
    config::PipelineConfig,
    error::PipelineError,
    metrics::{Counter, MetricsRegistry, THROUGHPUT_COUNTER},
};
use keybench_keys::GenerationError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum PipelineState {
    Starting,
    Running,
    Draining,
    Stopped,
}

#[derive(Debug, Default)]
struct PipelineStats {
    created: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
}

/// Totals of one pipeline run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PipelineReport {
    pub descriptor: OperationDescriptor,
    pub created: u64,
    pub succeeded: u64,
    pub failed: u64,
}

pub struct Pipeline<F: OperationFactory> {
    factory: F,
    config: PipelineConfig,
    descriptor: OperationDescriptor,
    counter: Counter,
    state: watch::Sender<PipelineState>,
    stats: Arc<PipelineStats>,
}

impl<F: OperationFactory> Pipeline<F> {
    pub fn new(factory: F, config: PipelineConfig, metrics: &MetricsRegistry) -> Self {
        let descriptor = factory.describe();
        let counter = metrics.counter(THROUGHPUT_COUNTER, &descriptor.labels());
        let (state, _) = watch::channel(PipelineState::Starting);
        Self { factory, config, descriptor, counter, state, stats: Arc::new(PipelineStats::default()) }
    }

    pub fn descriptor(&self) -> &OperationDescriptor { &self.descriptor }

    /// Follows the lifecycle of this pipeline, including after `run` consumed it.
    pub fn state(&self) -> watch::Receiver<PipelineState> { self.state.subscribe() }

    /// Runs until `cancel` fires or key generation fails, then waits for every task to return.
    pub async fn run(self, cancel: CancellationToken) -> Result<PipelineReport, PipelineError> {
        let Pipeline { factory, config, descriptor, counter, state, stats } = self;

        state.send_replace(PipelineState::Starting);
        info!("Pipeline({descriptor}) starting with {} workers, queue capacity {}", config.workers, config.queue_capacity);

        let (sender, receiver) = async_channel::bounded(config.queue_capacity.max(1));
        // both sets abort their tasks if this future is dropped
        let mut generator = JoinSet::new();
        generator.spawn(generate(factory, sender, cancel.clone(), stats.clone(), descriptor.clone()));

        let mut workers = JoinSet::new();
        for id in 0..config.workers {
            let worker = Worker {
                id,
                queue: receiver.clone(),
                cancel: cancel.clone(),
                counter: counter.clone(),
                stats: stats.clone(),
                cooldown: config.cooldown,
                descriptor: descriptor.clone(),
            };
            workers.spawn(worker.run());
        }
        // workers hold the only receivers, so the queue closes once they are gone
        drop(receiver);
        state.send_replace(PipelineState::Running);

        let finished = tokio::select! {
            _ = cancel.cancelled() => None,
            joined = generator.join_next() => joined,
        };
        state.send_replace(PipelineState::Draining);
        debug!("Pipeline({descriptor}) draining");

        let generated = match finished {
            Some(joined) => Some(joined),
            None => generator.join_next().await,
        };
        let mut outcome = match generated {
            Some(Ok(Ok(()))) | None => Ok(()),
            Some(Ok(Err(err))) => Err(PipelineError::Generation(err)),
            Some(Err(err)) => Err(PipelineError::Task(err)),
        };

        while let Some(joined) = workers.join_next().await {
            if let Err(err) = joined {
                error!("Pipeline({descriptor}) worker failed: {err}");
                if outcome.is_ok() {
                    outcome = Err(PipelineError::Task(err));
                }
            }
        }
        state.send_replace(PipelineState::Stopped);

        let report = PipelineReport {
            descriptor,
            created: stats.created.load(Ordering::Relaxed),
            succeeded: stats.succeeded.load(Ordering::Relaxed),
            failed: stats.failed.load(Ordering::Relaxed),
        };
        info!("Pipeline({}) stopped: {} created, {} succeeded, {} failed", report.descriptor, report.created, report.succeeded, report.failed);
        outcome.map(|()| report)
    }
}

async fn generate<F: OperationFactory>(
    mut factory: F,
    queue: Sender<F::Operation>,
    cancel: CancellationToken,
    stats: Arc<PipelineStats>,
    descriptor: OperationDescriptor,
) -> Result<(), GenerationError> {
    while !cancel.is_cancelled() {
        let operation = match factory.create() {
            Ok(operation) => operation,
            Err(err) => {
                error!(key_type = %descriptor.key_type, operation_type = %descriptor.operation, error = %err, "Error generating operation.");
                return Err(err);
            }
        };
        stats.created.fetch_add(1, Ordering::Relaxed);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            sent = queue.send(operation) => {
                if sent.is_err() {
                    // every worker is gone
                    break;
                }
            }
        }
    }
    Ok(())
}

struct Worker<O> {
    id: usize,
    queue: Receiver<O>,
    cancel: CancellationToken,
    counter: Counter,
    stats: Arc<PipelineStats>,
    cooldown: Duration,
    descriptor: OperationDescriptor,
}

impl<O: Operation> Worker<O> {
    async fn run(self) {
        loop {
            let operation = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                received = self.queue.recv() => match received {
                    Ok(operation) => operation,
                    Err(_) => break,
                },
            };

            match operation.execute().await {
                Ok(()) => {
                    self.counter.increment();
                    self.stats.succeeded.fetch_add(1, Ordering::Relaxed);
                }
                Err(err) => {
                    self.stats.failed.fetch_add(1, Ordering::Relaxed);
                    error!(
                        key_type = %self.descriptor.key_type,
                        operation_type = %self.descriptor.operation,
                        worker = self.id,
                        error = %err,
                        "Error executing operation."
                    );
                    tokio::select! {
                        biased;
                        _ = self.cancel.cancelled() => break,
                        _ = tokio::time::sleep(self.cooldown) => {}
                    }
                }
            }
        }
    }
}
