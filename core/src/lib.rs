//! Benchmark engine for keybench.
//!
//! [`Orchestrator`] prepares one [`TableGateway`] per key generator and runs a
//! [`Pipeline`] for every generator and operation kind. Pipelines report
//! successful operations to a shared [`MetricsRegistry`].

pub mod backend;
pub mod catalog;
pub mod config;
pub mod error;
pub mod gateway;
pub mod metrics;
pub mod orchestrator;
pub mod pipeline;

pub use backend::Backend;
pub use catalog::{
    InsertBatch, InsertOperationFactory, Operation, OperationDescriptor, OperationFactory, OperationKind, SelectOperationFactory, SelectSample,
};
pub use config::{BenchmarkConfig, BenchmarkConfigBuilder, PipelineConfig, TargetConfig};
pub use error::{BackendError, BenchmarkError, PipelineError, SetupError};
pub use gateway::{Row, TableGateway};
pub use metrics::{Counter, CounterSample, MetricsRegistry, THROUGHPUT_COUNTER, THROUGHPUT_HELP};
pub use orchestrator::{Orchestrator, Target};
pub use pipeline::{Pipeline, PipelineReport, PipelineState};

pub use keybench_keys as keys;
