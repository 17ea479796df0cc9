use keybench_keys::GenerationError;
use thiserror::Error;
use tokio::task::JoinError;

/// Failure of a single statement against the backend.
///
/// Workers contain these: the operation is dropped, the worker cools down, and
/// the pipeline keeps going.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("connection error: {0}")]
    Connection(Box<dyn std::error::Error + Send + Sync + 'static>),
    #[error("statement error: {0}")]
    Statement(Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl BackendError {
    pub fn connection<E: std::error::Error + Send + Sync + 'static>(err: E) -> Self { BackendError::Connection(Box::new(err)) }

    pub fn statement<E: std::error::Error + Send + Sync + 'static>(err: E) -> Self { BackendError::Statement(Box::new(err)) }
}

/// Failure while preparing a run. Always fatal.
#[derive(Error, Debug)]
pub enum SetupError {
    #[error("schema setup for table `{table}` failed: {source}")]
    Backend {
        table: String,
        #[source]
        source: BackendError,
    },
    #[error("invalid identifier `{0}`")]
    InvalidName(String),
    #[error("configuration error: {0}")]
    Config(String),
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("key generation failed: {0}")]
    Generation(#[from] GenerationError),
    #[error("pipeline task failed: {0}")]
    Task(#[from] JoinError),
}

#[derive(Error, Debug)]
pub enum BenchmarkError {
    #[error(transparent)]
    Setup(#[from] SetupError),
    #[error("pipeline {descriptor} failed: {source}")]
    Pipeline {
        descriptor: String,
        #[source]
        source: PipelineError,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown operation kind `{0}` (expected insert or select)")]
pub struct ParseOperationKindError(pub String);
