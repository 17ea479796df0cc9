//! Operations the pipelines execute and the factories that build them.

use async_trait::async_trait;
use chrono::Utc;
use keybench_keys::{GenerationError, KeyGenerator};
use rand::Rng;
use serde::Serialize;
use std::{fmt, str::FromStr};

use crate::{
    error::{BackendError, ParseOperationKindError},
    gateway::{Row, TableGateway},
};

pub const DEFAULT_BATCH_SIZE: usize = 100;
pub const DEFAULT_SAMPLE_LIMIT: u64 = 50_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Insert,
    Select,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Insert => "insert",
            OperationKind::Select => "select",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for OperationKind {
    type Err = ParseOperationKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "insert" => Ok(OperationKind::Insert),
            "select" => Ok(OperationKind::Select),
            _ => Err(ParseOperationKindError(s.to_string())),
        }
    }
}

/// Metrics identity of everything a factory produces.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct OperationDescriptor {
    pub key_type: String,
    pub operation: OperationKind,
}

impl OperationDescriptor {
    pub fn new(key_type: impl Into<String>, operation: OperationKind) -> Self { Self { key_type: key_type.into(), operation } }

    pub fn labels(&self) -> [(&'static str, &str); 2] { [("key_type", self.key_type.as_str()), ("operation_type", self.operation.as_str())] }
}

impl fmt::Display for OperationDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}/{}", self.key_type, self.operation) }
}

/// A unit of work, executed at most once.
#[async_trait]
pub trait Operation: Send + Sync + 'static {
    async fn execute(&self) -> Result<(), BackendError>;
}

/// Produces the operations of one pipeline.
pub trait OperationFactory: Send + 'static {
    type Operation: Operation;

    /// Stable across every operation this factory creates.
    fn describe(&self) -> OperationDescriptor;

    fn create(&mut self) -> Result<Self::Operation, GenerationError>;
}

pub struct InsertBatch {
    gateway: TableGateway,
    rows: Vec<Row>,
}

impl InsertBatch {
    pub fn rows(&self) -> &[Row] { &self.rows }
}

#[async_trait]
impl Operation for InsertBatch {
    async fn execute(&self) -> Result<(), BackendError> {
        self.gateway.insert_batch(&self.rows).await?;
        Ok(())
    }
}

pub struct SelectSample {
    gateway: TableGateway,
    limit: u64,
}

#[async_trait]
impl Operation for SelectSample {
    async fn execute(&self) -> Result<(), BackendError> {
        self.gateway.run_sample_query(self.limit).await?;
        Ok(())
    }
}

/// Builds insert batches with fresh keys and a sequence index that keeps
/// counting across batches.
pub struct InsertOperationFactory {
    generator: KeyGenerator,
    gateway: TableGateway,
    batch_size: usize,
    next_index: i64,
}

impl InsertOperationFactory {
    pub fn new(generator: KeyGenerator, gateway: TableGateway) -> Self {
        Self { generator, gateway, batch_size: DEFAULT_BATCH_SIZE, next_index: 0 }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }
}

impl OperationFactory for InsertOperationFactory {
    type Operation = InsertBatch;

    fn describe(&self) -> OperationDescriptor { OperationDescriptor::new(self.generator.name(), OperationKind::Insert) }

    fn create(&mut self) -> Result<InsertBatch, GenerationError> {
        let mut rng = rand::thread_rng();
        let mut rows = Vec::with_capacity(self.batch_size);
        for _ in 0..self.batch_size {
            rows.push(Row { index: self.next_index, key: self.generator.generate(Utc::now())?, name: rng.gen_range(0..i32::MAX) });
            self.next_index += 1;
        }
        Ok(InsertBatch { gateway: self.gateway.clone(), rows })
    }
}

/// Builds the sample read. The generator only contributes its name.
pub struct SelectOperationFactory {
    key_type: &'static str,
    gateway: TableGateway,
    limit: u64,
}

impl SelectOperationFactory {
    pub fn new(generator: &KeyGenerator, gateway: TableGateway) -> Self {
        Self { key_type: generator.name(), gateway, limit: DEFAULT_SAMPLE_LIMIT }
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }
}

impl OperationFactory for SelectOperationFactory {
    type Operation = SelectSample;

    fn describe(&self) -> OperationDescriptor { OperationDescriptor::new(self.key_type, OperationKind::Select) }

    fn create(&mut self) -> Result<SelectSample, GenerationError> { Ok(SelectSample { gateway: self.gateway.clone(), limit: self.limit }) }
}
