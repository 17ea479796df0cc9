//! Run configuration, built in code or read from `KEYBENCH_*` environment variables.

use keybench_keys::GeneratorKind;
use serde::Serialize;
use std::{collections::HashSet, fmt::Display, str::FromStr, time::Duration};

use crate::{
    catalog::{OperationKind, DEFAULT_BATCH_SIZE, DEFAULT_SAMPLE_LIMIT},
    error::SetupError,
};

/// Shape of one pipeline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PipelineConfig {
    /// Pending operations allowed before the generator blocks.
    pub queue_capacity: usize,
    pub workers: usize,
    /// Pause a worker takes after a failed operation.
    pub cooldown: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self { Self { queue_capacity: 30, workers: 30, cooldown: Duration::from_secs(1) } }
}

/// One generator writing to one table on one backend.
#[derive(Clone, PartialEq, Eq)]
pub struct TargetConfig {
    pub kind: GeneratorKind,
    pub table: String,
    /// Backend connection string. Opaque to the core.
    pub connection: String,
}

impl std::fmt::Debug for TargetConfig {
    // the connection string usually carries a password
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TargetConfig").field("kind", &self.kind).field("table", &self.table).finish_non_exhaustive()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BenchmarkConfig {
    pub pipeline: PipelineConfig,
    /// Operation kinds run against every target.
    pub operations: Vec<OperationKind>,
    pub insert_batch_size: usize,
    pub sample_limit: u64,
    pub schema: String,
    /// Drop the schema on every backend before creating it.
    pub reset_schema: bool,
    pub targets: Vec<TargetConfig>,
    pub pool_size: u32,
    pub metrics_addr: String,
}

impl Default for BenchmarkConfig {
    fn default() -> Self { BenchmarkConfig::builder().build() }
}

impl BenchmarkConfig {
    pub fn builder() -> BenchmarkConfigBuilder { BenchmarkConfigBuilder::default() }

    /// Reads the process environment.
    pub fn from_env() -> Result<Self, SetupError> { Self::from_lookup(|name| std::env::var(name).ok()) }

    /// Reads configuration through `lookup`, falling back to defaults for unset variables.
    pub fn from_lookup<L>(lookup: L) -> Result<Self, SetupError>
    where L: Fn(&str) -> Option<String> {
        let mut builder = BenchmarkConfig::builder();

        if let Some(value) = lookup("KEYBENCH_WORKERS") {
            builder = builder.workers(parse_value("KEYBENCH_WORKERS", &value)?);
        }
        if let Some(value) = lookup("KEYBENCH_QUEUE_CAPACITY") {
            builder = builder.queue_capacity(parse_value("KEYBENCH_QUEUE_CAPACITY", &value)?);
        }
        if let Some(value) = lookup("KEYBENCH_COOLDOWN_MS") {
            builder = builder.cooldown(Duration::from_millis(parse_value("KEYBENCH_COOLDOWN_MS", &value)?));
        }
        if let Some(value) = lookup("KEYBENCH_BATCH_SIZE") {
            builder = builder.insert_batch_size(parse_value("KEYBENCH_BATCH_SIZE", &value)?);
        }
        if let Some(value) = lookup("KEYBENCH_SAMPLE_LIMIT") {
            builder = builder.sample_limit(parse_value("KEYBENCH_SAMPLE_LIMIT", &value)?);
        }
        if let Some(value) = lookup("KEYBENCH_SCHEMA") {
            builder = builder.schema(value);
        }
        if let Some(value) = lookup("KEYBENCH_RESET_SCHEMA") {
            builder = builder.reset_schema(parse_bool("KEYBENCH_RESET_SCHEMA", &value)?);
        }
        if let Some(value) = lookup("KEYBENCH_POOL_SIZE") {
            builder = builder.pool_size(parse_value("KEYBENCH_POOL_SIZE", &value)?);
        }
        if let Some(value) = lookup("KEYBENCH_METRICS_ADDR") {
            builder = builder.metrics_addr(value);
        }
        if let Some(value) = lookup("KEYBENCH_OPERATIONS") {
            builder = builder.operations(parse_list("KEYBENCH_OPERATIONS", &value)?);
        }

        let kinds: Vec<GeneratorKind> = match lookup("KEYBENCH_VARIANTS") {
            Some(value) => parse_list("KEYBENCH_VARIANTS", &value)?,
            None => vec![GeneratorKind::TimeOrdered, GeneratorKind::Broken],
        };
        let host = lookup("KEYBENCH_PG_HOST").unwrap_or_else(|| "localhost".to_string());
        let user = lookup("KEYBENCH_PG_USER").unwrap_or_else(|| "postgres".to_string());
        let password = lookup("KEYBENCH_PG_PASSWORD").unwrap_or_else(|| "postgres".to_string());
        let dbname = lookup("KEYBENCH_PG_DBNAME").unwrap_or_else(|| "postgres".to_string());

        for kind in kinds {
            let table = kind.default_table();
            let connection = lookup(&format!("KEYBENCH_{}_URL", table.to_ascii_uppercase())).unwrap_or_else(|| {
                format!("host={host} port={}5432 user={user} password={password} dbname={dbname}", kind.instance())
            });
            builder = builder.target(TargetConfig { kind, table: table.to_string(), connection });
        }

        let config = builder.build();
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SetupError> {
        if self.targets.is_empty() {
            return Err(SetupError::Config("no key generator variants configured".into()));
        }
        if self.operations.is_empty() {
            return Err(SetupError::Config("no operation kinds configured".into()));
        }
        if self.pipeline.queue_capacity == 0 {
            return Err(SetupError::Config("queue capacity must be at least 1".into()));
        }
        if self.pipeline.workers == 0 {
            return Err(SetupError::Config("at least one worker is required".into()));
        }
        // two insert factories on one table would hand out overlapping sequence indexes
        let mut tables = HashSet::new();
        for target in &self.targets {
            if !tables.insert(target.table.as_str()) {
                return Err(SetupError::Config(format!("table `{}` is configured more than once", target.table)));
            }
        }
        Ok(())
    }
}

/// Builder for [`BenchmarkConfig`]; defaults match the reference run.
#[derive(Clone, Debug)]
pub struct BenchmarkConfigBuilder {
    pipeline: PipelineConfig,
    operations: Vec<OperationKind>,
    insert_batch_size: usize,
    sample_limit: u64,
    schema: String,
    reset_schema: bool,
    targets: Vec<TargetConfig>,
    pool_size: u32,
    metrics_addr: String,
}

impl Default for BenchmarkConfigBuilder {
    fn default() -> Self {
        Self {
            pipeline: PipelineConfig::default(),
            operations: vec![OperationKind::Insert, OperationKind::Select],
            insert_batch_size: DEFAULT_BATCH_SIZE,
            sample_limit: DEFAULT_SAMPLE_LIMIT,
            schema: "test_db".to_string(),
            reset_schema: true,
            targets: Vec::new(),
            pool_size: 400,
            metrics_addr: "0.0.0.0:9797".to_string(),
        }
    }
}

impl BenchmarkConfigBuilder {
    pub fn pipeline(mut self, pipeline: PipelineConfig) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.pipeline.workers = workers;
        self
    }

    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.pipeline.queue_capacity = capacity;
        self
    }

    pub fn cooldown(mut self, cooldown: Duration) -> Self {
        self.pipeline.cooldown = cooldown;
        self
    }

    pub fn operations(mut self, operations: Vec<OperationKind>) -> Self {
        self.operations = operations;
        self
    }

    pub fn insert_batch_size(mut self, size: usize) -> Self {
        self.insert_batch_size = size.max(1);
        self
    }

    pub fn sample_limit(mut self, limit: u64) -> Self {
        self.sample_limit = limit;
        self
    }

    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }

    pub fn reset_schema(mut self, reset: bool) -> Self {
        self.reset_schema = reset;
        self
    }

    pub fn target(mut self, target: TargetConfig) -> Self {
        self.targets.push(target);
        self
    }

    pub fn pool_size(mut self, size: u32) -> Self {
        self.pool_size = size.max(1);
        self
    }

    pub fn metrics_addr(mut self, addr: impl Into<String>) -> Self {
        self.metrics_addr = addr.into();
        self
    }

    pub fn build(self) -> BenchmarkConfig {
        BenchmarkConfig {
            pipeline: self.pipeline,
            operations: self.operations,
            insert_batch_size: self.insert_batch_size,
            sample_limit: self.sample_limit,
            schema: self.schema,
            reset_schema: self.reset_schema,
            targets: self.targets,
            pool_size: self.pool_size,
            metrics_addr: self.metrics_addr,
        }
    }
}

fn parse_value<T>(name: &str, value: &str) -> Result<T, SetupError>
where
    T: FromStr,
    T::Err: Display,
{
    value.trim().parse().map_err(|err| SetupError::Config(format!("{name}={value:?}: {err}")))
}

fn parse_list<T>(name: &str, value: &str) -> Result<Vec<T>, SetupError>
where
    T: FromStr,
    T::Err: Display,
{
    value.split(',').filter(|item| !item.trim().is_empty()).map(|item| parse_value(name, item)).collect()
}

fn parse_bool(name: &str, value: &str) -> Result<bool, SetupError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(SetupError::Config(format!("{name}={value:?}: expected a boolean"))),
    }
}
