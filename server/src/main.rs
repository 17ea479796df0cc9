use anyhow::Result;
use chrono::Utc;
use keybench_core::{BenchmarkConfig, CounterSample, MetricsRegistry, Orchestrator, PipelineReport, TableGateway, Target};
use keybench_server::MetricsServer;
use keybench_storage_postgres::Postgres;
use serde::Serialize;
use std::{str::FromStr, sync::Arc};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Level};

#[derive(Serialize)]
struct Summary {
    pipelines: Vec<PipelineReport>,
    counters: Vec<CounterSample>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // initialize tracing
    let level = std::env::var("LOG_LEVEL").ok().and_then(|level| Level::from_str(&level).ok()).unwrap_or(Level::INFO);
    tracing_subscriber::fmt().with_max_level(level).init();

    let config = BenchmarkConfig::from_env()?;
    info!("keybench starting: {:?}", config);

    // every generator gets its own backend, all warped clocks share one start
    let started_at = Utc::now();
    let mut targets = Vec::with_capacity(config.targets.len());
    for target in &config.targets {
        let backend = Postgres::connect(&target.connection, config.pool_size).await?;
        let gateway = TableGateway::new(&config.schema, &target.table, Arc::new(backend))?;
        targets.push(Target::new(target.kind.build(started_at), gateway));
    }

    let metrics = MetricsRegistry::new();
    let cancel = CancellationToken::new();

    let listener = TcpListener::bind(&config.metrics_addr).await?;
    let server = MetricsServer::new(metrics.clone());
    let http = tokio::spawn({
        let cancel = cancel.clone();
        async move { server.serve(listener, cancel).await }
    });

    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Shutdown requested");
                    cancel.cancel();
                }
                Err(err) => warn!("Unable to listen for shutdown signal: {err}"),
            }
        }
    });

    let orchestrator = Orchestrator::new(config, metrics.clone());
    let outcome = orchestrator.run(targets, cancel.clone()).await;
    cancel.cancel();
    http.await??;

    let summary = Summary { pipelines: outcome?, counters: metrics.snapshot() };
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}
