//! Common utilities for Postgres backend tests

use anyhow::Result;
use keybench_storage_postgres::Postgres;
use std::str::FromStr;
use testcontainers::ContainerAsync;
use testcontainers_modules::{postgres, testcontainers::runners::AsyncRunner};
use tracing::Level;

// Initialize tracing for tests
#[ctor::ctor]
fn init_tracing() {
    let level = std::env::var("LOG_LEVEL").ok().and_then(|level| Level::from_str(&level).ok()).unwrap_or(Level::INFO);
    tracing_subscriber::fmt().with_max_level(level).with_test_writer().init();
}

pub async fn create_postgres_container() -> Result<(ContainerAsync<postgres::Postgres>, Postgres)> {
    let container: ContainerAsync<postgres::Postgres> =
        postgres::Postgres::default().with_db_name("keybench").with_user("postgres").with_password("postgres").start().await?;

    let host = container.get_host().await?;
    let port = container.get_host_port_ipv4(5432).await?;
    let backend = Postgres::connect(&format!("host={host} port={port} user=postgres password=postgres dbname=keybench"), 8).await?;

    Ok((container, backend))
}
