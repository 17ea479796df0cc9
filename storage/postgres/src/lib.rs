use std::time::Duration;

use async_trait::async_trait;
use bb8_postgres::{tokio_postgres::NoTls, PostgresConnectionManager};
use keybench_core::{Backend, BackendError};
use tokio_postgres::SimpleQueryMessage;
use tracing::{debug, info};

/// How long a statement waits for a pooled connection before failing.
pub const CONNECTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Statement executor over a bb8 pool of tokio-postgres connections.
///
/// Each statement checks a connection out of the pool and returns it when the
/// guard drops, on success and on error alike.
pub struct Postgres {
    pool: bb8::Pool<PostgresConnectionManager<NoTls>>,
}

impl Postgres {
    pub fn new(pool: bb8::Pool<PostgresConnectionManager<NoTls>>) -> Self { Self { pool } }

    /// Builds a pool of up to `max_size` connections. Connections are opened lazily.
    pub async fn connect(connection: &str, max_size: u32) -> anyhow::Result<Self> {
        let manager = PostgresConnectionManager::new_from_stringlike(connection, NoTls)?;
        let pool = bb8::Pool::builder().max_size(max_size).connection_timeout(CONNECTION_TIMEOUT).build(manager).await?;
        info!("Postgres pool ready (max {} connections)", max_size);
        Ok(Self::new(pool))
    }
}

#[async_trait]
impl Backend for Postgres {
    async fn execute_statement(&self, text: &str) -> Result<u64, BackendError> {
        let client = self.pool.get().await.map_err(BackendError::connection)?;
        let messages = client.simple_query(text).await.map_err(BackendError::statement)?;
        let affected = messages
            .iter()
            .filter_map(|message| match message {
                SimpleQueryMessage::CommandComplete(rows) => Some(*rows),
                _ => None,
            })
            .sum();
        debug!("Postgres.execute_statement: {} rows", affected);
        Ok(affected)
    }
}
