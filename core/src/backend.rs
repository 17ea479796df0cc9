use async_trait::async_trait;

use crate::error::BackendError;

/// Executes statements against a database.
///
/// Implementations acquire a connection per call and release it before
/// returning, whether the statement succeeded or not.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Runs `text` and returns the number of rows it affected.
    async fn execute_statement(&self, text: &str) -> Result<u64, BackendError>;
}
