//! Scalar Store Trait - storage contract used by the executor
//!
//! Implementations run one already-validated query and hand back its first value.

use crate::error::Result;
use crate::execution::result::ScalarValue;
use async_trait::async_trait;

#[async_trait]
pub trait ScalarStore: Send + Sync {
    /// Store name for logs (e.g., "postgres")
    fn name(&self) -> &'static str;

    /// First column of the first row; `None` when there is no row or the value is NULL.
    async fn fetch_scalar(&self, sql: &str) -> Result<Option<ScalarValue>>;

    /// Check if the store is reachable
    async fn health_check(&self) -> Result<bool>;
}
