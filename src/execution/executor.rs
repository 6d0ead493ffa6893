//! Query Executor
//!
//! Runs a validated query with a latency bound and maps every storage failure to a
//! classified [`ExecutionError`].

use crate::execution::engine::ScalarStore;
use crate::execution::error_classifier::{ErrorClassifier, ExecutionError};
use crate::execution::result::ScalarValue;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub struct QueryExecutor {
    store: Arc<dyn ScalarStore>,
    timeout: Duration,
    classifier: ErrorClassifier,
}

impl QueryExecutor {
    pub fn new(store: Arc<dyn ScalarStore>, timeout: Duration) -> Self {
        Self {
            store,
            timeout,
            classifier: ErrorClassifier::new(),
        }
    }

    pub async fn execute_scalar(&self, sql: &str) -> std::result::Result<ScalarValue, ExecutionError> {
        let started = Instant::now();
        let outcome = tokio::time::timeout(self.timeout, self.store.fetch_scalar(sql)).await;
        let elapsed_ms = started.elapsed().as_millis();

        match outcome {
            Ok(Ok(Some(value))) => {
                debug!("{} returned {} in {}ms", self.store.name(), value, elapsed_ms);
                Ok(value)
            }
            Ok(Ok(None)) => {
                debug!("{} returned no value in {}ms, defaulting to 0", self.store.name(), elapsed_ms);
                Ok(ScalarValue::default())
            }
            Ok(Err(e)) => {
                let error = self.classifier.classify(&e);
                warn!("Query failed after {}ms ({}): {}", elapsed_ms, error.class, sql);
                Err(error)
            }
            Err(_) => {
                warn!("Query exceeded {:?}: {}", self.timeout, sql);
                Err(ExecutionError::timeout(format!(
                    "query exceeded {}ms",
                    self.timeout.as_millis()
                )))
            }
        }
    }
}
