//! Primary Generator
//!
//! Optional learned stage in front of the rule-based generator. Implementations never fail:
//! any fault is reported as "unavailable" (`None`) so the orchestrator can fall back.

use crate::llm::LlmClient;
use crate::schema;
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

#[async_trait]
pub trait PrimaryGenerator: Send + Sync {
    fn name(&self) -> &str;

    /// `false` lets callers skip the stage without awaiting anything.
    fn is_available(&self) -> bool {
        true
    }

    /// Raw generator output, or `None` when the generator could not produce anything.
    async fn attempt(&self, question: &str) -> Option<String>;
}

/// Stand-in used when no model is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullGenerator;

#[async_trait]
impl PrimaryGenerator for NullGenerator {
    fn name(&self) -> &str {
        "none"
    }

    fn is_available(&self) -> bool {
        false
    }

    async fn attempt(&self, _question: &str) -> Option<String> {
        None
    }
}

pub fn build_prompt(question: &str) -> String {
    format!("translate to SQL: {}\n\n{}", question, schema::schema_ddl())
}

/// Model-backed generator. Inference is the scarce resource, so in-flight requests are
/// capped by a semaphore and waiting callers queue.
pub struct LlmGenerator {
    client: LlmClient,
    permits: Semaphore,
    timeout: Duration,
}

impl LlmGenerator {
    pub fn new(client: LlmClient, max_concurrency: usize, timeout: Duration) -> Self {
        Self {
            client,
            permits: Semaphore::new(max_concurrency.max(1)),
            timeout,
        }
    }
}

#[async_trait]
impl PrimaryGenerator for LlmGenerator {
    fn name(&self) -> &str {
        self.client.model()
    }

    async fn attempt(&self, question: &str) -> Option<String> {
        let _permit = match self.permits.acquire().await {
            Ok(p) => p,
            Err(e) => {
                warn!("Inference queue closed: {}", e);
                return None;
            }
        };

        let prompt = build_prompt(question);
        match tokio::time::timeout(self.timeout, self.client.complete(&prompt)).await {
            Ok(Ok(text)) => {
                debug!("Model output: {}", text);
                Some(text)
            }
            Ok(Err(e)) => {
                warn!("Primary generator failed: {}", e);
                None
            }
            Err(_) => {
                warn!("Primary generator timed out after {:?}", self.timeout);
                None
            }
        }
    }
}
