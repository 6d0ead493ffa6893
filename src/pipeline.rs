//! Answer Pipeline
//!
//! translate, execute, optional second-level fallback, reply text. Callers only ever see the
//! scalar or one of the two fixed replies; everything else goes to the log.

use crate::config::LlmConfig;
use crate::execution::{ExecutionError, QueryExecutor, ScalarValue};
use crate::llm::LlmClient;
use crate::orchestrator::{GenerationSource, Orchestrator};
use crate::primary::{LlmGenerator, NullGenerator, PrimaryGenerator};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

pub const GENERATION_FAILED_REPLY: &str = "Could not generate SQL. Please rephrase.";
pub const RETRY_REPLY: &str = "Error. Please try again.";

pub const GREETING: &str = "Hi! Ask questions in Russian about video analytics.\n\n\
Examples:\n\
• Сколько всего видео есть в системе?\n\
• Сколько видео у креатора с id 123?\n\
• Сколько видео набрало больше 100000 просмотров?";

#[derive(Debug, Clone, PartialEq)]
pub enum Answer {
    Value {
        value: ScalarValue,
        /// The query that produced `value`.
        sql: String,
        source: GenerationSource,
        /// True when the value came from the second-level fallback.
        recovered: bool,
    },
    GenerationFailed,
    ExecutionFailed(ExecutionError),
}

impl Answer {
    pub fn reply_text(&self) -> String {
        match self {
            Answer::Value { value, .. } => value.to_string(),
            Answer::GenerationFailed => GENERATION_FAILED_REPLY.to_string(),
            Answer::ExecutionFailed(_) => RETRY_REPLY.to_string(),
        }
    }

    pub fn value(&self) -> Option<&ScalarValue> {
        match self {
            Answer::Value { value, .. } => Some(value),
            _ => None,
        }
    }
}

pub struct AnswerPipeline {
    orchestrator: Orchestrator,
    executor: QueryExecutor,
}

impl AnswerPipeline {
    pub fn new(orchestrator: Orchestrator, executor: QueryExecutor) -> Self {
        Self {
            orchestrator,
            executor,
        }
    }

    pub async fn answer(&self, question: &str) -> Answer {
        let span = info_span!("answer", request_id = %Uuid::new_v4());
        self.answer_inner(question).instrument(span).await
    }

    /// Answer one question per input line, writing one reply line each. Blank lines are
    /// skipped. Returns the number of questions answered.
    pub async fn serve_lines<R, W>(&self, input: R, output: &mut W) -> std::io::Result<usize>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = input.lines();
        let mut answered = 0;
        while let Some(line) = lines.next_line().await? {
            let question = line.trim();
            if question.is_empty() {
                continue;
            }
            let reply = self.answer(question).await.reply_text();
            output.write_all(reply.as_bytes()).await?;
            output.write_all(b"\n").await?;
            output.flush().await?;
            answered += 1;
        }
        Ok(answered)
    }

    async fn answer_inner(&self, question: &str) -> Answer {
        info!("Question: {}", question);

        let translation = self.orchestrator.translate(question).await;
        let query = match translation.outcome {
            Ok(query) => query,
            Err(rejection) => {
                error!("No query could be generated ({})", rejection);
                return Answer::GenerationFailed;
            }
        };

        let failure = match self.executor.execute_scalar(&query.sql).await {
            Ok(value) => {
                return Answer::Value {
                    value,
                    sql: query.sql,
                    source: query.source,
                    recovered: false,
                }
            }
            Err(e) => e,
        };

        warn!(
            "Execution failed for {} query ({}): {}",
            query.source, failure.class, query.sql
        );
        if query.source != GenerationSource::Primary {
            return Answer::ExecutionFailed(failure);
        }

        let fallback = self.orchestrator.translate_fallback_only(question).await;
        let fallback = match fallback.outcome {
            Ok(q) if q.sql != query.sql => q,
            Ok(_) => {
                info!("Fallback query is identical to the failed one, giving up");
                return Answer::ExecutionFailed(failure);
            }
            Err(_) => return Answer::ExecutionFailed(failure),
        };

        info!("Retrying with fallback query: {}", fallback.sql);
        match self.executor.execute_scalar(&fallback.sql).await {
            Ok(value) => Answer::Value {
                value,
                sql: fallback.sql,
                source: fallback.source,
                recovered: true,
            },
            Err(e) => {
                error!("Fallback query failed too ({}): {}", e.class, fallback.sql);
                Answer::ExecutionFailed(e)
            }
        }
    }
}

/// Model-backed generator when one is configured and reachable, the null generator otherwise.
pub async fn build_primary(config: &LlmConfig, disabled: bool) -> Arc<dyn PrimaryGenerator> {
    let base_url = match (&config.base_url, disabled) {
        (Some(url), false) => url.clone(),
        _ => {
            info!("No primary generator configured, using rule-based generation only");
            return Arc::new(NullGenerator);
        }
    };

    let client = match LlmClient::new(base_url.clone(), config.model.clone(), config.timeout) {
        Ok(client) => client,
        Err(e) => {
            warn!("{}", e);
            return Arc::new(NullGenerator);
        }
    };

    match client.health_check().await {
        Ok(true) => {
            info!("Primary generator '{}' ready at {}", config.model, base_url);
            Arc::new(LlmGenerator::new(client, config.max_concurrency, config.timeout))
        }
        Ok(false) => {
            warn!("Model '{}' not found at {}, using rule-based generation only", config.model, base_url);
            Arc::new(NullGenerator)
        }
        Err(e) => {
            warn!("{}; using rule-based generation only", e);
            Arc::new(NullGenerator)
        }
    }
}
