//! Generation Orchestrator
//!
//! Small state machine: primary generator, validation, rule-based fallback, validation.
//! Transitions are plain functions over [`GenerationState`]; only the two generator calls
//! are effects, and they are performed by [`Orchestrator::translate`].

use crate::fallback::RuleBasedGenerator;
use crate::primary::PrimaryGenerator;
use crate::sanitizer::{QuerySanitizer, Rejection, Validation};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationSource {
    Primary,
    Fallback,
}

impl fmt::Display for GenerationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationSource::Primary => write!(f, "primary"),
            GenerationSource::Fallback => write!(f, "fallback"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GenerationState {
    Start,
    TryPrimary,
    ValidatePrimary(String),
    TryFallback,
    ValidateFallback(String),
    Accepted(AcceptedQuery),
    Rejected(Rejection),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AcceptedQuery {
    pub sql: String,
    pub source: GenerationSource,
}

/// Diagnostics record for one generator call. Never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationAttempt {
    pub source: GenerationSource,
    pub input: String,
    /// `None` when the generator was unavailable.
    pub output: Option<String>,
    pub accepted: bool,
    #[serde(skip)]
    pub rejection: Option<Rejection>,
}

pub struct Translation {
    pub outcome: std::result::Result<AcceptedQuery, Rejection>,
    pub attempts: Vec<GenerationAttempt>,
}

impl Translation {
    pub fn accepted(&self) -> Option<&AcceptedQuery> {
        self.outcome.as_ref().ok()
    }
}

impl GenerationState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, GenerationState::Accepted(_) | GenerationState::Rejected(_))
    }

    pub fn start(primary_available: bool) -> Self {
        if primary_available {
            GenerationState::TryPrimary
        } else {
            GenerationState::TryFallback
        }
    }

    pub fn after_primary(output: Option<String>) -> Self {
        match output {
            Some(raw) => GenerationState::ValidatePrimary(raw),
            None => GenerationState::TryFallback,
        }
    }

    pub fn after_fallback(output: String) -> Self {
        GenerationState::ValidateFallback(output)
    }

    pub fn after_validation(source: GenerationSource, validation: Validation) -> Self {
        match (source, validation) {
            (source, Ok(sql)) => GenerationState::Accepted(AcceptedQuery { sql, source }),
            (GenerationSource::Primary, Err(_)) => GenerationState::TryFallback,
            (GenerationSource::Fallback, Err(rejection)) => GenerationState::Rejected(rejection),
        }
    }
}

/// Exposes `translate(question) -> query`. Holds no per-request state.
pub struct Orchestrator {
    primary: Arc<dyn PrimaryGenerator>,
    fallback: RuleBasedGenerator,
    sanitizer: QuerySanitizer,
}

impl Orchestrator {
    pub fn new(primary: Arc<dyn PrimaryGenerator>) -> Self {
        Self {
            primary,
            fallback: RuleBasedGenerator::new(),
            sanitizer: QuerySanitizer::new(),
        }
    }

    /// Full chain: primary first when available, then the rule-based generator.
    pub async fn translate(&self, question: &str) -> Translation {
        let start = GenerationState::start(self.primary.is_available());
        self.run(question, start).await
    }

    /// Skip the primary generator entirely.
    pub async fn translate_fallback_only(&self, question: &str) -> Translation {
        self.run(question, GenerationState::TryFallback).await
    }

    async fn run(&self, question: &str, mut state: GenerationState) -> Translation {
        let mut attempts = Vec::new();

        while !state.is_terminal() {
            state = match state {
                GenerationState::Start => GenerationState::start(self.primary.is_available()),
                GenerationState::TryPrimary => {
                    let output = self.primary.attempt(question).await;
                    if output.is_none() {
                        info!("Primary generator '{}' unavailable", self.primary.name());
                        attempts.push(GenerationAttempt {
                            source: GenerationSource::Primary,
                            input: question.to_string(),
                            output: None,
                            accepted: false,
                            rejection: None,
                        });
                    }
                    GenerationState::after_primary(output)
                }
                GenerationState::ValidatePrimary(raw) => {
                    self.validate(GenerationSource::Primary, question, raw, &mut attempts)
                }
                GenerationState::TryFallback => {
                    let (sql, rule) = self.fallback.generate_with_rule(question);
                    debug!("Fallback rule '{}' produced: {}", rule, sql);
                    GenerationState::after_fallback(sql)
                }
                GenerationState::ValidateFallback(raw) => {
                    self.validate(GenerationSource::Fallback, question, raw, &mut attempts)
                }
                terminal => terminal,
            };
        }

        let outcome = match state {
            GenerationState::Accepted(query) => {
                info!("Accepted {} query: {}", query.source, query.sql);
                Ok(query)
            }
            GenerationState::Rejected(rejection) => {
                error!(
                    "Invariant violated: rule-based query rejected ({}) for question: {}",
                    rejection, question
                );
                Err(rejection)
            }
            _ => unreachable!("loop exits only on a terminal state"),
        };

        Translation { outcome, attempts }
    }

    fn validate(
        &self,
        source: GenerationSource,
        question: &str,
        raw: String,
        attempts: &mut Vec<GenerationAttempt>,
    ) -> GenerationState {
        let validation = self.sanitizer.sanitize_and_validate(&raw);
        if let Err(ref rejection) = validation {
            warn!("Rejected {} output ({}): {}", source, rejection, raw);
        }
        attempts.push(GenerationAttempt {
            source,
            input: question.to_string(),
            output: Some(raw),
            accepted: validation.is_ok(),
            rejection: validation.as_ref().err().cloned(),
        });
        GenerationState::after_validation(source, validation)
    }
}
