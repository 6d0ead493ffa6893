//! Error Classifier
//!
//! Classifies storage failures into a taxonomy for operator diagnostics.

use crate::error::VidsqlError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Execution failure taxonomy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionErrorClass {
    RelationNotFound,
    ColumnNotFound,
    FunctionNotFound,
    Syntax,
    ReadOnlyViolation,
    Timeout,
    Connectivity,
    Other,
}

impl fmt::Display for ExecutionErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionErrorClass::RelationNotFound => write!(f, "RelationNotFound"),
            ExecutionErrorClass::ColumnNotFound => write!(f, "ColumnNotFound"),
            ExecutionErrorClass::FunctionNotFound => write!(f, "FunctionNotFound"),
            ExecutionErrorClass::Syntax => write!(f, "Syntax"),
            ExecutionErrorClass::ReadOnlyViolation => write!(f, "ReadOnlyViolation"),
            ExecutionErrorClass::Timeout => write!(f, "Timeout"),
            ExecutionErrorClass::Connectivity => write!(f, "Connectivity"),
            ExecutionErrorClass::Other => write!(f, "Other"),
        }
    }
}

/// A validated query that failed against storage.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{class}: {message}")]
pub struct ExecutionError {
    pub class: ExecutionErrorClass,
    pub message: String,
}

impl ExecutionError {
    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            class: ExecutionErrorClass::Timeout,
            message: message.into(),
        }
    }
}

impl From<ExecutionError> for VidsqlError {
    fn from(e: ExecutionError) -> Self {
        VidsqlError::Execution(e.to_string())
    }
}

/// Error classifier
pub struct ErrorClassifier;

impl ErrorClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify(&self, error: &VidsqlError) -> ExecutionError {
        let message = error.to_string();
        ExecutionError {
            class: self.classify_message(&message),
            message,
        }
    }

    /// Pattern matching on Postgres/driver error messages
    pub fn classify_message(&self, message: &str) -> ExecutionErrorClass {
        let msg = message.to_lowercase();

        if msg.contains("relation") && msg.contains("does not exist") {
            return ExecutionErrorClass::RelationNotFound;
        }

        if msg.contains("column") && msg.contains("does not exist") {
            return ExecutionErrorClass::ColumnNotFound;
        }

        if msg.contains("function") && msg.contains("does not exist") {
            return ExecutionErrorClass::FunctionNotFound;
        }

        if msg.contains("syntax error") {
            return ExecutionErrorClass::Syntax;
        }

        if msg.contains("read-only transaction") {
            return ExecutionErrorClass::ReadOnlyViolation;
        }

        if msg.contains("timed out") || msg.contains("timeout") || msg.contains("canceling statement") {
            return ExecutionErrorClass::Timeout;
        }

        if msg.contains("connection") || msg.contains("pool") || msg.contains("refused") || msg.contains("broken pipe") {
            return ExecutionErrorClass::Connectivity;
        }

        ExecutionErrorClass::Other
    }
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        Self::new()
    }
}
