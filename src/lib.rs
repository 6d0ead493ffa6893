pub mod config;
pub mod error;
pub mod execution;
pub mod fallback;
pub mod llm;
pub mod orchestrator;
pub mod pipeline;
pub mod primary;
pub mod sanitizer;
pub mod schema;

// Database module for PostgreSQL
pub mod db;

pub use config::AppConfig;
pub use error::{Result, VidsqlError};
pub use orchestrator::{GenerationSource, Orchestrator};
pub use pipeline::{Answer, AnswerPipeline};
