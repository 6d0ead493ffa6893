pub mod engine;
pub mod error_classifier;
pub mod executor;
pub mod result;

pub use engine::ScalarStore;
pub use error_classifier::{ErrorClassifier, ExecutionError, ExecutionErrorClass};
pub use executor::QueryExecutor;
pub use result::ScalarValue;
