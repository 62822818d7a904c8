use std::fmt;

use crate::model::ModelId;

#[derive(Debug)]
pub enum EngineError {
    /// `learn` was called with zero events in working memory.
    EmptySequence,
    /// Out-of-range configuration value. Carries a description of the
    /// offending field.
    InvalidConfiguration(String),
    /// Lookup of a model id that is not in the store.
    NotFound(ModelId),
    /// Failure surfaced by the persistence backend.
    Backend(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::EmptySequence => write!(f, "cannot learn an empty sequence"),
            EngineError::InvalidConfiguration(msg) => write!(f, "invalid configuration: {msg}"),
            EngineError::NotFound(id) => write!(f, "model not found: {id}"),
            EngineError::Backend(msg) => write!(f, "backend error: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {}

pub type Result<T> = std::result::Result<T, EngineError>;
