use std::fmt;

use presage_core::EngineError;

#[derive(Debug)]
pub enum StoreError {
    Sqlite(rusqlite::Error),
    InvalidData(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Sqlite(e) => write!(f, "SQLite error: {e}"),
            StoreError::InvalidData(msg) => write!(f, "invalid data: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Sqlite(e)
    }
}

/// Boundary conversion: the core treats any persistence failure as a
/// backend error.
impl From<StoreError> for EngineError {
    fn from(e: StoreError) -> Self {
        EngineError::Backend(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
