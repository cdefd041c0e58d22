use thiserror::Error;

impl From<serde_json::Error> for ChainLogError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(format!("JSON serialization error: {}", err))
    }
}

impl From<config::ConfigError> for ChainLogError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum ChainLogError {
    #[error("Storage write failed: {0}")]
    StorageWrite(String),

    #[error("Storage read failed: {0}")]
    StorageRead(String),

    #[error("Anchor write failed: {0}")]
    AnchorWrite(String),

    #[error("Anchor read failed: {0}")]
    AnchorRead(String),

    #[error("Malformed entry: {0}")]
    MalformedEntry(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Chain tip moved: expected {expected}, found {actual}")]
    TipConflict { expected: String, actual: String },

    #[error("Operation not supported: {0}")]
    Unsupported(String),
}

pub type Result<T> = std::result::Result<T, ChainLogError>;

impl ChainLogError {
    pub fn tip_conflict(expected: Option<&str>, actual: Option<&str>) -> Self {
        Self::TipConflict {
            expected: expected.unwrap_or("<empty>").to_string(),
            actual: actual.unwrap_or("<empty>").to_string(),
        }
    }
}
