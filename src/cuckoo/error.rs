use thiserror::Error;

use bincode::error::{DecodeError, EncodeError};

pub type Result<T> = std::result::Result<T, CuckooError>;

#[derive(Error, Debug, PartialEq)]
pub enum CuckooError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("The cuckoo filter is full: no free slot after {kicks} relocations")]
    Full { kicks: usize },

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Snapshot does not match this filter: {0}")]
    SnapshotMismatch(String),

    #[error("Time error: {0}")]
    TimeError(String),
}

// Conversion from String to CuckooError (for validation errors)
impl From<String> for CuckooError {
    fn from(msg: String) -> Self {
        CuckooError::InvalidConfig(msg)
    }
}

impl From<EncodeError> for CuckooError {
    fn from(err: EncodeError) -> Self {
        CuckooError::SerializationError(err.to_string())
    }
}

impl From<DecodeError> for CuckooError {
    fn from(err: DecodeError) -> Self {
        CuckooError::SerializationError(err.to_string())
    }
}
