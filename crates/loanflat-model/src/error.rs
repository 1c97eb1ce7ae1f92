use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("unknown data type: {0}")]
    UnknownDataType(String),
    #[error("invalid size in data type {0}")]
    InvalidTypeSize(String),
}

pub type Result<T> = std::result::Result<T, ModelError>;
