use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportErrorKind {
    ParseError,
    InvalidFormat,
    MissingData,
    UnknownType,
    ValidationError,
}

/// File-level import failure. Always names the offending file.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ImportError {
    #[error("Failed to parse '{filename}': {details}")]
    ParseError { filename: String, details: String },

    #[error("Invalid format in '{filename}': {details}")]
    InvalidFormat { filename: String, details: String },

    #[error("Missing data in '{filename}': {details}")]
    MissingData { filename: String, details: String },

    #[error("Could not determine the data type of '{filename}': {details}")]
    UnknownType { filename: String, details: String },

    #[error("Validation failed for '{filename}': {details}")]
    ValidationError { filename: String, details: String },
}

impl ImportError {
    pub fn kind(&self) -> ImportErrorKind {
        match self {
            Self::ParseError { .. } => ImportErrorKind::ParseError,
            Self::InvalidFormat { .. } => ImportErrorKind::InvalidFormat,
            Self::MissingData { .. } => ImportErrorKind::MissingData,
            Self::UnknownType { .. } => ImportErrorKind::UnknownType,
            Self::ValidationError { .. } => ImportErrorKind::ValidationError,
        }
    }

    pub fn filename(&self) -> &str {
        match self {
            Self::ParseError { filename, .. }
            | Self::InvalidFormat { filename, .. }
            | Self::MissingData { filename, .. }
            | Self::UnknownType { filename, .. }
            | Self::ValidationError { filename, .. } => filename,
        }
    }

    pub fn details(&self) -> &str {
        match self {
            Self::ParseError { details, .. }
            | Self::InvalidFormat { details, .. }
            | Self::MissingData { details, .. }
            | Self::UnknownType { details, .. }
            | Self::ValidationError { details, .. } => details,
        }
    }
}

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error(transparent)]
    Import(#[from] ImportError),

    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    #[error("Cannot aggregate an empty set of store results")]
    EmptyAggregation,

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
