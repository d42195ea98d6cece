//! Error types for Centsible

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Extraction stage failed: provider unreachable, errored, or its
    /// reply contained no locatable JSON.
    #[error("Extraction failed: {0}")]
    Extraction(String),

    /// Normalization stage failed: second model call errored or
    /// returned an unparsable reply.
    #[error("Normalization failed: {0}")]
    Normalization(String),

    /// Validation & repair could not produce a schema-valid record.
    /// Terminal for the current attempt.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Every attempt in the receipt fallback chain failed.
    #[error("Could not parse receipt: {0}")]
    Exhausted(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

pub type Result<T> = std::result::Result<T, Error>;
