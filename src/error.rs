//! Error types for Parlo

use thiserror::Error;

/// Result type alias using Parlo's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors in Parlo
#[derive(Error, Debug)]
pub enum Error {
    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Analysis failed: {0}")]
    Analysis(String),

    #[error("Invalid record: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Provider not configured: {0}")]
    ProviderNotConfigured(String),
}
