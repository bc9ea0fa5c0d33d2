//! Error taxonomy for the fetch/aggregate/report pipeline.
//!
//! Fatal errors surface as a one-line cause at the CLI boundary; no
//! stack traces in default mode.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Invalid or conflicting configuration / CLI arguments.
    #[error("config error: {0}")]
    Config(String),

    /// Network or API failure reaching the review platform.
    #[error("fetch error: {0}")]
    Fetch(String),

    /// A record is missing the identifier that links it to its submission.
    #[error("data integrity error: {0}")]
    DataIntegrity(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
