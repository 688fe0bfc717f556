use thiserror::Error;

use crate::core::DenyReason;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Missing query")]
    MissingInput,

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Unsafe SQL detected ({reason})")]
    UnsafeStatement { statement: String, reason: DenyReason },

    // store's own message, untouched
    #[error("{message}")]
    StoreExecution { statement: String, message: String },

    #[error("{0}")]
    Store(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Missing API key. Set {0} or pass --api-key")]
    MissingApiKey(&'static str),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Server error: {0}")]
    Server(String),
}
