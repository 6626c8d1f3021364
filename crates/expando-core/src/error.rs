use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExpandoError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Prefix '{prefix}' is already registered")]
    DuplicatePrefix { prefix: String },

    #[error("Prefix must not be empty")]
    EmptyPrefix,

    #[error("Active window unavailable: {0}")]
    ResolverUnavailable(String),

    #[error("Replacement interrupted after {emitted} of {total} events")]
    ReplacementInterrupted { emitted: usize, total: usize },

    #[error("Failed to install keyboard hook: {0}")]
    HookInstallFailure(String),

    #[error("Keyboard controller error: {0}")]
    Injection(String),

    #[error("Clipboard error: {0}")]
    Clipboard(String),

    #[error("Group not found: {0}")]
    GroupNotFound(String),

    #[error("Expansion not found: {0}")]
    ExpansionNotFound(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Error: {0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, ExpandoError>;
