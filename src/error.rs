//! Error types for the ledger agent

use thiserror::Error;

/// Result type alias for ledger agent operations
pub type Result<T> = std::result::Result<T, LedgerAgentError>;

#[derive(Error, Debug)]
pub enum LedgerAgentError {

    // =============================
    // Ledger Errors
    // =============================

    #[error("Malformed ledger: {0}")]
    MalformedLedger(String),

    // =============================
    // Tool Dispatch Errors
    // =============================

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid tool input: {0}")]
    InvalidToolInput(String),

    // =============================
    // Collaborator Errors
    // =============================

    #[error("LLM error: {0}")]
    LlmError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
