//! Error types shared by the storage layer and the generation flow.

use thiserror::Error;

/// Failure raised by a [`KeyValueStore`](crate::kv_store::KeyValueStore).
///
/// The quota tracker and history store never surface these to their
/// callers; they log them and keep their in-memory state authoritative.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("LMDB error: {0}")]
    Lmdb(#[from] lmdb::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// User-facing message for prompts rejected by the provider's safety filters.
pub const PROMPT_BLOCKED_ERROR_MESSAGE: &str = "This prompt couldn't be processed, likely due to safety filters. Please try describing your image in a different way.";

/// Reasons a generation attempt did not produce images.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("{}", PROMPT_BLOCKED_ERROR_MESSAGE)]
    Blocked,

    #[error("Daily limit reached: requested {requested}, remaining {remaining}")]
    QuotaExceeded { requested: u32, remaining: u32 },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("An error occurred while generating images: {0}")]
    Failed(String),
}

impl GenerationError {
    /// True when the provider refused the prompt, so the UI can suggest rewording.
    pub fn is_blocked(&self) -> bool {
        matches!(self, GenerationError::Blocked)
    }
}
