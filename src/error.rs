use thiserror::Error;

use crate::services::platform::PlatformError;

/// Errors surfaced by engine operations.
///
/// Per-template failures inside a batch run are *not* errors at this level;
/// they are recorded on the batch report so the caller always receives a
/// full result list.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("platform call failed: {0}")]
    External(#[from] PlatformError),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("mapping store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// True when the whole operation must be aborted rather than retried
    /// item by item (missing credentials, missing registry file).
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            EngineError::Configuration(_)
                | EngineError::External(PlatformError::Unconfigured)
        )
    }
}
