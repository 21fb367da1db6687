use thiserror::Error;

use super::order::RowId;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Not found")]
    NotFound,
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Unknown row {0}")]
    UnknownRow(RowId),
    #[error("Not authenticated")]
    Unauthorized,
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    /// Authentication failures abort the current flow; everything else may be
    /// degraded by the caller.
    pub fn is_auth(&self) -> bool {
        matches!(self, DomainError::Unauthorized)
    }
}
