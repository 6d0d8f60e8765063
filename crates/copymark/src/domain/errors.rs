//! Domain-specific errors.

use thiserror::Error;

/// Failures surfaced by a copy session.
///
/// None of these are fatal to the host: the button converts each one into a
/// transient error state and an optional callback.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CopyError {
    #[error("no content marked with the \"copy\" attribute found")]
    NoContentFound,
    #[error("failed to copy to clipboard: {0}")]
    CopyFailed(String),
    #[error("failed to scan content tree: {0}")]
    ScanFailed(String),
}

/// Errors raised by a content tree while it is being traversed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("content tree has no attached root")]
    Detached,
}

impl From<TreeError> for CopyError {
    fn from(err: TreeError) -> Self {
        CopyError::ScanFailed(err.to_string())
    }
}
