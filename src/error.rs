//! Recoverable failures surfaced to the user inline.
//!
//! None of these are fatal; callers report them and carry on.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("File \"{0}\" already exists")]
    DuplicateDocument(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Cannot {action} from state {from}")]
    IllegalTransition { from: String, action: &'static str },

    #[error("Not found: {0}")]
    NotFound(String),
}

impl CoreError {
    pub(crate) fn illegal(from: impl ToString, action: &'static str) -> Self {
        CoreError::IllegalTransition {
            from: from.to_string(),
            action,
        }
    }
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;
