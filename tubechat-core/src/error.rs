use thiserror::Error;

use crate::session::SessionId;

/// Failures reported by [`crate::SessionStore`] operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Never created, already ended, or already reaped
    #[error("session {0} not found")]
    NotFound(SessionId),

    /// Session is alive but its message budget is spent
    #[error("session {id} reached its limit of {max_messages} messages")]
    QuotaExceeded { id: SessionId, max_messages: usize },

    #[error("could not allocate a unique session id after {attempts} attempts")]
    IdentifierExhaustion { attempts: usize },
}

pub type StoreResult<T> = Result<T, StoreError>;
