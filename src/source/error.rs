use thiserror::Error;

/// Failure of a single list or fetch call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// The partition service asked us to back off (throttling, 5xx).
    #[error("transient failure: {0}")]
    Transient(String),

    /// The request itself is wrong; retrying will not help.
    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("partition {0} not found")]
    NotFound(String),

    /// A retryable failure that survived every attempt.
    #[error("gave up after {attempts} attempt(s): {last}")]
    Exhausted { attempts: u32, last: String },

    /// The shared cancellation token fired while the call was in flight.
    #[error("operation cancelled")]
    Cancelled,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed response: {0}")]
    Decode(String),
}

impl FetchError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::Transient(_) | FetchError::Transport(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, FetchError::Cancelled)
    }
}
