use thiserror::Error;

/// Failure taxonomy for the chat subsystem. The API layer maps these onto
/// HTTP statuses; the Unauthorized message stays generic so authorization
/// failures never leak whether the entity exists.
#[derive(Debug, Error)]
pub enum ChatError {
    /// Missing required text/attachment or malformed input — surfaced
    /// verbatim to the caller.
    #[error("{0}")]
    Validation(String),

    /// Caller is not a member of the project (or not the key holder).
    #[error("Unauthorized")]
    Unauthorized,

    /// An id did not resolve.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Store or runtime failure — logged, never retried at this layer.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ChatError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
