//! Error types for authenticated API calls

/// Why a credential refresh did not produce a new access token.
///
/// `Clone` because one failure is delivered to the refresh leader and to
/// every request that was queued behind it.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RefreshFailure {
    #[error(transparent)]
    Session(#[from] session::Error),

    #[error("refresh abandoned before it settled")]
    Abandoned,
}

/// Errors from the authenticated client and the resource bindings.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Transport(#[from] transport::TransportError),

    #[error("session refresh failed: {0}")]
    RefreshFailed(#[from] RefreshFailure),

    #[error(transparent)]
    Session(#[from] session::Error),

    #[error("request failed with {status}: {message}")]
    Status { status: u16, message: String },

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("{0}")]
    Invalid(String),
}

impl Error {
    /// Whether the caller should prompt for a fresh login.
    pub fn requires_login(&self) -> bool {
        matches!(
            self,
            Error::RefreshFailed(_)
                | Error::Status { status: 401, .. }
                | Error::Session(session::Error::InvalidCredentials(_))
        )
    }
}

/// Result alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;
