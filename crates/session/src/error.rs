//! Error types for session operations

/// Errors from session service calls and credential storage.
///
/// `Clone` so a single refresh failure can be handed to every request that
/// was waiting on it.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("session service returned {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("invalid session response: {0}")]
    InvalidResponse(String),

    #[error("credential parse error: {0}")]
    CredentialParse(String),

    #[error("I/O error: {0}")]
    Io(String),
}

/// Result alias for session operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<transport::TransportError> for Error {
    fn from(e: transport::TransportError) -> Self {
        Error::Http(e.to_string())
    }
}
