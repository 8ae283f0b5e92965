//! Command-line errors

use thiserror::Error;

/// Errors in how the binary was invoked.
///
/// API failures are `api_client::Error`; these cover only argument parsing
/// and missing local inputs.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("unknown command: {0} (try `jobtrack help`)")]
    UnknownCommand(String),

    #[error("usage: jobtrack {0}")]
    Usage(&'static str),

    #[error("unknown option {flag} for {command}")]
    UnknownFlag { command: &'static str, flag: String },

    #[error("missing value for {0}")]
    MissingFlagValue(String),

    #[error("invalid application status: {0}")]
    InvalidStatus(String),

    #[error("unterminated quote in: {0}")]
    UnterminatedQuote(String),

    #[error("no password available: set JOBTRACK_PASSWORD or session.password_file")]
    MissingPassword,
}

/// Result alias using CLI Error
pub type Result<T> = std::result::Result<T, Error>;
