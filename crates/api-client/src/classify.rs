//! Response classification for the recovery protocol
//!
//! Only a 401 is ever recovered, and only once per request. Everything else,
//! including other 4xx/5xx statuses, belongs to the caller.

use transport::StatusCode;

/// What the client should do with a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// Not an authorization failure; return it untouched.
    PassThrough,
    /// Expired access token on a fresh request; refresh and replay.
    Recover,
    /// Authorization failure that must not be retried: the request was
    /// already replayed once, or it was the refresh call itself.
    Terminal,
}

impl Recovery {
    pub fn label(&self) -> &'static str {
        match self {
            Recovery::PassThrough => "pass_through",
            Recovery::Recover => "recover",
            Recovery::Terminal => "terminal",
        }
    }
}

/// Classify a response by status, the request's one-shot guard, and whether
/// the request targeted the refresh endpoint.
pub fn classify_response(status: StatusCode, already_retried: bool, refresh_endpoint: bool) -> Recovery {
    if status != StatusCode::UNAUTHORIZED {
        return Recovery::PassThrough;
    }
    if already_retried || refresh_endpoint {
        Recovery::Terminal
    } else {
        Recovery::Recover
    }
}
