//! Transport abstraction for job-tracker API calls
//!
//! Defines the `Transport` trait that decouples the authenticated client from
//! the HTTP stack. `ReqwestTransport` is the production implementation; tests
//! substitute scripted transports to drive exact interleavings.
//!
//! Requests are plain values (`ApiRequest`) so the client can replay them
//! verbatim after a credential refresh.

pub mod http;
pub mod request;
pub mod response;

pub use http::ReqwestTransport;
pub use request::{ApiRequest, FormPart, RequestBody};
pub use response::ApiResponse;

pub use reqwest::header;
pub use reqwest::{Method, StatusCode};

use std::future::Future;
use std::pin::Pin;

/// Errors raised before a response status is available.
///
/// Everything here is a network or encoding failure. HTTP error statuses are
/// not errors at this layer; they come back as an `ApiResponse`.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("failed to read response body: {0}")]
    Body(String),

    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl TransportError {
    /// Short label for metrics and structured logs.
    pub fn label(&self) -> &'static str {
        match self {
            TransportError::Connect(_) => "connection",
            TransportError::Timeout(_) => "timeout",
            TransportError::Http(_) => "http",
            TransportError::InvalidRequest(_) => "invalid_request",
            TransportError::Body(_) => "body",
            TransportError::Decode(_) => "decode",
        }
    }
}

/// Result alias for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;

/// Boxed future returned by `Transport::execute`.
pub type ResponseFuture<'a> = Pin<Box<dyn Future<Output = Result<ApiResponse>> + Send + 'a>>;

/// Executes one HTTP round trip for an `ApiRequest`.
///
/// Implementations must not interpret status codes: a 401 or 500 is returned
/// as `Ok(ApiResponse)` so the caller can decide what to do with it.
///
/// Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility (`Arc<dyn Transport>`).
pub trait Transport: Send + Sync {
    /// Identifier for logging (e.g. "reqwest")
    fn id(&self) -> &str;

    /// Send the request and collect the full response.
    fn execute<'a>(&'a self, request: &'a ApiRequest) -> ResponseFuture<'a>;
}
