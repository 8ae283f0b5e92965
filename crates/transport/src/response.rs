//! Buffered API responses

use bytes::Bytes;
use reqwest::StatusCode;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;

use crate::{Result, TransportError};

/// A fully-read response. The body is buffered so the caller can inspect the
/// status, decide on recovery, and still decode the payload afterwards.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl ApiResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Build a JSON response. Used by in-memory transports.
    pub fn from_json(status: StatusCode, value: &serde_json::Value) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Self::new(status, headers, Bytes::from(value.to_string()))
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == StatusCode::UNAUTHORIZED
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|e| {
            TransportError::Decode(format!("{} response body: {e}", self.status.as_u16()))
        })
    }

    /// Body as UTF-8 text (lossy).
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// The user-facing error message the backend put in the body.
    ///
    /// Handlers reply with `{"message": ...}` (upload handlers use `msg`).
    /// Falls back to the raw body, then to the status reason.
    pub fn error_message(&self) -> String {
        if let Ok(value) = serde_json::from_slice::<serde_json::Value>(&self.body) {
            for key in ["message", "msg"] {
                if let Some(message) = value.get(key).and_then(|m| m.as_str()) {
                    return message.to_string();
                }
            }
        }
        let text = self.text();
        let text = text.trim();
        if !text.is_empty() {
            return text.to_string();
        }
        self.status
            .canonical_reason()
            .unwrap_or("unknown status")
            .to_string()
    }
}
