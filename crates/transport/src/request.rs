//! Replayable request descriptions

use bytes::Bytes;
use reqwest::Method;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use std::str::FromStr;

use crate::{Result, TransportError};

/// One file field of a multipart body. Owns its bytes so a replay rebuilds
/// an identical form.
#[derive(Debug, Clone)]
pub struct FormPart {
    pub name: String,
    pub file_name: String,
    pub mime: String,
    pub bytes: Bytes,
}

/// Request payload.
#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(serde_json::Value),
    Multipart(Vec<FormPart>),
}

/// An outbound API call, relative to the transport's base URL.
///
/// `retried` is the one-shot recovery guard: once set, a 401 for this request
/// is returned to the caller instead of triggering another refresh.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    headers: HeaderMap,
    body: RequestBody,
    retried: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            body: RequestBody::Empty,
            retried: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Attach a JSON body.
    pub fn json<T: Serialize + ?Sized>(mut self, value: &T) -> Result<Self> {
        let value = serde_json::to_value(value)
            .map_err(|e| TransportError::InvalidRequest(format!("serializing body: {e}")))?;
        self.body = RequestBody::Json(value);
        Ok(self)
    }

    /// Attach a multipart body.
    pub fn multipart(mut self, parts: Vec<FormPart>) -> Self {
        self.body = RequestBody::Multipart(parts);
        self
    }

    /// Add or replace a header.
    pub fn header(mut self, name: &str, value: &str) -> Result<Self> {
        let name = HeaderName::from_str(name)
            .map_err(|e| TransportError::InvalidRequest(format!("header name {name:?}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| TransportError::InvalidRequest(format!("header {name} value: {e}")))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &RequestBody {
        &self.body
    }

    /// Set `Authorization: Bearer <token>`, replacing any previous value.
    /// The header is marked sensitive so it is redacted from Debug output.
    pub fn set_bearer(&mut self, token: &str) -> Result<()> {
        let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| TransportError::InvalidRequest(format!("invalid token value: {e}")))?;
        value.set_sensitive(true);
        self.headers.insert(AUTHORIZATION, value);
        Ok(())
    }

    /// Remove any `Authorization` header.
    pub fn strip_authorization(&mut self) {
        self.headers.remove(AUTHORIZATION);
    }

    /// The bearer token currently attached, if any.
    pub fn bearer_token(&self) -> Option<&str> {
        self.headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
    }

    pub fn mark_retried(&mut self) {
        self.retried = true;
    }

    pub fn is_retried(&self) -> bool {
        self.retried
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_bearer_replaces_previous_token() {
        let mut request = ApiRequest::get("/jobs");
        request.set_bearer("tok1").unwrap();
        request.set_bearer("tok2").unwrap();

        assert_eq!(request.bearer_token(), Some("tok2"));
        assert_eq!(request.headers().get_all(AUTHORIZATION).iter().count(), 1);
    }

    #[test]
    fn bearer_header_is_redacted_in_debug() {
        let mut request = ApiRequest::get("/jobs");
        request.set_bearer("super-secret-token").unwrap();

        let debug = format!("{request:?}");
        assert!(
            !debug.contains("super-secret-token"),
            "token leaked into Debug output: {debug}"
        );
    }

    #[test]
    fn strip_authorization_removes_header() {
        let mut request = ApiRequest::post("/auth/refresh");
        request.set_bearer("tok1").unwrap();
        request.strip_authorization();
        assert!(request.bearer_token().is_none());
        assert!(request.headers().get(AUTHORIZATION).is_none());
    }

    #[test]
    fn set_bearer_rejects_control_characters() {
        let mut request = ApiRequest::get("/jobs");
        let err = request.set_bearer("bad\ntoken").unwrap_err();
        assert!(matches!(err, TransportError::InvalidRequest(_)));
    }

    #[test]
    fn retried_guard_starts_clear_and_survives_clone() {
        let mut request = ApiRequest::get("/jobs");
        assert!(!request.is_retried());

        request.mark_retried();
        let replay = request.clone();
        assert!(replay.is_retried());
    }

    #[test]
    fn json_body_is_captured() {
        let request = ApiRequest::put("/applications/a1/status")
            .json(&serde_json::json!({ "status": "Offer" }))
            .unwrap();

        match request.body() {
            RequestBody::Json(value) => assert_eq!(value["status"], "Offer"),
            other => panic!("expected JSON body, got {other:?}"),
        }
        assert_eq!(*request.method(), Method::PUT);
        assert_eq!(request.path(), "/applications/a1/status");
    }

    #[test]
    fn header_rejects_invalid_name() {
        let result = ApiRequest::get("/jobs").header("bad header", "v");
        assert!(result.is_err());
    }

    #[test]
    fn multipart_parts_are_kept_for_replay() {
        let request = ApiRequest::post("/uploads/resume").multipart(vec![FormPart {
            name: "file".into(),
            file_name: "cv.pdf".into(),
            mime: "application/pdf".into(),
            bytes: Bytes::from_static(b"%PDF-1.7"),
        }]);

        let replay = request.clone();
        match replay.body() {
            RequestBody::Multipart(parts) => {
                assert_eq!(parts.len(), 1);
                assert_eq!(parts[0].bytes.as_ref(), b"%PDF-1.7");
            }
            other => panic!("expected multipart body, got {other:?}"),
        }
    }
}
