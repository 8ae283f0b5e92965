//! reqwest-backed transport
//!
//! Joins the configured API base URL with each request path, forwards the
//! request headers as-is, and buffers the response. The client keeps a cookie
//! jar: the session service sets the long-lived refresh credential as an
//! http-only cookie on login, and the jar replays it on later calls
//! (notably `POST /auth/refresh`) without any code touching it.

use std::time::Duration;

use reqwest::multipart::{Form, Part};
use tracing::{debug, instrument};

use crate::{
    ApiRequest, ApiResponse, FormPart, RequestBody, ResponseFuture, Result, Transport,
    TransportError,
};

/// Transport over a shared `reqwest::Client` with a cookie store.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl ReqwestTransport {
    /// Build a transport with its own cookie-enabled client.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .map_err(|e| TransportError::InvalidRequest(format!("building HTTP client: {e}")))?;
        Ok(Self::with_client(client, base_url, timeout))
    }

    /// Wrap an existing client. The caller is responsible for enabling the
    /// cookie store if refresh cookies must be carried.
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            timeout,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        if path.starts_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        }
    }

    #[instrument(skip_all, fields(method = %request.method(), path = %request.path()))]
    async fn round_trip(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let mut builder = self
            .client
            .request(request.method().clone(), self.url_for(request.path()))
            .headers(request.headers().clone())
            .timeout(self.timeout);

        builder = match request.body() {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Multipart(parts) => builder.multipart(build_form(parts)?),
        };

        let response = builder.send().await.map_err(classify_send_error)?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::Body(e.to_string()))?;

        debug!(status = status.as_u16(), bytes = body.len(), "response received");
        Ok(ApiResponse::new(status, headers, body))
    }
}

impl Transport for ReqwestTransport {
    fn id(&self) -> &str {
        "reqwest"
    }

    fn execute<'a>(&'a self, request: &'a ApiRequest) -> ResponseFuture<'a> {
        Box::pin(self.round_trip(request))
    }
}

/// Rebuild a multipart form from owned parts.
fn build_form(parts: &[FormPart]) -> Result<Form> {
    let mut form = Form::new();
    for part in parts {
        let file = Part::bytes(part.bytes.to_vec())
            .file_name(part.file_name.clone())
            .mime_str(&part.mime)
            .map_err(|e| {
                TransportError::InvalidRequest(format!("mime type {:?}: {e}", part.mime))
            })?;
        form = form.part(part.name.clone(), file);
    }
    Ok(form)
}

fn classify_send_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout(e.to_string())
    } else if e.is_connect() {
        TransportError::Connect(e.to_string())
    } else {
        TransportError::Http(e.to_string())
    }
}
