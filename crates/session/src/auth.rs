//! Session service calls
//!
//! Four endpoints under `/auth`:
//! 1. `login` exchanges email + password for an access token (the server also
//!    sets the refresh cookie on the transport's jar)
//! 2. `register` creates an account
//! 3. `refresh` mints a new access token from the refresh cookie
//! 4. `logout` clears the server-side refresh cookie
//!
//! All four go through the same `Transport` as ordinary API calls so they
//! share one cookie jar. None of them attach an access token.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use transport::{ApiRequest, ApiResponse, StatusCode, Transport};

use crate::constants::{LOGIN_PATH, LOGOUT_PATH, REFRESH_PATH, REGISTER_PATH};
use crate::error::{Error, Result};
use crate::identity::{Role, User};

/// Body of a successful `POST /auth/refresh`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
}

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Body of a successful `POST /auth/login`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    pub user: Option<User>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Account creation payload.
///
/// `admin_key` is only honoured by the server together with `role: admin`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_key: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterResponse {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub user: Option<User>,
}

/// Mint a new access token.
///
/// Sent with no body and no `Authorization` header; the refresh cookie is the
/// only credential. 401/403 mean the refresh cookie is missing, expired or
/// revoked, and the session cannot be recovered.
pub async fn refresh(transport: &dyn Transport) -> Result<RefreshResponse> {
    let response = transport
        .execute(&ApiRequest::post(REFRESH_PATH))
        .await
        .map_err(|e| Error::Http(format!("token refresh request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(Error::InvalidCredentials(format!(
                "refresh rejected ({status}): {}",
                response.error_message()
            )));
        }
        return Err(rejected(&response));
    }

    let body: RefreshResponse = response
        .json()
        .map_err(|e| Error::InvalidResponse(format!("invalid refresh response: {e}")))?;
    if body.access_token.trim().is_empty() {
        return Err(Error::InvalidResponse(
            "refresh response carried an empty access token".into(),
        ));
    }
    debug!("access token refreshed");
    Ok(body)
}

/// Sign in with email and password.
pub async fn login(transport: &dyn Transport, email: &str, password: &str) -> Result<LoginResponse> {
    let request = ApiRequest::post(LOGIN_PATH).json(&LoginRequest { email, password })?;
    let response = transport
        .execute(&request)
        .await
        .map_err(|e| Error::Http(format!("login request failed: {e}")))?;

    let status = response.status();
    if status == StatusCode::UNAUTHORIZED {
        return Err(Error::InvalidCredentials(response.error_message()));
    }
    if !status.is_success() {
        return Err(rejected(&response));
    }

    response
        .json::<LoginResponse>()
        .map_err(|e| Error::InvalidResponse(format!("invalid login response: {e}")))
}

/// Create an account. Does not sign in.
pub async fn register(transport: &dyn Transport, request: &RegisterRequest) -> Result<RegisterResponse> {
    let api_request = ApiRequest::post(REGISTER_PATH).json(request)?;
    let response = transport
        .execute(&api_request)
        .await
        .map_err(|e| Error::Http(format!("register request failed: {e}")))?;

    if !response.is_success() {
        return Err(rejected(&response));
    }

    response
        .json::<RegisterResponse>()
        .map_err(|e| Error::InvalidResponse(format!("invalid register response: {e}")))
}

/// Ask the server to clear the refresh cookie.
///
/// Best effort: the local session is cleared regardless, so failures are
/// only logged.
pub async fn logout(transport: &dyn Transport) {
    match transport.execute(&ApiRequest::post(LOGOUT_PATH)).await {
        Ok(response) if response.is_success() => debug!("server session closed"),
        Ok(response) => warn!(
            status = response.status().as_u16(),
            message = %response.error_message(),
            "logout rejected by server"
        ),
        Err(e) => warn!(error = %e, "logout request failed"),
    }
}

fn rejected(response: &ApiResponse) -> Error {
    Error::Rejected {
        status: response.status().as_u16(),
        message: response.error_message(),
    }
}
