//! Session service constants
//!
//! Paths are relative to the API base URL (e.g. `http://localhost:5000/api`).

/// Mints a new access token from the refresh cookie
pub const REFRESH_PATH: &str = "/auth/refresh";

/// Exchanges email + password for an access token and sets the refresh cookie
pub const LOGIN_PATH: &str = "/auth/login";

/// Creates a user account
pub const REGISTER_PATH: &str = "/auth/register";

/// Clears the server-side refresh cookie
pub const LOGOUT_PATH: &str = "/auth/logout";

/// Key under which the access token is persisted in local storage
pub const TOKEN_STORAGE_KEY: &str = "token";

/// Whether `path` targets the refresh endpoint.
///
/// Query strings and a trailing slash are ignored so `/auth/refresh/` and
/// `/auth/refresh?x=1` are still exempt from credential attachment.
pub fn is_refresh_endpoint(path: &str) -> bool {
    let path = path.split(['?', '#']).next().unwrap_or(path);
    path.trim_end_matches('/') == REFRESH_PATH
}
