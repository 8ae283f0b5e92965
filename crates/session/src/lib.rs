//! Job-tracker session library
//!
//! Owns everything about "who is signed in": the credential store, the
//! session service endpoints, and unverified access-token claims. This crate
//! knows nothing about request recovery; the authenticated client in
//! `api-client` drives it.
//!
//! Credential flow:
//! 1. `auth::login()` returns an access token; the server sets the refresh
//!    cookie on the transport's jar
//! 2. Token and identity stored via `CredentialStore::set_auth()`
//! 3. On expiry the client calls `auth::refresh()` (cookie only)
//! 4. New token saved via `CredentialStore::replace_access_token()`
//! 5. Refresh failure or logout ends in `CredentialStore::clear()`

pub mod auth;
pub mod claims;
pub mod constants;
pub mod credentials;
pub mod error;
pub mod identity;

pub use auth::{LoginResponse, RefreshResponse, RegisterRequest, RegisterResponse};
pub use claims::AccessClaims;
pub use constants::*;
pub use credentials::CredentialStore;
pub use error::{Error, Result};
pub use identity::{Role, User};
