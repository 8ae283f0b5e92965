//! Authenticated client for the job-tracker API
//!
//! `AuthClient` wraps a `Transport`, attaches the stored access token to
//! every call, and recovers from token expiry with one coordinated refresh
//! no matter how many requests fail at once. The resource modules (`jobs`,
//! `applications`, `profile`, `uploads`, `ai`) are typed bindings that all
//! route through it.
//!
//! Session lifecycle:
//! 1. `AuthClient::login` stores the access token; the server sets the
//!    refresh cookie on the transport's jar
//! 2. Requests carry `Authorization: Bearer <token>`
//! 3. A 401 triggers a single-flight refresh; concurrent 401s queue behind it
//! 4. The refreshed token is stored and every queued request is replayed
//! 5. A rejected refresh clears the session and broadcasts
//!    `SessionEvent::LoginRequired`
//! 6. Optionally, a background task refreshes shortly before expiry

pub mod ai;
pub mod applications;
pub mod classify;
pub mod client;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod jobs;
pub mod metrics;
pub mod profile;
pub mod refresh;
pub mod uploads;
pub mod validate;

#[cfg(test)]
pub(crate) mod testing;

pub use applications::{Application, ApplicationStats, ApplicationStatus, ApplyRequest, ResumeRef};
pub use classify::{Recovery, classify_response};
pub use client::AuthClient;
pub use error::{Error, RefreshFailure, Result};
pub use events::SessionEvent;
pub use jobs::{Job, JobUpdate, NewJob};
pub use refresh::{CycleOutcome, spawn_refresh_task};

/// Percent-encode an identifier as a single path segment.
pub(crate) fn path_segment(id: &str) -> Result<String> {
    let id = id.trim();
    if id.is_empty() {
        return Err(Error::Invalid("identifier must not be empty".into()));
    }
    Ok(urlencoding::encode(id).into_owned())
}
