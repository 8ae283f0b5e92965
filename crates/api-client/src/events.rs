//! Session lifecycle events
//!
//! The client never navigates anywhere itself. It broadcasts what happened
//! to the session and the UI layer decides what that means.

use session::User;

/// Capacity of the broadcast channel. Slow subscribers lag rather than
/// block the client.
pub const EVENT_CAPACITY: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Credentials stored after a successful login.
    LoggedIn { user: Option<User> },
    /// A new access token replaced the expired one.
    Refreshed,
    /// The refresh credential was rejected and the session was torn down.
    /// Subscribers should send the user back to the login entry point.
    LoginRequired { reason: String },
    /// The user signed out.
    LoggedOut,
}

impl SessionEvent {
    pub fn label(&self) -> &'static str {
        match self {
            SessionEvent::LoggedIn { .. } => "logged_in",
            SessionEvent::Refreshed => "refreshed",
            SessionEvent::LoginRequired { .. } => "login_required",
            SessionEvent::LoggedOut => "logged_out",
        }
    }
}
