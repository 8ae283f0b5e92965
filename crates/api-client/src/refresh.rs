//! Proactive background token refresh
//!
//! Spawns a periodic task that decodes the stored access token's `exp` and
//! refreshes it shortly before it lapses, so most requests never see a 401.
//! The refresh goes through the same single-flight coordinator as request
//! recovery, so a background refresh and a request-triggered one never run
//! side by side.

use std::sync::Arc;
use std::time::Duration;

use session::AccessClaims;
use tracing::{debug, info, warn};

use crate::client::AuthClient;

/// What one refresh cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    SignedOut,
    /// Token is not a JWT or carries no `exp`; leave it to request recovery.
    UnknownExpiry,
    StillValid,
    Refreshed,
    Failed,
}

/// Spawn a background task that refreshes the access token when it expires
/// within `threshold`.
///
/// Runs every `interval`. A refresh credential the server rejects tears the
/// session down; connection errors, timeouts and server errors leave it in
/// place and the next tick retries.
///
/// Returns a `JoinHandle` for the spawned task.
pub fn spawn_refresh_task(
    client: Arc<AuthClient>,
    interval: Duration,
    threshold: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // Skip the immediate first tick; the token was just loaded
        ticker.tick().await;

        loop {
            ticker.tick().await;
            refresh_cycle(&client, threshold).await;
        }
    })
}

/// Run one cycle: refresh if the stored token expires within `threshold`.
pub async fn refresh_cycle(client: &AuthClient, threshold: Duration) -> CycleOutcome {
    let Some(token) = client.store().access_token().await else {
        return CycleOutcome::SignedOut;
    };

    let claims = match AccessClaims::decode(&token) {
        Ok(claims) if claims.exp.is_some() => claims,
        Ok(_) | Err(_) => {
            debug!("access token expiry unknown, skipping proactive refresh");
            return CycleOutcome::UnknownExpiry;
        }
    };

    let now_secs = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();

    if !claims.expires_within(now_secs, threshold.as_secs()) {
        return CycleOutcome::StillValid;
    }

    debug!(
        remaining_secs = claims.seconds_remaining(now_secs),
        "access token expiring within threshold, refreshing"
    );
    match client.refresh_ahead_of_expiry().await {
        Ok(()) => {
            info!("background token refresh succeeded");
            CycleOutcome::Refreshed
        }
        Err(e) => {
            warn!(error = %e, "background token refresh failed");
            CycleOutcome::Failed
        }
    }
}
