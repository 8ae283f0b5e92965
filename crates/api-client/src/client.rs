//! Authenticated request client
//!
//! Every call goes through `AuthClient::send`, which attaches the current
//! access token and recovers from expiry:
//!
//! 1. A 401 on a request that has not been replayed marks it as retried
//! 2. If a refresh is already in flight the request queues behind it
//! 3. Otherwise it leads a refresh against `/auth/refresh` (cookie only)
//! 4. On success the new token is stored, the queue is released, and the
//!    request is replayed with the new token
//! 5. On failure the queue is rejected, the session is cleared, and
//!    `SessionEvent::LoginRequired` is broadcast
//!
//! The refresh call itself never carries an access token and never
//! triggers recovery. Any status other than 401 is returned untouched.

use std::sync::Arc;
use std::time::Instant;

use serde::de::DeserializeOwned;
use session::{CredentialStore, RegisterRequest, RegisterResponse, User, is_refresh_endpoint};
use tokio::sync::broadcast;
use tracing::{Instrument, debug, info, info_span, warn};
use transport::{ApiRequest, ApiResponse, ResponseFuture, Transport};

use crate::classify::{Recovery, classify_response};
use crate::coordinator::{RefreshCoordinator, RefreshOutcome, Ticket};
use crate::error::{Error, RefreshFailure, Result};
use crate::events::{EVENT_CAPACITY, SessionEvent};
use crate::{metrics, validate};

/// Profile endpoint used to confirm a persisted token on startup.
pub const PROFILE_PATH: &str = "/user/profile";

/// HTTP client wrapper that owns the refresh protocol.
///
/// Cheap to share behind an `Arc`; all state is internally synchronized.
pub struct AuthClient {
    transport: MeteredTransport,
    store: Arc<CredentialStore>,
    coordinator: RefreshCoordinator,
    events: broadcast::Sender<SessionEvent>,
}

impl AuthClient {
    pub fn new(transport: Arc<dyn Transport>, store: Arc<CredentialStore>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        info!(transport = transport.id(), "authenticated client ready");
        Self {
            transport: MeteredTransport { inner: transport },
            store,
            coordinator: RefreshCoordinator::new(),
            events,
        }
    }

    pub fn store(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    /// Subscribe to session lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Whether a refresh call is currently in flight.
    pub fn refresh_in_progress(&self) -> bool {
        self.coordinator.is_refreshing()
    }

    /// Requests queued behind the in-flight refresh.
    pub fn pending_requests(&self) -> usize {
        self.coordinator.pending()
    }

    /// Send a request with the current access token, recovering once from
    /// an expired token.
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let request_id = format!("req_{}", uuid::Uuid::new_v4().as_simple());
        let span = info_span!(
            "api_request",
            request_id = %request_id,
            method = %request.method(),
            path = %request.path(),
        );
        self.send_with_recovery(request).instrument(span).await
    }

    async fn send_with_recovery(&self, mut request: ApiRequest) -> Result<ApiResponse> {
        let refresh_endpoint = is_refresh_endpoint(request.path());
        if refresh_endpoint {
            request.strip_authorization();
        } else if let Some(token) = self.store.access_token().await {
            request.set_bearer(&token)?;
        }

        let response = self.execute(&request).await?;
        let recovery = classify_response(response.status(), request.is_retried(), refresh_endpoint);
        if recovery != Recovery::Recover {
            if recovery == Recovery::Terminal {
                debug!(recovery = recovery.label(), "authorization failure returned to caller");
            }
            return Ok(response);
        }

        request.mark_retried();
        debug!("access token rejected, recovering");
        let token = self.recover(OnFailure::SignOut).await?;

        request.set_bearer(&token)?;
        metrics::record_replay();
        debug!("replaying request with refreshed token");
        self.execute(&request).await
    }

    /// Send and decode a JSON body. Non-success statuses become
    /// `Error::Status` carrying the server's message.
    pub async fn send_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        let response = self.send_checked(request).await?;
        response
            .json()
            .map_err(|e| Error::Decode(e.to_string()))
    }

    /// Send and require a success status.
    pub async fn send_checked(&self, request: ApiRequest) -> Result<ApiResponse> {
        let response = self.send(request).await?;
        if !response.is_success() {
            return Err(Error::Status {
                status: response.status().as_u16(),
                message: response.error_message(),
            });
        }
        Ok(response)
    }

    /// One transport round trip.
    async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse> {
        Ok(self.transport.execute(request).await?)
    }

    /// Obtain a fresh access token, either by leading a refresh or by
    /// waiting on the one already in flight.
    async fn recover(&self, policy: OnFailure) -> std::result::Result<String, RefreshFailure> {
        let guard = match self.coordinator.begin() {
            Ticket::Waiter(waiter) => return waiter.wait().await,
            Ticket::Leader(guard) => guard,
        };

        let outcome = self.refresh_access_token().await;
        let waiters = guard.settle(&outcome);
        metrics::record_refresh(outcome.is_ok(), waiters);

        match &outcome {
            Ok(_) => {
                info!(waiters, "session refreshed");
                self.emit(SessionEvent::Refreshed);
            }
            Err(e) if policy.signs_out(e) => {
                warn!(error = %e, waiters, "session refresh failed, signing out");
                self.teardown(e).await;
            }
            Err(e) => {
                warn!(error = %e, waiters, "session refresh failed, keeping session");
            }
        }
        outcome
    }

    /// Call the refresh endpoint and store the new token, keeping the
    /// current identity.
    async fn refresh_access_token(&self) -> RefreshOutcome {
        let refreshed = session::auth::refresh(&self.transport).await?;
        if let Err(e) = self
            .store
            .replace_access_token(refreshed.access_token.clone())
            .await
        {
            // The new token is already live in memory
            warn!(error = %e, "failed to persist refreshed access token");
        }
        Ok(refreshed.access_token)
    }

    /// Clear the local session after an unrecoverable refresh failure and
    /// tell subscribers to send the user back to login.
    async fn teardown(&self, failure: &RefreshFailure) {
        if let Err(e) = self.store.clear().await {
            warn!(error = %e, "failed to clear persisted session");
        }
        self.emit(SessionEvent::LoginRequired {
            reason: failure.to_string(),
        });
    }

    /// Refresh the access token now, sharing any refresh already running.
    pub async fn refresh_session(&self) -> Result<()> {
        self.recover(OnFailure::SignOut).await?;
        Ok(())
    }

    /// Refresh ahead of expiry. Only a rejected refresh credential signs the
    /// user out; a transient failure keeps the session so a later attempt
    /// can retry while the current token is still valid.
    pub(crate) async fn refresh_ahead_of_expiry(&self) -> Result<()> {
        self.recover(OnFailure::SignOutIfRejected).await?;
        Ok(())
    }

    /// Sign in and store the access token and identity.
    pub async fn login(&self, email: &str, password: &str) -> Result<Option<User>> {
        validate::email(email)?;
        validate::required(&[password], "Password is required")?;

        let response = session::auth::login(&self.transport, email, password).await?;
        self.store
            .set_auth(response.user.clone(), response.access_token)
            .await?;

        info!(
            role = response.user.as_ref().map(|u| u.role.label()).unwrap_or("unknown"),
            "logged in"
        );
        self.emit(SessionEvent::LoggedIn {
            user: response.user.clone(),
        });
        Ok(response.user)
    }

    /// Create an account. Does not sign in.
    pub async fn register(&self, request: &RegisterRequest) -> Result<RegisterResponse> {
        validate::name(&request.name)?;
        validate::email(&request.email)?;
        validate::password(&request.password)?;

        let response = session::auth::register(&self.transport, request).await?;
        info!("account registered");
        Ok(response)
    }

    /// Close the server session (best effort) and clear local state.
    pub async fn logout(&self) -> Result<()> {
        session::auth::logout(&self.transport).await;
        self.store.clear().await?;
        info!("logged out");
        self.emit(SessionEvent::LoggedOut);
        Ok(())
    }

    /// Confirm a persisted token by loading the profile.
    ///
    /// Returns `Ok(None)` when no token is stored. A failure leaves the
    /// token in place: expiry is handled by the refresh protocol, which
    /// clears the session itself if the refresh credential is gone.
    pub async fn check_auth(&self) -> Result<Option<User>> {
        if !self.store.is_authenticated().await {
            debug!("no stored access token");
            return Ok(None);
        }

        match self.send_json::<User>(ApiRequest::get(PROFILE_PATH)).await {
            Ok(user) => {
                self.store.set_identity(user.clone()).await;
                Ok(Some(user))
            }
            Err(e) => {
                warn!(error = %e, "auth check failed");
                Err(e)
            }
        }
    }

    fn emit(&self, event: SessionEvent) {
        debug!(event = event.label(), "session event");
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

/// What a failed refresh does to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OnFailure {
    /// Any failure clears the session.
    SignOut,
    /// Only a refresh credential the server refused clears the session.
    SignOutIfRejected,
}

impl OnFailure {
    fn signs_out(self, failure: &RefreshFailure) -> bool {
        match self {
            OnFailure::SignOut => true,
            OnFailure::SignOutIfRejected => matches!(
                failure,
                RefreshFailure::Session(session::Error::InvalidCredentials(_))
            ),
        }
    }
}

/// Records metrics for every round trip, including the session endpoints
/// that bypass `AuthClient::send`.
struct MeteredTransport {
    inner: Arc<dyn Transport>,
}

impl Transport for MeteredTransport {
    fn id(&self) -> &str {
        self.inner.id()
    }

    fn execute<'a>(&'a self, request: &'a ApiRequest) -> ResponseFuture<'a> {
        Box::pin(async move {
            let start = Instant::now();
            let result = self.inner.execute(request).await;
            match &result {
                Ok(response) => metrics::record_request(
                    response.status().as_u16(),
                    request.method().as_str(),
                    start.elapsed().as_secs_f64(),
                ),
                Err(e) => {
                    metrics::record_transport_error(e.label());
                    warn!(error = %e, transport = self.inner.id(), "request failed before a response");
                }
            }
            result
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockApi, RefreshReply, collect_events, wait_until};
    use futures_util::future::join_all;
    use session::Role;
    use transport::StatusCode;
    use transport::header::AUTHORIZATION;

    async fn signed_in(api: &Arc<MockApi>, token: &str) -> Arc<AuthClient> {
        let store = Arc::new(CredentialStore::in_memory());
        store
            .set_auth(
                Some(User {
                    id: "u1".into(),
                    name: "Ada".into(),
                    email: "ada@example.com".into(),
                    role: Role::User,
                }),
                token.into(),
            )
            .await
            .unwrap();
        Arc::new(AuthClient::new(api.clone(), store))
    }

    #[tokio::test]
    async fn attaches_current_token() {
        let api = MockApi::new("tok1");
        let client = signed_in(&api, "tok1").await;

        let response = client.send(ApiRequest::get("/jobs")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(api.requests()[0].bearer_token(), Some("tok1"));
        assert_eq!(api.refresh_calls(), 0);
    }

    #[tokio::test]
    async fn signed_out_requests_carry_no_token() {
        let api = MockApi::new("tok1");
        api.open("/public/ping");
        let client = AuthClient::new(api.clone(), Arc::new(CredentialStore::in_memory()));

        let response = client.send(ApiRequest::get("/public/ping")).await.unwrap();

        assert!(response.is_success());
        assert!(api.requests()[0].headers().get(AUTHORIZATION).is_none());
        assert_eq!(api.refresh_calls(), 0);
    }

    #[tokio::test]
    async fn signed_out_401_refreshes_then_asks_for_login_once() {
        let api = MockApi::new("tok1");
        let client = AuthClient::new(api.clone(), Arc::new(CredentialStore::in_memory()));
        let mut events = client.subscribe();

        let err = client.send(ApiRequest::get("/jobs")).await.unwrap_err();

        assert!(err.requires_login());
        assert_eq!(api.refresh_calls(), 1);
        let events = collect_events(&mut events);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], SessionEvent::LoginRequired { .. }));
        assert!(!client.refresh_in_progress());
    }

    #[tokio::test]
    async fn request_time_refresh_failure_signs_out_even_when_transient() {
        let api = MockApi::new("tok2");
        api.fail("/auth/refresh");
        let client = signed_in(&api, "tok1").await;

        let err = client.send(ApiRequest::get("/jobs")).await.unwrap_err();

        assert!(matches!(err, Error::RefreshFailed(RefreshFailure::Session(session::Error::Http(_)))));
        assert!(!client.store().is_authenticated().await);
    }

    fn isolated_recorder() -> (
        metrics_exporter_prometheus::PrometheusRecorder,
        metrics_exporter_prometheus::PrometheusHandle,
    ) {
        let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        (recorder, handle)
    }

    #[tokio::test]
    async fn refresh_round_trip_is_counted() {
        let (recorder, handle) = isolated_recorder();
        let _guard = ::metrics::set_default_local_recorder(&recorder);
        let api = MockApi::new("tok2");
        api.push_refresh(RefreshReply::Token("tok2"));
        let client = signed_in(&api, "tok1").await;

        client.send(ApiRequest::get("/jobs")).await.unwrap();

        let output = handle.render();
        let posts: Vec<_> = output
            .lines()
            .filter(|l| l.starts_with("api_client_requests_total") && l.contains(r#"method="POST""#))
            .collect();
        assert_eq!(posts.len(), 1, "refresh call must be counted, got: {output}");
        assert!(posts[0].contains(r#"status="200""#));
        assert!(output.contains(r#"status="401""#));
    }

    #[tokio::test]
    async fn refresh_transport_error_is_counted() {
        let (recorder, handle) = isolated_recorder();
        let _guard = ::metrics::set_default_local_recorder(&recorder);
        let api = MockApi::new("tok2");
        api.fail("/auth/refresh");
        let client = signed_in(&api, "tok1").await;

        client.send(ApiRequest::get("/jobs")).await.unwrap_err();

        let output = handle.render();
        assert!(
            output.contains(r#"api_client_transport_errors_total{error_type="connection"} 1"#),
            "got: {output}"
        );
    }

    #[tokio::test]
    async fn non_401_failures_pass_through_untouched() {
        let api = MockApi::new("tok1");
        api.reply(
            "/jobs/missing",
            StatusCode::NOT_FOUND,
            serde_json::json!({ "message": "Job not found" }),
        );
        api.reply(
            "/jobs/broken",
            StatusCode::INTERNAL_SERVER_ERROR,
            serde_json::json!({ "message": "Server error" }),
        );
        let client = signed_in(&api, "tok1").await;

        let missing = client.send(ApiRequest::get("/jobs/missing")).await.unwrap();
        let broken = client.send(ApiRequest::get("/jobs/broken")).await.unwrap();

        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        assert_eq!(broken.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api.requests().len(), 2, "no retries on generic failures");
        assert_eq!(api.refresh_calls(), 0);
    }

    #[tokio::test]
    async fn network_errors_propagate_without_refresh() {
        let api = MockApi::new("tok1");
        api.fail("/jobs");
        let client = signed_in(&api, "tok1").await;

        let err = client.send(ApiRequest::get("/jobs")).await.unwrap_err();

        assert!(matches!(err, Error::Transport(_)), "got: {err:?}");
        assert_eq!(api.refresh_calls(), 0);
    }

    #[tokio::test]
    async fn expired_token_is_refreshed_and_request_replayed() {
        let api = MockApi::new("tok2");
        api.push_refresh(RefreshReply::Token("tok2"));
        let client = signed_in(&api, "tok1").await;
        let mut events = client.subscribe();

        let response = client.send(ApiRequest::get("/jobs")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value = response.json().unwrap();
        assert_eq!(body["token"], "tok2", "result must be the replayed response");

        let requests = api.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].bearer_token(), Some("tok1"));
        assert_eq!(requests[1].path(), "/auth/refresh");
        assert_eq!(
            requests[2].headers().get(AUTHORIZATION).unwrap(),
            "Bearer tok2"
        );
        assert!(requests[2].is_retried());

        assert_eq!(client.store().access_token().await.as_deref(), Some("tok2"));
        assert_eq!(
            client.store().identity().await.map(|u| u.id),
            Some("u1".to_string()),
            "identity survives a refresh"
        );
        assert_eq!(collect_events(&mut events), vec![SessionEvent::Refreshed]);
    }

    #[tokio::test]
    async fn refresh_call_never_carries_authorization() {
        let api = MockApi::new("tok2");
        api.push_refresh(RefreshReply::Token("tok2"));
        let client = signed_in(&api, "tok1").await;

        client.send(ApiRequest::get("/jobs")).await.unwrap();

        let mut direct = ApiRequest::post("/auth/refresh");
        direct.set_bearer("caller-supplied").unwrap();
        api.push_refresh(RefreshReply::Token("tok3"));
        client.send(direct).await.unwrap();

        let refreshes: Vec<_> = api
            .requests()
            .into_iter()
            .filter(|r| r.path() == "/auth/refresh")
            .collect();
        assert_eq!(refreshes.len(), 2);
        for r in refreshes {
            assert!(r.headers().get(AUTHORIZATION).is_none());
        }
    }

    #[tokio::test]
    async fn refresh_endpoint_401_is_terminal() {
        let api = MockApi::new("tok2");
        api.push_refresh(RefreshReply::Rejected);
        let client = signed_in(&api, "tok1").await;

        let response = client.send(ApiRequest::post("/auth/refresh")).await.unwrap();

        assert!(response.is_unauthorized());
        assert_eq!(api.refresh_calls(), 1, "no recovery for the refresh call");
        assert!(client.store().is_authenticated().await);
    }

    #[tokio::test]
    async fn second_401_after_replay_is_returned() {
        let api = MockApi::new("tok2");
        api.always_unauthorized("/applications/getapplications");
        api.push_refresh(RefreshReply::Token("tok2"));
        let client = signed_in(&api, "tok1").await;

        let response = client
            .send(ApiRequest::get("/applications/getapplications"))
            .await
            .unwrap();

        assert!(response.is_unauthorized());
        assert_eq!(api.refresh_calls(), 1);
        assert_eq!(api.requests().len(), 3, "original, refresh, one replay");
        assert!(!client.refresh_in_progress());
    }

    #[tokio::test]
    async fn refresh_failure_tears_down_session_once() {
        let api = MockApi::new("tok2");
        api.push_refresh(RefreshReply::Rejected);
        let client = signed_in(&api, "tok1").await;
        let mut events = client.subscribe();

        let err = client.send(ApiRequest::get("/jobs")).await.unwrap_err();

        assert!(
            matches!(
                err,
                Error::RefreshFailed(RefreshFailure::Session(session::Error::InvalidCredentials(_)))
            ),
            "got: {err:?}"
        );
        assert!(err.requires_login());
        assert!(client.store().access_token().await.is_none());
        assert!(client.store().identity().await.is_none());
        assert!(!client.refresh_in_progress());

        let events = collect_events(&mut events);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], SessionEvent::LoginRequired { .. }));
    }

    #[tokio::test]
    async fn concurrent_expiry_triggers_exactly_one_refresh() {
        const N: usize = 5;
        let api = MockApi::gated("tok2");
        api.push_refresh(RefreshReply::Token("tok2"));
        let client = signed_in(&api, "tok1").await;
        assert!(!client.refresh_in_progress());

        let handles: Vec<_> = (0..N)
            .map(|i| {
                let client = client.clone();
                tokio::spawn(async move { client.send(ApiRequest::get(format!("/jobs/{i}"))).await })
            })
            .collect();

        wait_until(|| client.pending_requests() == N - 1).await;
        assert!(client.refresh_in_progress());
        api.release_refresh();

        for handle in join_all(handles).await {
            let response = handle.unwrap().unwrap();
            let body: serde_json::Value = response.json().unwrap();
            assert_eq!(body["token"], "tok2");
        }

        assert_eq!(api.refresh_calls(), 1);
        let replays = api
            .requests()
            .into_iter()
            .filter(|r| r.is_retried())
            .count();
        assert_eq!(replays, N);
        assert!(!client.refresh_in_progress());
        assert_eq!(client.pending_requests(), 0);
    }

    #[tokio::test]
    async fn concurrent_expiry_with_failed_refresh_rejects_all() {
        const N: usize = 4;
        let api = MockApi::gated("tok2");
        api.push_refresh(RefreshReply::Rejected);
        let client = signed_in(&api, "tok1").await;
        let mut events = client.subscribe();

        let handles: Vec<_> = (0..N)
            .map(|i| {
                let client = client.clone();
                tokio::spawn(async move { client.send(ApiRequest::get(format!("/jobs/{i}"))).await })
            })
            .collect();

        wait_until(|| client.pending_requests() == N - 1).await;
        api.release_refresh();

        for handle in join_all(handles).await {
            let err = handle.unwrap().unwrap_err();
            assert!(
                matches!(err, Error::RefreshFailed(RefreshFailure::Session(_))),
                "got: {err:?}"
            );
        }

        assert_eq!(api.refresh_calls(), 1);
        assert!(!client.refresh_in_progress());
        assert!(client.store().access_token().await.is_none());

        let login_required = collect_events(&mut events)
            .into_iter()
            .filter(|e| matches!(e, SessionEvent::LoginRequired { .. }))
            .count();
        assert_eq!(login_required, 1, "session torn down exactly once");
    }

    #[tokio::test]
    async fn unaffected_request_returns_while_others_recover() {
        let api = MockApi::gated("tok2");
        api.open("/public/announcements");
        api.push_refresh(RefreshReply::Token("tok2"));
        let client = signed_in(&api, "tok1").await;

        let a = tokio::spawn({
            let client = client.clone();
            async move { client.send(ApiRequest::get("/jobs/a")).await }
        });
        wait_until(|| client.refresh_in_progress()).await;

        let b = tokio::spawn({
            let client = client.clone();
            async move { client.send(ApiRequest::get("/jobs/b")).await }
        });
        wait_until(|| client.pending_requests() == 1).await;

        // C completes while the refresh is still held open
        let c = client
            .send(ApiRequest::get("/public/announcements"))
            .await
            .unwrap();
        assert_eq!(c.status(), StatusCode::OK);
        assert!(client.refresh_in_progress());

        api.release_refresh();
        let a = a.await.unwrap().unwrap();
        let b = b.await.unwrap().unwrap();

        assert_eq!(a.json::<serde_json::Value>().unwrap()["token"], "tok2");
        assert_eq!(b.json::<serde_json::Value>().unwrap()["token"], "tok2");
        assert_eq!(api.refresh_calls(), 1);
    }

    #[tokio::test]
    async fn cancelled_leader_releases_waiters() {
        let api = MockApi::gated("tok2");
        api.push_refresh(RefreshReply::Token("tok2"));
        let client = signed_in(&api, "tok1").await;

        let leader = tokio::spawn({
            let client = client.clone();
            async move { client.send(ApiRequest::get("/jobs/a")).await }
        });
        wait_until(|| client.refresh_in_progress()).await;

        let waiter = tokio::spawn({
            let client = client.clone();
            async move { client.send(ApiRequest::get("/jobs/b")).await }
        });
        wait_until(|| client.pending_requests() == 1).await;

        leader.abort();
        let err = waiter.await.unwrap().unwrap_err();

        assert!(matches!(err, Error::RefreshFailed(RefreshFailure::Abandoned)), "got: {err:?}");
        assert!(!client.refresh_in_progress());
    }

    #[tokio::test]
    async fn refresh_session_stores_new_token() {
        let api = MockApi::new("tok2");
        api.push_refresh(RefreshReply::Token("tok2"));
        let client = signed_in(&api, "tok1").await;

        client.refresh_session().await.unwrap();

        assert_eq!(client.store().access_token().await.as_deref(), Some("tok2"));
        assert_eq!(api.refresh_calls(), 1);
    }

    #[tokio::test]
    async fn login_stores_token_and_identity() {
        let api = MockApi::new("tok1");
        api.reply(
            "/auth/login",
            StatusCode::OK,
            serde_json::json!({
                "message": "Login successful",
                "accessToken": "tok1",
                "user": { "id": "u9", "name": "Lin", "email": "lin@example.com", "role": "admin" }
            }),
        );
        let client = AuthClient::new(api.clone(), Arc::new(CredentialStore::in_memory()));
        let mut events = client.subscribe();

        let user = client.login("lin@example.com", "secret1").await.unwrap().unwrap();

        assert!(user.is_admin());
        assert_eq!(client.store().access_token().await.as_deref(), Some("tok1"));
        assert_eq!(client.store().identity().await, Some(user.clone()));
        assert_eq!(
            collect_events(&mut events),
            vec![SessionEvent::LoggedIn { user: Some(user) }]
        );
    }

    #[tokio::test]
    async fn login_rejects_malformed_email_without_a_request() {
        let api = MockApi::new("tok1");
        let client = AuthClient::new(api.clone(), Arc::new(CredentialStore::in_memory()));

        let err = client.login("not-an-email", "secret1").await.unwrap_err();

        assert!(matches!(err, Error::Invalid(_)));
        assert!(api.requests().is_empty());
    }

    #[tokio::test]
    async fn register_validates_before_sending() {
        let api = MockApi::new("tok1");
        let client = AuthClient::new(api.clone(), Arc::new(CredentialStore::in_memory()));

        let err = client
            .register(&RegisterRequest {
                name: "Ada".into(),
                email: "ada@example.com".into(),
                password: "123".into(),
                role: None,
                admin_key: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Invalid(_)));
        assert!(api.requests().is_empty());
    }

    #[tokio::test]
    async fn logout_clears_even_when_server_fails() {
        let api = MockApi::new("tok1");
        api.fail("/auth/logout");
        let client = signed_in(&api, "tok1").await;
        let mut events = client.subscribe();

        client.logout().await.unwrap();

        assert!(!client.store().is_authenticated().await);
        assert_eq!(collect_events(&mut events), vec![SessionEvent::LoggedOut]);
    }

    #[tokio::test]
    async fn check_auth_records_profile_identity() {
        let api = MockApi::new("tok1");
        api.reply(
            PROFILE_PATH,
            StatusCode::OK,
            serde_json::json!({ "_id": "u1", "name": "Ada", "email": "ada@example.com", "role": "user" }),
        );
        let store = Arc::new(CredentialStore::in_memory());
        store.set_auth(None, "tok1".into()).await.unwrap();
        let client = AuthClient::new(api.clone(), store);

        let user = client.check_auth().await.unwrap().unwrap();

        assert_eq!(user.id, "u1");
        assert_eq!(client.store().identity().await, Some(user));
    }

    #[tokio::test]
    async fn check_auth_without_token_sends_nothing() {
        let api = MockApi::new("tok1");
        let client = AuthClient::new(api.clone(), Arc::new(CredentialStore::in_memory()));

        assert!(client.check_auth().await.unwrap().is_none());
        assert!(api.requests().is_empty());
    }

    #[tokio::test]
    async fn check_auth_failure_keeps_token() {
        let api = MockApi::new("tok1");
        api.reply(
            PROFILE_PATH,
            StatusCode::INTERNAL_SERVER_ERROR,
            serde_json::json!({ "message": "Error fetching profile" }),
        );
        let client = signed_in(&api, "tok1").await;

        let err = client.check_auth().await.unwrap_err();

        assert!(matches!(err, Error::Status { status: 500, .. }));
        assert!(client.store().is_authenticated().await);
    }

    #[tokio::test]
    async fn send_json_surfaces_server_message() {
        let api = MockApi::new("tok1");
        api.reply(
            "/applications/apply",
            StatusCode::BAD_REQUEST,
            serde_json::json!({ "message": "You have already applied for this job" }),
        );
        let client = signed_in(&api, "tok1").await;

        let err = client
            .send_json::<serde_json::Value>(ApiRequest::post("/applications/apply"))
            .await
            .unwrap_err();

        match err {
            Error::Status { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "You have already applied for this job");
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    /// End to end over HTTP: the refresh credential travels only as a cookie
    /// set at login, and the refreshed token is replayed.
    #[tokio::test]
    async fn recovers_over_http_with_cookie_refresh() {
        use axum::http::HeaderMap;
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::time::Duration;
        use tokio::net::TcpListener;

        let refreshes = Arc::new(AtomicUsize::new(0));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}/api", listener.local_addr().unwrap());

        let counter = refreshes.clone();
        let app = axum::Router::new()
            .route(
                "/api/auth/login",
                axum::routing::post(|| async {
                    (
                        StatusCode::OK,
                        [("set-cookie", "refreshToken=rt_1; Path=/; HttpOnly")],
                        axum::Json(serde_json::json!({
                            "accessToken": "tok1",
                            "user": { "id": "u1", "name": "Ada", "email": "ada@example.com", "role": "user" }
                        })),
                    )
                }),
            )
            .route(
                "/api/auth/refresh",
                axum::routing::post(move |headers: HeaderMap| {
                    let counter = counter.clone();
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        let cookie = headers
                            .get("cookie")
                            .and_then(|v| v.to_str().ok())
                            .unwrap_or("");
                        if headers.contains_key("authorization") || !cookie.contains("refreshToken=rt_1") {
                            return (
                                StatusCode::UNAUTHORIZED,
                                axum::Json(serde_json::json!({ "message": "No refresh token" })),
                            );
                        }
                        (
                            StatusCode::OK,
                            axum::Json(serde_json::json!({ "accessToken": "tok2" })),
                        )
                    }
                }),
            )
            .route(
                "/api/jobs",
                axum::routing::get(|headers: HeaderMap| async move {
                    match headers.get("authorization").and_then(|v| v.to_str().ok()) {
                        Some("Bearer tok2") => (StatusCode::OK, axum::Json(serde_json::json!([]))),
                        _ => (
                            StatusCode::UNAUTHORIZED,
                            axum::Json(serde_json::json!({ "message": "Token expired" })),
                        ),
                    }
                }),
            );
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let transport = transport::ReqwestTransport::new(base_url, Duration::from_secs(5)).unwrap();
        let client = AuthClient::new(Arc::new(transport), Arc::new(CredentialStore::in_memory()));

        client.login("ada@example.com", "secret1").await.unwrap();
        let jobs: Vec<serde_json::Value> = client.send_json(ApiRequest::get("/jobs")).await.unwrap();

        assert!(jobs.is_empty());
        assert_eq!(refreshes.load(Ordering::SeqCst), 1);
        assert_eq!(client.store().access_token().await.as_deref(), Some("tok2"));
    }
}
