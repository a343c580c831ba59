//! Authenticated HTTP transport with coordinated token refresh.
//!
//! Every outbound request picks up the stored access token as a bearer
//! credential. When the backend rejects it with a 401, the transport runs
//! exactly one refresh call per expiry window: the first request to observe
//! the 401 leads the refresh, every other request that fails in the same
//! window queues on the in-flight refresh and is replayed with the new
//! token once it lands. A replayed request is never refreshed again, so a
//! second 401 passes through to the caller.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use reqwest::{Client, Method, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::auth::CredentialStore;

use super::ApiError;

/// HTTP request timeout in seconds.
/// Applies to the refresh call too, so queued requests cannot hang
/// indefinitely on a dead refresh connection.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Token refresh endpoint, relative to the API base
const REFRESH_PATH: &str = "auth/token/refresh/";

/// A replayable description of an outbound request.
///
/// Kept separate from `reqwest::Request` because a sent request cannot be
/// reused; the transport rebuilds the real request for the retry.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
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

    /// Append a query parameter
    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    /// Attach a JSON body
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

// ============================================================================
// Refresh coordination
// ============================================================================

/// Outcome delivered to a queued request: the new access token, or `None`
/// when the refresh failed and the session is over.
type RefreshOutcome = Option<String>;

enum RefreshTicket {
    /// This request owns the refresh call.
    Leader,
    /// A refresh is already in flight; await its outcome.
    Follower(oneshot::Receiver<RefreshOutcome>),
}

/// Explicit refresh state: the in-flight flag plus the queue of requests
/// waiting on the result. Flag and queue only ever change together under
/// one lock acquisition, so no request can observe them out of sync.
#[derive(Default)]
struct RefreshGate {
    inner: Mutex<GateInner>,
}

#[derive(Default)]
struct GateInner {
    in_flight: bool,
    waiters: Vec<oneshot::Sender<RefreshOutcome>>,
}

impl RefreshGate {
    /// Atomic check-then-set: become the leader if no refresh is in flight,
    /// otherwise join the queue.
    fn begin_or_join(&self) -> RefreshTicket {
        let mut inner = self.inner.lock().unwrap();
        if inner.in_flight {
            let (tx, rx) = oneshot::channel();
            inner.waiters.push(tx);
            RefreshTicket::Follower(rx)
        } else {
            inner.in_flight = true;
            RefreshTicket::Leader
        }
    }

    /// Clear the flag and wake every queued waiter, in enqueue order.
    fn complete(&self, outcome: Option<&str>) {
        let waiters = {
            let mut inner = self.inner.lock().unwrap();
            inner.in_flight = false;
            std::mem::take(&mut inner.waiters)
        };
        for waiter in waiters {
            // receiver may have been dropped by a cancelled caller
            let _ = waiter.send(outcome.map(str::to_string));
        }
    }
}

// ============================================================================
// Transport
// ============================================================================

type SessionTerminatedHook = Arc<dyn Fn() + Send + Sync>;

/// HTTP transport that owns credential attachment and token refresh.
/// Share it behind an `Arc`; `reqwest::Client` pools connections internally.
pub struct AuthTransport {
    client: Client,
    base_url: String,
    store: Arc<CredentialStore>,
    gate: RefreshGate,
    on_session_terminated: Mutex<Option<SessionTerminatedHook>>,
}

impl AuthTransport {
    pub fn new(base_url: impl Into<String>, store: Arc<CredentialStore>) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            store,
            gate: RefreshGate::default(),
            on_session_terminated: Mutex::new(None),
        })
    }

    /// Register a callback fired when the session ends irrecoverably
    /// (missing refresh token or failed refresh). The hosting application
    /// uses this to navigate back to its sign-in entry point.
    pub fn on_session_terminated(&self, hook: impl Fn() + Send + Sync + 'static) {
        *self.on_session_terminated.lock().unwrap() = Some(Arc::new(hook));
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    /// Send a request, transparently refreshing the access token once if
    /// the backend rejects it. All non-401 responses pass through untouched.
    pub async fn send(&self, request: ApiRequest) -> Result<Response, ApiError> {
        let access = self.store.access_token();
        let response = self.issue(&request, access.as_deref()).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        debug!(path = %request.path, "Access token rejected, entering refresh flow");

        let Some(refresh) = self.store.refresh_token() else {
            warn!("No refresh token stored, signing out");
            self.sign_out();
            return Err(ApiError::Unauthorized);
        };

        match self.gate.begin_or_join() {
            RefreshTicket::Follower(outcome) => match outcome.await {
                Ok(Some(token)) => self.issue(&request, Some(&token)).await,
                // refresh failed (or the leader vanished): surface the 401
                _ => Err(ApiError::Unauthorized),
            },
            RefreshTicket::Leader => match self.refresh_access_token(&refresh).await {
                Ok(token) => {
                    if let Err(e) = self.store.set_access_token(&token) {
                        warn!(error = %e, "Failed to persist refreshed access token");
                    }
                    debug!("Access token refreshed, replaying queued requests");
                    self.gate.complete(Some(token.as_str()));
                    self.issue(&request, Some(&token)).await
                }
                Err(e) => {
                    warn!(error = %e, "Token refresh failed, signing out");
                    self.gate.complete(None);
                    self.sign_out();
                    Err(ApiError::Unauthorized)
                }
            },
        }
    }

    /// Clear stored credentials and notify the host that the session ended.
    pub fn sign_out(&self) {
        if let Err(e) = self.store.clear_tokens() {
            warn!(error = %e, "Failed to clear credentials during sign-out");
        }
        let hook = self.on_session_terminated.lock().unwrap().clone();
        if let Some(hook) = hook {
            hook();
        }
    }

    /// Build and send the real request, attaching the bearer token if present
    async fn issue(&self, request: &ApiRequest, token: Option<&str>) -> Result<Response, ApiError> {
        let mut builder = self
            .client
            .request(request.method.clone(), self.url(&request.path));
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        Ok(builder.send().await?)
    }

    /// Exchange the refresh token for a new access token.
    /// A 2xx response without an `access` field still counts as failure.
    async fn refresh_access_token(&self, refresh: &str) -> Result<String, ApiError> {
        #[derive(Deserialize)]
        struct RefreshResponse {
            access: Option<String>,
        }

        let response = self
            .client
            .post(self.url(REFRESH_PATH))
            .json(&serde_json::json!({ "refresh": refresh }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::from_status(status, &body));
        }

        let parsed: RefreshResponse = response.json().await?;
        parsed
            .access
            .filter(|access| !access.is_empty())
            .ok_or_else(|| {
                ApiError::InvalidResponse("refresh response missing access token".to_string())
            })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}
