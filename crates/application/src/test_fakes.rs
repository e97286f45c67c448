use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use http::StatusCode;
use orderdesk_core::{AppError, AppResult, TenantId};
use orderdesk_domain::{
    BearerCredential, Role, Session, SessionId, SessionUser, Subscription, TenantSettings,
};
use serde_json::json;
use tokio::sync::{Mutex, Notify};
use uuid::Uuid;

use crate::{
    CredentialVerifier, HttpTransport, KeyValueStore, OutboundRequest, ReauthenticationNotifier,
    SessionAuthority, SignInRequest, TransportResponse, WorkspaceRepository,
};

pub(crate) fn test_tenant() -> TenantId {
    TenantId::from_uuid(Uuid::from_u128(0x0dde_5c00_0000_0000_0000_0000_0000_0001))
}

pub(crate) fn credential(value: &str) -> BearerCredential {
    BearerCredential::new(value).unwrap_or_else(|_| unreachable!())
}

pub(crate) fn session_with_credential(value: &str) -> Session {
    Session::new(
        SessionUser::from_claims(
            "user-1",
            "Alice Baker",
            Some("alice@example.com".to_owned()),
            test_tenant(),
        )
        .unwrap_or_else(|_| unreachable!()),
        SessionId::new(format!("sid-{value}")).unwrap_or_else(|_| unreachable!()),
        credential(value),
    )
}

#[derive(Default)]
pub(crate) struct FakeKeyValueStore {
    entries: Mutex<HashMap<String, String>>,
}

#[async_trait]
impl KeyValueStore for FakeKeyValueStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> AppResult<()> {
        self.entries.lock().await.insert(key.to_owned(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> AppResult<()> {
        self.entries.lock().await.remove(key);
        Ok(())
    }
}

/// Accepts exactly one credential value; everything else gets a 401.
pub(crate) struct FakeTransport {
    accepted_credential: Option<String>,
    unauthorized_responses: AtomicUsize,
    unauthorized_seen: Notify,
    held: Option<(String, String)>,
    held_arrived: AtomicBool,
    held_seen: Notify,
    held_release: Notify,
    pub(crate) sent: Mutex<Vec<(String, Option<String>)>>,
}

impl FakeTransport {
    pub(crate) fn accepting(credential: &str) -> Self {
        Self {
            accepted_credential: Some(credential.to_owned()),
            unauthorized_responses: AtomicUsize::new(0),
            unauthorized_seen: Notify::new(),
            held: None,
            held_arrived: AtomicBool::new(false),
            held_seen: Notify::new(),
            held_release: Notify::new(),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Parks the first request to `target` carrying `credential` until
    /// [`Self::release_held`] is called.
    pub(crate) fn holding(mut self, target: &str, credential: &str) -> Self {
        self.held = Some((target.to_owned(), credential.to_owned()));
        self
    }

    pub(crate) async fn wait_until_held(&self) {
        while !self.held_arrived.load(Ordering::SeqCst) {
            self.held_seen.notified().await;
        }
    }

    pub(crate) fn release_held(&self) {
        self.held_release.notify_one();
    }

    pub(crate) fn rejecting_everything() -> Self {
        Self {
            accepted_credential: None,
            ..Self::accepting("")
        }
    }

    pub(crate) fn unauthorized_responses(&self) -> usize {
        self.unauthorized_responses.load(Ordering::SeqCst)
    }

    pub(crate) async fn wait_for_unauthorized(&self, count: usize) {
        while self.unauthorized_responses() < count {
            self.unauthorized_seen.notified().await;
        }
    }
}

#[async_trait]
impl HttpTransport for FakeTransport {
    async fn send(
        &self,
        request: &OutboundRequest,
        credential: Option<&BearerCredential>,
    ) -> AppResult<TransportResponse> {
        let presented = credential.map(|value| value.expose().to_owned());
        self.sent
            .lock()
            .await
            .push((request.target.clone(), presented.clone()));

        let is_held = self.held.as_ref().is_some_and(|(target, credential)| {
            *target == request.target && presented.as_deref() == Some(credential.as_str())
        });
        if is_held && !self.held_arrived.swap(true, Ordering::SeqCst) {
            self.held_seen.notify_one();
            self.held_release.notified().await;
        }

        if presented.is_some() && presented == self.accepted_credential {
            return Ok(TransportResponse::new(
                StatusCode::OK,
                Some(json!({ "target": request.target, "credential": presented })),
            ));
        }

        self.unauthorized_responses.fetch_add(1, Ordering::SeqCst);
        self.unauthorized_seen.notify_one();
        Ok(TransportResponse::new(
            StatusCode::UNAUTHORIZED,
            Some(json!({ "message": "credential expired" })),
        ))
    }
}

pub(crate) enum RenewalBehaviour {
    Issue(String),
    /// Issues on the first renewal and hangs on every later one.
    IssueOnceThenHang(String),
    Fail,
    Hang,
}

/// Counts a renewal as running until its future completes or is dropped.
struct RunningRenewal<'a>(&'a AtomicUsize);

impl<'a> RunningRenewal<'a> {
    fn enter(running: &'a AtomicUsize) -> Self {
        running.fetch_add(1, Ordering::SeqCst);
        Self(running)
    }
}

impl Drop for RunningRenewal<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

pub(crate) struct FakeAuthority {
    behaviour: RenewalBehaviour,
    hold_until: Option<(Arc<FakeTransport>, usize)>,
    renew_calls: AtomicUsize,
    running_renewals: AtomicUsize,
    sign_in_calls: AtomicUsize,
    discard_calls: AtomicUsize,
}

impl FakeAuthority {
    pub(crate) fn new(behaviour: RenewalBehaviour) -> Self {
        Self {
            behaviour,
            hold_until: None,
            renew_calls: AtomicUsize::new(0),
            running_renewals: AtomicUsize::new(0),
            sign_in_calls: AtomicUsize::new(0),
            discard_calls: AtomicUsize::new(0),
        }
    }

    /// Holds every renewal until `transport` has answered `count` 401s.
    pub(crate) fn holding_until(mut self, transport: Arc<FakeTransport>, count: usize) -> Self {
        self.hold_until = Some((transport, count));
        self
    }

    pub(crate) fn renew_calls(&self) -> usize {
        self.renew_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn running_renewals(&self) -> usize {
        self.running_renewals.load(Ordering::SeqCst)
    }

    pub(crate) fn sign_in_calls(&self) -> usize {
        self.sign_in_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn discard_calls(&self) -> usize {
        self.discard_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionAuthority for FakeAuthority {
    async fn sign_in(&self, request: &SignInRequest) -> AppResult<BearerCredential> {
        self.sign_in_calls.fetch_add(1, Ordering::SeqCst);
        if request.password == "correct horse" {
            return Ok(credential("signed-in-token"));
        }

        Err(AppError::Unauthorized("invalid email or password".to_owned()))
    }

    async fn renew(&self) -> AppResult<BearerCredential> {
        let call = self.renew_calls.fetch_add(1, Ordering::SeqCst);
        let _running = RunningRenewal::enter(&self.running_renewals);
        if let Some((transport, count)) = &self.hold_until {
            transport.wait_for_unauthorized(*count).await;
        }

        match &self.behaviour {
            RenewalBehaviour::Issue(value) => Ok(credential(value)),
            RenewalBehaviour::IssueOnceThenHang(value) if call == 0 => Ok(credential(value)),
            RenewalBehaviour::IssueOnceThenHang(_) => std::future::pending().await,
            RenewalBehaviour::Fail => Err(AppError::Unauthorized(
                "refresh credential expired".to_owned(),
            )),
            RenewalBehaviour::Hang => std::future::pending().await,
        }
    }

    async fn discard_refresh_credential(&self) -> AppResult<()> {
        self.discard_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Decodes any credential except those starting with `bad`.
pub(crate) struct FakeVerifier;

impl CredentialVerifier for FakeVerifier {
    fn verify(&self, credential: &BearerCredential) -> AppResult<Session> {
        if credential.expose().starts_with("bad") {
            return Err(AppError::Unauthorized(
                "credential signature mismatch".to_owned(),
            ));
        }

        Ok(session_with_credential(credential.expose()))
    }
}

#[derive(Default)]
pub(crate) struct RecordingNotifier {
    reasons: std::sync::Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub(crate) fn count(&self) -> usize {
        self.reasons
            .lock()
            .map(|reasons| reasons.len())
            .unwrap_or_default()
    }
}

impl ReauthenticationNotifier for RecordingNotifier {
    fn require_sign_in(&self, reason: &str) {
        if let Ok(mut reasons) = self.reasons.lock() {
            reasons.push(reason.to_owned());
        }
    }
}

#[derive(Default)]
pub(crate) struct FakeWorkspaceRepository {
    pub(crate) subscription: Mutex<Option<Subscription>>,
    pub(crate) roles: Mutex<Vec<Role>>,
    pub(crate) settings: Mutex<Option<TenantSettings>>,
}

#[async_trait]
impl WorkspaceRepository for FakeWorkspaceRepository {
    async fn find_subscription(&self, _tenant_id: TenantId) -> AppResult<Option<Subscription>> {
        Ok(self.subscription.lock().await.clone())
    }

    async fn list_roles(&self, _tenant_id: TenantId) -> AppResult<Vec<Role>> {
        Ok(self.roles.lock().await.clone())
    }

    async fn find_tenant_settings(&self, _tenant_id: TenantId) -> AppResult<Option<TenantSettings>> {
        Ok(*self.settings.lock().await)
    }
}
