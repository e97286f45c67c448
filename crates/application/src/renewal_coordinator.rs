//! Request pipeline that keeps the bearer credential valid.
//!
//! Every credentialed request reads the credential from the
//! [`CredentialStore`] at send time. A `401` parks the request on a waiter
//! queue behind a single in-flight renewal; when the renewal settles, every
//! waiter is released with the same outcome and replays its request.
//!
//! ```text
//!            401 (first)                    renewal ok: replace session,
//!   Idle ───────────────► Renewing ───────► release waiters ──► Idle
//!                          │  ▲
//!                 401 ─────┘  └── queued    renewal failed/timed out:
//!                                           purge session, reject waiters,
//!                                           require sign-in ──► Idle
//! ```
//!
//! Each request is replayed at most `max_retries_per_request` times. A
//! request that is still rejected after that drains the queue, purges the
//! session and requires sign-in without renewing again.

use std::sync::Arc;
use std::time::Duration;

use orderdesk_core::{AppError, AppResult};
use orderdesk_domain::BearerCredential;
use tokio::sync::{Mutex, oneshot};
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

use crate::{
    CredentialPolicy, CredentialStore, CredentialVerifier, HttpTransport, OutboundRequest,
    ReauthenticationNotifier, SessionAuthority, TransportResponse,
};

type RenewalOutcome = AppResult<BearerCredential>;

/// Limits applied to credential renewal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenewalPolicy {
    /// Replays allowed per request after a renewal.
    pub max_retries_per_request: u8,
    /// Upper bound on one renewal call.
    pub renewal_timeout: Duration,
}

impl Default for RenewalPolicy {
    fn default() -> Self {
        Self {
            max_retries_per_request: 1,
            renewal_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Default)]
struct FlightState {
    generation: u64,
    in_flight: bool,
    renewal: Option<AbortHandle>,
    waiters: Vec<oneshot::Sender<RenewalOutcome>>,
}

impl FlightState {
    /// Ends the current flight and hands back its waiters.
    fn settle(&mut self) -> Vec<oneshot::Sender<RenewalOutcome>> {
        self.generation = self.generation.wrapping_add(1);
        self.in_flight = false;
        self.renewal = None;
        std::mem::take(&mut self.waiters)
    }

    /// Cancels the outstanding renewal call, then settles.
    fn supersede(&mut self) -> Vec<oneshot::Sender<RenewalOutcome>> {
        if let Some(renewal) = self.renewal.take() {
            renewal.abort();
        }
        self.settle()
    }
}

struct CoordinatorInner {
    transport: Arc<dyn HttpTransport>,
    authority: Arc<dyn SessionAuthority>,
    verifier: Arc<dyn CredentialVerifier>,
    store: CredentialStore,
    notifier: Arc<dyn ReauthenticationNotifier>,
    policy: RenewalPolicy,
    flight: Mutex<FlightState>,
}

/// Sends requests with the session credential and renews it single-flight.
#[derive(Clone)]
pub struct RenewalCoordinator {
    inner: Arc<CoordinatorInner>,
}

impl RenewalCoordinator {
    /// Creates a coordinator. Construct one per process and share clones.
    #[must_use]
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        authority: Arc<dyn SessionAuthority>,
        verifier: Arc<dyn CredentialVerifier>,
        store: CredentialStore,
        notifier: Arc<dyn ReauthenticationNotifier>,
        policy: RenewalPolicy,
    ) -> Self {
        Self {
            inner: Arc::new(CoordinatorInner {
                transport,
                authority,
                verifier,
                store,
                notifier,
                policy,
                flight: Mutex::new(FlightState::default()),
            }),
        }
    }

    /// Returns the credential store the coordinator reads from.
    #[must_use]
    pub fn store(&self) -> &CredentialStore {
        &self.inner.store
    }

    /// Returns whether a renewal is currently outstanding.
    pub async fn is_renewing(&self) -> bool {
        self.inner.flight.lock().await.in_flight
    }

    /// Returns how many requests are parked behind the current renewal.
    pub async fn pending_waiters(&self) -> usize {
        self.inner.flight.lock().await.waiters.len()
    }

    /// Sends `request` and returns the final response.
    ///
    /// Authorization failures on credentialed requests are recovered through
    /// renewal before the caller sees them. Other non-success statuses are
    /// returned as responses.
    pub async fn send(&self, request: OutboundRequest) -> AppResult<TransportResponse> {
        if request.credential == CredentialPolicy::Omit {
            return self.inner.transport.send(&request, None).await;
        }

        let mut credential = self.inner.store.credential().await;
        let mut retries = 0_u8;

        loop {
            let response = self
                .inner
                .transport
                .send(&request, credential.as_ref())
                .await?;
            if !response.is_authorization_failure() {
                return Ok(response);
            }

            if retries >= self.inner.policy.max_retries_per_request {
                warn!(
                    method = %request.method,
                    request_target = %request.target,
                    retries,
                    "request still unauthorized after credential renewal"
                );
                let reason = format!(
                    "{} {} was rejected after credential renewal",
                    request.method, request.target
                );
                self.inner.abandon_session(reason.as_str()).await;
                return Err(AppError::Unauthorized(reason));
            }

            retries = retries.saturating_add(1);
            credential = Some(self.await_renewal(&request, credential.as_ref()).await?);
        }
    }

    async fn await_renewal(
        &self,
        request: &OutboundRequest,
        rejected: Option<&BearerCredential>,
    ) -> RenewalOutcome {
        let receiver = {
            let mut flight = self.inner.flight.lock().await;
            if !flight.in_flight {
                // A renewal settled between the rejection and this point.
                match (self.inner.store.credential().await, rejected) {
                    (Some(current), _) if Some(&current) != rejected => {
                        debug!(
                            request_target = %request.target,
                            "replaying with already renewed credential"
                        );
                        return Ok(current);
                    }
                    (None, Some(_)) => {
                        return Err(AppError::Unauthorized(
                            "session ended while the request was in flight".to_owned(),
                        ));
                    }
                    _ => {}
                }
            }

            let (sender, receiver) = oneshot::channel();
            flight.waiters.push(sender);

            if flight.in_flight {
                debug!(
                    request_target = %request.target,
                    waiters = flight.waiters.len(),
                    "queued behind in-flight credential renewal"
                );
            } else {
                flight.in_flight = true;
                let generation = flight.generation;
                let inner = Arc::clone(&self.inner);
                let renewal = tokio::spawn(async move { inner.renew(generation).await });
                flight.renewal = Some(renewal.abort_handle());
            }

            receiver
        };

        receiver.await.map_err(|_| {
            AppError::Unauthorized("credential renewal was abandoned".to_owned())
        })?
    }
}

impl CoordinatorInner {
    async fn renew(&self, generation: u64) {
        info!(generation, "renewing session credential");

        let renewed = match tokio::time::timeout(self.policy.renewal_timeout, self.authority.renew())
            .await
        {
            Ok(Ok(credential)) => self.verifier.verify(&credential),
            Ok(Err(error)) => Err(error),
            Err(_) => Err(AppError::Unauthorized(format!(
                "credential renewal timed out after {} ms",
                self.policy.renewal_timeout.as_millis()
            ))),
        };

        let (waiters, outcome) = {
            let mut flight = self.flight.lock().await;
            if flight.generation != generation {
                debug!(generation, "discarding result of superseded renewal");
                return;
            }

            let outcome = match renewed {
                Ok(session) => {
                    let credential = session.credential().clone();
                    self.store.replace(session).await.map(|()| credential)
                }
                Err(error) => Err(error),
            };

            if outcome.is_err() {
                self.purge_session().await;
            }

            (flight.settle(), outcome)
        };

        match outcome {
            Ok(credential) => {
                info!(
                    generation,
                    waiters = waiters.len(),
                    "session credential renewed"
                );
                for waiter in waiters {
                    let _ = waiter.send(Ok(credential.clone()));
                }
            }
            Err(error) => {
                warn!(
                    generation,
                    waiters = waiters.len(),
                    error = %error,
                    "credential renewal failed"
                );
                let rejection = AppError::Unauthorized(format!("credential renewal failed: {error}"));
                for waiter in waiters {
                    let _ = waiter.send(Err(rejection.clone()));
                }
                self.notifier.require_sign_in(rejection.to_string().as_str());
            }
        }
    }

    /// Purges the session after the retry ceiling, rejecting every waiter
    /// before sign-in is required. An outstanding renewal is cancelled.
    async fn abandon_session(&self, reason: &str) {
        let waiters = {
            let mut flight = self.flight.lock().await;
            self.purge_session().await;
            flight.supersede()
        };

        let rejection = AppError::Unauthorized(reason.to_owned());
        for waiter in waiters {
            let _ = waiter.send(Err(rejection.clone()));
        }

        self.notifier.require_sign_in(reason);
    }

    /// Forgets the session and the refresh credential that could renew it.
    async fn purge_session(&self) {
        if let Err(error) = self.store.clear().await {
            warn!(error = %error, "failed to purge session");
        }
        if let Err(error) = self.authority.discard_refresh_credential().await {
            warn!(error = %error, "failed to discard refresh credential");
        }
    }
}
