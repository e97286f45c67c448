use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use orderdesk_application::{
    CredentialStore, KeyValueStore, RenewalCoordinator, RenewalPolicy, SessionService,
    SignInRequest, WorkspaceRepository,
};
use orderdesk_core::{AppError, TenantId};
use orderdesk_domain::{Panel, SubscriptionStatus};

use crate::test_server::{self, ServerState};
use crate::{
    ApiBaseUrl, HttpSessionAuthority, InMemoryKeyValueStore, PersistentCookieJar,
    REFRESH_COOKIES_STORAGE_KEY, ReqwestHttpTransport, TracingReauthenticationNotifier,
    build_http_client,
};

use super::HttpWorkspaceRepository;

struct Wiring {
    repository: HttpWorkspaceRepository,
    sessions: SessionService,
    store: CredentialStore,
    storage: Arc<InMemoryKeyValueStore>,
    notifier: Arc<TracingReauthenticationNotifier>,
    server: Arc<ServerState>,
}

async fn wiring() -> Wiring {
    let (base_url, server) = test_server::spawn().await;
    wiring_on(base_url, server, Arc::new(InMemoryKeyValueStore::new())).await
}

/// Wires a fresh client, as a new process would, over existing device storage.
async fn wiring_on(
    base_url: ApiBaseUrl,
    server: Arc<ServerState>,
    storage: Arc<InMemoryKeyValueStore>,
) -> Wiring {
    let cookies = Arc::new(PersistentCookieJar::new(storage.clone()));
    assert!(cookies.restore().await.is_ok());
    let http_client = build_http_client(Duration::from_secs(5), cookies.clone())
        .unwrap_or_else(|_| unreachable!());
    let authority = Arc::new(HttpSessionAuthority::new(
        http_client.clone(),
        base_url.clone(),
        cookies,
    ));
    let transport = Arc::new(ReqwestHttpTransport::new(http_client, base_url));
    let verifier = Arc::new(test_server::verifier());
    let notifier = Arc::new(TracingReauthenticationNotifier::new());
    let store = CredentialStore::new(storage.clone());
    assert!(store.restore().await.is_ok());

    let coordinator = RenewalCoordinator::new(
        transport,
        authority.clone(),
        verifier.clone(),
        store.clone(),
        notifier.clone(),
        RenewalPolicy::default(),
    );

    Wiring {
        repository: HttpWorkspaceRepository::new(coordinator),
        sessions: SessionService::new(authority, verifier, store.clone()),
        store,
        storage,
        notifier,
        server,
    }
}

fn tenant() -> TenantId {
    TenantId::from_uuid(test_server::product_id())
}

async fn sign_in(wiring: &Wiring) {
    let result = wiring
        .sessions
        .sign_in(SignInRequest {
            email: "alice@example.com".to_owned(),
            password: "correct horse".to_owned(),
            platform: "cli".to_owned(),
        })
        .await;
    assert!(result.is_ok(), "sign-in failed: {result:?}");
}

#[tokio::test]
async fn signed_in_client_reads_workspace() {
    let wiring = wiring().await;
    sign_in(&wiring).await;

    let subscription = wiring
        .repository
        .find_subscription(tenant())
        .await
        .unwrap_or_else(|error| panic!("subscription read failed: {error}"));
    assert_eq!(
        subscription.map(|subscription| subscription.status),
        Some(SubscriptionStatus::Active)
    );

    let roles = wiring
        .repository
        .list_roles(tenant())
        .await
        .unwrap_or_else(|error| panic!("roles read failed: {error}"));
    assert_eq!(roles.len(), 1);
    assert!(roles[0].can_access(Panel::Orders));
    assert!(!roles[0].can_access(Panel::Reports));

    let settings = wiring.repository.find_tenant_settings(tenant()).await;
    assert_eq!(settings.ok(), Some(None));
    assert_eq!(wiring.server.refresh_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn expired_access_token_is_renewed_with_refresh_cookie() {
    let wiring = wiring().await;
    sign_in(&wiring).await;
    wiring.server.expire_access_token().await;

    let roles = wiring.repository.list_roles(tenant()).await;

    assert!(roles.is_ok_and(|roles| roles.len() == 1));
    assert_eq!(wiring.server.refresh_calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        wiring
            .store
            .current()
            .await
            .map(|session| session.session_id().as_str().to_owned()),
        Some("sess-1".to_owned())
    );
    assert!(!wiring.notifier.was_triggered());
}

#[tokio::test]
async fn renewal_works_in_a_later_process_on_the_same_device() {
    let (base_url, server) = test_server::spawn().await;
    let storage = Arc::new(InMemoryKeyValueStore::new());

    let first = wiring_on(base_url.clone(), server.clone(), storage.clone()).await;
    sign_in(&first).await;
    drop(first);

    let second = wiring_on(base_url, server.clone(), storage).await;
    assert!(second.store.is_authenticated().await);
    server.expire_access_token().await;

    let roles = second.repository.list_roles(tenant()).await;

    assert!(roles.is_ok_and(|roles| roles.len() == 1));
    assert_eq!(server.refresh_calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        second
            .store
            .current()
            .await
            .map(|session| session.session_id().as_str().to_owned()),
        Some("sess-1".to_owned())
    );
    assert!(!second.notifier.was_triggered());
}

#[tokio::test]
async fn sign_out_forgets_refresh_cookie_for_later_processes() {
    let (base_url, server) = test_server::spawn().await;
    let storage = Arc::new(InMemoryKeyValueStore::new());

    let first = wiring_on(base_url.clone(), server.clone(), storage.clone()).await;
    sign_in(&first).await;
    assert!(
        storage
            .get(REFRESH_COOKIES_STORAGE_KEY)
            .await
            .ok()
            .flatten()
            .is_some()
    );
    assert!(first.sessions.sign_out().await.is_ok());
    assert!(
        storage
            .get(REFRESH_COOKIES_STORAGE_KEY)
            .await
            .ok()
            .flatten()
            .is_none()
    );

    let second = wiring_on(base_url, server.clone(), storage).await;
    let result = second.repository.list_roles(tenant()).await;

    assert!(matches!(result, Err(AppError::Unauthorized(_))));
    assert_eq!(server.refresh_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn client_without_refresh_cookie_must_sign_in() {
    let wiring = wiring().await;

    let result = wiring.repository.list_roles(tenant()).await;

    assert!(matches!(result, Err(AppError::Unauthorized(_))));
    assert_eq!(wiring.server.refresh_calls.load(Ordering::SeqCst), 1);
    assert!(wiring.notifier.was_triggered());
    assert!(
        wiring
            .storage
            .get(REFRESH_COOKIES_STORAGE_KEY)
            .await
            .ok()
            .flatten()
            .is_none()
    );
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let wiring = wiring().await;

    let result = wiring
        .sessions
        .sign_in(SignInRequest {
            email: "alice@example.com".to_owned(),
            password: "hunter2".to_owned(),
            platform: "cli".to_owned(),
        })
        .await;

    assert!(matches!(result, Err(AppError::Unauthorized(_))));
    assert!(!wiring.store.is_authenticated().await);
}
