use std::sync::Arc;

use orderdesk_application::{
    CredentialStore, DeviceStateService, KeyValueStore, RenewalCoordinator, RenewalPolicy,
    SessionService, WorkspaceAccessService,
};
use orderdesk_core::{AppError, AppResult};
use orderdesk_domain::RouteGateConfig;
use orderdesk_infrastructure::{
    HttpSessionAuthority, HttpWorkspaceRepository, JsonFileKeyValueStore, JwtCredentialVerifier,
    PersistentCookieJar, ReqwestHttpTransport, TracingReauthenticationNotifier, build_http_client,
};

use crate::client_config::ClientConfig;

pub struct ClientServices {
    pub sessions: SessionService,
    pub coordinator: RenewalCoordinator,
    pub workspace: WorkspaceAccessService,
    pub device_state: DeviceStateService,
    pub notifier: Arc<TracingReauthenticationNotifier>,
    pub platform: String,
}

pub async fn build_services(config: &ClientConfig) -> AppResult<ClientServices> {
    let public_key = tokio::fs::read(&config.token_public_key_path)
        .await
        .map_err(|error| {
            AppError::Validation(format!(
                "failed to read ORDERDESK_TOKEN_PUBLIC_KEY_PATH '{}': {error}",
                config.token_public_key_path.display()
            ))
        })?;
    let verifier = Arc::new(JwtCredentialVerifier::from_rsa_pem(
        public_key.as_slice(),
        config.token_issuer.as_str(),
        config.token_audience.as_str(),
    )?);

    let storage: Arc<dyn KeyValueStore> =
        Arc::new(JsonFileKeyValueStore::new(config.state_file.clone()));
    let store = CredentialStore::new(storage.clone());
    let cookies = Arc::new(PersistentCookieJar::new(storage.clone()));
    cookies.restore().await?;
    let device_state = DeviceStateService::new(storage);

    let http_client = build_http_client(config.http_timeout, cookies.clone())?;
    let authority = Arc::new(HttpSessionAuthority::new(
        http_client.clone(),
        config.api_base_url.clone(),
        cookies,
    ));
    let transport = Arc::new(ReqwestHttpTransport::new(
        http_client,
        config.api_base_url.clone(),
    ));
    let notifier = Arc::new(TracingReauthenticationNotifier::new());

    let coordinator = RenewalCoordinator::new(
        transport,
        authority.clone(),
        verifier.clone(),
        store.clone(),
        notifier.clone(),
        RenewalPolicy {
            renewal_timeout: config.renewal_timeout,
            ..RenewalPolicy::default()
        },
    );

    let sessions = SessionService::new(authority, verifier, store);
    sessions.restore().await?;

    let workspace = WorkspaceAccessService::new(
        Arc::new(HttpWorkspaceRepository::new(coordinator.clone())),
        device_state.clone(),
        RouteGateConfig::subscription_default()?,
    );

    Ok(ClientServices {
        sessions,
        coordinator,
        workspace,
        device_state,
        notifier,
        platform: config.platform.clone(),
    })
}
