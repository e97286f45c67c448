//! Sign-in, restore and sign-out flows.

use std::sync::Arc;

use orderdesk_core::{AppError, AppResult};
use orderdesk_domain::Session;
use tracing::info;

use crate::{CredentialStore, CredentialVerifier, SessionAuthority, SignInRequest};

/// Application service for session lifecycle operations.
#[derive(Clone)]
pub struct SessionService {
    authority: Arc<dyn SessionAuthority>,
    verifier: Arc<dyn CredentialVerifier>,
    store: CredentialStore,
}

impl SessionService {
    /// Creates a new session service.
    #[must_use]
    pub fn new(
        authority: Arc<dyn SessionAuthority>,
        verifier: Arc<dyn CredentialVerifier>,
        store: CredentialStore,
    ) -> Self {
        Self {
            authority,
            verifier,
            store,
        }
    }

    /// Exchanges account credentials for a verified session and stores it.
    pub async fn sign_in(&self, request: SignInRequest) -> AppResult<Session> {
        let request = SignInRequest {
            email: request.email.trim().to_owned(),
            ..request
        };
        if request.email.is_empty() {
            return Err(AppError::Validation("email must not be empty".to_owned()));
        }
        if request.password.is_empty() {
            return Err(AppError::Validation("password must not be empty".to_owned()));
        }

        let credential = self.authority.sign_in(&request).await?;
        let session = self.verifier.verify(&credential)?;
        self.store.replace(session.clone()).await?;

        info!(
            subject = %session.identity().subject(),
            tenant_id = %session.tenant_id(),
            platform = %request.platform,
            "signed in"
        );
        Ok(session)
    }

    /// Re-checks the signed-in user's password before a sensitive action.
    ///
    /// A successful check rotates the session to the freshly issued credential.
    pub async fn confirm_password(&self, password: &str, platform: &str) -> AppResult<()> {
        let Some(session) = self.store.current().await else {
            return Err(AppError::Unauthorized("no active session".to_owned()));
        };
        let Some(email) = session.identity().email() else {
            return Err(AppError::Validation(
                "session carries no email to confirm against".to_owned(),
            ));
        };

        self.sign_in(SignInRequest {
            email: email.to_owned(),
            password: password.to_owned(),
            platform: platform.to_owned(),
        })
        .await
        .map(|_| ())
    }

    /// Reloads the persisted session, if any.
    pub async fn restore(&self) -> AppResult<Option<Session>> {
        let restored = self.store.restore().await?;
        if let Some(session) = &restored {
            info!(subject = %session.identity().subject(), "restored persisted session");
        }

        Ok(restored)
    }

    /// Purges the current session and its refresh credential.
    pub async fn sign_out(&self) -> AppResult<()> {
        let previous = self.store.current().await;
        self.store.clear().await?;
        self.authority.discard_refresh_credential().await?;

        if let Some(session) = previous {
            info!(subject = %session.identity().subject(), "signed out");
        }

        Ok(())
    }

    /// Returns the current session.
    pub async fn current_session(&self) -> Option<Session> {
        self.store.current().await
    }
}
