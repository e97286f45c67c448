use std::fmt::{Debug, Formatter};

use async_trait::async_trait;
use orderdesk_core::AppResult;
use orderdesk_domain::{BearerCredential, Session};

/// Credentials submitted on sign-in.
#[derive(Clone, PartialEq, Eq)]
pub struct SignInRequest {
    /// Account email.
    pub email: String,
    /// Account password.
    pub password: String,
    /// Device or platform label reported to the authority.
    pub platform: String,
}

impl Debug for SignInRequest {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("SignInRequest")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("platform", &self.platform)
            .finish()
    }
}

/// External identity authority that issues bearer credentials.
#[async_trait]
pub trait SessionAuthority: Send + Sync {
    /// Exchanges account credentials for a bearer credential.
    async fn sign_in(&self, request: &SignInRequest) -> AppResult<BearerCredential>;

    /// Obtains a new bearer credential using the out-of-band refresh cookie.
    ///
    /// Implementations must not route this call through the renewal
    /// pipeline.
    async fn renew(&self) -> AppResult<BearerCredential>;

    /// Forgets the refresh credential so no later renewal can succeed.
    async fn discard_refresh_credential(&self) -> AppResult<()>;
}

/// Verifies and decodes bearer credentials.
pub trait CredentialVerifier: Send + Sync {
    /// Verifies signature, issuer, audience and expiry, then decodes the session.
    fn verify(&self, credential: &BearerCredential) -> AppResult<Session>;
}

/// Receives the signal that the user must sign in again.
pub trait ReauthenticationNotifier: Send + Sync {
    /// Redirects to sign-in. Called after the session has been purged.
    fn require_sign_in(&self, reason: &str);
}
