use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use orderdesk_application::CredentialVerifier;
use orderdesk_core::{AppError, AppResult, TenantId};
use orderdesk_domain::{BearerCredential, Session, SessionId, SessionUser};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Claims carried by the access credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Server-side session id.
    pub sid: String,
    /// Stable user subject.
    pub sub: String,
    /// Display name.
    pub name: String,
    /// Account email.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Tenant (product) the session is bound to.
    pub product_id: Uuid,
    /// Issuing authority.
    pub iss: String,
    /// Intended audience.
    pub aud: String,
    /// Expiry, seconds since the epoch.
    pub exp: u64,
    /// Issue time, seconds since the epoch.
    pub iat: u64,
}

/// Verifies RS256 access credentials and decodes them into sessions.
pub struct JwtCredentialVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtCredentialVerifier {
    /// Creates a verifier from a PEM-encoded RSA public key.
    pub fn from_rsa_pem(public_key_pem: &[u8], issuer: &str, audience: &str) -> AppResult<Self> {
        let decoding_key = DecodingKey::from_rsa_pem(public_key_pem).map_err(|error| {
            AppError::Validation(format!("invalid credential verification key: {error}"))
        })?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[issuer]);
        validation.set_audience(&[audience]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.leeway = 0;

        Ok(Self {
            decoding_key,
            validation,
        })
    }
}

impl CredentialVerifier for JwtCredentialVerifier {
    fn verify(&self, credential: &BearerCredential) -> AppResult<Session> {
        let claims = jsonwebtoken::decode::<SessionClaims>(
            credential.expose(),
            &self.decoding_key,
            &self.validation,
        )
        .map_err(|error| AppError::Unauthorized(format!("credential rejected: {error}")))?
        .claims;

        let identity = SessionUser::from_claims(
            claims.sub,
            claims.name,
            claims.email,
            TenantId::from_uuid(claims.product_id),
        )?;

        Ok(Session::new(
            identity,
            SessionId::new(claims.sid)?,
            credential.clone(),
        ))
    }
}
