use std::fmt::{Debug, Formatter};

use orderdesk_core::{AppError, AppResult, NonEmptyString, TenantId};
use serde::{Deserialize, Serialize};

/// Identifier of one authenticated session at the identity authority.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(NonEmptyString);

impl SessionId {
    /// Creates a validated session identifier.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        Ok(Self(NonEmptyString::new(value)?))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// Opaque bearer credential attached to outbound requests.
///
/// The raw value never appears in `Debug` output.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BearerCredential(String);

impl BearerCredential {
    /// Wraps a raw credential string.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(AppError::Validation(
                "bearer credential must not be empty".to_owned(),
            ));
        }

        Ok(Self(value))
    }

    /// Returns the raw credential for the `Authorization` header.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.as_str()
    }
}

impl Debug for BearerCredential {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str("BearerCredential(<redacted>)")
    }
}

/// Signed-in user decoded from a verified bearer credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    subject: NonEmptyString,
    display_name: String,
    email: Option<String>,
    tenant_id: TenantId,
}

impl SessionUser {
    /// Builds the user from credential claims.
    ///
    /// A blank email is dropped. A blank display name falls back to the
    /// email, then to the subject.
    pub fn from_claims(
        subject: impl Into<String>,
        display_name: impl Into<String>,
        email: Option<String>,
        tenant_id: TenantId,
    ) -> AppResult<Self> {
        let subject = NonEmptyString::new(subject)?;
        let email = email
            .map(|email| email.trim().to_owned())
            .filter(|email| !email.is_empty());
        let display_name = display_name.into().trim().to_owned();
        let display_name = if display_name.is_empty() {
            email
                .clone()
                .unwrap_or_else(|| subject.as_str().to_owned())
        } else {
            display_name
        };

        Ok(Self {
            subject,
            display_name,
            email,
            tenant_id,
        })
    }

    /// Returns the user id issued by the identity authority.
    #[must_use]
    pub fn subject(&self) -> &str {
        self.subject.as_str()
    }

    /// Returns the name shown for the user.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.display_name.as_str()
    }

    /// Returns the email, if the credential carried one.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// Returns the tenant product the user signed in to.
    #[must_use]
    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

/// The authenticated actor together with its current bearer credential.
///
/// Sessions are immutable. Renewal builds a new value and replaces the old
/// one wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    identity: SessionUser,
    session_id: SessionId,
    credential: BearerCredential,
}

impl Session {
    /// Creates a session from verified credential claims.
    #[must_use]
    pub fn new(identity: SessionUser, session_id: SessionId, credential: BearerCredential) -> Self {
        Self {
            identity,
            session_id,
            credential,
        }
    }

    /// Returns the signed-in user.
    #[must_use]
    pub fn identity(&self) -> &SessionUser {
        &self.identity
    }

    /// Returns the session identifier.
    #[must_use]
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Returns the bearer credential.
    #[must_use]
    pub fn credential(&self) -> &BearerCredential {
        &self.credential
    }

    /// Returns the tenant product the session belongs to.
    #[must_use]
    pub fn tenant_id(&self) -> TenantId {
        self.identity.tenant_id()
    }
}
