use async_trait::async_trait;
use http::{Method, StatusCode};
use orderdesk_core::{AppError, AppResult};
use orderdesk_domain::BearerCredential;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Whether an outbound request carries the session credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialPolicy {
    /// Attach the current bearer credential and renew it on rejection.
    Attach,
    /// Send anonymously; authorization failures are returned as-is.
    Omit,
}

/// Description of one outbound API request.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundRequest {
    /// HTTP method.
    pub method: Method,
    /// Target path relative to the API base URL.
    pub target: String,
    /// Optional JSON body.
    pub body: Option<Value>,
    /// Credential handling.
    pub credential: CredentialPolicy,
}

impl OutboundRequest {
    /// Creates a credentialed request.
    #[must_use]
    pub fn new(method: Method, target: impl Into<String>) -> Self {
        Self {
            method,
            target: target.into(),
            body: None,
            credential: CredentialPolicy::Attach,
        }
    }

    /// Creates a credentialed `GET` request.
    #[must_use]
    pub fn get(target: impl Into<String>) -> Self {
        Self::new(Method::GET, target)
    }

    /// Creates a credentialed `POST` request with a JSON body.
    #[must_use]
    pub fn post(target: impl Into<String>, body: Value) -> Self {
        Self::new(Method::POST, target).with_body(body)
    }

    /// Sets the JSON body.
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Marks the request as not requiring a credential.
    #[must_use]
    pub fn without_credential(mut self) -> Self {
        self.credential = CredentialPolicy::Omit;
        self
    }
}

/// Response returned by the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    /// HTTP status.
    pub status: StatusCode,
    /// Parsed JSON body, absent for empty bodies.
    pub body: Option<Value>,
}

impl TransportResponse {
    /// Creates a response.
    #[must_use]
    pub fn new(status: StatusCode, body: Option<Value>) -> Self {
        Self { status, body }
    }

    /// Returns whether the credential was rejected.
    #[must_use]
    pub fn is_authorization_failure(&self) -> bool {
        self.status == StatusCode::UNAUTHORIZED
    }

    /// Decodes a successful JSON body into `T`.
    pub fn json<T: DeserializeOwned>(self) -> AppResult<T> {
        if !self.status.is_success() {
            return Err(self.into_error());
        }

        serde_json::from_value(self.body.unwrap_or(Value::Null)).map_err(|error| {
            AppError::Internal(format!("failed to decode response body: {error}"))
        })
    }

    /// Converts a non-success response into the matching error category.
    #[must_use]
    pub fn into_error(self) -> AppError {
        let detail = self
            .body
            .as_ref()
            .and_then(|body| body.get("message"))
            .and_then(Value::as_str)
            .map(str::to_owned)
            .unwrap_or_else(|| format!("request failed with status {}", self.status.as_u16()));

        match self.status {
            StatusCode::UNAUTHORIZED => AppError::Unauthorized(detail),
            StatusCode::FORBIDDEN => AppError::Forbidden(detail),
            StatusCode::NOT_FOUND => AppError::NotFound(detail),
            StatusCode::CONFLICT => AppError::Conflict(detail),
            status if status.is_client_error() => AppError::Validation(detail),
            _ => AppError::Internal(detail),
        }
    }
}

/// Sends requests to the remote API.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Sends `request`, attaching `credential` as a bearer token when given.
    ///
    /// Non-success statuses are returned as responses; only transport-level
    /// failures are errors.
    async fn send(
        &self,
        request: &OutboundRequest,
        credential: Option<&BearerCredential>,
    ) -> AppResult<TransportResponse>;
}
