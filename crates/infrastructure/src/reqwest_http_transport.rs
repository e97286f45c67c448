use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use orderdesk_application::{HttpTransport, OutboundRequest, TransportResponse};
use orderdesk_core::{AppError, AppResult};
use orderdesk_domain::BearerCredential;
use serde_json::Value;
use tracing::debug;

use crate::{ApiBaseUrl, PersistentCookieJar};

/// Builds the HTTP client shared by the transport and the session authority.
///
/// `cookies` carries the refresh credential between sign-in and renewal
/// calls, so both adapters must use the same client.
pub fn build_http_client(
    timeout: Duration,
    cookies: Arc<PersistentCookieJar>,
) -> AppResult<reqwest::Client> {
    reqwest::Client::builder()
        .cookie_provider(cookies)
        .timeout(timeout)
        .build()
        .map_err(|error| AppError::Internal(format!("failed to build HTTP client: {error}")))
}

/// `reqwest`-based implementation of the outbound API transport.
pub struct ReqwestHttpTransport {
    http_client: reqwest::Client,
    base_url: ApiBaseUrl,
}

impl ReqwestHttpTransport {
    /// Creates a transport rooted at `base_url`.
    #[must_use]
    pub fn new(http_client: reqwest::Client, base_url: ApiBaseUrl) -> Self {
        Self {
            http_client,
            base_url,
        }
    }
}

#[async_trait]
impl HttpTransport for ReqwestHttpTransport {
    async fn send(
        &self,
        request: &OutboundRequest,
        credential: Option<&BearerCredential>,
    ) -> AppResult<TransportResponse> {
        let url = self.base_url.join(request.target.as_str())?;
        let mut builder = self.http_client.request(request.method.clone(), url);

        if let Some(credential) = credential {
            builder = builder.bearer_auth(credential.expose());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|error| {
            AppError::Internal(format!(
                "{} {} transport error: {error}",
                request.method, request.target
            ))
        })?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(|error| {
            AppError::Internal(format!(
                "failed to read response body of {} {}: {error}",
                request.method, request.target
            ))
        })?;

        debug!(
            method = %request.method,
            request_target = %request.target,
            status = status.as_u16(),
            "api response"
        );

        Ok(TransportResponse::new(status, decode_body(bytes.as_ref())))
    }
}

/// Decodes a response body as JSON, keeping non-JSON text as a string.
pub(crate) fn decode_body(bytes: &[u8]) -> Option<Value> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return None;
    }

    serde_json::from_slice(bytes)
        .ok()
        .or_else(|| Some(Value::String(String::from_utf8_lossy(bytes).into_owned())))
}
