use std::sync::Arc;

use async_trait::async_trait;
use orderdesk_application::{SessionAuthority, SignInRequest};
use orderdesk_core::{AppError, AppResult};
use orderdesk_domain::BearerCredential;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{ApiBaseUrl, PersistentCookieJar};

const SIGN_IN_PATH: &str = "auth/sign-in";
const REFRESH_PATH: &str = "auth/refresh";

#[derive(Debug, Serialize)]
struct SignInBody<'a> {
    email: &'a str,
    password: &'a str,
    platform: &'a str,
}

#[derive(Debug, Deserialize)]
struct AccessTokenBody {
    access_token: String,
}

/// Identity authority reached over HTTP.
///
/// Renewal relies on the refresh cookie kept in `cookies`, which must be the
/// cookie store of `http_client`. Renewal never goes through the renewal
/// pipeline. The cookies are persisted after every issued credential.
pub struct HttpSessionAuthority {
    http_client: reqwest::Client,
    base_url: ApiBaseUrl,
    cookies: Arc<PersistentCookieJar>,
}

impl HttpSessionAuthority {
    /// Creates an authority client rooted at `base_url`.
    #[must_use]
    pub fn new(
        http_client: reqwest::Client,
        base_url: ApiBaseUrl,
        cookies: Arc<PersistentCookieJar>,
    ) -> Self {
        Self {
            http_client,
            base_url,
            cookies,
        }
    }

    async fn issue(
        &self,
        builder: reqwest::RequestBuilder,
        operation: &str,
        rejection: &str,
    ) -> AppResult<BearerCredential> {
        let response = builder.send().await.map_err(|error| {
            AppError::Internal(format!("{operation} transport error: {error}"))
        })?;

        let status = response.status();
        debug!(operation, status = status.as_u16(), "authority response");

        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            return Err(AppError::Unauthorized(rejection.to_owned()));
        }
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<response body unavailable>".to_owned());
            return Err(AppError::Internal(format!(
                "{operation} failed with status {status}: {body}"
            )));
        }

        let body = response.json::<AccessTokenBody>().await.map_err(|error| {
            AppError::Internal(format!("{operation} returned an invalid body: {error}"))
        })?;
        let credential = BearerCredential::new(body.access_token)?;

        self.cookies.persist().await?;
        Ok(credential)
    }
}

#[async_trait]
impl SessionAuthority for HttpSessionAuthority {
    async fn sign_in(&self, request: &SignInRequest) -> AppResult<BearerCredential> {
        let url = self.base_url.join(SIGN_IN_PATH)?;
        let builder = self.http_client.post(url).json(&SignInBody {
            email: request.email.as_str(),
            password: request.password.as_str(),
            platform: request.platform.as_str(),
        });

        self.issue(builder, "sign-in", "invalid email or password")
            .await
    }

    async fn renew(&self) -> AppResult<BearerCredential> {
        let url = self.base_url.join(REFRESH_PATH)?;
        let builder = self.http_client.post(url);

        self.issue(builder, "credential renewal", "refresh credential was rejected")
            .await
    }

    async fn discard_refresh_credential(&self) -> AppResult<()> {
        self.cookies.clear().await
    }
}
