use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::jwt_credential_verifier::SessionClaims;
use crate::{ApiBaseUrl, JwtCredentialVerifier};

const SIGNING_KEY: &str = include_str!("jwt_credential_verifier/test_signing_key.pem");
const VERIFYING_KEY: &str = include_str!("jwt_credential_verifier/test_verifying_key.pem");
const ISSUER: &str = "https://auth.orderdesk.test";
const AUDIENCE: &str = "orderdesk-client";
const REFRESH_COOKIE: &str = "orderdesk_refresh=r-7c1e";

pub(crate) fn product_id() -> Uuid {
    Uuid::from_u128(0x7a3c_0000_0000_4000_8000_0000_0000_0042)
}

pub(crate) fn verifier() -> JwtCredentialVerifier {
    JwtCredentialVerifier::from_rsa_pem(VERIFYING_KEY.as_bytes(), ISSUER, AUDIENCE)
        .unwrap_or_else(|_| unreachable!())
}

#[derive(Default)]
pub(crate) struct ServerState {
    accepted_token: Mutex<Option<String>>,
    issued: AtomicUsize,
    pub(crate) refresh_calls: AtomicUsize,
}

impl ServerState {
    /// Stops accepting the current access token, as if it expired.
    pub(crate) async fn expire_access_token(&self) {
        *self.accepted_token.lock().await = None;
    }

    async fn issue_token(&self) -> String {
        let sequence = self.issued.fetch_add(1, Ordering::SeqCst);
        let now = jsonwebtoken::get_current_timestamp();
        let claims = SessionClaims {
            sid: format!("sess-{sequence}"),
            sub: "user-1".to_owned(),
            name: "Alice Baker".to_owned(),
            email: Some("alice@example.com".to_owned()),
            product_id: product_id(),
            iss: ISSUER.to_owned(),
            aud: AUDIENCE.to_owned(),
            exp: now.saturating_add(600),
            iat: now,
        };
        let key =
            EncodingKey::from_rsa_pem(SIGNING_KEY.as_bytes()).unwrap_or_else(|_| unreachable!());
        let token = jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &key)
            .unwrap_or_else(|_| unreachable!());

        *self.accepted_token.lock().await = Some(token.clone());
        token
    }

    async fn authorized(&self, headers: &HeaderMap) -> bool {
        let presented = headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "));

        match (presented, self.accepted_token.lock().await.as_deref()) {
            (Some(presented), Some(accepted)) => presented == accepted,
            _ => false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SignInPayload {
    email: String,
    password: String,
    platform: String,
}

async fn sign_in(State(state): State<Arc<ServerState>>, Json(payload): Json<SignInPayload>) -> Response {
    if payload.email != "alice@example.com"
        || payload.password != "correct horse"
        || payload.platform.is_empty()
    {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "message": "invalid credentials" })))
            .into_response();
    }

    let token = state.issue_token().await;
    (
        [(header::SET_COOKIE, format!("{REFRESH_COOKIE}; Path=/; HttpOnly"))],
        Json(json!({ "access_token": token })),
    )
        .into_response()
}

async fn refresh(State(state): State<Arc<ServerState>>, headers: HeaderMap) -> Response {
    state.refresh_calls.fetch_add(1, Ordering::SeqCst);
    let has_cookie = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .any(|value| value.split("; ").any(|cookie| cookie == REFRESH_COOKIE));
    if !has_cookie {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let token = state.issue_token().await;
    Json(json!({ "access_token": token })).into_response()
}

async fn subscription(State(state): State<Arc<ServerState>>, headers: HeaderMap) -> Response {
    if !state.authorized(&headers).await {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "message": "token expired" })))
            .into_response();
    }

    Json(json!({
        "status": "active",
        "plan_id": "bakery-pro",
        "started_at": "2025-01-01T00:00:00Z",
        "expires_at": "2099-01-01T00:00:00Z",
        "is_trial": false
    }))
    .into_response()
}

async fn roles(State(state): State<Arc<ServerState>>, headers: HeaderMap) -> Response {
    if !state.authorized(&headers).await {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    Json(json!([{
        "id": "0b4f5a52-6a64-4bc4-9a25-3f1f0f0c2a11",
        "name": "Counter staff",
        "can_access_dashboard": true,
        "can_access_orders": true,
        "can_create_orders": true
    }]))
    .into_response()
}

async fn settings(State(state): State<Arc<ServerState>>, headers: HeaderMap) -> Response {
    if !state.authorized(&headers).await {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    StatusCode::NOT_FOUND.into_response()
}

/// Serves a minimal identity authority and workspace API on a random port.
pub(crate) async fn spawn() -> (ApiBaseUrl, Arc<ServerState>) {
    let state = Arc::new(ServerState::default());
    let router = Router::new()
        .route("/auth/sign-in", post(sign_in))
        .route("/auth/refresh", post(refresh))
        .route("/api/workspace/subscription", get(subscription))
        .route("/api/workspace/roles", get(roles))
        .route("/api/workspace/settings", get(settings))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
        .await
        .unwrap_or_else(|_| unreachable!());
    let address = listener.local_addr().unwrap_or_else(|_| unreachable!());
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });

    let base_url = ApiBaseUrl::parse(format!("http://{address}").as_str())
        .unwrap_or_else(|_| unreachable!());
    (base_url, state)
}
