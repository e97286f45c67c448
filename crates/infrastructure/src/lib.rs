//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod api_base_url;
mod http_session_authority;
mod http_workspace_repository;
mod in_memory_key_value_store;
mod json_file_key_value_store;
mod jwt_credential_verifier;
mod persistent_cookie_jar;
mod reqwest_http_transport;
mod tracing_reauthentication_notifier;

#[cfg(test)]
mod test_server;

pub use api_base_url::ApiBaseUrl;
pub use http_session_authority::HttpSessionAuthority;
pub use http_workspace_repository::HttpWorkspaceRepository;
pub use in_memory_key_value_store::InMemoryKeyValueStore;
pub use json_file_key_value_store::JsonFileKeyValueStore;
pub use jwt_credential_verifier::{JwtCredentialVerifier, SessionClaims};
pub use persistent_cookie_jar::{PersistentCookieJar, REFRESH_COOKIES_STORAGE_KEY};
pub use reqwest_http_transport::{ReqwestHttpTransport, build_http_client};
pub use tracing_reauthentication_notifier::TracingReauthenticationNotifier;
