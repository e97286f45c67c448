//! Application services and ports.

#![forbid(unsafe_code)]

mod credential_store;
mod device_state_service;
mod renewal_coordinator;
mod session_ports;
mod session_service;
mod workspace_access_service;
mod workspace_ports;

#[cfg(test)]
mod test_fakes;

pub use credential_store::{CredentialStore, SESSION_STORAGE_KEY};
pub use device_state_service::{
    DeviceStateService, PWA_PROMPT_STORAGE_KEY, SELECTED_ROLE_STORAGE_KEY,
};
pub use renewal_coordinator::{RenewalCoordinator, RenewalPolicy};
pub use session_ports::{
    CredentialPolicy, CredentialVerifier, HttpTransport, KeyValueStore, OutboundRequest,
    ReauthenticationNotifier, SessionAuthority, SignInRequest, TransportResponse,
};
pub use session_service::SessionService;
pub use workspace_access_service::{NavigationDecision, WorkspaceAccessService};
pub use workspace_ports::{WorkspaceRepository, WorkspaceSnapshot};
