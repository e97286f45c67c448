mod authority;
mod storage;
mod transport;

pub use authority::{CredentialVerifier, ReauthenticationNotifier, SessionAuthority, SignInRequest};
pub use storage::KeyValueStore;
pub use transport::{CredentialPolicy, HttpTransport, OutboundRequest, TransportResponse};
