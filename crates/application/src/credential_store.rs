//! Single source of truth for the signed-in session.

use std::sync::Arc;

use orderdesk_core::{AppError, AppResult};
use orderdesk_domain::{BearerCredential, Session};
use tokio::sync::RwLock;
use tracing::warn;

use crate::KeyValueStore;

/// Storage key holding the serialized session.
pub const SESSION_STORAGE_KEY: &str = "session";

/// Holds the current session in memory and in durable storage.
///
/// Readers always see either the previous or the next session, never a mix:
/// sessions are replaced wholesale.
#[derive(Clone)]
pub struct CredentialStore {
    storage: Arc<dyn KeyValueStore>,
    current: Arc<RwLock<Option<Session>>>,
}

impl CredentialStore {
    /// Creates an empty store over `storage`. Call [`Self::restore`] to load
    /// a persisted session.
    #[must_use]
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self {
            storage,
            current: Arc::new(RwLock::new(None)),
        }
    }

    /// Loads the persisted session into memory.
    ///
    /// An unreadable entry is discarded and treated as signed out.
    pub async fn restore(&self) -> AppResult<Option<Session>> {
        let restored = match self.storage.get(SESSION_STORAGE_KEY).await? {
            Some(raw) => match serde_json::from_str::<Session>(raw.as_str()) {
                Ok(session) => Some(session),
                Err(error) => {
                    warn!(error = %error, "discarding unreadable persisted session");
                    self.storage.remove(SESSION_STORAGE_KEY).await?;
                    None
                }
            },
            None => None,
        };

        *self.current.write().await = restored.clone();
        Ok(restored)
    }

    /// Returns the current session.
    pub async fn current(&self) -> Option<Session> {
        self.current.read().await.clone()
    }

    /// Returns the current bearer credential.
    pub async fn credential(&self) -> Option<BearerCredential> {
        self.current
            .read()
            .await
            .as_ref()
            .map(|session| session.credential().clone())
    }

    /// Returns whether a session exists.
    pub async fn is_authenticated(&self) -> bool {
        self.current.read().await.is_some()
    }

    /// Persists `session` and makes it current.
    pub async fn replace(&self, session: Session) -> AppResult<()> {
        let encoded = serde_json::to_string(&session)
            .map_err(|error| AppError::Internal(format!("failed to encode session: {error}")))?;
        self.storage.set(SESSION_STORAGE_KEY, encoded).await?;
        *self.current.write().await = Some(session);
        Ok(())
    }

    /// Forgets the session in memory and in storage.
    pub async fn clear(&self) -> AppResult<()> {
        *self.current.write().await = None;
        self.storage.remove(SESSION_STORAGE_KEY).await
    }
}
