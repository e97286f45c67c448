use std::str::FromStr;
use std::sync::Arc;

use orderdesk_core::AppResult;
use orderdesk_domain::RoleSelection;
use tracing::warn;

use crate::KeyValueStore;

/// Storage key holding the device's selected role pointer.
pub const SELECTED_ROLE_STORAGE_KEY: &str = "selected_role";

/// Storage key recording that the install prompt was shown.
pub const PWA_PROMPT_STORAGE_KEY: &str = "pwa_prompt_shown";

/// Device-scoped preferences that outlive any one session.
#[derive(Clone)]
pub struct DeviceStateService {
    storage: Arc<dyn KeyValueStore>,
}

impl DeviceStateService {
    /// Creates the service over `storage`.
    #[must_use]
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self { storage }
    }

    /// Returns the persisted role selection.
    pub async fn selected_role(&self) -> AppResult<Option<RoleSelection>> {
        let Some(raw) = self.storage.get(SELECTED_ROLE_STORAGE_KEY).await? else {
            return Ok(None);
        };

        match RoleSelection::from_str(raw.as_str()) {
            Ok(selection) => Ok(Some(selection)),
            Err(error) => {
                warn!(error = %error, "ignoring unreadable selected role pointer");
                Ok(None)
            }
        }
    }

    /// Persists `selection` for this device.
    pub async fn set_selected_role(&self, selection: RoleSelection) -> AppResult<()> {
        self.storage
            .set(SELECTED_ROLE_STORAGE_KEY, selection.to_storage_value())
            .await
    }

    /// Removes the persisted role selection.
    pub async fn clear_selected_role(&self) -> AppResult<()> {
        self.storage.remove(SELECTED_ROLE_STORAGE_KEY).await
    }

    /// Returns whether the install prompt was already shown on this device.
    pub async fn pwa_prompt_shown(&self) -> AppResult<bool> {
        Ok(self
            .storage
            .get(PWA_PROMPT_STORAGE_KEY)
            .await?
            .is_some_and(|value| value == "true"))
    }

    /// Records that the install prompt was shown.
    pub async fn mark_pwa_prompt_shown(&self) -> AppResult<()> {
        self.storage
            .set(PWA_PROMPT_STORAGE_KEY, "true".to_owned())
            .await
    }
}
