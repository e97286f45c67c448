use serde::{Deserialize, Serialize};

use crate::Panel;

/// Tenant-wide feature flags that shape role enforcement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TenantSettings {
    /// Roles are enforced at all. When false every actor behaves as owner.
    pub roles_enabled: bool,
    /// Opening reports asks for the password again.
    pub reports_require_password: bool,
    /// Opening settings asks for the password again.
    pub settings_require_password: bool,
    /// Switching the selected role asks for the password.
    pub role_switch_requires_password: bool,
}

/// Names one tenant feature flag for feature-gated controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenantFeature {
    /// Role management and role switching.
    Roles,
    /// Password re-entry before reports.
    ReportsPassword,
    /// Password re-entry before settings.
    SettingsPassword,
    /// Password before switching roles.
    RoleSwitchPassword,
}

impl TenantSettings {
    /// Returns whether `feature` is switched on.
    #[must_use]
    pub fn is_enabled(&self, feature: TenantFeature) -> bool {
        match feature {
            TenantFeature::Roles => self.roles_enabled,
            TenantFeature::ReportsPassword => self.reports_require_password,
            TenantFeature::SettingsPassword => self.settings_require_password,
            TenantFeature::RoleSwitchPassword => self.role_switch_requires_password,
        }
    }

    /// Returns whether opening `panel` requires re-entering the password.
    #[must_use]
    pub fn requires_password_for(&self, panel: Panel) -> bool {
        match panel {
            Panel::Reports => self.reports_require_password,
            Panel::Settings => self.settings_require_password,
            _ => false,
        }
    }
}
