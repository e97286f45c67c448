use async_trait::async_trait;
use orderdesk_core::{AppResult, TenantId};
use orderdesk_domain::{Role, Subscription, TenantSettings};

/// Read port over the remote data store for access-policy inputs.
#[async_trait]
pub trait WorkspaceRepository: Send + Sync {
    /// Returns the tenant's subscription, if one exists.
    async fn find_subscription(&self, tenant_id: TenantId) -> AppResult<Option<Subscription>>;

    /// Lists the roles defined by the tenant.
    async fn list_roles(&self, tenant_id: TenantId) -> AppResult<Vec<Role>>;

    /// Returns the tenant's feature flags, if configured.
    async fn find_tenant_settings(&self, tenant_id: TenantId) -> AppResult<Option<TenantSettings>>;
}

/// Policy inputs loaded at workspace initialization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkspaceSnapshot {
    /// Subscription snapshot.
    pub subscription: Option<Subscription>,
    /// Tenant roles.
    pub roles: Vec<Role>,
    /// Tenant settings.
    pub settings: Option<TenantSettings>,
}
