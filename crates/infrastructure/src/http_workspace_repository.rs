use async_trait::async_trait;
use http::StatusCode;
use orderdesk_application::{OutboundRequest, RenewalCoordinator, WorkspaceRepository};
use orderdesk_core::{AppResult, TenantId};
use orderdesk_domain::{Role, Subscription, TenantSettings};
use tracing::debug;

/// Workspace reads over the remote API, sent through the renewal pipeline.
#[derive(Clone)]
pub struct HttpWorkspaceRepository {
    coordinator: RenewalCoordinator,
}

impl HttpWorkspaceRepository {
    /// Creates a repository that sends through `coordinator`.
    #[must_use]
    pub fn new(coordinator: RenewalCoordinator) -> Self {
        Self { coordinator }
    }

    fn target(resource: &str, tenant_id: TenantId) -> String {
        format!("api/workspace/{resource}?product_id={tenant_id}")
    }
}

#[async_trait]
impl WorkspaceRepository for HttpWorkspaceRepository {
    async fn find_subscription(&self, tenant_id: TenantId) -> AppResult<Option<Subscription>> {
        let response = self
            .coordinator
            .send(OutboundRequest::get(Self::target("subscription", tenant_id)))
            .await?;

        if response.status == StatusCode::NOT_FOUND {
            debug!(tenant_id = %tenant_id, "tenant has no subscription");
            return Ok(None);
        }

        response.json()
    }

    async fn list_roles(&self, tenant_id: TenantId) -> AppResult<Vec<Role>> {
        self.coordinator
            .send(OutboundRequest::get(Self::target("roles", tenant_id)))
            .await?
            .json()
    }

    async fn find_tenant_settings(&self, tenant_id: TenantId) -> AppResult<Option<TenantSettings>> {
        let response = self
            .coordinator
            .send(OutboundRequest::get(Self::target("settings", tenant_id)))
            .await?;

        if response.status == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        response.json()
    }
}

#[cfg(test)]
mod tests;
