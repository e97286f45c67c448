//! Composes the subscription gate, role gate and password re-entry into
//! navigation decisions for the signed-in workspace.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use orderdesk_core::{AppError, AppResult, TenantId};
use orderdesk_domain::{
    Actor, GateDecision, Panel, RoleGate, RoleGateContext, RoleGateRequest, RoleSelection,
    RouteGate, RouteGateConfig, RouteGateInput, SubscriptionLifecycle, TenantFeature,
    TenantSettings,
};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::{DeviceStateService, WorkspaceRepository, WorkspaceSnapshot};

/// Outcome of navigating to one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationDecision {
    /// Workspace state has not been loaded yet.
    Loading,
    /// The page renders.
    Allow,
    /// Navigation moves to another route.
    Redirect(String),
    /// The page renders nothing.
    Hide,
    /// The page renders inert.
    Disable,
    /// The password must be re-entered before the panel opens.
    ChallengePassword(Panel),
}

impl From<GateDecision> for NavigationDecision {
    fn from(decision: GateDecision) -> Self {
        match decision {
            GateDecision::Loading => Self::Loading,
            GateDecision::Render => Self::Allow,
            GateDecision::Redirect(target) => Self::Redirect(target),
            GateDecision::Hide => Self::Hide,
            GateDecision::Disable => Self::Disable,
        }
    }
}

#[derive(Debug)]
struct AccessState {
    tenant_id: Option<TenantId>,
    snapshot: WorkspaceSnapshot,
    actor: Actor,
    unlocked_panels: BTreeSet<Panel>,
}

impl AccessState {
    fn empty() -> Self {
        Self {
            tenant_id: None,
            snapshot: WorkspaceSnapshot::default(),
            actor: Actor::Unselected,
            unlocked_panels: BTreeSet::new(),
        }
    }

    fn role_context(&self) -> RoleGateContext<'_> {
        RoleGateContext {
            loading: self.tenant_id.is_none(),
            actor: &self.actor,
            settings: self.snapshot.settings.as_ref(),
        }
    }

    fn panel_allowed(&self, panel: Panel) -> bool {
        RoleGate::evaluate(self.role_context(), &RoleGateRequest::panel(panel)).is_allowed()
    }

    fn accessible_panels(&self) -> Vec<Panel> {
        if self.tenant_id.is_none() {
            return Vec::new();
        }

        Panel::all()
            .iter()
            .copied()
            .filter(|panel| self.panel_allowed(*panel))
            .collect()
    }

    fn requires_password(&self, panel: Panel) -> bool {
        self.snapshot
            .settings
            .as_ref()
            .is_some_and(|settings| settings.requires_password_for(panel))
            && !self.unlocked_panels.contains(&panel)
    }
}

/// Application service owning the workspace access snapshot.
#[derive(Clone)]
pub struct WorkspaceAccessService {
    repository: Arc<dyn WorkspaceRepository>,
    device_state: DeviceStateService,
    route_gate: RouteGateConfig,
    state: Arc<RwLock<AccessState>>,
}

impl WorkspaceAccessService {
    /// Creates a service that has not loaded any workspace yet.
    #[must_use]
    pub fn new(
        repository: Arc<dyn WorkspaceRepository>,
        device_state: DeviceStateService,
        route_gate: RouteGateConfig,
    ) -> Self {
        Self {
            repository,
            device_state,
            route_gate,
            state: Arc::new(RwLock::new(AccessState::empty())),
        }
    }

    /// Loads subscription, roles and settings and resolves the actor.
    ///
    /// A persisted role pointer naming a role the tenant no longer has is
    /// cleared and the actor stays unselected.
    pub async fn initialize(&self, tenant_id: TenantId) -> AppResult<WorkspaceSnapshot> {
        let (subscription, roles, settings) = tokio::try_join!(
            self.repository.find_subscription(tenant_id),
            self.repository.list_roles(tenant_id),
            self.repository.find_tenant_settings(tenant_id),
        )?;

        let selection = self.device_state.selected_role().await?;
        let resolution = Actor::resolve(selection, roles.as_slice());
        if let Some(stale_role) = resolution.stale_role {
            warn!(
                tenant_id = %tenant_id,
                role_id = %stale_role,
                "clearing selected role missing from tenant"
            );
            self.device_state.clear_selected_role().await?;
        }

        let snapshot = WorkspaceSnapshot {
            subscription,
            roles,
            settings,
        };

        let mut state = self.state.write().await;
        *state = AccessState {
            tenant_id: Some(tenant_id),
            snapshot: snapshot.clone(),
            actor: resolution.actor,
            unlocked_panels: BTreeSet::new(),
        };

        info!(
            tenant_id = %tenant_id,
            roles = snapshot.roles.len(),
            has_subscription = snapshot.subscription.is_some(),
            has_settings = snapshot.settings.is_some(),
            "workspace access initialized"
        );
        Ok(snapshot)
    }

    /// Reloads tenant settings after an explicit update.
    pub async fn refresh_settings(&self) -> AppResult<Option<TenantSettings>> {
        let tenant_id = self.loaded_tenant().await?;
        let settings = self.repository.find_tenant_settings(tenant_id).await?;
        self.state.write().await.snapshot.settings = settings;
        Ok(settings)
    }

    /// Returns the subscription lifecycle at `now`.
    pub async fn lifecycle_at(&self, now: DateTime<Utc>) -> SubscriptionLifecycle {
        let state = self.state.read().await;
        SubscriptionLifecycle::resolve(state.snapshot.subscription.as_ref(), now)
    }

    /// Returns the resolved actor.
    pub async fn current_actor(&self) -> Actor {
        self.state.read().await.actor.clone()
    }

    /// Decides navigation to `path` at `now`.
    ///
    /// Subscription blocks win over role checks, and role checks win over
    /// the password challenge.
    pub async fn navigate_at(
        &self,
        path: &str,
        authenticated: bool,
        now: DateTime<Utc>,
    ) -> NavigationDecision {
        let state = self.state.read().await;
        if !authenticated {
            return NavigationDecision::Allow;
        }
        if state.tenant_id.is_none() {
            return NavigationDecision::Loading;
        }

        let lifecycle = SubscriptionLifecycle::resolve(state.snapshot.subscription.as_ref(), now);
        let subscription_decision = RouteGate::evaluate(
            &self.route_gate,
            RouteGateInput {
                path,
                authenticated,
                lifecycle: &lifecycle,
            },
        );
        if subscription_decision != GateDecision::Render {
            return subscription_decision.into();
        }

        let Some(panel) = Panel::for_path(path) else {
            return NavigationDecision::Allow;
        };

        if !state.panel_allowed(panel) {
            return match state.accessible_panels().first() {
                Some(landing) => NavigationDecision::Redirect(landing.route().to_owned()),
                None => NavigationDecision::Hide,
            };
        }

        if state.requires_password(panel) {
            return NavigationDecision::ChallengePassword(panel);
        }

        NavigationDecision::Allow
    }

    /// Records a successful password re-entry for `panel`.
    pub async fn unlock_panel(&self, panel: Panel) {
        self.state.write().await.unlocked_panels.insert(panel);
    }

    /// Forgets every password re-entry. Called on sign-out and role switch.
    pub async fn lock_panels(&self) {
        self.state.write().await.unlocked_panels.clear();
    }

    /// Decides how one control renders for the current actor.
    pub async fn evaluate_control(&self, request: &RoleGateRequest) -> GateDecision {
        let state = self.state.read().await;
        RoleGate::evaluate(state.role_context(), request)
    }

    /// Switches the device to `selection`.
    pub async fn select_role(
        &self,
        selection: RoleSelection,
        password_confirmed: bool,
    ) -> AppResult<Actor> {
        let tenant_id = self.loaded_tenant().await?;
        let mut state = self.state.write().await;

        let password_required = state
            .snapshot
            .settings
            .as_ref()
            .is_some_and(|settings| settings.is_enabled(TenantFeature::RoleSwitchPassword));
        if password_required && !password_confirmed {
            return Err(AppError::Forbidden(
                "switching roles requires the account password".to_owned(),
            ));
        }

        let resolution = Actor::resolve(Some(selection), state.snapshot.roles.as_slice());
        if let Some(unknown) = resolution.stale_role {
            return Err(AppError::Validation(format!(
                "role '{unknown}' does not exist in this workspace"
            )));
        }

        self.device_state.set_selected_role(selection).await?;
        state.actor = resolution.actor;
        state.unlocked_panels.clear();

        info!(
            tenant_id = %tenant_id,
            selection = %selection.to_storage_value(),
            "selected role changed"
        );
        Ok(state.actor.clone())
    }

    /// Returns the panels the current actor may open, in navigation order.
    pub async fn accessible_panels(&self) -> Vec<Panel> {
        self.state.read().await.accessible_panels()
    }

    async fn loaded_tenant(&self) -> AppResult<TenantId> {
        self.state
            .read()
            .await
            .tenant_id
            .ok_or_else(|| AppError::Conflict("workspace access is not initialized".to_owned()))
    }
}
