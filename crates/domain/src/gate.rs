use serde::{Deserialize, Serialize};

use crate::{Actor, OrderAction, Panel, TenantFeature, TenantSettings};

/// What a gated surface should do with its content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "decision", content = "target")]
pub enum GateDecision {
    /// Inputs are still loading; show a placeholder.
    Loading,
    /// Render normally.
    Render,
    /// Navigate elsewhere.
    Redirect(String),
    /// Render nothing.
    Hide,
    /// Render inertly and de-emphasized.
    Disable,
}

impl GateDecision {
    /// Returns whether the content renders interactively.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Render)
    }
}

/// How a denied control is presented when no redirect applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockMode {
    /// Render nothing.
    #[default]
    Hide,
    /// Render inertly.
    Disable,
}

impl BlockMode {
    /// Returns the decision this mode produces for a denied surface.
    #[must_use]
    pub fn denied(self) -> GateDecision {
        match self {
            Self::Hide => GateDecision::Hide,
            Self::Disable => GateDecision::Disable,
        }
    }
}

/// Requirements a UI control declares before it renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RoleGateRequest {
    /// Panel the control belongs to.
    pub panel: Option<Panel>,
    /// Order mutation the control triggers.
    pub permission: Option<OrderAction>,
    /// Tenant feature the control depends on.
    pub feature: Option<TenantFeature>,
    /// Presentation for a denied permission.
    pub block_mode: BlockMode,
}

impl RoleGateRequest {
    /// Requires access to `panel`.
    #[must_use]
    pub fn panel(panel: Panel) -> Self {
        Self {
            panel: Some(panel),
            ..Self::default()
        }
    }

    /// Requires the order `action` permission.
    #[must_use]
    pub fn permission(action: OrderAction) -> Self {
        Self {
            permission: Some(action),
            ..Self::default()
        }
    }

    /// Requires the tenant `feature` to be enabled.
    #[must_use]
    pub fn feature(feature: TenantFeature) -> Self {
        Self {
            feature: Some(feature),
            ..Self::default()
        }
    }

    /// Sets how a denied permission is presented.
    #[must_use]
    pub fn with_block_mode(mut self, block_mode: BlockMode) -> Self {
        self.block_mode = block_mode;
        self
    }

    fn is_unconstrained(&self) -> bool {
        self.panel.is_none() && self.permission.is_none() && self.feature.is_none()
    }
}

/// Inputs a role gate evaluates against.
#[derive(Debug, Clone, Copy)]
pub struct RoleGateContext<'a> {
    /// Workspace state is still loading.
    pub loading: bool,
    /// Resolved actor.
    pub actor: &'a Actor,
    /// Tenant settings, absent when they could not be loaded.
    pub settings: Option<&'a TenantSettings>,
}

/// Role and tenant-feature gate for individual controls.
pub struct RoleGate;

impl RoleGate {
    /// Decides how a control with `request` requirements renders.
    ///
    /// Rules apply in order: loading, owner bypass, tenant feature, panel
    /// access, order permission.
    #[must_use]
    pub fn evaluate(context: RoleGateContext<'_>, request: &RoleGateRequest) -> GateDecision {
        if context.loading {
            return GateDecision::Loading;
        }

        if context.actor.is_owner() || request.is_unconstrained() {
            return GateDecision::Render;
        }

        let Some(settings) = context.settings else {
            return GateDecision::Hide;
        };

        if request
            .feature
            .is_some_and(|feature| !settings.is_enabled(feature))
        {
            return GateDecision::Hide;
        }

        if !settings.roles_enabled {
            return GateDecision::Render;
        }

        if let Some(panel) = request.panel {
            let granted = context
                .actor
                .role()
                .is_some_and(|role| role.can_access(panel));
            if !granted {
                return GateDecision::Hide;
            }
        }

        if let Some(action) = request.permission {
            let granted = context
                .actor
                .role()
                .is_some_and(|role| role.can_perform(action));
            if !granted {
                return request.block_mode.denied();
            }
        }

        GateDecision::Render
    }
}
