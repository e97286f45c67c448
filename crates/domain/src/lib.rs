//! Domain model and pure access-policy rules for the Orderdesk client.

#![forbid(unsafe_code)]

mod actor;
mod gate;
mod role;
mod route;
mod session;
mod subscription;
mod tenant_settings;

pub use actor::{Actor, ActorResolution, RoleSelection};
pub use gate::{BlockMode, GateDecision, RoleGate, RoleGateContext, RoleGateRequest};
pub use role::{OrderAction, OrderPermissions, Panel, PanelAccess, Role, RoleId};
pub use route::{
    RouteGate, RouteGateConfig, RouteGateInput, RoutePattern, RouteScope,
    SUBSCRIPTION_FALLBACK_ROUTE,
};
pub use session::{BearerCredential, Session, SessionId, SessionUser};
pub use subscription::{
    EXPIRY_WARNING_WINDOW_DAYS, Subscription, SubscriptionLifecycle, SubscriptionStatus,
};
pub use tenant_settings::{TenantFeature, TenantSettings};
