use std::fmt::{Display, Formatter};
use std::str::FromStr;

use orderdesk_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a tenant-defined role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoleId(Uuid);

impl RoleId {
    /// Creates a random role identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a role identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for RoleId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for RoleId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

impl FromStr for RoleId {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(value.trim())
            .map(Self)
            .map_err(|error| AppError::Validation(format!("invalid role id '{value}': {error}")))
    }
}

/// Workspace panels that can be granted per role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Panel {
    /// Landing dashboard.
    Dashboard,
    /// Order list and order detail screens.
    Orders,
    /// Delivery calendar.
    Calendar,
    /// Production planning.
    Production,
    /// Delivery routing.
    Delivery,
    /// Reminder management.
    Reminders,
    /// Revenue and volume reports.
    Reports,
    /// Tenant settings.
    Settings,
}

impl Panel {
    /// Returns all panels in navigation order.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[Panel] = &[
            Panel::Dashboard,
            Panel::Orders,
            Panel::Calendar,
            Panel::Production,
            Panel::Delivery,
            Panel::Reminders,
            Panel::Reports,
            Panel::Settings,
        ];

        ALL
    }

    /// Returns a stable storage value for this panel.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dashboard => "dashboard",
            Self::Orders => "orders",
            Self::Calendar => "calendar",
            Self::Production => "production",
            Self::Delivery => "delivery",
            Self::Reminders => "reminders",
            Self::Reports => "reports",
            Self::Settings => "settings",
        }
    }

    /// Returns the root route of the panel.
    #[must_use]
    pub fn route(&self) -> &'static str {
        match self {
            Self::Dashboard => "/dashboard",
            Self::Orders => "/orders",
            Self::Calendar => "/calendar",
            Self::Production => "/production",
            Self::Delivery => "/delivery",
            Self::Reminders => "/reminders",
            Self::Reports => "/reports",
            Self::Settings => "/settings",
        }
    }

    /// Returns the panel that owns `path`, judged by its first segment.
    #[must_use]
    pub fn for_path(path: &str) -> Option<Self> {
        let first_segment = path
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .trim_start_matches('/')
            .split('/')
            .next()
            .unwrap_or_default();

        Self::from_str(first_segment).ok()
    }
}

impl FromStr for Panel {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|panel| panel.as_str() == value)
            .ok_or_else(|| AppError::Validation(format!("unknown panel '{value}'")))
    }
}

/// Order mutations that can be granted per role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderAction {
    /// Create new orders.
    Create,
    /// Edit existing orders.
    Edit,
    /// Delete orders.
    Delete,
}

impl OrderAction {
    /// Returns a stable storage value for this action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "orders.create",
            Self::Edit => "orders.edit",
            Self::Delete => "orders.delete",
        }
    }
}

/// Per-panel access flags, named after the backend role columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelAccess {
    /// Dashboard access.
    pub can_access_dashboard: bool,
    /// Orders access.
    pub can_access_orders: bool,
    /// Calendar access.
    pub can_access_calendar: bool,
    /// Production access.
    pub can_access_production: bool,
    /// Delivery access.
    pub can_access_delivery: bool,
    /// Reminders access.
    pub can_access_reminders: bool,
    /// Reports access.
    pub can_access_reports: bool,
    /// Settings access.
    pub can_access_settings: bool,
}

impl PanelAccess {
    /// Grants every panel.
    #[must_use]
    pub fn all() -> Self {
        Self {
            can_access_dashboard: true,
            can_access_orders: true,
            can_access_calendar: true,
            can_access_production: true,
            can_access_delivery: true,
            can_access_reminders: true,
            can_access_reports: true,
            can_access_settings: true,
        }
    }

    /// Returns whether `panel` is granted.
    #[must_use]
    pub fn allows(&self, panel: Panel) -> bool {
        match panel {
            Panel::Dashboard => self.can_access_dashboard,
            Panel::Orders => self.can_access_orders,
            Panel::Calendar => self.can_access_calendar,
            Panel::Production => self.can_access_production,
            Panel::Delivery => self.can_access_delivery,
            Panel::Reminders => self.can_access_reminders,
            Panel::Reports => self.can_access_reports,
            Panel::Settings => self.can_access_settings,
        }
    }
}

/// Per-action order permissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderPermissions {
    /// May create orders.
    pub can_create_orders: bool,
    /// May edit orders.
    pub can_edit_orders: bool,
    /// May delete orders.
    pub can_delete_orders: bool,
}

impl OrderPermissions {
    /// Returns whether `action` is granted.
    #[must_use]
    pub fn allows(&self, action: OrderAction) -> bool {
        match action {
            OrderAction::Create => self.can_create_orders,
            OrderAction::Edit => self.can_edit_orders,
            OrderAction::Delete => self.can_delete_orders,
        }
    }
}

/// Tenant-defined bundle of panel access and order permissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Role identifier.
    pub id: RoleId,
    /// Display name.
    pub name: NonEmptyString,
    /// Panel access flags.
    #[serde(flatten)]
    pub panels: PanelAccess,
    /// Order permission flags.
    #[serde(flatten)]
    pub orders: OrderPermissions,
}

impl Role {
    /// Creates a role with explicit flags.
    pub fn new(
        id: RoleId,
        name: impl Into<String>,
        panels: PanelAccess,
        orders: OrderPermissions,
    ) -> AppResult<Self> {
        Ok(Self {
            id,
            name: NonEmptyString::new(name)?,
            panels,
            orders,
        })
    }

    /// Returns whether the role may open `panel`.
    #[must_use]
    pub fn can_access(&self, panel: Panel) -> bool {
        self.panels.allows(panel)
    }

    /// Returns whether the role may perform `action` on orders.
    #[must_use]
    pub fn can_perform(&self, action: OrderAction) -> bool {
        self.orders.allows(action)
    }
}
