use std::str::FromStr;

use orderdesk_core::AppError;

use crate::{Role, RoleId};

const OWNER_STORAGE_VALUE: &str = "owner";

/// Device-scoped choice of who is operating the workspace.
///
/// Owner is an explicit choice. It is never inferred from a missing or
/// unknown role reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoleSelection {
    /// The tenant owner, unrestricted.
    Owner,
    /// A tenant-defined role.
    Role(RoleId),
}

impl RoleSelection {
    /// Returns the persisted representation.
    #[must_use]
    pub fn to_storage_value(&self) -> String {
        match self {
            Self::Owner => OWNER_STORAGE_VALUE.to_owned(),
            Self::Role(role_id) => role_id.to_string(),
        }
    }
}

impl FromStr for RoleSelection {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value.trim() == OWNER_STORAGE_VALUE {
            return Ok(Self::Owner);
        }

        RoleId::from_str(value).map(Self::Role)
    }
}

/// The resolved actor used by every policy decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    /// Owner: passes every role check.
    Owner,
    /// A selected role that exists in the tenant.
    Role(Role),
    /// No valid selection. Denied wherever roles are enforced.
    Unselected,
}

/// Outcome of resolving a persisted selection against the tenant's roles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorResolution {
    /// Actor to evaluate policies with.
    pub actor: Actor,
    /// Role id the persisted pointer referenced but the tenant no longer has.
    pub stale_role: Option<RoleId>,
}

impl Actor {
    /// Resolves `selection` against the tenant role list.
    ///
    /// A pointer to a role missing from `roles` yields `Unselected` and
    /// reports the stale id so the caller can clear the binding.
    #[must_use]
    pub fn resolve(selection: Option<RoleSelection>, roles: &[Role]) -> ActorResolution {
        match selection {
            Some(RoleSelection::Owner) => ActorResolution {
                actor: Self::Owner,
                stale_role: None,
            },
            Some(RoleSelection::Role(role_id)) => {
                match roles.iter().find(|role| role.id == role_id) {
                    Some(role) => ActorResolution {
                        actor: Self::Role(role.clone()),
                        stale_role: None,
                    },
                    None => ActorResolution {
                        actor: Self::Unselected,
                        stale_role: Some(role_id),
                    },
                }
            }
            None => ActorResolution {
                actor: Self::Unselected,
                stale_role: None,
            },
        }
    }

    /// Returns whether the actor is the owner.
    #[must_use]
    pub fn is_owner(&self) -> bool {
        matches!(self, Self::Owner)
    }

    /// Returns the selected role, if any.
    #[must_use]
    pub fn role(&self) -> Option<&Role> {
        match self {
            Self::Role(role) => Some(role),
            Self::Owner | Self::Unselected => None,
        }
    }
}
