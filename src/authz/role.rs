use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Roles ordered by privilege. Declaration order drives `Ord`, so
/// `LimitedUser < StandardUser < OfficeAdmin < SuperAdmin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    LimitedUser,
    StandardUser,
    OfficeAdmin,
    SuperAdmin,
}

/// Breadth of a scope, narrowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ScopeKind {
    OwnedBy,
    Office,
    All,
}

/// How a role's scope is derived for one view mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeRule {
    All,
    /// Home office when set, otherwise every record.
    HomeOfficeOrAll,
    /// Home office when set, otherwise only the actor's own records.
    HomeOfficeOrOwn,
    Own,
}

impl ScopeRule {
    /// Widest scope kind this rule can ever produce.
    pub fn max_kind(self) -> ScopeKind {
        match self {
            ScopeRule::All | ScopeRule::HomeOfficeOrAll => ScopeKind::All,
            ScopeRule::HomeOfficeOrOwn => ScopeKind::Office,
            ScopeRule::Own => ScopeKind::OwnedBy,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleCapabilities {
    pub rank: u8,
    pub can_toggle: bool,
    pub broad: ScopeRule,
    pub scoped: ScopeRule,
    /// Contact fields are hidden from this role even inside its scope.
    pub field_restricted: bool,
}

const SUPER_ADMIN: RoleCapabilities = RoleCapabilities {
    rank: 3,
    can_toggle: true,
    broad: ScopeRule::All,
    scoped: ScopeRule::HomeOfficeOrAll,
    field_restricted: false,
};

const OFFICE_ADMIN: RoleCapabilities = RoleCapabilities {
    rank: 2,
    can_toggle: true,
    broad: ScopeRule::HomeOfficeOrOwn,
    scoped: ScopeRule::Own,
    field_restricted: false,
};

const STANDARD_USER: RoleCapabilities = RoleCapabilities {
    rank: 1,
    can_toggle: false,
    broad: ScopeRule::Own,
    scoped: ScopeRule::Own,
    field_restricted: false,
};

const LIMITED_USER: RoleCapabilities = RoleCapabilities {
    rank: 0,
    can_toggle: false,
    broad: ScopeRule::Own,
    scoped: ScopeRule::Own,
    field_restricted: true,
};

impl Role {
    pub const ALL: [Role; 4] = [Role::SuperAdmin, Role::OfficeAdmin, Role::StandardUser, Role::LimitedUser];

    /// Role used whenever the stored role is missing or unrecognised.
    pub const FAIL_CLOSED: Role = Role::LimitedUser;

    pub fn capabilities(self) -> &'static RoleCapabilities {
        match self {
            Role::SuperAdmin => &SUPER_ADMIN,
            Role::OfficeAdmin => &OFFICE_ADMIN,
            Role::StandardUser => &STANDARD_USER,
            Role::LimitedUser => &LIMITED_USER,
        }
    }

    pub fn rank(self) -> u8 {
        self.capabilities().rank
    }

    pub fn can_toggle(self) -> bool {
        self.capabilities().can_toggle
    }

    /// Widest scope kind the role may hold in any mode.
    pub fn max_scope_kind(self) -> ScopeKind {
        let caps = self.capabilities();
        caps.broad.max_kind().max(caps.scoped.max_kind())
    }

    pub fn is_field_restricted(self) -> bool {
        self.capabilities().field_restricted
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::SuperAdmin => "super_admin",
            Role::OfficeAdmin => "office_admin",
            Role::StandardUser => "standard_user",
            Role::LimitedUser => "limited_user",
        }
    }

    /// Lenient parse for values read from the user store. Missing or unknown
    /// values resolve to [`Role::FAIL_CLOSED`] and are logged.
    pub fn from_stored(raw: Option<&str>) -> Role {
        match raw {
            Some(value) => value.parse().unwrap_or_else(|err: UnknownRole| {
                tracing::warn!(role = %err.0, "unknown role in user store, falling back to limited_user");
                Role::FAIL_CLOSED
            }),
            None => {
                tracing::warn!("user record has no role, falling back to limited_user");
                Role::FAIL_CLOSED
            }
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "super_admin" => Ok(Role::SuperAdmin),
            "office_admin" => Ok(Role::OfficeAdmin),
            "standard_user" => Ok(Role::StandardUser),
            "limited_user" => Ok(Role::LimitedUser),
            _ => Err(UnknownRole(s.to_string())),
        }
    }
}
