//! Role/tier model.
//!
//! One static, exhaustive table keyed by [`Role`]. Every lookup is a pure
//! function of the role; nothing here is mutable after startup.

use core::str::FromStr;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::AuthError;
use crate::permissions::{self, PermissionSet};

/// Fine-grained role, assigned at account creation and never changed by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    SuperAdmin,
    Admin,
    Organization,
    Driver,
    Passenger,
}

/// Coarse authentication category. Selects the backing user collection and
/// the token lifetimes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserTier {
    SuperAdmin,
    Admin,
    Organization,
    User,
}

/// Authority ranking used for coarse endpoint gating (1..=4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HierarchyLevel(u8);

impl HierarchyLevel {
    pub const USER: HierarchyLevel = HierarchyLevel(1);
    pub const ORGANIZATION: HierarchyLevel = HierarchyLevel(2);
    pub const ADMIN: HierarchyLevel = HierarchyLevel(3);
    pub const SUPER_ADMIN: HierarchyLevel = HierarchyLevel(4);

    pub fn value(self) -> u8 {
        self.0
    }
}

impl core::fmt::Display for HierarchyLevel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Declared client application, sent in the `X-App-Context` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AppContext {
    WebDashboard,
    DriverApp,
    PassengerApp,
}

impl AppContext {
    pub const HEADER: &'static str = "x-app-context";

    pub fn as_str(self) -> &'static str {
        match self {
            AppContext::WebDashboard => "web-dashboard",
            AppContext::DriverApp => "driver-app",
            AppContext::PassengerApp => "passenger-app",
        }
    }
}

impl FromStr for AppContext {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "web-dashboard" => Ok(AppContext::WebDashboard),
            "driver-app" => Ok(AppContext::DriverApp),
            "passenger-app" => Ok(AppContext::PassengerApp),
            other => Err(AuthError::token_invalid(format!("unknown app context '{other}'"))),
        }
    }
}

impl core::fmt::Display for AppContext {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the access-control core knows about a role.
#[derive(Debug, Clone, Copy)]
pub struct RoleProfile {
    pub role: Role,
    pub tier: UserTier,
    pub hierarchy: HierarchyLevel,
    pub permissions: &'static [&'static str],
    pub contexts: &'static [AppContext],
    /// Restricted to the account's own organization.
    pub organization_boundary: bool,
}

static SUPER_ADMIN: RoleProfile = RoleProfile {
    role: Role::SuperAdmin,
    tier: UserTier::SuperAdmin,
    hierarchy: HierarchyLevel::SUPER_ADMIN,
    permissions: permissions::SUPER_ADMIN,
    contexts: &[AppContext::WebDashboard],
    organization_boundary: false,
};

static ADMIN: RoleProfile = RoleProfile {
    role: Role::Admin,
    tier: UserTier::Admin,
    hierarchy: HierarchyLevel::ADMIN,
    permissions: permissions::ADMIN,
    contexts: &[AppContext::WebDashboard],
    organization_boundary: false,
};

static ORGANIZATION: RoleProfile = RoleProfile {
    role: Role::Organization,
    tier: UserTier::Organization,
    hierarchy: HierarchyLevel::ORGANIZATION,
    permissions: permissions::ORGANIZATION,
    contexts: &[AppContext::WebDashboard],
    organization_boundary: true,
};

static DRIVER: RoleProfile = RoleProfile {
    role: Role::Driver,
    tier: UserTier::User,
    hierarchy: HierarchyLevel::USER,
    permissions: permissions::DRIVER,
    contexts: &[AppContext::DriverApp],
    organization_boundary: true,
};

static PASSENGER: RoleProfile = RoleProfile {
    role: Role::Passenger,
    tier: UserTier::User,
    hierarchy: HierarchyLevel::USER,
    permissions: permissions::PASSENGER,
    contexts: &[AppContext::PassengerApp],
    organization_boundary: false,
};

impl Role {
    pub const ALL: [Role; 5] = [
        Role::SuperAdmin,
        Role::Admin,
        Role::Organization,
        Role::Driver,
        Role::Passenger,
    ];

    pub fn profile(self) -> &'static RoleProfile {
        match self {
            Role::SuperAdmin => &SUPER_ADMIN,
            Role::Admin => &ADMIN,
            Role::Organization => &ORGANIZATION,
            Role::Driver => &DRIVER,
            Role::Passenger => &PASSENGER,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::SuperAdmin => "SUPER_ADMIN",
            Role::Admin => "ADMIN",
            Role::Organization => "ORGANIZATION",
            Role::Driver => "DRIVER",
            Role::Passenger => "PASSENGER",
        }
    }

    /// Wildcard authority: bypasses role, permission, resource and method checks.
    pub fn is_super_admin(self) -> bool {
        matches!(self, Role::SuperAdmin)
    }
}

impl FromStr for Role {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SUPER_ADMIN" => Ok(Role::SuperAdmin),
            "ADMIN" => Ok(Role::Admin),
            "ORGANIZATION" => Ok(Role::Organization),
            "DRIVER" => Ok(Role::Driver),
            "PASSENGER" => Ok(Role::Passenger),
            other => Err(AuthError::InvalidRole(other.to_string())),
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl UserTier {
    pub const ALL: [UserTier; 4] = [
        UserTier::SuperAdmin,
        UserTier::Admin,
        UserTier::Organization,
        UserTier::User,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            UserTier::SuperAdmin => "SUPER_ADMIN",
            UserTier::Admin => "ADMIN",
            UserTier::Organization => "ORGANIZATION",
            UserTier::User => "USER",
        }
    }

    /// Role assumed for tiers that hold a single role. `User` accounts carry
    /// their role (driver or passenger) in the store record instead.
    pub fn implied_role(self) -> Option<Role> {
        match self {
            UserTier::SuperAdmin => Some(Role::SuperAdmin),
            UserTier::Admin => Some(Role::Admin),
            UserTier::Organization => Some(Role::Organization),
            UserTier::User => None,
        }
    }

    pub fn access_lifetime(self) -> Duration {
        match self {
            UserTier::SuperAdmin => Duration::minutes(30),
            UserTier::Admin => Duration::hours(1),
            UserTier::Organization => Duration::hours(2),
            UserTier::User => Duration::hours(4),
        }
    }

    pub fn refresh_lifetime(self) -> Duration {
        match self {
            UserTier::SuperAdmin | UserTier::Admin => Duration::days(7),
            UserTier::Organization => Duration::days(14),
            UserTier::User => Duration::days(30),
        }
    }
}

impl FromStr for UserTier {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SUPER_ADMIN" => Ok(UserTier::SuperAdmin),
            "ADMIN" => Ok(UserTier::Admin),
            "ORGANIZATION" => Ok(UserTier::Organization),
            "USER" => Ok(UserTier::User),
            other => Err(AuthError::InvalidUserTier(other.to_string())),
        }
    }
}

impl core::fmt::Display for UserTier {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn hierarchy_of(role: Role) -> HierarchyLevel {
    role.profile().hierarchy
}

pub fn tier_of(role: Role) -> UserTier {
    role.profile().tier
}

pub fn permissions_of(role: Role) -> PermissionSet {
    PermissionSet::from_static(role.profile().permissions)
}

pub fn allowed_contexts_of(role: Role) -> &'static [AppContext] {
    role.profile().contexts
}

/// Organization boundary is decided per role: the `User` tier mixes drivers
/// (bounded to their employer) and passengers (unbounded).
pub fn has_organization_boundary(role: Role) -> bool {
    role.profile().organization_boundary
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn hierarchy_levels_match_role_ranking() {
        assert_eq!(hierarchy_of(Role::SuperAdmin).value(), 4);
        assert_eq!(hierarchy_of(Role::Admin).value(), 3);
        assert_eq!(hierarchy_of(Role::Organization).value(), 2);
        assert_eq!(hierarchy_of(Role::Driver).value(), 1);
        assert_eq!(hierarchy_of(Role::Passenger).value(), 1);
    }

    #[test]
    fn drivers_and_passengers_share_the_user_tier() {
        assert_eq!(tier_of(Role::Driver), UserTier::User);
        assert_eq!(tier_of(Role::Passenger), UserTier::User);
        assert_ne!(allowed_contexts_of(Role::Driver), allowed_contexts_of(Role::Passenger));
    }

    #[test]
    fn every_role_has_exactly_one_context() {
        for role in Role::ALL {
            assert_eq!(allowed_contexts_of(role).len(), 1, "{role}");
        }
        assert_eq!(allowed_contexts_of(Role::Admin), &[AppContext::WebDashboard]);
        assert_eq!(allowed_contexts_of(Role::Driver), &[AppContext::DriverApp]);
        assert_eq!(allowed_contexts_of(Role::Passenger), &[AppContext::PassengerApp]);
    }

    #[test]
    fn organization_boundary_applies_to_organizations_and_drivers() {
        assert!(has_organization_boundary(Role::Organization));
        assert!(has_organization_boundary(Role::Driver));
        assert!(!has_organization_boundary(Role::SuperAdmin));
        assert!(!has_organization_boundary(Role::Admin));
        assert!(!has_organization_boundary(Role::Passenger));
    }

    #[test]
    fn lifetimes_follow_tier_table() {
        assert_eq!(UserTier::SuperAdmin.access_lifetime(), Duration::minutes(30));
        assert_eq!(UserTier::User.access_lifetime(), Duration::hours(4));
        assert_eq!(UserTier::Admin.refresh_lifetime(), Duration::days(7));
        assert_eq!(UserTier::Organization.refresh_lifetime(), Duration::days(14));
        assert_eq!(UserTier::User.refresh_lifetime(), Duration::days(30));
    }

    #[test]
    fn unknown_strings_fail_loudly() {
        assert_eq!(
            "OWNER".parse::<Role>().unwrap_err(),
            AuthError::InvalidRole("OWNER".to_string())
        );
        assert_eq!(
            "DRIVER".parse::<UserTier>().unwrap_err(),
            AuthError::InvalidUserTier("DRIVER".to_string())
        );
        assert!("mobile".parse::<AppContext>().is_err());
    }

    #[test]
    fn wire_names_round_trip() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
            let json = serde_json::to_string(&role).unwrap();
            assert_eq!(json, format!("\"{}\"", role.as_str()));
        }
        for tier in UserTier::ALL {
            assert_eq!(tier.as_str().parse::<UserTier>().unwrap(), tier);
        }
        let json = serde_json::to_string(&AppContext::WebDashboard).unwrap();
        assert_eq!(json, "\"web-dashboard\"");
    }

    fn any_role() -> impl Strategy<Value = Role> {
        prop::sample::select(Role::ALL.to_vec())
    }

    proptest! {
        /// Property: role lookups are total and stable across repeated calls.
        #[test]
        fn role_tables_are_deterministic(role in any_role()) {
            prop_assert_eq!(hierarchy_of(role), hierarchy_of(role));
            prop_assert_eq!(permissions_of(role), permissions_of(role));
            prop_assert_eq!(tier_of(role), tier_of(role));
            prop_assert!(!permissions_of(role).is_empty());
        }
    }
}
