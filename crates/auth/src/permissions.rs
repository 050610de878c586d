use std::borrow::Cow;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Permission identifier.
///
/// Permissions are strings of the form `resource:action` (e.g. "trips:read").
/// The wildcard permission `"*"` is granted to super admins only and satisfies
/// every requirement.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub const WILDCARD: Permission = Permission(Cow::Borrowed("*"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == "*"
    }

    /// The `resource` half of `resource:action`.
    pub fn resource(&self) -> Option<&str> {
        self.as_str().split_once(':').map(|(resource, _)| resource)
    }

    /// The `action` half of `resource:action`.
    pub fn action(&self) -> Option<&str> {
        self.as_str().split_once(':').map(|(_, action)| action)
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered set of permissions embedded in an access token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet(BTreeSet<Permission>);

impl PermissionSet {
    pub fn from_static(names: &'static [&'static str]) -> Self {
        Self(names.iter().map(|n| Permission::new(*n)).collect())
    }

    pub fn has_wildcard(&self) -> bool {
        self.0.contains(&Permission::WILDCARD)
    }

    pub fn contains(&self, permission: &Permission) -> bool {
        self.has_wildcard() || self.0.contains(permission)
    }

    /// Requirements not covered by this set (empty when all are granted).
    pub fn missing<'a>(&self, required: &'a [Permission]) -> Vec<&'a Permission> {
        required.iter().filter(|p| !self.contains(p)).collect()
    }

    pub fn grants_all(&self, required: &[Permission]) -> bool {
        self.missing(required).is_empty()
    }

    /// True when any permission targets `resource` (e.g. any `drivers:*`).
    pub fn touches_resource(&self, resource: &str) -> bool {
        self.has_wildcard() || self.0.iter().any(|p| p.resource() == Some(resource))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Permission> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_superset(&self, other: &PermissionSet) -> bool {
        self.has_wildcard() || self.0.is_superset(&other.0)
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = Permission>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// Role → permission tables. `roles::Role::profile` is the only consumer.

pub(crate) const SUPER_ADMIN: &[&str] = &["*"];

pub(crate) const ADMIN: &[&str] = &[
    "organizations:read",
    "organizations:create",
    "organizations:update",
    "organizations:delete",
    "organizations:approve",
    "users:read",
    "users:update",
    "users:delete",
    "drivers:read",
    "drivers:create",
    "drivers:update",
    "drivers:delete",
    "vehicles:read",
    "vehicles:create",
    "vehicles:update",
    "vehicles:delete",
    "routes:read",
    "routes:create",
    "routes:update",
    "routes:delete",
    "trips:read",
    "trips:create",
    "trips:update",
    "trips:delete",
    "bookings:read",
    "payments:read",
    "reports:read",
    "analytics:read",
    "location:read",
    "reviews:read",
    "reviews:delete",
    "notifications:read",
    "notifications:create",
    "profile:read",
    "profile:update",
    "system:read",
];

pub(crate) const ORGANIZATION: &[&str] = &[
    "organizations:read",
    "organizations:update",
    "drivers:read",
    "drivers:create",
    "drivers:update",
    "drivers:delete",
    "vehicles:read",
    "vehicles:create",
    "vehicles:update",
    "vehicles:delete",
    "routes:read",
    "routes:create",
    "routes:update",
    "routes:delete",
    "trips:read",
    "trips:create",
    "trips:update",
    "trips:delete",
    "bookings:read",
    "payments:read",
    "reports:read",
    "analytics:read",
    "location:read",
    "notifications:read",
    "profile:read",
    "profile:update",
];

pub(crate) const DRIVER: &[&str] = &[
    "profile:read",
    "profile:update",
    "trips:read",
    "trips:update",
    "routes:read",
    "vehicles:read",
    "bookings:read",
    "location:update",
    "notifications:read",
];

pub(crate) const PASSENGER: &[&str] = &[
    "profile:read",
    "profile:update",
    "trips:read",
    "routes:read",
    "bookings:read",
    "bookings:create",
    "bookings:cancel",
    "payments:read",
    "payments:create",
    "reviews:create",
    "notifications:read",
];
