//! Per-role resource and method allow-lists, plus the per-route requirements
//! an endpoint declares.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AuthError;
use crate::permissions::Permission;
use crate::roles::{HierarchyLevel, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    Organizations,
    Users,
    Drivers,
    Vehicles,
    Routes,
    Trips,
    Bookings,
    Payments,
    Reports,
    Analytics,
    Location,
    Reviews,
    Notifications,
    Profile,
    System,
}

impl Resource {
    pub fn as_str(self) -> &'static str {
        match self {
            Resource::Organizations => "organizations",
            Resource::Users => "users",
            Resource::Drivers => "drivers",
            Resource::Vehicles => "vehicles",
            Resource::Routes => "routes",
            Resource::Trips => "trips",
            Resource::Bookings => "bookings",
            Resource::Payments => "payments",
            Resource::Reports => "reports",
            Resource::Analytics => "analytics",
            Resource::Location => "location",
            Resource::Reviews => "reviews",
            Resource::Notifications => "notifications",
            Resource::Profile => "profile",
            Resource::System => "system",
        }
    }

    /// `resource:action` permission for this resource.
    pub fn permission(self, action: &str) -> Permission {
        Permission::new(format!("{}:{action}", self.as_str()))
    }
}

impl FromStr for Resource {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "organizations" => Resource::Organizations,
            "users" => Resource::Users,
            "drivers" => Resource::Drivers,
            "vehicles" => Resource::Vehicles,
            "routes" => Resource::Routes,
            "trips" => Resource::Trips,
            "bookings" => Resource::Bookings,
            "payments" => Resource::Payments,
            "reports" => Resource::Reports,
            "analytics" => Resource::Analytics,
            "location" => Resource::Location,
            "reviews" => Resource::Reviews,
            "notifications" => Resource::Notifications,
            "profile" => Resource::Profile,
            "system" => Resource::System,
            other => {
                return Err(AuthError::InsufficientPermissions(format!(
                    "unknown resource '{other}'"
                )));
            }
        })
    }
}

impl core::fmt::Display for Resource {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl FromStr for HttpMethod {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "PATCH" => Ok(HttpMethod::Patch),
            "DELETE" => Ok(HttpMethod::Delete),
            other => Err(AuthError::InsufficientPermissions(format!(
                "unsupported method '{other}'"
            ))),
        }
    }
}

impl core::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Methods a role may use on one resource.
#[derive(Debug, Clone, Copy)]
pub struct ResourceGrant {
    pub resource: Resource,
    pub methods: &'static [HttpMethod],
}

use HttpMethod::{Delete, Get, Patch, Post, Put};

const READ: &[HttpMethod] = &[Get];
const READ_UPDATE: &[HttpMethod] = &[Get, Put, Patch];
const FULL: &[HttpMethod] = &[Get, Post, Put, Patch, Delete];

const fn grant(resource: Resource, methods: &'static [HttpMethod]) -> ResourceGrant {
    ResourceGrant { resource, methods }
}

const ADMIN_GRANTS: &[ResourceGrant] = &[
    grant(Resource::Organizations, FULL),
    grant(Resource::Users, &[Get, Put, Patch, Delete]),
    grant(Resource::Drivers, FULL),
    grant(Resource::Vehicles, FULL),
    grant(Resource::Routes, FULL),
    grant(Resource::Trips, FULL),
    grant(Resource::Bookings, READ),
    grant(Resource::Payments, READ),
    grant(Resource::Reports, READ),
    grant(Resource::Analytics, READ),
    grant(Resource::Location, READ),
    grant(Resource::Reviews, &[Get, Delete]),
    grant(Resource::Notifications, &[Get, Post]),
    grant(Resource::Profile, READ_UPDATE),
    grant(Resource::System, READ),
];

const ORGANIZATION_GRANTS: &[ResourceGrant] = &[
    grant(Resource::Organizations, READ_UPDATE),
    grant(Resource::Drivers, FULL),
    grant(Resource::Vehicles, FULL),
    grant(Resource::Routes, FULL),
    grant(Resource::Trips, FULL),
    grant(Resource::Bookings, READ),
    grant(Resource::Payments, READ),
    grant(Resource::Reports, READ),
    grant(Resource::Analytics, READ),
    grant(Resource::Location, READ),
    grant(Resource::Notifications, READ),
    grant(Resource::Profile, READ_UPDATE),
];

const DRIVER_GRANTS: &[ResourceGrant] = &[
    grant(Resource::Profile, READ_UPDATE),
    grant(Resource::Trips, &[Get, Patch]),
    grant(Resource::Routes, READ),
    grant(Resource::Vehicles, READ),
    grant(Resource::Bookings, READ),
    grant(Resource::Location, &[Post, Put]),
    grant(Resource::Notifications, READ),
];

const PASSENGER_GRANTS: &[ResourceGrant] = &[
    grant(Resource::Profile, READ_UPDATE),
    grant(Resource::Trips, READ),
    grant(Resource::Routes, READ),
    grant(Resource::Bookings, &[Get, Post, Delete]),
    grant(Resource::Payments, &[Get, Post]),
    grant(Resource::Reviews, &[Post]),
    grant(Resource::Notifications, READ),
];

/// Static allow-list for a role. Super admins are never consulted here: the
/// pipeline bypasses the resource and method stages for them.
pub fn resource_grants_of(role: Role) -> &'static [ResourceGrant] {
    match role {
        Role::SuperAdmin => &[],
        Role::Admin => ADMIN_GRANTS,
        Role::Organization => ORGANIZATION_GRANTS,
        Role::Driver => DRIVER_GRANTS,
        Role::Passenger => PASSENGER_GRANTS,
    }
}

pub fn methods_for(role: Role, resource: Resource) -> Option<&'static [HttpMethod]> {
    resource_grants_of(role)
        .iter()
        .find(|g| g.resource == resource)
        .map(|g| g.methods)
}

/// What an endpoint demands of its caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePolicy {
    pub resource: Resource,
    pub required_hierarchy: HierarchyLevel,
    pub required_permissions: Vec<Permission>,
}

impl RoutePolicy {
    pub fn new(resource: Resource) -> Self {
        Self {
            resource,
            required_hierarchy: HierarchyLevel::USER,
            required_permissions: Vec::new(),
        }
    }

    pub fn min_hierarchy(mut self, level: HierarchyLevel) -> Self {
        self.required_hierarchy = level;
        self
    }

    /// Require `resource:action` on this policy's resource.
    pub fn action(mut self, action: &str) -> Self {
        self.required_permissions.push(self.resource.permission(action));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roles::permissions_of;

    #[test]
    fn drivers_may_patch_but_not_delete_trips() {
        let methods = methods_for(Role::Driver, Resource::Trips).unwrap();
        assert!(methods.contains(&HttpMethod::Patch));
        assert!(!methods.contains(&HttpMethod::Delete));
    }

    #[test]
    fn passengers_cannot_touch_drivers() {
        assert!(methods_for(Role::Passenger, Resource::Drivers).is_none());
    }

    #[test]
    fn every_grant_is_backed_by_a_permission_on_that_resource() {
        for role in Role::ALL {
            let perms = permissions_of(role);
            for g in resource_grants_of(role) {
                assert!(perms.touches_resource(g.resource.as_str()), "{role} {}", g.resource);
            }
        }
    }

    #[test]
    fn policy_builder_collects_requirements() {
        let policy = RoutePolicy::new(Resource::Drivers)
            .min_hierarchy(HierarchyLevel::ORGANIZATION)
            .action("read");
        assert_eq!(policy.required_permissions, vec![Permission::new("drivers:read")]);
        assert_eq!(policy.required_hierarchy, HierarchyLevel::ORGANIZATION);
    }

    #[test]
    fn method_names_parse_case_insensitively() {
        assert_eq!("patch".parse::<HttpMethod>().unwrap(), HttpMethod::Patch);
        assert!("TRACE".parse::<HttpMethod>().is_err());
        assert_eq!("trips".parse::<Resource>().unwrap(), Resource::Trips);
    }
}
