//! HTTP application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store selection and the shared [`AuthService`]
//! - `routes/`: handlers, one file per area
//! - `dto.rs`: request/response bodies
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{
    Extension, Router,
    routing::{get, post},
};

use fleetgate_auth::{AccountStore, AuthService, HierarchyLevel, Resource, RoutePolicy};

use crate::middleware::{self, AccessState};

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Store handle shared by every request.
pub type SharedStore = Arc<dyn AccountStore>;
pub type SharedAuth = Arc<AuthService<SharedStore>>;

/// Policy guarding `GET /auth/me`.
pub fn profile_policy() -> RoutePolicy {
    RoutePolicy::new(Resource::Profile).action("read")
}

/// Policy guarding `GET /organizations/:organization_id/access`.
pub fn organization_access_policy() -> RoutePolicy {
    RoutePolicy::new(Resource::Organizations)
        .min_hierarchy(HierarchyLevel::ORGANIZATION)
        .action("read")
}

/// Build the full HTTP router (public entrypoint used by `main.rs` and tests).
pub fn build_app(auth: SharedAuth) -> Router {
    let profile = Router::new()
        .route("/auth/me", get(routes::auth::me))
        .route_layer(axum::middleware::from_fn_with_state(
            AccessState::new(auth.clone(), profile_policy()),
            middleware::access_middleware,
        ));

    let organizations = Router::new()
        .route(
            "/organizations/:organization_id/access",
            get(routes::organizations::access),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            AccessState::new(auth.clone(), organization_access_policy()),
            middleware::access_middleware,
        ));

    Router::new()
        .route("/health", get(routes::system::health))
        .route("/auth/refresh", post(routes::auth::refresh))
        .route("/auth/logout", post(routes::auth::logout))
        .merge(profile)
        .merge(organizations)
        .layer(Extension(auth))
}
