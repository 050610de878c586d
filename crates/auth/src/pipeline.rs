//! Access-control pipeline.
//!
//! Seven stages run in a fixed order and stop at the first denial:
//! authenticate → role → organization boundary → context → permission →
//! resource → method. Context is checked before permissions so a request from
//! the wrong client app gets a 401 without learning anything about the
//! permission model. Super admins skip role, permission, resource and method.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;


use crate::claims::AccessClaims;
use crate::codec::TokenCodec;
use crate::error::AuthError;
use crate::policy::{HttpMethod, RoutePolicy, methods_for};
use crate::roles::{AppContext, allowed_contexts_of, has_organization_boundary};
use crate::store::{AccountState, AccountStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Authenticate,
    Role,
    OrganizationBoundary,
    Context,
    Permission,
    Resource,
    Method,
}

impl Stage {
    pub const ORDER: [Stage; 7] = [
        Stage::Authenticate,
        Stage::Role,
        Stage::OrganizationBoundary,
        Stage::Context,
        Stage::Permission,
        Stage::Resource,
        Stage::Method,
    ];
}

impl core::fmt::Display for Stage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            Stage::Authenticate => "authenticate",
            Stage::Role => "role",
            Stage::OrganizationBoundary => "organization_boundary",
            Stage::Context => "context",
            Stage::Permission => "permission",
            Stage::Resource => "resource",
            Stage::Method => "method",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DenialReason {
    TokenInvalid,
    TokenExpired,
    AccountNotFound,
    AccountInactive,
    StoreUnavailable,
    InsufficientPermissions,
    OrganizationBoundaryViolation,
    ContextMismatch,
    ResourceAccessDenied,
    MethodNotAllowed,
}

impl DenialReason {
    pub fn code(self) -> &'static str {
        match self {
            DenialReason::TokenInvalid => "TOKEN_INVALID",
            DenialReason::TokenExpired => "TOKEN_EXPIRED",
            DenialReason::AccountNotFound => "ACCOUNT_NOT_FOUND",
            DenialReason::AccountInactive => "ACCOUNT_INACTIVE",
            DenialReason::StoreUnavailable => "STORE_UNAVAILABLE",
            DenialReason::InsufficientPermissions => "INSUFFICIENT_PERMISSIONS",
            DenialReason::OrganizationBoundaryViolation => "ORGANIZATION_BOUNDARY_VIOLATION",
            DenialReason::ContextMismatch => "CONTEXT_MISMATCH",
            DenialReason::ResourceAccessDenied => "RESOURCE_ACCESS_DENIED",
            DenialReason::MethodNotAllowed => "METHOD_NOT_ALLOWED",
        }
    }

    pub fn http_status(self) -> u16 {
        match self {
            DenialReason::TokenInvalid
            | DenialReason::TokenExpired
            | DenialReason::AccountNotFound
            | DenialReason::AccountInactive
            | DenialReason::ContextMismatch => 401,
            DenialReason::InsufficientPermissions
            | DenialReason::OrganizationBoundaryViolation
            | DenialReason::ResourceAccessDenied => 403,
            DenialReason::MethodNotAllowed => 405,
            DenialReason::StoreUnavailable => 503,
        }
    }
}

impl core::fmt::Display for DenialReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.code())
    }
}

/// Terminal pipeline outcome.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize)]
#[error("{reason} at {stage} stage: {message}")]
pub struct AccessDenied {
    pub stage: Stage,
    pub reason: DenialReason,
    pub message: String,
}

impl AccessDenied {
    fn new(stage: Stage, reason: DenialReason, message: impl Into<String>) -> Self {
        Self {
            stage,
            reason,
            message: message.into(),
        }
    }
}

/// Per-request inputs, taken from the transport layer.
#[derive(Debug, Clone, Copy)]
pub struct AccessRequest<'a> {
    /// Value after `Bearer `.
    pub bearer_token: Option<&'a str>,
    /// Raw `X-App-Context` header.
    pub app_context: Option<&'a str>,
    /// Organization the request targets, as it appears in the route. Not
    /// validated: a malformed value never matches the caller's organization.
    pub organization_id: Option<&'a str>,
    pub method: HttpMethod,
}

/// Caller identity once every stage has passed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizedPrincipal {
    pub claims: AccessClaims,
    pub account: AccountState,
    pub context: AppContext,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "reason")]
pub enum StageStatus {
    Passed,
    /// Skipped by super-admin wildcard authority.
    Bypassed,
    Denied(DenialReason),
    NotReached,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StageOutcome {
    pub stage: Stage,
    pub status: StageStatus,
}

impl StageOutcome {
    fn passed(stage: Stage) -> Self {
        Self {
            stage,
            status: StageStatus::Passed,
        }
    }

    fn bypassed(stage: Stage) -> Self {
        Self {
            stage,
            status: StageStatus::Bypassed,
        }
    }
}

/// Full decision record (audit trail): the outcome of every stage plus the result.
#[derive(Debug, Clone)]
pub struct AccessDecision {
    pub stages: Vec<StageOutcome>,
    pub result: Result<AuthorizedPrincipal, AccessDenied>,
}

impl AccessDecision {
    pub fn granted(&self) -> bool {
        self.result.is_ok()
    }

    pub fn denial(&self) -> Option<&AccessDenied> {
        self.result.as_ref().err()
    }
}

/// Stateless pipeline over a codec and an account store.
#[derive(Debug, Clone)]
pub struct AccessPipeline<S> {
    codec: TokenCodec,
    store: S,
}

impl<S> AccessPipeline<S>
where
    S: AccountStore,
{
    pub fn new(codec: TokenCodec, store: S) -> Self {
        Self { codec, store }
    }

    pub async fn authorize(
        &self,
        request: &AccessRequest<'_>,
        policy: &RoutePolicy,
        now: DateTime<Utc>,
    ) -> Result<AuthorizedPrincipal, AccessDenied> {
        self.evaluate(request, policy, now).await.result
    }

    pub async fn evaluate(
        &self,
        request: &AccessRequest<'_>,
        policy: &RoutePolicy,
        now: DateTime<Utc>,
    ) -> AccessDecision {
        let mut stages = Vec::with_capacity(Stage::ORDER.len());
        let result = self.run(request, policy, now, &mut stages).await;

        if let Err(denied) = &result {
            debug!(
                stage = %denied.stage,
                reason = %denied.reason,
                resource = %policy.resource,
                method = %request.method,
                "access denied: {}",
                denied.message
            );
        }

        for stage in Stage::ORDER.iter().skip(stages.len()) {
            stages.push(StageOutcome {
                stage: *stage,
                status: StageStatus::NotReached,
            });
        }

        AccessDecision { stages, result }
    }

    async fn run(
        &self,
        request: &AccessRequest<'_>,
        policy: &RoutePolicy,
        now: DateTime<Utc>,
        trace: &mut Vec<StageOutcome>,
    ) -> Result<AuthorizedPrincipal, AccessDenied> {
        let (claims, account) = record(trace, self.authenticate(request, now).await)?;

        record(trace, check_role(&claims, policy))?;
        record(trace, check_organization_boundary(&claims, request))?;
        let context = record(trace, check_context(&claims, request))?;
        record(trace, check_permissions(&claims, policy))?;
        let methods = record(trace, check_resource(&claims, policy))?;
        record(trace, check_method(&claims, request, methods))?;

        Ok(AuthorizedPrincipal {
            claims,
            account,
            context,
        })
    }

    async fn authenticate(
        &self,
        request: &AccessRequest<'_>,
        now: DateTime<Utc>,
    ) -> Result<(StageOutcome, (AccessClaims, AccountState)), AccessDenied> {
        let deny = |reason, message: String| AccessDenied::new(Stage::Authenticate, reason, message);

        let token = request
            .bearer_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| deny(DenialReason::TokenInvalid, "missing bearer token".to_string()))?;

        let claims = self.codec.verify_access_token(token, now).map_err(|e| match e {
            AuthError::TokenExpired => deny(DenialReason::TokenExpired, e.to_string()),
            other => deny(DenialReason::TokenInvalid, other.to_string()),
        })?;

        let account = self
            .store
            .load_account_state(&claims.id, claims.user_type)
            .await
            .map_err(|e| deny(DenialReason::StoreUnavailable, e.to_string()))?
            .ok_or_else(|| deny(DenialReason::AccountNotFound, format!("account {} not found", claims.id)))?;

        if !account.is_active {
            return Err(deny(
                DenialReason::AccountInactive,
                format!("account {} is inactive", account.id),
            ));
        }

        Ok((StageOutcome::passed(Stage::Authenticate), (claims, account)))
    }
}

/// Push the stage outcome (or the denial) into the trace and unwrap the value.
fn record<T>(
    trace: &mut Vec<StageOutcome>,
    result: Result<(StageOutcome, T), AccessDenied>,
) -> Result<T, AccessDenied> {
    match result {
        Ok((outcome, value)) => {
            trace.push(outcome);
            Ok(value)
        }
        Err(denied) => {
            trace.push(StageOutcome {
                stage: denied.stage,
                status: StageStatus::Denied(denied.reason),
            });
            Err(denied)
        }
    }
}

type StageResult<T = ()> = Result<(StageOutcome, T), AccessDenied>;

fn check_role(claims: &AccessClaims, policy: &RoutePolicy) -> StageResult {
    if claims.role.is_super_admin() {
        return Ok((StageOutcome::bypassed(Stage::Role), ()));
    }
    if claims.hierarchy < policy.required_hierarchy {
        return Err(AccessDenied::new(
            Stage::Role,
            DenialReason::InsufficientPermissions,
            format!(
                "hierarchy {} below required {}",
                claims.hierarchy, policy.required_hierarchy
            ),
        ));
    }
    Ok((StageOutcome::passed(Stage::Role), ()))
}

fn check_organization_boundary(claims: &AccessClaims, request: &AccessRequest<'_>) -> StageResult {
    if !has_organization_boundary(claims.role) {
        return Ok((StageOutcome::passed(Stage::OrganizationBoundary), ()));
    }
    match request.organization_id {
        None => Ok((StageOutcome::passed(Stage::OrganizationBoundary), ())),
        Some(requested) if claims.organization_id.as_ref().is_some_and(|own| own.as_str() == requested) => {
            Ok((StageOutcome::passed(Stage::OrganizationBoundary), ()))
        }
        Some(requested) => Err(AccessDenied::new(
            Stage::OrganizationBoundary,
            DenialReason::OrganizationBoundaryViolation,
            format!("{} may not access organization {requested}", claims.role),
        )),
    }
}

fn check_context(claims: &AccessClaims, request: &AccessRequest<'_>) -> StageResult<AppContext> {
    let deny = |message: String| AccessDenied::new(Stage::Context, DenialReason::ContextMismatch, message);

    let raw = request
        .app_context
        .ok_or_else(|| deny("missing X-App-Context header".to_string()))?;
    let context: AppContext = raw
        .trim()
        .parse()
        .map_err(|_| deny(format!("unknown app context '{raw}'")))?;

    if !allowed_contexts_of(claims.role).contains(&context) {
        return Err(deny(format!("{} may not use {context}", claims.role)));
    }
    Ok((StageOutcome::passed(Stage::Context), context))
}

fn check_permissions(claims: &AccessClaims, policy: &RoutePolicy) -> StageResult {
    if claims.role.is_super_admin() {
        return Ok((StageOutcome::bypassed(Stage::Permission), ()));
    }
    let missing = claims.permissions.missing(&policy.required_permissions);
    if !missing.is_empty() {
        let names: Vec<&str> = missing.iter().map(|p| p.as_str()).collect();
        return Err(AccessDenied::new(
            Stage::Permission,
            DenialReason::InsufficientPermissions,
            format!("missing permissions: {}", names.join(", ")),
        ));
    }
    Ok((StageOutcome::passed(Stage::Permission), ()))
}

fn check_resource(claims: &AccessClaims, policy: &RoutePolicy) -> StageResult<Option<&'static [HttpMethod]>> {
    if claims.role.is_super_admin() {
        return Ok((StageOutcome::bypassed(Stage::Resource), None));
    }
    match methods_for(claims.role, policy.resource) {
        Some(methods) => Ok((StageOutcome::passed(Stage::Resource), Some(methods))),
        None => Err(AccessDenied::new(
            Stage::Resource,
            DenialReason::ResourceAccessDenied,
            format!("{} may not access {}", claims.role, policy.resource),
        )),
    }
}

fn check_method(
    claims: &AccessClaims,
    request: &AccessRequest<'_>,
    methods: Option<&'static [HttpMethod]>,
) -> StageResult {
    let Some(methods) = methods else {
        return Ok((StageOutcome::bypassed(Stage::Method), ()));
    };
    if !methods.contains(&request.method) {
        return Err(AccessDenied::new(
            Stage::Method,
            DenialReason::MethodNotAllowed,
            format!("{} may not {} this resource", claims.role, request.method),
        ));
    }
    Ok((StageOutcome::passed(Stage::Method), ()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    use crate::policy::Resource;
    use crate::roles::{HierarchyLevel, Role};
    use crate::test_support::{Fixture, UnavailableStore, t0};

    fn request<'a>(
        token: &'a str,
        context: &'a str,
        org: Option<&'a str>,
        method: HttpMethod,
    ) -> AccessRequest<'a> {
        AccessRequest {
            bearer_token: Some(token),
            app_context: Some(context),
            organization_id: org,
            method,
        }
    }

    fn drivers_read() -> RoutePolicy {
        RoutePolicy::new(Resource::Drivers)
            .min_hierarchy(HierarchyLevel::ORGANIZATION)
            .action("read")
    }

    #[tokio::test]
    async fn organization_is_bounded_to_its_own_org() {
        let fx = Fixture::new();
        let token = fx.access_token(&fx.organization, Role::Organization);
        let pipeline = fx.pipeline();

        let denied = pipeline
            .authorize(&request(&token, "web-dashboard", Some("org_B"), HttpMethod::Get), &drivers_read(), t0())
            .await
            .unwrap_err();
        assert_eq!(denied.reason, DenialReason::OrganizationBoundaryViolation);
        assert_eq!(denied.stage, Stage::OrganizationBoundary);

        for org in [Some("org_A"), None] {
            pipeline
                .authorize(&request(&token, "web-dashboard", org, HttpMethod::Get), &drivers_read(), t0())
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn malformed_organization_id_is_a_boundary_violation() {
        let fx = Fixture::new();
        let token = fx.access_token(&fx.driver, Role::Driver);
        let policy = RoutePolicy::new(Resource::Trips).action("read");

        for org in ["org B", " ", ""] {
            let denied = fx
                .pipeline()
                .authorize(&request(&token, "driver-app", Some(org), HttpMethod::Get), &policy, t0())
                .await
                .unwrap_err();
            assert_eq!(denied.reason, DenialReason::OrganizationBoundaryViolation);
        }
    }

    #[tokio::test]
    async fn store_outage_denies_at_authentication_with_503() {
        let fx = Fixture::new();
        let token = fx.access_token(&fx.organization, Role::Organization);
        let pipeline = AccessPipeline::new(fx.codec.clone(), UnavailableStore);

        let decision = pipeline
            .evaluate(&request(&token, "web-dashboard", None, HttpMethod::Get), &drivers_read(), t0())
            .await;
        let denied = decision.denial().unwrap();
        assert_eq!(denied.stage, Stage::Authenticate);
        assert_eq!(denied.reason, DenialReason::StoreUnavailable);
        assert_eq!(denied.reason.http_status(), 503);
        assert!(
            decision.stages[1..]
                .iter()
                .all(|s| s.status == StageStatus::NotReached)
        );
    }

    #[tokio::test]
    async fn driver_on_web_dashboard_is_a_context_mismatch() {
        let fx = Fixture::new();
        let token = fx.access_token(&fx.driver, Role::Driver);
        // A policy the driver would fail later anyway: context must win.
        let policy = RoutePolicy::new(Resource::System).action("read");

        let denied = fx
            .pipeline()
            .authorize(&request(&token, "web-dashboard", None, HttpMethod::Delete), &policy, t0())
            .await
            .unwrap_err();
        assert_eq!(denied.reason, DenialReason::ContextMismatch);
        assert_eq!(denied.reason.http_status(), 401);
    }

    #[tokio::test]
    async fn missing_context_header_is_a_mismatch() {
        let fx = Fixture::new();
        let token = fx.access_token(&fx.passenger, Role::Passenger);
        let req = AccessRequest {
            bearer_token: Some(&token),
            app_context: None,
            organization_id: None,
            method: HttpMethod::Get,
        };

        let denied = fx
            .pipeline()
            .authorize(&req, &RoutePolicy::new(Resource::Trips).action("read"), t0())
            .await
            .unwrap_err();
        assert_eq!(denied.reason, DenialReason::ContextMismatch);
    }

    #[tokio::test]
    async fn super_admin_bypasses_authority_checks_but_not_context() {
        let fx = Fixture::new();
        let token = fx.access_token(&fx.super_admin, Role::SuperAdmin);
        let pipeline = fx.pipeline();
        let policy = RoutePolicy::new(Resource::Location)
            .min_hierarchy(HierarchyLevel::SUPER_ADMIN)
            .action("purge");

        let decision = pipeline
            .evaluate(&request(&token, "web-dashboard", Some("org_Z"), HttpMethod::Delete), &policy, t0())
            .await;
        assert!(decision.granted());
        let bypassed: Vec<Stage> = decision
            .stages
            .iter()
            .filter(|s| s.status == StageStatus::Bypassed)
            .map(|s| s.stage)
            .collect();
        assert_eq!(
            bypassed,
            vec![Stage::Role, Stage::Permission, Stage::Resource, Stage::Method]
        );

        let denied = pipeline
            .authorize(&request(&token, "driver-app", None, HttpMethod::Get), &policy, t0())
            .await
            .unwrap_err();
        assert_eq!(denied.reason, DenialReason::ContextMismatch);
    }

    #[tokio::test]
    async fn passenger_lacks_driver_management_permissions() {
        let fx = Fixture::new();
        let token = fx.access_token(&fx.passenger, Role::Passenger);
        let policy = RoutePolicy::new(Resource::Drivers).action("read");

        let decision = fx
            .pipeline()
            .evaluate(&request(&token, "passenger-app", None, HttpMethod::Get), &policy, t0())
            .await;
        let denied = decision.denial().unwrap();
        assert_eq!(denied.reason, DenialReason::InsufficientPermissions);
        assert_eq!(denied.stage, Stage::Permission);
        assert_eq!(decision.stages.len(), Stage::ORDER.len());
        assert_eq!(decision.stages[5].status, StageStatus::NotReached);
    }

    #[tokio::test]
    async fn low_hierarchy_is_denied_at_role_stage() {
        let fx = Fixture::new();
        let token = fx.access_token(&fx.driver, Role::Driver);

        let denied = fx
            .pipeline()
            .authorize(&request(&token, "driver-app", None, HttpMethod::Get), &drivers_read(), t0())
            .await
            .unwrap_err();
        assert_eq!(denied.stage, Stage::Role);
        assert_eq!(denied.reason, DenialReason::InsufficientPermissions);
    }

    #[tokio::test]
    async fn resource_and_method_allow_lists_apply() {
        let fx = Fixture::new();
        let token = fx.access_token(&fx.driver, Role::Driver);
        let pipeline = fx.pipeline();

        // Driver holds trips:update but may not DELETE trips.
        let trips = RoutePolicy::new(Resource::Trips).action("update");
        let denied = pipeline
            .authorize(&request(&token, "driver-app", None, HttpMethod::Delete), &trips, t0())
            .await
            .unwrap_err();
        assert_eq!(denied.reason, DenialReason::MethodNotAllowed);

        pipeline
            .authorize(&request(&token, "driver-app", None, HttpMethod::Patch), &trips, t0())
            .await
            .unwrap();

        // No permission requirement, but reports are not on the driver allow-list.
        let reports = RoutePolicy::new(Resource::Reports);
        let denied = pipeline
            .authorize(&request(&token, "driver-app", None, HttpMethod::Get), &reports, t0())
            .await
            .unwrap_err();
        assert_eq!(denied.reason, DenialReason::ResourceAccessDenied);
    }

    #[tokio::test]
    async fn authentication_failures_are_typed() {
        let fx = Fixture::new();
        let pipeline = fx.pipeline();
        let policy = RoutePolicy::new(Resource::Trips).action("read");
        let token = fx.access_token(&fx.passenger, Role::Passenger);

        let expired = pipeline
            .authorize(
                &request(&token, "passenger-app", None, HttpMethod::Get),
                &policy,
                t0() + Duration::hours(4),
            )
            .await
            .unwrap_err();
        assert_eq!(expired.reason, DenialReason::TokenExpired);

        let invalid = pipeline
            .authorize(&request("garbage", "passenger-app", None, HttpMethod::Get), &policy, t0())
            .await
            .unwrap_err();
        assert_eq!(invalid.reason, DenialReason::TokenInvalid);

        fx.collections.users.set_active(&fx.passenger.id, false);
        let inactive = pipeline
            .authorize(&request(&token, "passenger-app", None, HttpMethod::Get), &policy, t0())
            .await
            .unwrap_err();
        assert_eq!(inactive.reason, DenialReason::AccountInactive);
        assert_eq!(inactive.stage, Stage::Authenticate);
    }

    #[tokio::test]
    async fn permissions_are_not_rederived_from_current_role() {
        let fx = Fixture::new();
        let token = fx.access_token(&fx.driver, Role::Driver);
        fx.collections.users.set_role(&fx.driver.id, Role::Passenger);

        let principal = fx
            .pipeline()
            .authorize(
                &request(&token, "driver-app", None, HttpMethod::Post),
                &RoutePolicy::new(Resource::Location).action("update"),
                t0(),
            )
            .await
            .unwrap();
        assert_eq!(principal.claims.role, Role::Driver);
    }
}
