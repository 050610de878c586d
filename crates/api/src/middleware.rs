use std::sync::Arc;

use axum::{
    extract::{RawPathParams, State},
    http::{HeaderMap, Method, StatusCode},
    middleware::Next,
    response::Response,
};

use fleetgate_auth::{AccessRequest, AppContext, HttpMethod, RoutePolicy};

use crate::app::{SharedAuth, errors};
use crate::context::PrincipalContext;

/// Path parameter naming the organization a route targets.
pub const ORGANIZATION_PARAM: &str = "organization_id";

#[derive(Clone)]
pub struct AccessState {
    pub auth: SharedAuth,
    pub policy: Arc<RoutePolicy>,
}

impl AccessState {
    pub fn new(auth: SharedAuth, policy: RoutePolicy) -> Self {
        Self {
            auth,
            policy: Arc::new(policy),
        }
    }
}

/// Runs the access pipeline for one route (installed with `route_layer`).
pub async fn access_middleware(
    State(state): State<AccessState>,
    params: Option<RawPathParams>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let Some(method) = pipeline_method(req.method()) else {
        return errors::json_error(
            StatusCode::METHOD_NOT_ALLOWED,
            "METHOD_NOT_ALLOWED",
            format!("{} is not supported", req.method()),
        );
    };

    let headers = req.headers();
    let access = AccessRequest {
        bearer_token: extract_bearer(headers),
        app_context: headers
            .get(AppContext::HEADER)
            .and_then(|v| v.to_str().ok()),
        organization_id: organization_param(params.as_ref()),
        method,
    };

    match state.auth.authorize(&access, &state.policy).await {
        Ok(principal) => {
            req.extensions_mut().insert(PrincipalContext::from(principal));
            next.run(req).await
        }
        Err(denied) => errors::denial_response(&denied),
    }
}

/// `HEAD` is served by `GET` handlers, so it is authorized as a read.
fn pipeline_method(method: &Method) -> Option<HttpMethod> {
    if *method == Method::HEAD {
        return Some(HttpMethod::Get);
    }
    method.as_str().parse().ok()
}

/// Raw organization segment; the boundary stage decides what a bad one means.
fn organization_param(params: Option<&RawPathParams>) -> Option<&str> {
    params?
        .iter()
        .find(|(key, _)| *key == ORGANIZATION_PARAM)
        .map(|(_, value)| value)
}

/// Token after `Bearer `, or `None` when the header is absent or malformed.
pub fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(axum::http::header::AUTHORIZATION)?;
    let header = header.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        return None;
    }
    Some(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_requires_scheme_and_value() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_bearer(&headers), None);

        headers.insert(axum::http::header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(extract_bearer(&headers), None);

        headers.insert(axum::http::header::AUTHORIZATION, HeaderValue::from_static("Bearer   "));
        assert_eq!(extract_bearer(&headers), None);

        headers.insert(axum::http::header::AUTHORIZATION, HeaderValue::from_static("Bearer t.o.k"));
        assert_eq!(extract_bearer(&headers), Some("t.o.k"));
    }

    #[test]
    fn head_is_authorized_as_get() {
        assert_eq!(pipeline_method(&Method::HEAD), Some(HttpMethod::Get));
        assert_eq!(pipeline_method(&Method::PATCH), Some(HttpMethod::Patch));
        assert_eq!(pipeline_method(&Method::OPTIONS), None);
    }
}
