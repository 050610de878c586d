use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use fleetgate_auth::{AccessDenied, AuthError, AuthErrorKind};

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// Denial from the access pipeline, with the stage that rejected the request.
pub fn denial_response(denied: &AccessDenied) -> axum::response::Response {
    let status = StatusCode::from_u16(denied.reason.http_status()).unwrap_or(StatusCode::FORBIDDEN);
    (
        status,
        axum::Json(json!({
            "error": denied.reason.code(),
            "stage": denied.stage,
            "message": denied.message,
        })),
    )
        .into_response()
}

pub fn auth_error_status(kind: AuthErrorKind) -> StatusCode {
    match kind {
        AuthErrorKind::TokenInvalid
        | AuthErrorKind::TokenExpired
        | AuthErrorKind::AccountNotFound
        | AuthErrorKind::AccountInactive
        | AuthErrorKind::TokenReuseOrStale => StatusCode::UNAUTHORIZED,
        AuthErrorKind::InsufficientPermissions => StatusCode::FORBIDDEN,
        AuthErrorKind::StoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        AuthErrorKind::ConfigurationError | AuthErrorKind::InvalidUserTier | AuthErrorKind::InvalidRole => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

pub fn auth_error_response(err: &AuthError) -> axum::response::Response {
    let kind = err.kind();
    let status = auth_error_status(kind);
    if status.is_server_error() {
        tracing::error!(error = %err, code = kind.code(), "auth failure");
    }
    json_error(status, kind.code(), err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_failures_force_reauthentication_with_401() {
        for kind in [
            AuthErrorKind::TokenInvalid,
            AuthErrorKind::TokenExpired,
            AuthErrorKind::TokenReuseOrStale,
            AuthErrorKind::AccountNotFound,
        ] {
            assert_eq!(auth_error_status(kind), StatusCode::UNAUTHORIZED);
        }
    }

    #[test]
    fn store_outage_is_not_an_authentication_failure() {
        assert_eq!(
            auth_error_status(AuthErrorKind::StoreUnavailable),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            auth_error_status(AuthErrorKind::ConfigurationError),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
