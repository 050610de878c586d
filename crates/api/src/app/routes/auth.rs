use axum::{
    Extension, Json,
    extract::rejection::JsonRejection,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};

use crate::app::{SharedAuth, dto, errors};
use crate::context::PrincipalContext;
use crate::middleware::extract_bearer;

/// `POST /auth/refresh`: rotate a refresh token into a new pair.
pub async fn refresh(
    Extension(auth): Extension<SharedAuth>,
    body: Result<Json<dto::RefreshRequest>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => {
            return errors::json_error(rejection.status(), "INVALID_REQUEST_BODY", rejection.body_text());
        }
    };

    match auth.refresh(&body.refresh_token).await {
        Ok(pair) => (StatusCode::OK, Json(pair)).into_response(),
        Err(e) => errors::auth_error_response(&e),
    }
}

/// `POST /auth/logout`: clear the caller's stored refresh token.
pub async fn logout(Extension(auth): Extension<SharedAuth>, headers: HeaderMap) -> Response {
    let Some(token) = extract_bearer(&headers) else {
        return errors::json_error(StatusCode::UNAUTHORIZED, "TOKEN_INVALID", "missing bearer token");
    };

    let claims = match auth.validate(token, None).await {
        Ok(claims) => claims,
        Err(e) => return errors::auth_error_response(&e),
    };

    match auth.revoke(&claims.id, claims.user_type).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::auth_error_response(&e),
    }
}

/// `GET /auth/me`
pub async fn me(Extension(principal): Extension<PrincipalContext>) -> Response {
    Json(dto::PrincipalResponse::from(&principal)).into_response()
}
