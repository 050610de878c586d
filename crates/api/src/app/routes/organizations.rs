use axum::{Extension, Json, extract::Path, response::IntoResponse};

use crate::app::dto::OrganizationAccessResponse;
use crate::context::PrincipalContext;

/// `GET /organizations/:organization_id/access`
///
/// Reaching the handler means the boundary check already passed.
pub async fn access(
    Path(organization_id): Path<String>,
    Extension(principal): Extension<PrincipalContext>,
) -> impl IntoResponse {
    Json(OrganizationAccessResponse {
        organization_id,
        account_id: principal.account_id().to_string(),
        role: principal.role(),
    })
}
