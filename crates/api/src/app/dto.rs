use serde::{Deserialize, Serialize};

use fleetgate_auth::{AppContext, Role, UserTier};

use crate::context::PrincipalContext;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrincipalResponse {
    pub id: String,
    pub email: String,
    pub role: Role,
    pub user_type: UserTier,
    pub organization_id: Option<String>,
    pub app_context: AppContext,
    pub permissions: Vec<String>,
}

impl From<&PrincipalContext> for PrincipalResponse {
    fn from(principal: &PrincipalContext) -> Self {
        Self {
            id: principal.account_id().to_string(),
            email: principal.email().to_string(),
            role: principal.role(),
            user_type: principal.tier(),
            organization_id: principal.organization_id().map(|o| o.to_string()),
            app_context: principal.app_context(),
            permissions: principal.permissions().iter().map(|p| p.to_string()).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationAccessResponse {
    pub organization_id: String,
    pub account_id: String,
    pub role: Role,
}
