use fleetgate_auth::{AppContext, AuthorizedPrincipal, PermissionSet, Role, UserTier};
use fleetgate_core::{AccountId, OrganizationId};

/// Principal context for a request that passed the access pipeline.
///
/// Inserted into request extensions by the access middleware; handlers read it
/// instead of re-decoding the token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    account_id: AccountId,
    email: String,
    role: Role,
    tier: UserTier,
    organization_id: Option<OrganizationId>,
    app_context: AppContext,
    permissions: PermissionSet,
}

impl PrincipalContext {
    pub fn account_id(&self) -> &AccountId {
        &self.account_id
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn tier(&self) -> UserTier {
        self.tier
    }

    pub fn organization_id(&self) -> Option<&OrganizationId> {
        self.organization_id.as_ref()
    }

    pub fn app_context(&self) -> AppContext {
        self.app_context
    }

    pub fn permissions(&self) -> &PermissionSet {
        &self.permissions
    }
}

impl From<AuthorizedPrincipal> for PrincipalContext {
    fn from(principal: AuthorizedPrincipal) -> Self {
        let claims = principal.claims;
        Self {
            account_id: claims.id,
            email: claims.email,
            role: claims.role,
            tier: claims.user_type,
            organization_id: claims.organization_id,
            app_context: principal.context,
            permissions: claims.permissions,
        }
    }
}
