//! Caller-facing facade used by login controllers and HTTP middleware.

use std::sync::Arc;

use tracing::{debug, info, instrument};

use fleetgate_core::{AccountId, Clock, OrganizationId};

use crate::claims::AccessClaims;
use crate::codec::{Identity, TokenCodec, TokenPair};
use crate::error::AuthError;
use crate::pipeline::{AccessDecision, AccessDenied, AccessPipeline, AccessRequest, AuthorizedPrincipal};
use crate::policy::RoutePolicy;
use crate::refresh::RefreshEngine;
use crate::roles::{Role, UserTier, tier_of};
use crate::store::AccountStore;

#[derive(Clone)]
pub struct AuthService<S> {
    codec: TokenCodec,
    store: S,
    refresh: RefreshEngine<S>,
    pipeline: AccessPipeline<S>,
    clock: Arc<dyn Clock>,
}

impl<S> core::fmt::Debug for AuthService<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AuthService").finish_non_exhaustive()
    }
}

impl<S> AuthService<S>
where
    S: AccountStore + Clone,
{
    pub fn new(codec: TokenCodec, store: S, clock: Arc<dyn Clock>) -> Self {
        Self {
            refresh: RefreshEngine::new(codec.clone(), store.clone()),
            pipeline: AccessPipeline::new(codec.clone(), store.clone()),
            codec,
            store,
            clock,
        }
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Issue a pair after a successful login and store the refresh token,
    /// replacing (and thereby invalidating) any previous one.
    #[instrument(skip(self, identity), fields(account_id = %identity.id, %role), err)]
    pub async fn issue_tokens(
        &self,
        identity: &Identity,
        role: Role,
        organization_id: Option<OrganizationId>,
    ) -> Result<TokenPair, AuthError> {
        let now = self.clock.now();
        let tier = tier_of(role);
        let access = self
            .codec
            .issue_access_token(identity, role, organization_id.clone(), now)?;
        let refresh = self
            .codec
            .issue_refresh_token(&identity.id, tier, organization_id, now)?;

        let stored = self
            .store
            .persist_refresh_token(&identity.id, tier, Some(&refresh.token))
            .await?;
        if !stored {
            return Err(AuthError::AccountNotFound);
        }

        info!(%tier, "tokens issued");
        Ok(TokenPair::new(&access, &refresh))
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        self.refresh.refresh(refresh_token, self.clock.now()).await
    }

    /// Verify an access token and confirm the account is still live.
    ///
    /// With `required_tier`, the token's tier must equal it; super admins
    /// satisfy any tier.
    pub async fn validate(
        &self,
        access_token: &str,
        required_tier: Option<UserTier>,
    ) -> Result<AccessClaims, AuthError> {
        let claims = self.codec.verify_access_token(access_token, self.clock.now())?;

        if let Some(required) = required_tier {
            if claims.user_type != required && !claims.role.is_super_admin() {
                debug!(account_id = %claims.id, tier = %claims.user_type, %required, "tier mismatch");
                return Err(AuthError::InsufficientPermissions(format!(
                    "requires tier {required}, token is {}",
                    claims.user_type
                )));
            }
        }

        let account = self
            .store
            .load_account_state(&claims.id, claims.user_type)
            .await?
            .ok_or(AuthError::AccountNotFound)?;
        if !account.is_active {
            return Err(AuthError::AccountInactive);
        }

        Ok(claims)
    }

    /// Clear the refresh-token slot (logout / administrative revocation).
    #[instrument(skip(self), err)]
    pub async fn revoke(&self, id: &AccountId, tier: UserTier) -> Result<(), AuthError> {
        if !self.store.persist_refresh_token(id, tier, None).await? {
            return Err(AuthError::AccountNotFound);
        }
        info!("refresh token revoked");
        Ok(())
    }

    pub async fn authorize(
        &self,
        request: &AccessRequest<'_>,
        policy: &RoutePolicy,
    ) -> Result<AuthorizedPrincipal, AccessDenied> {
        self.pipeline.authorize(request, policy, self.clock.now()).await
    }

    pub async fn evaluate(&self, request: &AccessRequest<'_>, policy: &RoutePolicy) -> AccessDecision {
        self.pipeline.evaluate(request, policy, self.clock.now()).await
    }
}
